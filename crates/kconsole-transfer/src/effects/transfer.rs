use std::io;
use std::path::Path;

use kconsole_archive::{ArchiveStats, Unpacker, make_tar, remote_prefix};
use tokio::io::{DuplexStream, duplex};
use tokio::task::JoinHandle;
use tokio_util::io::SyncIoBridge;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::exec::{ExecIo, RemoteExec};
use crate::core::{
    download_command, download_destination, settle, upload_command, upload_destination,
    validate_local_path, validate_remote_path,
};
use crate::data::{ContainerRef, Direction, StdinMode, TransferOptions, TransferReport, TransferSpec};
use crate::error::{RemoteError, Result, TransferError};

/// Runs transfers against one container.
///
/// Each transfer is one tar stream: the remote command and the local packer
/// or unpacker run concurrently, joined by a bounded in-process pipe. The
/// local side runs on the blocking pool since archive I/O is synchronous.
pub struct Transfer<E: RemoteExec> {
    exec: E,
    target: ContainerRef,
    options: TransferOptions,
    cancel: CancellationToken,
}

impl<E: RemoteExec> Transfer<E> {
    pub fn new(exec: E, target: ContainerRef) -> Self {
        Self {
            exec,
            target,
            options: TransferOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Bind transfers to an externally owned cancellation scope.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn target(&self) -> &ContainerRef {
        &self.target
    }

    /// Validate `spec` and run it.
    pub async fn run(&self, spec: &TransferSpec) -> Result<TransferReport> {
        validate_local_path(&spec.local_path)?;
        validate_remote_path(&spec.remote_path)?;

        match spec.direction {
            Direction::Upload => self.upload(&spec.local_path, &spec.remote_path).await,
            Direction::Download => {
                self.download(&spec.remote_path, Path::new(&spec.local_path))
                    .await
            }
        }
    }

    /// Copy `local` (a file, directory or glob) to `remote` in the container.
    pub async fn upload(&self, local: &str, remote: &str) -> Result<TransferReport> {
        require_non_empty(local, remote)?;
        let dest = upload_destination(local, remote);
        info!(local, remote = %dest, container = %self.target, "upload started");

        let (channel_in, pack_out) = duplex(self.options.pipe_capacity);
        let pack = spawn_pack(local.to_string(), dest.clone(), pack_out);

        let io = ExecIo::default()
            .stdin(channel_in)
            .stderr(tokio::io::stderr());
        let remote_result = self.exec_cancellable(&upload_command(), io).await;
        let local_result = pack.await.map_err(TransferError::Task)?;

        let Some(remote_result) = remote_result else {
            warn!(local, remote = %dest, "upload cancelled");
            return Err(TransferError::Cancelled);
        };

        let stats = settle(remote_result, local_result, TransferError::Pack)
            .inspect_err(|e| warn!(local, remote = %dest, error = %e, "upload failed"))?;
        info!(
            local,
            remote = %dest,
            entries = stats.entries,
            bytes = stats.bytes,
            "upload finished"
        );

        Ok(TransferReport {
            direction: Direction::Upload,
            local_path: local.into(),
            remote_path: dest,
            stats,
        })
    }

    /// Copy `remote` out of the container into `local/<base name of remote>`.
    pub async fn download(&self, remote: &str, local: &Path) -> Result<TransferReport> {
        require_non_empty(&local.to_string_lossy(), remote)?;
        let prefix = remote_prefix(remote);
        let dest = download_destination(local, &prefix);
        info!(remote, local = %dest.display(), container = %self.target, "download started");

        let (unpack_in, channel_out) = duplex(self.options.pipe_capacity);
        let unpacker =
            Unpacker::new(dest.clone(), prefix.clone()).with_options(self.options.unpack.clone());
        let unpack = spawn_unpack(unpacker, unpack_in);

        let mut io = ExecIo::default()
            .stdout(channel_out)
            .stderr(tokio::io::stderr());
        if self.options.stdin == StdinMode::Inherit {
            io = io.stdin(tokio::io::stdin());
        }
        let remote_result = self
            .exec_cancellable(&download_command(remote), io)
            .await;
        let local_result = unpack.await.map_err(TransferError::Task)?;

        let Some(remote_result) = remote_result else {
            warn!(remote, local = %dest.display(), "download cancelled");
            return Err(TransferError::Cancelled);
        };

        let stats = settle(remote_result, local_result, TransferError::Unpack).inspect_err(
            |e| warn!(remote, local = %dest.display(), error = %e, "download failed"),
        )?;
        info!(
            remote,
            local = %dest.display(),
            entries = stats.entries,
            bytes = stats.bytes,
            "download finished"
        );

        Ok(TransferReport {
            direction: Direction::Download,
            local_path: dest,
            remote_path: remote.to_string(),
            stats,
        })
    }

    /// Run the remote command unless the scope is cancelled first. On
    /// cancellation the exec future and its streams are dropped, which closes
    /// the pipe under the local task.
    async fn exec_cancellable(
        &self,
        command: &[String],
        io: ExecIo,
    ) -> Option<std::result::Result<(), RemoteError>> {
        tokio::select! {
            result = self.exec.exec(&self.target, command, io) => Some(result),
            _ = self.cancel.cancelled() => None,
        }
    }
}

fn require_non_empty(local: &str, remote: &str) -> Result<()> {
    if local.is_empty() || remote.is_empty() {
        return Err(TransferError::Configuration(
            "both a local and a remote path are required".to_string(),
        ));
    }
    Ok(())
}

/// Pack on the blocking pool, writing into `writer`. The writer is dropped
/// when packing ends, so the reading side sees EOF on success and failure.
pub(crate) fn spawn_pack(
    source: String,
    dest: String,
    writer: DuplexStream,
) -> JoinHandle<kconsole_archive::Result<ArchiveStats>> {
    tokio::task::spawn_blocking(move || {
        make_tar(&source, &dest, SyncIoBridge::new(writer)).map(|(_, stats)| stats)
    })
}

/// Unpack on the blocking pool from `reader`, then drain whatever record
/// padding follows the end-of-archive marker so the writer never sees a
/// closed pipe on a good stream.
pub(crate) fn spawn_unpack(
    unpacker: Unpacker,
    reader: DuplexStream,
) -> JoinHandle<kconsole_archive::Result<ArchiveStats>> {
    tokio::task::spawn_blocking(move || {
        let mut bridge = SyncIoBridge::new(reader);
        let stats = unpacker.unpack(&mut bridge)?;
        io::copy(&mut bridge, &mut io::sink()).map_err(kconsole_archive::Error::Stream)?;
        Ok(stats)
    })
}
