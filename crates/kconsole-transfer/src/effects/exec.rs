use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::data::ContainerRef;
use crate::error::RemoteError;

pub type BoxReader = Pin<Box<dyn AsyncRead + Send>>;
pub type BoxWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Streams attached to one remote command.
///
/// A `None` stream is closed: the command sees end-of-input on stdin, and
/// output written to a closed sink is discarded. Implementations drop every
/// stream before returning so the other end observes EOF.
#[derive(Default)]
pub struct ExecIo {
    pub stdin: Option<BoxReader>,
    pub stdout: Option<BoxWriter>,
    pub stderr: Option<BoxWriter>,
}

impl ExecIo {
    pub fn stdin(mut self, reader: impl AsyncRead + Send + 'static) -> Self {
        self.stdin = Some(Box::pin(reader));
        self
    }

    pub fn stdout(mut self, writer: impl AsyncWrite + Send + 'static) -> Self {
        self.stdout = Some(Box::pin(writer));
        self
    }

    pub fn stderr(mut self, writer: impl AsyncWrite + Send + 'static) -> Self {
        self.stderr = Some(Box::pin(writer));
        self
    }
}

/// Remote command execution inside a container.
///
/// This is the only thing a transfer needs from the cluster: run `command`
/// in `target` with the given streams and report how it ended.
///
/// # Implementations
///
/// - `kconsole_kube::KubectlExec`: runs `kubectl exec -i`
/// - In-memory doubles for testing
pub trait RemoteExec: Send + Sync {
    /// Run `command` to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started, a stream fails, or
    /// the command exits unsuccessfully.
    fn exec(
        &self,
        target: &ContainerRef,
        command: &[String],
        io: ExecIo,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
