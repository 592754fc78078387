use std::io;
use std::process::Stdio;

use kconsole_transfer::{BoxReader, BoxWriter, ContainerRef, ExecIo, RemoteError, RemoteExec};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::ChildStdin;
use tracing::debug;

use crate::error::Error;
use crate::kubectl::{Kubectl, exec_args};

/// Transfer channel backed by `kubectl exec -i`.
#[derive(Debug, Clone)]
pub struct KubectlExec {
    kubectl: Kubectl,
}

impl KubectlExec {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }
}

impl RemoteExec for KubectlExec {
    async fn exec(
        &self,
        target: &ContainerRef,
        command: &[String],
        io: ExecIo,
    ) -> Result<(), RemoteError> {
        let ExecIo {
            stdin,
            stdout,
            stderr,
        } = io;

        let mut child = self
            .kubectl
            .command(exec_args(target, false, command))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e {
                Error::CommandFailed { source, .. } => RemoteError::Spawn(source),
                other => RemoteError::Other(other.to_string()),
            })?;

        let child_stdin = child.stdin.take();
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let mut feeding = Box::pin(feed(stdin, child_stdin));
        let mut relaying = Box::pin(async move {
            tokio::try_join!(relay(child_stdout, stdout), relay(child_stderr, stderr))
        });

        // once the remote closes its output nothing more will be read from stdin
        let mut fed = false;
        let relayed = loop {
            tokio::select! {
                result = &mut relaying => break result,
                result = &mut feeding, if !fed => {
                    fed = true;
                    result.map_err(RemoteError::Io)?;
                }
            }
        };
        drop(feeding);
        relayed.map_err(RemoteError::Io)?;

        let status = child.wait().await.map_err(RemoteError::Io)?;
        debug!(container = %target, ?status, "remote command finished");
        if status.success() {
            Ok(())
        } else {
            Err(RemoteError::Exit {
                code: status.code(),
            })
        }
    }
}

/// Copy `source` into the child's stdin, then close it. The child going away
/// mid-copy is not an error here; its exit status reports the failure.
async fn feed(source: Option<BoxReader>, sink: Option<ChildStdin>) -> io::Result<()> {
    let (Some(mut source), Some(mut sink)) = (source, sink) else {
        return Ok(());
    };
    let copied = async {
        tokio::io::copy(&mut source, &mut sink).await?;
        sink.shutdown().await
    };
    match copied.await {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Copy a child output stream to `sink`, discarding it when there is none.
/// The sink is dropped on return so its reader sees EOF.
async fn relay<R: AsyncRead + Unpin>(source: Option<R>, sink: Option<BoxWriter>) -> io::Result<()> {
    let Some(mut source) = source else {
        return Ok(());
    };
    match sink {
        Some(mut sink) => {
            tokio::io::copy(&mut source, &mut sink).await?;
            sink.flush().await
        }
        None => tokio::io::copy(&mut source, &mut tokio::io::sink())
            .await
            .map(drop),
    }
}
