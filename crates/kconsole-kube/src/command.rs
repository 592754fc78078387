use std::ffi::OsStr;
use std::process::{ExitStatus, Output, Stdio};

use tokio::process::{Child, Command as TokioCommand};
use tracing::debug;

use crate::error::{Error, Result};

/// Builder around an async child process.
///
/// Children are killed when their handle is dropped, so abandoning a future
/// that owns one never leaks the process.
#[derive(Debug)]
pub struct Command {
    inner: TokioCommand,
    program: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref();
        let mut inner = TokioCommand::new(program);
        inner.kill_on_drop(true);
        Self {
            inner,
            program: program.to_string_lossy().into_owned(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.inner.arg(arg.as_ref());
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub fn stdin(mut self, cfg: impl Into<Stdio>) -> Self {
        self.inner.stdin(cfg);
        self
    }

    pub fn stdout(mut self, cfg: impl Into<Stdio>) -> Self {
        self.inner.stdout(cfg);
        self
    }

    pub fn stderr(mut self, cfg: impl Into<Stdio>) -> Self {
        self.inner.stderr(cfg);
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The command line for messages and logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn spawn(&mut self) -> Result<Child> {
        debug!(cmd = %self.display(), "spawning");
        self.inner.spawn().map_err(|e| self.failed(e))
    }

    pub async fn status(&mut self) -> Result<ExitStatus> {
        debug!(cmd = %self.display(), "running");
        self.inner.status().await.map_err(|e| self.failed(e))
    }

    /// Run to completion capturing output; a non-zero exit is an error.
    pub async fn capture(mut self) -> Result<Output> {
        debug!(cmd = %self.display(), "capturing");
        let output = self
            .inner
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.failed(e))?;
        if !output.status.success() {
            return Err(Error::NonZeroExit {
                cmd: self.display(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    fn failed(&self, source: std::io::Error) -> Error {
        Error::CommandFailed {
            cmd: self.program.clone(),
            source,
        }
    }
}
