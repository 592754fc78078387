//! Error types for kconsole-transfer.

use std::io;

use thiserror::Error;

/// Failure reported by a [`crate::RemoteExec`] implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to start remote command: {0}")]
    Spawn(#[source] io::Error),

    #[error("remote command exited with status {}", exit_status(.code))]
    Exit { code: Option<i32> },

    #[error("remote stream failed: {0}")]
    Io(#[source] io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer: {0}")]
    Configuration(String),

    #[error("local pack failed: {0}")]
    Pack(#[source] kconsole_archive::Error),

    #[error("local unpack failed: {0}")]
    Unpack(#[source] kconsole_archive::Error),

    #[error("remote exec failed: {0}")]
    Remote(#[source] RemoteError),

    #[error("transfer cancelled")]
    Cancelled,

    #[error("local transfer task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

impl TransferError {
    /// True when the failure happened on the local side of the channel.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Pack(_) | Self::Unpack(_) | Self::Task(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

fn exit_status(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

pub type Result<T> = std::result::Result<T, TransferError>;
