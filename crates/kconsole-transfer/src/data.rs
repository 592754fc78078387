//! Data layer: immutable descriptions of a transfer and its outcome.

use std::fmt;
use std::path::PathBuf;

use kconsole_archive::{ArchiveStats, UnpackOptions};

/// Default capacity of the in-process pipe between the channel and the local side.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local tree into the container.
    Upload,
    /// Container tree onto the local filesystem.
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// One requested copy. Which path is the source depends on `direction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub direction: Direction,
    pub local_path: String,
    pub remote_path: String,
}

impl TransferSpec {
    pub fn upload(local_path: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            direction: Direction::Upload,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
        }
    }

    pub fn download(remote_path: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            direction: Direction::Download,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
        }
    }
}

/// The container a transfer or command targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl ContainerRef {
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
        }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.pod, self.container)
    }
}

/// Where the remote command's input comes from during a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdinMode {
    /// The remote command sees end-of-input immediately.
    #[default]
    Closed,
    /// Local stdin is relayed to the remote command.
    Inherit,
}

#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Capacity in bytes of the pipe joining the channel and the local side.
    ///
    /// Default: 64 KiB
    pub pipe_capacity: usize,

    /// Remote stdin during downloads.
    ///
    /// Default: [`StdinMode::Closed`]
    pub stdin: StdinMode,

    /// Policy applied while materializing a download.
    pub unpack: UnpackOptions,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            stdin: StdinMode::default(),
            unpack: UnpackOptions::default(),
        }
    }
}

impl TransferOptions {
    pub fn pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    pub fn stdin(mut self, mode: StdinMode) -> Self {
        self.stdin = mode;
        self
    }

    pub fn unpack(mut self, options: UnpackOptions) -> Self {
        self.unpack = options;
        self
    }
}

/// Outcome of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub direction: Direction,
    /// Upload source, or the directory the download was materialized into.
    pub local_path: PathBuf,
    /// Download source, or the upload destination after composition.
    pub remote_path: String,
    pub stats: ArchiveStats,
}
