use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tar contents corrupted: entry '{entry}' is outside prefix '{prefix}'")]
    Corrupted { entry: String, prefix: String },

    #[error("path traversal rejected: entry '{entry}' resolves to '{resolved}'")]
    PathTraversal { entry: String, resolved: PathBuf },

    #[error("invalid source pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("no local file matches '{pattern}'")]
    NoMatch { pattern: String },

    #[error("failed to read '{path}': {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to write archive entry '{entry}': {source}")]
    WriteFailed { entry: String, source: io::Error },

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error("failed to create symlink '{link}' -> '{target}': {source}")]
    SymlinkCreationFailed {
        target: PathBuf,
        link: PathBuf,
        source: io::Error,
    },

    #[error("failed to create directory: {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("destination already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("failed to read archive: {0}")]
    Stream(#[source] io::Error),
}

/// Coarse classification used by callers that report which kind of failure
/// ended a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Filesystem,
    ArchiveFormat,
    PathTraversal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Corrupted { .. } => ErrorKind::ArchiveFormat,
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            _ => ErrorKind::Filesystem,
        }
    }

    /// The underlying I/O error, if this failure came from the byte stream or the filesystem.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::ReadFailed { source, .. }
            | Self::WriteFailed { source, .. }
            | Self::ExtractionFailed { source, .. }
            | Self::SymlinkCreationFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::Stream(source) => Some(source),
            _ => None,
        }
    }

    /// True when the failure only reflects the other end of the stream going away.
    pub fn is_pipe_closed(&self) -> bool {
        matches!(
            self.io_error().map(io::Error::kind),
            Some(io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
