//! Streaming tar packing and unpacking for container file transfer.
//!
//! # Architecture
//!
//! - `sanitize.rs` - Lexical slash-path cleaning and jail resolution
//! - `entry.rs` - Archive member metadata and tar header mapping
//! - `pack.rs` - Local tree or glob to tar stream
//! - `unpack.rs` - Tar stream to local tree, prefix checked
//! - `options.rs` - Unpack policy
//! - `report.rs` - Per-stream counters

pub use entry::{ArchiveEntry, EntryKind};
pub use error::{Error, ErrorKind, Result};
pub use options::{ExistingPolicy, UnpackOptions};
pub use pack::{Packer, make_tar};
pub use report::ArchiveStats;
pub use sanitize::{
    base_name, clean, dir_name, has_glob_magic, join, normalize, remote_prefix, resolve_within,
};
pub use unpack::{Unpacker, unpack};

pub mod entry;
mod error;
pub mod options;
mod pack;
mod report;
pub mod sanitize;
mod unpack;
