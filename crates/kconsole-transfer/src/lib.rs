//! Copy file trees into and out of containers over a remote exec channel.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Transfer descriptions, options and reports
//! - [`core`] - Pure path composition, remote command selection and error precedence
//! - [`effects`] - The [`RemoteExec`] seam and the [`Transfer`] orchestrator
//!
//! # Key Features
//!
//! - **Single Stream**: one tar stream per transfer, packed or unpacked while it
//!   crosses the channel
//! - **Bounded Memory**: the local side and the channel are joined by a fixed
//!   capacity pipe, so a slow peer suspends the other side
//! - **Mechanism-Only**: target selection and transport live behind [`RemoteExec`]

pub mod core;
pub mod data;
mod effects;
mod error;

pub use core::{
    download_command, download_destination, settle, upload_command, upload_destination,
    validate_local_path, validate_remote_path,
};
pub use data::{
    ContainerRef, Direction, StdinMode, TransferOptions, TransferReport, TransferSpec,
};
pub use effects::{BoxReader, BoxWriter, ExecIo, RemoteExec, Transfer};
pub use error::{RemoteError, Result, TransferError};

pub use kconsole_archive::{ArchiveStats, ExistingPolicy, UnpackOptions};
