//! I/O side of a transfer: the remote channel seam and the orchestrator that
//! joins it to the local packer or unpacker.

mod exec;
mod transfer;

pub use exec::{BoxReader, BoxWriter, ExecIo, RemoteExec};
pub use transfer::Transfer;
