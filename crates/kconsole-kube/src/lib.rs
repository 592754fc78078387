//! Cluster boundary for kconsole, built on the local `kubectl` binary.
//!
//! - [`Kubectl`] carries the binary path and the kubeconfig/context flags and
//!   runs discovery, logs and interactive shells.
//! - [`KubectlExec`] is the transfer channel: `kubectl exec -i` with its
//!   streams relayed to the caller.

mod command;
mod error;
mod exec;
mod kubectl;
pub mod pods;

pub use command::Command;
pub use error::{Error, Result};
pub use exec::KubectlExec;
pub use kubectl::{Kubectl, exec_args, logs_args, pods_args};
pub use pods::PodInfo;
