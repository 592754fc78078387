use clap::{Parser, Subcommand};

use super::completion::CompletionArg;
use super::console::ConsoleArg;
use super::log::{LogArg, LogDownArg};
use super::login::LoginArg;
use super::pods::PodsArg;
use super::switch::SwitchArg;
use super::transfer::{DownloadArg, UploadArg};

#[derive(Debug, Parser)]
#[command(name = "kconsole", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Log filter, e.g. `info` or `kconsole_transfer=debug` (default: $KCONSOLE_LOG or warn)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "c", name = "console", about = "Open a shell in a container")]
    Console(ConsoleArg),
    #[command(alias = "l", name = "log", about = "Show the latest log lines of a container")]
    Log(LogArg),
    #[command(alias = "ld", name = "logdown", about = "Save the latest log lines of a container to a file")]
    LogDown(LogDownArg),
    #[command(alias = "up", name = "upload", about = "Copy a local file, directory or glob into a container")]
    Upload(UploadArg),
    #[command(alias = "down", name = "download", about = "Copy a file or directory out of a container")]
    Download(DownloadArg),
    #[command(alias = "ls", name = "pods", about = "List pods and their containers")]
    Pods(PodsArg),
    #[command(name = "login", about = "Set how kconsole authenticates to the cluster")]
    Login(LoginArg),
    #[command(alias = "sw", name = "switch", about = "Show or select the kubeconfig context")]
    Switch(SwitchArg),
    #[command(name = "completion", about = "Print a shell completion script")]
    Completion(CompletionArg),
}
