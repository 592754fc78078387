use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::Session;
use super::target::TargetArgs;

#[derive(Args, Clone, Debug)]
pub struct LogArg {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, help = "Number of lines to show (default: log_lines from config)")]
    pub lines: Option<u32>,

    #[arg(long, short, help = "Keep streaming new lines")]
    pub follow: bool,
}

#[derive(Args, Clone, Debug)]
pub struct LogDownArg {
    #[command(flatten)]
    pub target: TargetArgs,

    /// File to write the log lines to
    pub file: PathBuf,

    #[arg(long, help = "Number of lines to save (default: log_lines from config)")]
    pub lines: Option<u32>,
}

pub async fn log(arg: LogArg, session: &Session) -> Result<()> {
    let kubectl = session.kubectl()?;
    let target = arg.target.resolve(&kubectl).await?;
    let lines = arg.lines.unwrap_or(session.config.log_lines);

    kubectl.print_logs(&target, lines, arg.follow).await?;
    Ok(())
}

pub async fn logdown(arg: LogDownArg, session: &Session) -> Result<()> {
    let kubectl = session.kubectl()?;
    let target = arg.target.resolve(&kubectl).await?;
    let lines = arg.lines.unwrap_or(session.config.log_lines);

    let bytes = kubectl
        .save_logs(&target, lines, &arg.file)
        .await
        .with_context(|| format!("failed to save logs of {target}"))?;
    println!("saved {bytes} bytes of {target} logs to {}", arg.file.display());
    Ok(())
}
