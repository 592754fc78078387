use anyhow::{Result, bail};
use clap::Args;

use super::Session;
use super::target::TargetArgs;

#[derive(Args, Clone, Debug)]
pub struct ConsoleArg {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, short, default_value = "sh", value_parser = ["sh", "bash"], help = "Shell to run")]
    pub shell: String,
}

pub async fn console(arg: ConsoleArg, session: &Session) -> Result<()> {
    let kubectl = session.kubectl()?;
    let target = arg.target.resolve(&kubectl).await?;

    let status = kubectl.shell(&target, &arg.shell).await?;
    if !status.success() {
        bail!("shell in {target} exited with {status}");
    }
    Ok(())
}
