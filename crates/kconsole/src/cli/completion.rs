use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};

use super::app::App;

#[derive(Args, Clone, Debug)]
pub struct CompletionArg {
    /// Shell to generate the script for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn completion(arg: CompletionArg) -> Result<()> {
    let mut command = App::command();
    let mut stdout = std::io::stdout();
    generate(arg.shell, &mut command, "kconsole", &mut stdout);
    Ok(())
}
