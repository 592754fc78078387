use anyhow::{Context, Result};
use clap::Args;

use super::Session;

#[derive(Args, Clone, Debug)]
pub struct SwitchArg {
    /// Context to use from now on; lists the contexts when omitted
    pub context: Option<String>,
}

pub async fn switch(arg: SwitchArg, session: &Session) -> Result<()> {
    let kubectl = session.kubectl()?;

    let Some(context) = arg.context else {
        let current = match &session.config.context {
            Some(context) => context.clone(),
            None => kubectl.current_context().await.unwrap_or_default(),
        };
        for name in kubectl.contexts().await? {
            let marker = if name == current { "*" } else { " " };
            println!("{marker} {name}");
        }
        return Ok(());
    };

    kubectl.check_context(&context).await?;
    let mut config = session.config.clone();
    config.context = Some(context.clone());
    session
        .store
        .save(&config)
        .with_context(|| format!("failed to update {}", session.store.path().display()))?;
    println!("checkout context: {context} ~");
    Ok(())
}
