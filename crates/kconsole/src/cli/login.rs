use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kconsole_kube::Kubectl;
use tracing::info;

use super::Session;
use crate::config::AuthMode;

#[derive(Args, Clone, Debug)]
pub struct LoginArg {
    #[arg(long, short, value_enum, default_value_t = AuthMode::Local, help = "Authentication mode")]
    pub mode: AuthMode,

    #[arg(long, help = "kubeconfig file to use instead of kubectl's default")]
    pub kubeconfig: Option<PathBuf>,

    #[arg(long, help = "kubeconfig context to use")]
    pub context: Option<String>,

    #[arg(long, help = "Path to the kubectl binary")]
    pub kubectl: Option<PathBuf>,
}

pub async fn login(arg: LoginArg, session: &Session) -> Result<()> {
    let mut config = session.config.clone();
    config.auth = arg.mode;
    if arg.kubectl.is_some() {
        config.kubectl = arg.kubectl;
    }
    if arg.kubeconfig.is_some() {
        config.kubeconfig = arg.kubeconfig;
    }

    let kubectl = Kubectl::locate(config.kubectl.as_deref())?
        .with_kubeconfig(config.kubeconfig.clone());
    if let Some(context) = arg.context {
        kubectl.check_context(&context).await?;
        config.context = Some(context);
    }

    session
        .store
        .save(&config)
        .with_context(|| format!("failed to update {}", session.store.path().display()))?;
    info!(path = %session.store.path().display(), "config written");
    println!("login successfully.");
    Ok(())
}
