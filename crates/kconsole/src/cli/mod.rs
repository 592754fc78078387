mod app;
mod completion;
mod console;
mod log;
mod login;
mod pods;
mod switch;
mod target;
mod transfer;

use anyhow::Result;
use kconsole_kube::Kubectl;

pub use app::{App, Commands};

use crate::config::{Config, ConfigStore};

/// Loaded configuration and where it came from.
pub struct Session {
    pub store: ConfigStore,
    pub config: Config,
}

impl Session {
    pub fn load() -> Result<Self> {
        let store = ConfigStore::locate()?;
        let config = store.load()?;
        Ok(Self { store, config })
    }

    /// A `kubectl` handle carrying the configured binary, kubeconfig and context.
    pub fn kubectl(&self) -> Result<Kubectl> {
        let kubectl = Kubectl::locate(self.config.kubectl.as_deref())?
            .with_kubeconfig(self.config.kubeconfig.clone())
            .with_context(self.config.context.clone());
        Ok(kubectl)
    }
}

pub async fn run(app: App) -> Result<()> {
    if let Commands::Completion(arg) = app.cmd {
        return completion::completion(arg);
    }

    let session = Session::load()?;
    match app.cmd {
        Commands::Console(arg) => console::console(arg, &session).await,
        Commands::Log(arg) => log::log(arg, &session).await,
        Commands::LogDown(arg) => log::logdown(arg, &session).await,
        Commands::Upload(arg) => transfer::upload(arg, &session).await,
        Commands::Download(arg) => transfer::download(arg, &session).await,
        Commands::Pods(arg) => pods::pods(arg, &session).await,
        Commands::Login(arg) => login::login(arg, &session).await,
        Commands::Switch(arg) => switch::switch(arg, &session).await,
        Commands::Completion(_) => Ok(()),
    }
}
