use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kconsole_transfer::data::DEFAULT_PIPE_CAPACITY;

const HOME_ENV: &str = "KCONSOLE_HOME";
const ENV_PREFIX: &str = "KCONSOLE_";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine the home directory; set {HOME_ENV}")]
    NoHome,

    #[error("failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How kconsole reaches the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Whatever the local kubeconfig points at.
    #[default]
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub log_lines: u32,
    pub pipe_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthMode::Local,
            kubectl: None,
            kubeconfig: None,
            context: None,
            log_lines: 150,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipe_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipe_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Location of the config file and its load/save cycle.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$KCONSOLE_HOME/config.toml`, defaulting to `~/.kconsole/config.toml`.
    pub fn locate() -> Result<Self, ConfigError> {
        let root = match env::var_os(HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => home::home_dir().ok_or(ConfigError::NoHome)?.join(".kconsole"),
        };
        Ok(Self::new(root.join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Defaults, overlaid by the file, overlaid by `KCONSOLE_*` variables.
    pub fn figment(&self) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&self.path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["home", "log"]))
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        Self::extract(self.figment())
    }

    pub fn extract(figment: Figment) -> Result<Config, ConfigError> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config`, creating the directory on first use.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let text = toml::to_string_pretty(config)?;
        let write_failed = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_failed)?;
        }
        fs::write(&self.path, text).map_err(write_failed)
    }
}
