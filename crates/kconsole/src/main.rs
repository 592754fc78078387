use std::process::ExitCode;

use clap::Parser;
use kconsole_transfer::TransferError;

use crate::cli::App;
use crate::config::ConfigError;

mod cli;
mod config;
mod logging;

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    logging::init(app.log_level.as_deref());

    match cli::run(app).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code(&err)
        }
    }
}

/// 2 for bad input or configuration, 3 for local filesystem or archive
/// failures, 4 for the cluster side, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(classify(err))
}

fn classify(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
        if let Some(err) = cause.downcast_ref::<TransferError>() {
            return match err {
                TransferError::Configuration(_) => 2,
                TransferError::Pack(_) | TransferError::Unpack(_) | TransferError::Task(_) => 3,
                TransferError::Remote(_) => 4,
                TransferError::Cancelled => 1,
            };
        }
        if let Some(err) = cause.downcast_ref::<kconsole_kube::Error>() {
            return match err {
                kconsole_kube::Error::KubectlNotFound(_)
                | kconsole_kube::Error::AmbiguousContainer { .. }
                | kconsole_kube::Error::ContainerNotFound { .. }
                | kconsole_kube::Error::UnknownContext(_) => 2,
                _ => 4,
            };
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use kconsole_transfer::RemoteError;

    use super::*;

    #[test]
    fn transfer_errors_map_by_side() {
        let config = anyhow::Error::from(TransferError::Configuration("relative".into()));
        assert_eq!(classify(&config), 2);

        let remote = anyhow::Error::from(TransferError::Remote(RemoteError::Exit { code: Some(2) }));
        assert_eq!(classify(&remote), 4);

        assert_eq!(classify(&anyhow::Error::from(TransferError::Cancelled)), 1);
    }

    #[test]
    fn context_does_not_hide_the_cause() {
        let err = Err::<(), _>(ConfigError::Invalid("pipe_capacity".into()))
            .context("loading config")
            .unwrap_err();
        assert_eq!(classify(&err), 2);
    }

    #[test]
    fn kube_errors_split_between_input_and_cluster() {
        let ambiguous = anyhow::Error::from(kconsole_kube::Error::AmbiguousContainer {
            pod: "web-0".into(),
            available: vec!["a".into(), "b".into()],
        });
        assert_eq!(classify(&ambiguous), 2);

        let missing = anyhow::Error::from(kconsole_kube::Error::PodNotFound {
            namespace: "shop".into(),
            pod: "web-9".into(),
        });
        assert_eq!(classify(&missing), 4);
    }

    #[test]
    fn unknown_errors_are_generic() {
        assert_eq!(classify(&anyhow::anyhow!("boom")), 1);
    }
}
