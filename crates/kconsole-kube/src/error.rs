use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("kubectl not found in PATH: {0}")]
    KubectlNotFound(#[source] which::Error),

    #[error("command failed: {cmd}: {source}")]
    CommandFailed {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{cmd}` exited with status {code}: {stderr}")]
    NonZeroExit {
        cmd: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to parse kubectl output for {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pod '{namespace}/{pod}' not found")]
    PodNotFound { namespace: String, pod: String },

    #[error("container '{container}' not found in pod '{pod}' (available: {})", .available.join(", "))]
    ContainerNotFound {
        pod: String,
        container: String,
        available: Vec<String>,
    },

    #[error("pod '{pod}' has several containers, pick one with --container: {}", .available.join(", "))]
    AmbiguousContainer { pod: String, available: Vec<String> },

    #[error("unknown kubeconfig context '{0}'")]
    UnknownContext(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_errors_list_choices() {
        let err = Error::AmbiguousContainer {
            pod: "web-0".into(),
            available: vec!["app".into(), "sidecar".into()],
        };
        assert!(err.to_string().ends_with("app, sidecar"));

        let err = Error::ContainerNotFound {
            pod: "web-0".into(),
            container: "db".into(),
            available: vec!["app".into()],
        };
        assert!(err.to_string().contains("'db'"));
    }
}
