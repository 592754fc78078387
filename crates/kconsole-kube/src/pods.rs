//! Pod discovery from `kubectl get pods -o json`.

use serde::Deserialize;

use crate::error::{Error, Result};

/// The parts of a pod kconsole needs to pick a target and list it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    pub namespace: String,
    pub name: String,
    pub phase: String,
    pub containers: Vec<String>,
    pub ready: usize,
    pub restarts: u32,
}

impl PodInfo {
    /// Pick the container to target, defaulting to the only one.
    pub fn resolve_container(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(name) if self.containers.iter().any(|c| c == name) => Ok(name.to_string()),
            Some(name) => Err(Error::ContainerNotFound {
                pod: self.name.clone(),
                container: name.to_string(),
                available: self.containers.clone(),
            }),
            None => match self.containers.as_slice() {
                [only] => Ok(only.clone()),
                _ => Err(Error::AmbiguousContainer {
                    pod: self.name.clone(),
                    available: self.containers.clone(),
                }),
            },
        }
    }
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: Metadata,
    #[serde(default)]
    spec: PodSpec,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Deserialize)]
struct Metadata {
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Deserialize, Default)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
}

#[derive(Deserialize)]
struct Container {
    name: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    restart_count: u32,
}

impl From<Pod> for PodInfo {
    fn from(pod: Pod) -> Self {
        let statuses = &pod.status.container_statuses;
        Self {
            ready: statuses.iter().filter(|s| s.ready).count(),
            restarts: statuses.iter().map(|s| s.restart_count).sum(),
            namespace: pod.metadata.namespace,
            name: pod.metadata.name,
            phase: pod.status.phase.unwrap_or_else(|| "Unknown".to_string()),
            containers: pod.spec.containers.into_iter().map(|c| c.name).collect(),
        }
    }
}

/// Parse a `List` of pods.
pub fn parse_pod_list(json: &str) -> Result<Vec<PodInfo>> {
    let list: PodList = serde_json::from_str(json).map_err(|source| Error::Parse {
        what: "pod list".to_string(),
        source,
    })?;
    Ok(list.items.into_iter().map(PodInfo::from).collect())
}

/// Parse a single pod object.
pub fn parse_pod(json: &str) -> Result<PodInfo> {
    let pod: Pod = serde_json::from_str(json).map_err(|source| Error::Parse {
        what: "pod".to_string(),
        source,
    })?;
    Ok(pod.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD_LIST: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "metadata": {"name": "web-0", "namespace": "shop"},
                "spec": {"containers": [{"name": "nginx"}, {"name": "exporter"}]},
                "status": {
                    "phase": "Running",
                    "containerStatuses": [
                        {"name": "nginx", "ready": true, "restartCount": 1},
                        {"name": "exporter", "ready": false, "restartCount": 4}
                    ]
                }
            },
            {
                "metadata": {"name": "job-x", "namespace": "batch"},
                "spec": {"containers": [{"name": "worker"}]},
                "status": {"phase": "Pending"}
            }
        ]
    }"#;

    #[test]
    fn parses_list() {
        let pods = parse_pod_list(POD_LIST).unwrap();
        assert_eq!(pods.len(), 2);

        let web = &pods[0];
        assert_eq!(web.namespace, "shop");
        assert_eq!(web.name, "web-0");
        assert_eq!(web.phase, "Running");
        assert_eq!(web.containers, ["nginx", "exporter"]);
        assert_eq!(web.ready, 1);
        assert_eq!(web.restarts, 5);

        assert_eq!(pods[1].phase, "Pending");
        assert_eq!(pods[1].ready, 0);
    }

    #[test]
    fn parses_single_pod_without_status() {
        let pod = parse_pod(r#"{"metadata": {"name": "p", "namespace": "n"}}"#).unwrap();
        assert_eq!(pod.phase, "Unknown");
        assert!(pod.containers.is_empty());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(parse_pod_list("not json"), Err(Error::Parse { .. })));
    }

    #[test]
    fn container_resolution() {
        let pods = parse_pod_list(POD_LIST).unwrap();
        let (web, job) = (&pods[0], &pods[1]);

        assert_eq!(job.resolve_container(None).unwrap(), "worker");
        assert_eq!(web.resolve_container(Some("exporter")).unwrap(), "exporter");
        assert!(matches!(
            web.resolve_container(None),
            Err(Error::AmbiguousContainer { .. })
        ));
        assert!(matches!(
            web.resolve_container(Some("db")),
            Err(Error::ContainerNotFound { .. })
        ));
    }
}
