use anyhow::Result;
use clap::Args;
use kconsole_kube::PodInfo;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::Session;

#[derive(Args, Clone, Debug)]
pub struct PodsArg {
    #[arg(long, short, help = "Only list pods in this namespace (default: all namespaces)")]
    pub namespace: Option<String>,
}

#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    phase: String,
    #[tabled(rename = "READY")]
    ready: String,
    #[tabled(rename = "RESTARTS")]
    restarts: u32,
    #[tabled(rename = "CONTAINERS")]
    containers: String,
}

impl From<PodInfo> for PodRow {
    fn from(pod: PodInfo) -> Self {
        Self {
            ready: format!("{}/{}", pod.ready, pod.containers.len()),
            containers: pod.containers.join(","),
            namespace: pod.namespace,
            name: pod.name,
            phase: pod.phase,
            restarts: pod.restarts,
        }
    }
}

pub fn render(pods: Vec<PodInfo>) -> String {
    let rows: Vec<PodRow> = pods.into_iter().map(PodRow::from).collect();
    Table::new(rows).with(Style::blank()).to_string()
}

pub async fn pods(arg: PodsArg, session: &Session) -> Result<()> {
    let kubectl = session.kubectl()?;
    let pods = kubectl.pods(arg.namespace.as_deref()).await?;
    if pods.is_empty() {
        println!("no pods found");
        return Ok(());
    }
    println!("{}", render(pods));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_one_row_per_pod() {
        let pods = vec![PodInfo {
            namespace: "shop".into(),
            name: "web-0".into(),
            phase: "Running".into(),
            containers: vec!["nginx".into(), "exporter".into()],
            ready: 1,
            restarts: 3,
        }];

        let table = render(pods);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("NAMESPACE"));
        assert!(lines[1].contains("web-0"));
        assert!(lines[1].contains("1/2"));
        assert!(lines[1].contains("nginx,exporter"));
    }
}
