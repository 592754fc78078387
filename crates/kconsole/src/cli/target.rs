use anyhow::Result;
use clap::Args;
use kconsole_kube::Kubectl;
use kconsole_transfer::ContainerRef;

/// Which container a command acts on.
#[derive(Args, Clone, Debug)]
pub struct TargetArgs {
    /// Pod name
    pub pod: String,

    #[arg(long, short, default_value = "default", help = "Namespace of the pod")]
    pub namespace: String,

    #[arg(long, short, help = "Container name; may be omitted when the pod has only one")]
    pub container: Option<String>,
}

impl TargetArgs {
    pub async fn resolve(&self, kubectl: &Kubectl) -> Result<ContainerRef> {
        let target = kubectl
            .resolve(&self.namespace, &self.pod, self.container.as_deref())
            .await?;
        tracing::debug!(container = %target, "resolved target");
        Ok(target)
    }
}
