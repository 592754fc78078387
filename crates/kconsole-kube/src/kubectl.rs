use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use kconsole_transfer::ContainerRef;
use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::pods::{PodInfo, parse_pod, parse_pod_list};

/// Handle on the local `kubectl` binary and the cluster settings every
/// invocation carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kubectl {
    program: PathBuf,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl Kubectl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            kubeconfig: None,
            context: None,
        }
    }

    /// Use `explicit` when given, otherwise find `kubectl` on `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        let program = match explicit {
            Some(path) => path.to_path_buf(),
            None => which::which("kubectl").map_err(Error::KubectlNotFound)?,
        };
        debug!(kubectl = %program.display(), "using kubectl");
        Ok(Self::new(program))
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>) -> Self {
        self.kubeconfig = kubeconfig;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Global flags placed before every subcommand.
    pub fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.to_string_lossy().into_owned());
        }
        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args
    }

    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Command::new(&self.program)
            .args(self.global_args())
            .args(args)
    }

    pub async fn pods(&self, namespace: Option<&str>) -> Result<Vec<PodInfo>> {
        let output = self.command(pods_args(namespace)).capture().await?;
        parse_pod_list(&String::from_utf8_lossy(&output.stdout))
    }

    pub async fn pod(&self, namespace: &str, name: &str) -> Result<PodInfo> {
        let output = self
            .command(["get", "pod", name, "-n", namespace, "-o", "json"])
            .capture()
            .await
            .map_err(|e| match e {
                Error::NonZeroExit { ref stderr, .. } if stderr.contains("NotFound") => {
                    Error::PodNotFound {
                        namespace: namespace.to_string(),
                        pod: name.to_string(),
                    }
                }
                other => other,
            })?;
        parse_pod(&String::from_utf8_lossy(&output.stdout))
    }

    /// Resolve a pod and container name into a full target.
    pub async fn resolve(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
    ) -> Result<ContainerRef> {
        let info = self.pod(namespace, pod).await?;
        let container = info.resolve_container(container)?;
        Ok(ContainerRef::new(namespace, pod, container))
    }

    /// Open an interactive shell with the terminal attached.
    pub async fn shell(&self, target: &ContainerRef, shell: &str) -> Result<ExitStatus> {
        self.command(exec_args(target, true, &[shell]))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
    }

    /// Print the last `lines` log lines of a container to stdout.
    pub async fn print_logs(&self, target: &ContainerRef, lines: u32, follow: bool) -> Result<()> {
        let status = self
            .command(logs_args(target, lines, follow))
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;
        check_status("kubectl logs", status)
    }

    /// Save the last `lines` log lines of a container to `path`.
    pub async fn save_logs(&self, target: &ContainerRef, lines: u32, path: &Path) -> Result<u64> {
        let output = self
            .command(logs_args(target, lines, false))
            .capture()
            .await?;
        tokio::fs::write(path, &output.stdout)
            .await
            .map_err(|source| Error::CommandFailed {
                cmd: format!("write {}", path.display()),
                source,
            })?;
        Ok(output.stdout.len() as u64)
    }

    pub async fn contexts(&self) -> Result<Vec<String>> {
        let output = self
            .command(["config", "get-contexts", "-o", "name"])
            .capture()
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    pub async fn current_context(&self) -> Result<String> {
        let output = self
            .command(["config", "current-context"])
            .capture()
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Fail unless `context` names a context in the active kubeconfig.
    pub async fn check_context(&self, context: &str) -> Result<()> {
        if self.contexts().await?.iter().any(|c| c == context) {
            Ok(())
        } else {
            Err(Error::UnknownContext(context.to_string()))
        }
    }
}

pub fn pods_args(namespace: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = vec!["get".into(), "pods".into()];
    match namespace {
        Some(ns) => args.extend(["-n".into(), ns.to_string()]),
        None => args.push("-A".into()),
    }
    args.extend(["-o".into(), "json".into()]);
    args
}

/// `exec` arguments running `command` in `target`. Stdin is always attached;
/// `tty` adds a terminal for interactive use.
pub fn exec_args<S: AsRef<str>>(target: &ContainerRef, tty: bool, command: &[S]) -> Vec<String> {
    let mut args = vec!["exec".to_string(), "-i".to_string()];
    if tty {
        args.push("-t".to_string());
    }
    args.extend([
        "-n".to_string(),
        target.namespace.clone(),
        target.pod.clone(),
        "-c".to_string(),
        target.container.clone(),
        "--".to_string(),
    ]);
    args.extend(command.iter().map(|s| s.as_ref().to_string()));
    args
}

pub fn logs_args(target: &ContainerRef, lines: u32, follow: bool) -> Vec<String> {
    let mut args = vec![
        "logs".to_string(),
        "-n".to_string(),
        target.namespace.clone(),
        target.pod.clone(),
        "-c".to_string(),
        target.container.clone(),
        format!("--tail={lines}"),
    ];
    if follow {
        args.push("-f".to_string());
    }
    args
}

fn check_status(cmd: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::NonZeroExit {
            cmd: cmd.to_string(),
            code: status.code().unwrap_or(-1),
            stderr: String::new(),
        })
    }
}
