use anyhow::Result;
use clap::Args;
use kconsole_kube::KubectlExec;
use kconsole_transfer::{
    ContainerRef, Direction, ExistingPolicy, StdinMode, Transfer, TransferOptions,
    TransferReport, TransferSpec, UnpackOptions,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Session;
use super::target::TargetArgs;

#[derive(Args, Clone, Debug)]
pub struct UploadArg {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Local file, directory or glob; must start with '/', './' or '../'
    pub local: String,

    /// Absolute destination path in the container; a trailing '/' copies into it
    pub remote: String,
}

#[derive(Args, Clone, Debug)]
pub struct DownloadArg {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Absolute path in the container
    pub remote: String,

    /// Local directory; must start with '/', './' or '../'
    pub local: String,

    #[arg(long, help = "Replace existing symlinks and links at the destination")]
    pub replace: bool,

    #[arg(long, help = "Relay local stdin to the remote tar")]
    pub stdin: bool,
}

pub async fn upload(arg: UploadArg, session: &Session) -> Result<()> {
    let spec = TransferSpec::upload(arg.local, arg.remote);
    run(&arg.target, &spec, TransferOptions::default(), session).await
}

pub async fn download(arg: DownloadArg, session: &Session) -> Result<()> {
    let unpack = UnpackOptions::default().existing(if arg.replace {
        ExistingPolicy::Replace
    } else {
        ExistingPolicy::Reject
    });
    let options = TransferOptions::default()
        .unpack(unpack)
        .stdin(if arg.stdin {
            StdinMode::Inherit
        } else {
            StdinMode::Closed
        });

    let spec = TransferSpec::download(arg.remote, arg.local);
    run(&arg.target, &spec, options, session).await
}

async fn run(
    target: &TargetArgs,
    spec: &TransferSpec,
    options: TransferOptions,
    session: &Session,
) -> Result<()> {
    kconsole_transfer::validate_local_path(&spec.local_path)?;
    kconsole_transfer::validate_remote_path(&spec.remote_path)?;

    let kubectl = session.kubectl()?;
    let target = target.resolve(&kubectl).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling transfer");
            on_interrupt.cancel();
        }
    });

    let transfer = Transfer::new(KubectlExec::new(kubectl), target)
        .with_options(options.pipe_capacity(session.config.pipe_capacity))
        .with_cancellation(cancel);
    let result = transfer.run(spec).await;
    watcher.abort();

    print_report(&result?, transfer.target());
    Ok(())
}

fn print_report(report: &TransferReport, target: &ContainerRef) {
    let stats = &report.stats;
    let summary = format!(
        "{} files, {} dirs, {} links, {} bytes",
        stats.files,
        stats.directories,
        stats.symlinks + stats.hard_links,
        stats.bytes
    );
    let local = report.local_path.display();
    match report.direction {
        Direction::Upload => {
            println!("uploaded {local} to {target}:{} ({summary})", report.remote_path)
        }
        Direction::Download => {
            println!("downloaded {target}:{} to {local} ({summary})", report.remote_path)
        }
    }
}
