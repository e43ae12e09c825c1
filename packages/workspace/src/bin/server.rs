use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tandem_workspace::{router, ChangeKind, FileWatcher, Workspace, WorkspaceConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem-server")]
#[command(about = "Serve the diagram editor RPC surface over HTTP", long_about = None)]
struct Args {
    /// Root directory of the workspace
    #[arg(default_value = ".")]
    root_dir: PathBuf,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (default: tandem.config.json in the root directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not reload open documents when their files change
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => WorkspaceConfig::load(path)?,
        None => WorkspaceConfig::discover(&args.root_dir)?,
    };
    let port = args.port.unwrap_or(config.port);

    let workspace = Arc::new(Workspace::from_config(&config)?);

    if !args.no_watch {
        let root_dir = args
            .root_dir
            .canonicalize()
            .with_context(|| format!("Root directory {} not found", args.root_dir.display()))?;
        spawn_watcher(root_dir, workspace.clone())?;
    }

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(root = %args.root_dir.display(), "listening on http://{}", addr);

    let app = router(workspace.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(workspace))
        .await?;
    Ok(())
}

fn spawn_watcher(root_dir: PathBuf, workspace: Arc<Workspace>) -> anyhow::Result<()> {
    let mut watcher = FileWatcher::new(&root_dir)?;
    tokio::spawn(async move {
        while let Some(changes) = watcher.next_changes().await {
            for change in changes {
                if change.kind == ChangeKind::Removed {
                    continue;
                }
                if let Err(e) = workspace.reload_from_disk(&change.path).await {
                    tracing::warn!(path = %change.path.display(), error = %e, "reload failed");
                }
            }
        }
    });
    Ok(())
}

async fn shutdown_signal(workspace: Arc<Workspace>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("shutting down");
    workspace.shutdown();
}
