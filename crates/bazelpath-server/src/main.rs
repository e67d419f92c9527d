//! bazelpath binary
//!
//! Mounts a virtual GOPATH over a Bazel workspace.
//!
//! ## Usage
//!
//! ```bash
//! # From the workspace root; the first run writes .bazelpath.toml
//! bazelpath
//!
//! # Build every first-party package once mounted
//! bazelpath --build
//!
//! # Verbose logging
//! bazelpath --debug
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bazelpath_server::bootstrap;
use bazelpath_server::constants::{BOOTSTRAP_DELAY, CONFIG_FILE_NAME, WORKSPACE_MARKERS};
use bazelpath_server::{BazelExecutor, MountedOverlay, Settings};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Virtual GOPATH for Bazel workspaces.
#[derive(Parser, Debug)]
#[command(name = "bazelpath", version)]
#[command(about = "Mount a virtual GOPATH over a Bazel workspace")]
struct Args {
    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Build and install all packages after mounting
    #[arg(long)]
    build: bool,

    /// Settings file (default: <workspace>/.bazelpath.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bazel workspace root (default: current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let workspace = match args.workspace {
        Some(dir) => dir,
        None => env::current_dir().context("failed to read the current directory")?,
    };
    let workspace = dunce::canonicalize(&workspace)
        .with_context(|| format!("workspace {} is not accessible", workspace.display()))?;
    if !is_bazel_workspace(&workspace) {
        bail!(
            "{} is not a Bazel workspace (none of {} found)",
            workspace.display(),
            WORKSPACE_MARKERS.join(", ")
        );
    }

    let config_path = args
        .config
        .unwrap_or_else(|| workspace.join(CONFIG_FILE_NAME));
    if Settings::write_default(&config_path)? {
        info!(path = %config_path.display(), "wrote default settings, customize them and run again");
        return Ok(());
    }

    let settings = Settings::load(&config_path)?;
    let go_path = settings.go_path(&workspace)?;
    let config = Arc::new(settings.namespace_config(&workspace)?);

    for dir in ["bin", "pkg", "src"] {
        let dir = go_path.join(dir);
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let mountpoint = go_path.join("src");

    let executor = Arc::new(BazelExecutor::new(&go_path, &workspace));
    let mounted = MountedOverlay::mount(config, &mountpoint, executor.clone())?;
    info!(go_path = %go_path.display(), "GOPATH ready, Ctrl+C to unmount");

    let after_mount = tokio::spawn(after_mount(settings, workspace, executor, args.build));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("interrupted, unmounting");

    after_mount.abort();
    mounted.unmount().await;
    Ok(())
}

fn is_bazel_workspace(dir: &Path) -> bool {
    WORKSPACE_MARKERS
        .iter()
        .any(|marker| dir.join(marker).is_file())
}

/// Give the kernel a moment to settle the mount before the toolchain
/// starts walking it.
async fn after_mount(settings: Settings, workspace: PathBuf, executor: Arc<BazelExecutor>, build: bool) {
    tokio::time::sleep(BOOTSTRAP_DELAY).await;
    if build {
        bootstrap::build_all(&settings, &workspace, executor.as_ref()).await;
    }
    bootstrap::launch_ide(&settings, executor.as_ref()).await;
}
