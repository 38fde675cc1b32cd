//! MariaDB Operator - grants and metrics exporters for MariaDB on Kubernetes

use clap::{Parser, Subcommand};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mariadb_index::KubeWatchRegistrar;
use mariadb_operator::config::OperatorConfig;
use mariadb_operator::controller_runner::{
    build_grant_controller, build_mariadb_controller, build_maxscale_controller,
};
use mariadb_operator::startup::{build_indexes, crd_manifests, ensure_crds_installed};

/// MariaDB operator - reconciles Grants and metrics exporters
#[derive(Parser, Debug)]
#[command(name = "mariadb-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    Controller(ControllerArgs),
}

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "mariadb-operator")]
struct ControllerArgs {
    /// Restrict controllers and watches to a single namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Interval between User existence checks during Grant finalization
    #[arg(long, env = "USER_POLL_INTERVAL_MS", default_value_t = 1000)]
    user_poll_interval_ms: u64,

    /// Window in which a deleted User is waited for before revoking
    #[arg(long, env = "USER_POLL_TIMEOUT_MS", default_value_t = 5000)]
    user_poll_timeout_ms: u64,

    /// Do not apply CRDs on startup
    #[arg(long)]
    skip_crd_install: bool,
}

impl Cli {
    /// Controller arguments for the selected mode. Without a subcommand the
    /// controller runs with flag defaults and environment fallbacks.
    fn controller_args(self) -> Result<ControllerArgs, clap::Error> {
        match self.command {
            Some(Commands::Controller(args)) => Ok(args),
            None => ControllerArgs::try_parse_from(["mariadb-operator"]),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        print!("{}", crd_manifests()?);
        return Ok(());
    }

    let args = cli.controller_args()?;
    let config = OperatorConfig::new(
        args.namespace,
        args.user_poll_interval_ms,
        args.user_poll_timeout_ms,
        !args.skip_crd_install,
    )?;
    run_controller(config).await
}

async fn run_controller(config: OperatorConfig) -> anyhow::Result<()> {
    tracing::info!(namespace = ?config.namespace, "MariaDB operator starting...");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if config.install_crds {
        ensure_crds_installed(&client).await?;
    }

    // Index setup failures abort startup
    let registrar = KubeWatchRegistrar::new(client.clone(), config.namespace.clone());
    let indexes = build_indexes(&registrar).await.map_err(|e| {
        tracing::error!(error = %e, "Dependency index setup failed");
        anyhow::anyhow!("dependency index setup failed: {}", e)
    })?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!("Starting MariaDB operator controllers...");
    let controllers = vec![
        build_mariadb_controller(client.clone(), &config, indexes.mariadb),
        build_maxscale_controller(client.clone(), &config, indexes.maxscale),
        build_grant_controller(client, &config, shutdown.clone()),
    ];
    futures::future::join_all(controllers).await;

    shutdown.cancel();
    tracing::info!("MariaDB operator shutting down");
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Shutdown signal received, cancelling in-flight work");
    token.cancel();
}
