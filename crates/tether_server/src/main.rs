use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether_core::sink::memory::MemorySink;
use tether_core::transport::memory::MemoryTransport;
use tether_core::{CredentialSink, OrchestratorConfig, PairingOrchestrator, PairingTransport};
use tether_server::{router, AppState};
use tether_store::{GithubStore, StoreConfig};

#[derive(Parser)]
#[command(name = "tether-server")]
#[command(about = "Pairing server linking messaging accounts to the bot runtime")]
#[command(version)]
struct Cli {
    /// Address to bind the HTTP listener on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Directory holding per-account credential staging
    #[arg(long, default_value = "./sessions")]
    staging_dir: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Store configuration is captured here but validated at first upload,
    // so a bad token or repo shows up in the logs rather than preventing
    // startup.
    let store_config = StoreConfig::from_env();
    let sink: Arc<dyn CredentialSink> = if store_config.is_present() {
        info!("credential store: GitHub contents API");
        Arc::new(GithubStore::new(store_config))
    } else {
        info!("credential store: none configured, uploads stay in process memory");
        Arc::new(MemorySink::new())
    };

    // The real protocol transport is an integration point; the loopback
    // transport keeps the HTTP surface exercisable without one.
    let transport: Arc<dyn PairingTransport> = Arc::new(MemoryTransport::new());

    let orchestrator = Arc::new(PairingOrchestrator::new(
        transport,
        sink,
        cli.staging_dir,
        OrchestratorConfig::default(),
    ));

    let app = router(AppState::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .into_diagnostic()?;
    info!(bind = %cli.bind, "tether server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
