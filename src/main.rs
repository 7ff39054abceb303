use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use git_gateway::config::GatewayConfig;
use git_gateway::http::{create_router, AppState};
use git_gateway::session::RepositorySession;
use git_gateway::{shutdown, telemetry};

#[derive(Parser, Debug)]
#[command(name = "git-gateway")]
#[command(about = "HTTP gateway exposing a single Git repository")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to git-gateway.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path of the repository to serve
    #[arg(long)]
    repo_path: Option<String>,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(path) = &self.repo_path {
            config.repository.path = path.clone();
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_file = GatewayConfig::load_env_file()?;
    let mut config =
        GatewayConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    telemetry::init_telemetry(&config.observability)?;
    if let Some(path) = env_file {
        tracing::info!(path = %path.display(), "Loaded environment variables from .env file");
    }

    let session = Arc::new(RepositorySession::from_config(&config.repository));
    tracing::info!(
        path = %session.path().display(),
        bound = session.is_bound(),
        "Repository session ready"
    );

    let result = run_http_server(&config, Arc::clone(&session)).await;
    shutdown::finish(&session);
    result
}

async fn run_http_server(config: &GatewayConfig, session: Arc<RepositorySession>) -> Result<()> {
    let state = AppState::new(session, config.server.service_name.as_str());
    let app = create_router(state);

    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind HTTP listener on {host}:{port}"))?;

    let listen_addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}
