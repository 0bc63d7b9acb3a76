//! mgeops-wi (WHOIS Investigation) - operator tooling service
//!
//! Identity resolution, alt-account detection, alt-link curation, and Elo
//! reversion over the per-region duel databases.

use anyhow::Result;
use clap::Parser;
use mgeops_common::config::{resolve_config_path, ServiceConfig};
use mgeops_common::db::init_ops_database;
use mgeops_wi::regions::RegionSet;
use mgeops_wi::repo::sqlite::{SqliteAuditLog, SqliteLinkRepository};
use mgeops_wi::{build_router, AppState};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mgeops-wi", about = "WHOIS investigation service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<String>,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting MGEOps WHOIS Investigation (mgeops-wi) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    info!("Config file: {}", config_path.display());
    let mut config = ServiceConfig::load(&config_path)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    if config.auth_enabled() {
        info!("API authentication enabled");
    } else {
        info!("API authentication disabled (no api_secret configured)");
    }

    let regions = RegionSet::open(&config.regions).await?;
    info!("Opened {} region database(s)", config.regions.len());

    let ops_pool = init_ops_database(&config.ops_db_path).await?;
    let links = SqliteLinkRepository::new(ops_pool.clone());
    let audit = SqliteAuditLog::new(ops_pool);

    let listen = config.listen.clone();
    let state = AppState::new(regions, links, audit, config);
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("mgeops-wi listening on http://{}", listen);
    info!("Health check: http://{}/health", listen);

    axum::serve(listener, app).await?;

    Ok(())
}
