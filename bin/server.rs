// Bull Registry - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use std::net::SocketAddr;
use std::path::PathBuf;

use bull_registry::server::{router, AppState};
use bull_registry::{Config, SqliteBullStore};

#[derive(Parser, Debug)]
#[command(name = "bull-server", version, about = "Serve the bull registry over HTTP")]
struct Args {
    /// SQLite database file (defaults to $BULLS_DATABASE_PATH or bulls.db).
    #[arg(long)]
    database: Option<PathBuf>,

    /// Address to listen on (defaults to $BULLS_BIND_ADDR or 127.0.0.1:3000).
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::from_env()
        .with_database_path(args.database)
        .with_bind_addr(args.bind);
    let bind_addr = config.bind_addr()?;

    let store = SqliteBullStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    log::info!("Database opened: {}", config.database_path.display());

    let app = router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    log::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
