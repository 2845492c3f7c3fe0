//! Lightfield server -- command queue and drawing store for the installation.
//!
//! Tablets create drawings, save their canvas and push commands (wiggle,
//! glimmer, spawn) at the creature they drew. The installation host polls the
//! command routes and the drawing index feed. All state sits in one JSON file
//! guarded by a single async mutex; every mutation is written through.

mod commands;
mod db;
mod drawings;
mod error;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use db::Database;
use routes::{router, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lightfield drawing and command server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// JSON database file
    #[arg(long, default_value = "db/db.json")]
    db: PathBuf,

    /// Directory holding approved drawing PNGs
    #[arg(long, default_value = "img/drawings/approved")]
    image_dir: PathBuf,

    /// Approve drawings as soon as they are completed
    #[arg(long)]
    auto_approve: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("Lightfield server starting...");
    let db = Database::open(&args.db)
        .with_context(|| format!("opening database '{}'", args.db.display()))?;
    if args.auto_approve {
        log::info!("Auto-approve enabled: completed drawings go live immediately");
    }

    let app = router(AppState::new(db, args.image_dir.clone(), args.auto_approve));
    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    log::info!(
        "Listening on {} (images from '{}')",
        listener.local_addr()?,
        args.image_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("Lightfield server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
