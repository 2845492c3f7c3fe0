//! Lightfield installation host.
//!
//! Watches the drawing directory, keeps an in-memory table of decoded
//! drawings, spawns them into the scene and reacts to commands pushed from
//! the tablets through the server. Everything runs on one thread: the frame
//! loop, the command poller and the index sync are cooperative tasks on a
//! current-thread runtime sharing one `World`.

mod config;
mod dispatch;
mod effects;
mod index_sync;
mod manifest;
mod materials;
mod objects;
mod poller;
mod record;
mod selection;
mod source;
mod spawner;
mod store;
mod transport;
mod world;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lf_core::time::SystemClock;
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::{load_config_from_path, ClientConfig};
use dispatch::SceneApplier;
use index_sync::IndexSync;
use poller::CommandPoller;
use source::DiskSource;
use transport::HttpTransport;
use world::World;

/// Frames between periodic status lines.
const STATUS_EVERY_FRAMES: u64 = 600;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lightfield installation host")]
struct Args {
    /// JSON config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the drawing directory
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Override the server base URL
    #[arg(long)]
    server_url: Option<String>,

    /// Mirror approved drawings from the server
    #[arg(long)]
    sync: bool,
}

fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(dir) = &args.image_dir {
        config.image_dir = dir.clone();
    }
    if let Some(url) = &args.server_url {
        config.server_url = url.clone();
    }
    if args.sync {
        config.sync_enabled = true;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config: {e}"))?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = resolve_config(&args)?;

    log::info!("Lightfield host starting...");
    log::info!(
        "Watching '{}', server {}",
        config.manifest_path().display(),
        config.server_url
    );

    let world = Rc::new(RefCell::new(World::new(
        &config,
        Box::new(DiskSource),
        StdRng::from_entropy(),
    )));
    let transport = HttpTransport::new(&config.server_url).context("building HTTP client")?;

    let poller = CommandPoller::new(
        transport.clone(),
        SceneApplier::new(world.clone()),
        Duration::from_secs_f64(config.poll_interval_secs),
    );
    let sync = config.sync_enabled.then(|| {
        IndexSync::new(
            transport.clone(),
            config.image_dir.clone(),
            &config.manifest_name,
            Duration::from_secs_f64(config.sync_interval_secs),
        )
    });
    if sync.is_some() {
        log::info!("Index sync enabled every {}s", config.sync_interval_secs);
    }

    let sync_task = async move {
        match sync {
            Some(sync) => sync.run().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = frame_loop(world.clone(), config.frame_rate) => {}
        _ = poller.run() => {}
        _ = sync_task => {}
        result = tokio::signal::ctrl_c() => {
            result.context("listening for shutdown signal")?;
            log::info!("Shutdown requested");
        }
    }

    let world = world.borrow();
    log::info!(
        "Lightfield host stopped after {} frames ({} records, {} objects)",
        world.frames().frame_count,
        world.store.len(),
        world.scene.len()
    );
    Ok(())
}

async fn frame_loop(world: Rc<RefCell<World>>, frame_rate: u32) {
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / frame_rate as f64));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let clock = SystemClock;
    loop {
        ticker.tick().await;
        let mut world = world.borrow_mut();
        let summary = world.frame(&clock);
        if summary.added + summary.updated + summary.removed > 0 {
            log::debug!(
                "Records: {} added, {} updated, {} removed",
                summary.added,
                summary.updated,
                summary.removed
            );
        }
        if summary.spawned || summary.expired > 0 {
            log::trace!("Spawned: {}, effects expired: {}", summary.spawned, summary.expired);
        }

        let frames = world.frames();
        if frames.frame_count % STATUS_EVERY_FRAMES == 0 {
            log::info!(
                "Frame {}: {:.2}ms avg, {} records, {} objects, {} scan cycles",
                frames.frame_count,
                frames.smoothed_frame_time_ms,
                world.store.len(),
                world.scene.len(),
                world.store.cycles()
            );
        }
    }
}
