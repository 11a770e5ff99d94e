use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::engine::Engine;
use crate::notify::NotifyHub;
use crate::observability;
use crate::reaper;
use crate::venue::{InMemoryVenueDirectory, VenueDirectory};

/// A running booking engine with its sweeper and compactor.
pub struct BookingService {
    engine: Arc<Engine>,
    tasks: Vec<JoinHandle<()>>,
}

impl BookingService {
    /// Open (or create) the WAL under `config.data_dir`, replay it, and spawn
    /// the background tasks.
    pub fn start(config: &Config, directory: Arc<dyn VenueDirectory>) -> io::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let notify = Arc::new(NotifyHub::new());
        let engine = Arc::new(Engine::new(config.wal_path(), directory, notify)?);

        let reaper_engine = engine.clone();
        let every = config.sweep_interval;
        let reaper = tokio::spawn(async move {
            reaper::run_reaper(reaper_engine, every).await;
        });
        let compactor_engine = engine.clone();
        let threshold = config.compact_threshold;
        let compactor = tokio::spawn(async move {
            reaper::run_compactor(compactor_engine, threshold).await;
        });

        info!("booking service started");
        info!("  wal: {}", config.wal_path().display());
        info!("  sweep interval: {:?}", config.sweep_interval);
        info!("  compact threshold: {}", config.compact_threshold);

        Ok(Self {
            engine,
            tasks: vec![reaper, compactor],
        })
    }

    /// Install the metrics exporter if `config.metrics_port` is set, then
    /// start with the in-memory directory described by `config`.
    pub fn start_from_config(config: &Config) -> io::Result<Self> {
        observability::init(config.metrics_port).map_err(io::Error::other)?;
        let directory = Arc::new(load_directory(config)?);
        Self::start(config, directory)
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Stop the background tasks. Every acknowledged mutation is already
    /// fsynced, so nothing is flushed here.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
        info!("booking service stopped");
    }
}

/// Seed venues from `config.venues_file`, or start empty.
pub fn load_directory(config: &Config) -> io::Result<InMemoryVenueDirectory> {
    let Some(path) = &config.venues_file else {
        return Ok(InMemoryVenueDirectory::new());
    };
    let directory = InMemoryVenueDirectory::load_file(path)?;
    info!("loaded {} venues from {}", directory.len(), path.display());
    Ok(directory)
}
