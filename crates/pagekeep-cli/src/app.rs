//! Opening the store, config, and fixture source for a command.

use anyhow::{Context, Result, bail};
use clap::Args;
use pagekeep_core::config::load_config;
use pagekeep_core::descriptor::OrderListDescriptor;
use pagekeep_core::{EngineConfig, ListItemDataSource, ListStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::fixture::{FixtureSource, Order};

const DB_FILE: &str = "lists.sqlite3";
const CACHE_FILE: &str = "items.json";

/// Which order list a command operates on.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Site owning the orders.
    #[arg(long, default_value_t = 1)]
    pub site: i64,

    /// Only orders with this status (case-insensitive).
    #[arg(short, long)]
    pub status: Option<String>,

    /// Remote ids requested per page.
    #[arg(long, default_value_t = pagekeep_core::descriptor::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl ListArgs {
    pub fn descriptor(&self) -> OrderListDescriptor {
        let descriptor = OrderListDescriptor::new(self.site).with_page_size(self.page_size);
        match &self.status {
            Some(status) => descriptor.with_status(status.clone()),
            None => descriptor,
        }
    }
}

/// Paths and flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Locations {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub fixture: Option<PathBuf>,
}

pub struct App {
    pub store: Arc<ListStore>,
    pub source: Arc<FixtureSource>,
    pub config: EngineConfig,
    pub db_path: PathBuf,
}

impl App {
    /// Resolve locations, load config, open the store, and load the
    /// fixture source.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined or any file
    /// fails to load.
    pub fn open(locations: &Locations) -> Result<Self> {
        let config_path = match &locations.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let config = load_config(&config_path)?;
        let db_path = resolve_db_path(locations.db.as_deref(), &config)?;
        debug!(db = %db_path.display(), config = %config_path.display(), "opening list store");

        let store = ListStore::open(&db_path, config.clone())
            .with_context(|| format!("Failed to open list store at {}", db_path.display()))?;
        let cache_path = db_path
            .parent()
            .map_or_else(|| PathBuf::from(CACHE_FILE), |dir| dir.join(CACHE_FILE));
        let source = Arc::new(FixtureSource::load(locations.fixture.as_deref(), cache_path)?);

        let expired = store.remove_expired(config.max_list_age())?;
        if expired > 0 {
            info!(count = expired, "pruned expired lists on open");
        }

        Ok(Self {
            store,
            source,
            config,
            db_path,
        })
    }

    /// The fixture source behind the engine's data-source trait object.
    pub fn data_source(&self) -> Arc<dyn ListItemDataSource<OrderListDescriptor, Order>> {
        Arc::clone(&self.source) as Arc<dyn ListItemDataSource<OrderListDescriptor, Order>>
    }
}

fn default_config_path() -> Result<PathBuf> {
    let Some(dir) = dirs::config_dir() else {
        bail!("Could not determine a config directory; pass --config");
    };
    Ok(dir.join("pagekeep").join("config.toml"))
}

/// `--db` wins over `db_path` in config, which wins over the data dir.
fn resolve_db_path(flag: Option<&Path>, config: &EngineConfig) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }
    let Some(dir) = dirs::data_dir() else {
        bail!("Could not determine a data directory; pass --db");
    };
    Ok(dir.join("pagekeep").join(DB_FILE))
}
