// Runtime Configuration
// Read from the environment (a `.env` file is honoured by the binaries)

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::ledger::{Ledger, MemoryLedger, SqliteLedger};

/// Which backing store the ledger uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// In-process, lost on restart
    Memory,

    /// SQLite file at `Config::db_path`
    Sqlite,
}

impl StoreKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreKind::Memory),
            "sqlite" | "db" => Ok(StoreKind::Sqlite),
            other => bail!("Unknown POS_STORE {other:?} (expected \"memory\" or \"sqlite\")"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub db_path: PathBuf,
    pub bind_addr: String,

    /// Load the Apple/Banana demo catalog into a fresh memory store
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreKind::Memory,
            db_path: PathBuf::from("pos.db"),
            bind_addr: "0.0.0.0:8000".to_string(),
            seed_demo: true,
        }
    }
}

impl Config {
    /// POS_STORE, POS_DB_PATH, POS_BIND_ADDR, POS_SEED_DEMO
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(store) = lookup("POS_STORE") {
            config.store = StoreKind::parse(&store)?;
        }
        if let Some(path) = lookup("POS_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("POS_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(seed) = lookup("POS_SEED_DEMO") {
            config.seed_demo = seed
                .trim()
                .parse()
                .with_context(|| format!("POS_SEED_DEMO must be true or false, got {seed:?}"))?;
        }

        Ok(config)
    }

    /// Construct the configured ledger (creates the SQLite schema if absent)
    pub fn open_ledger(&self) -> Result<Arc<dyn Ledger>> {
        let ledger: Arc<dyn Ledger> = match self.store {
            StoreKind::Memory if self.seed_demo => Arc::new(MemoryLedger::with_defaults()),
            StoreKind::Memory => Arc::new(MemoryLedger::new()),
            StoreKind::Sqlite => Arc::new(
                SqliteLedger::open(&self.db_path)
                    .with_context(|| format!("Failed to open database {}", self.db_path.display()))?,
            ),
        };
        Ok(ledger)
    }
}
