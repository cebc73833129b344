//! Disk-backed key-value store shared by the catalog and the price cache.

use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;

/// Thin wrapper over a fjall keyspace. Each concern (catalog, prices)
/// lives in its own partition so keys never collide.
pub struct Store {
    keyspace: Keyspace,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Ok(Self { keyspace })
    }

    pub fn partition(&self, name: &str) -> Result<PartitionHandle> {
        self.keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open store partition: {name}"))
    }
}
