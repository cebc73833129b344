//! On-disk memoization of fetch results keyed by (product, date range).

use crate::core::PricePoint;
use crate::store::Store;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fjall::PartitionHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Stored value. Entries are immutable once written and never expire:
/// freshness is range-based, so a new date range is always a fresh fetch.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    created_at: DateTime<Utc>,
    points: Vec<PricePoint>,
}

/// Exact-range lookup only: a request for a sub-range of a cached
/// superset misses and refetches.
pub struct PriceCache {
    partition: PartitionHandle,
}

impl PriceCache {
    pub fn new(store: &Store) -> Result<Self> {
        Ok(Self {
            partition: store.partition("prices")?,
        })
    }

    fn key(code: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{code}:{}:{}",
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }

    pub fn get(&self, code: &str, start: NaiveDate, end: NaiveDate) -> Option<Vec<PricePoint>> {
        let key = Self::key(code, start, end);
        match self.partition.get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => {
                    debug!("Cache HIT for key: {key}");
                    Some(entry.points)
                }
                Err(e) => {
                    warn!("Discarding unreadable cache entry {key}: {e}");
                    None
                }
            },
            Ok(None) => {
                debug!("Cache MISS for key: {key}");
                None
            }
            Err(e) => {
                warn!("Cache read failed for {key}: {e}");
                None
            }
        }
    }

    /// Best-effort write: failures are logged and the fetch result is
    /// still returned to the caller.
    pub fn put(&self, code: &str, start: NaiveDate, end: NaiveDate, points: &[PricePoint]) {
        let key = Self::key(code, start, end);
        let entry = CacheEntry {
            created_at: Utc::now(),
            points: points.to_vec(),
        };
        let res = serde_json::to_vec(&entry)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| {
                self.partition
                    .insert(&key, bytes)
                    .map_err(anyhow::Error::from)
            });
        match res {
            Ok(()) => debug!("Cache PUT for key: {key}"),
            Err(e) => warn!("Cache write failed for {key}: {e}"),
        }
    }
}
