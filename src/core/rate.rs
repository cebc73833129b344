//! Exchange-rate abstractions

use async_trait::async_trait;
use chrono::NaiveDate;

/// Rate used when the historical quote is unavailable or the date is in
/// the future. Approximate by design: currency reconciliation must never
/// abort a price fetch.
pub const FALLBACK_RATE: f64 = 5.0;

/// Resolves a BRL-per-USD rate for a calendar date. Infallible by
/// contract: implementations degrade to [`FALLBACK_RATE`] on any failure.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn rate(&self, date: NaiveDate) -> f64;
}
