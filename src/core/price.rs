//! Pricing abstractions and core types

use crate::core::product::ProductDescriptor;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw observation as returned by an upstream source, before currency
/// reconciliation. `price` is quoted in the product's native currency;
/// `price_secondary` carries the other currency leg when the source
/// publishes one directly.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub date: NaiveDate,
    pub price: f64,
    pub price_secondary: Option<f64>,
}

/// One normalized price observation.
///
/// `price_brl` is always present and finite. `price_usd` is present when
/// the source published a USD leg or a conversion was possible;
/// `exchange_rate` (BRL per USD) is recorded only when a conversion was
/// actually performed, for traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price_brl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<f64>,
}

/// Failure modes shared by all upstream sources. These never propagate
/// past the price service, which degrades them to an empty series.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no recognizable data table in response")]
    NoDataFound,
    #[error("empty response from source")]
    EmptyResponse,
    #[error("network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),
    #[error("failed to parse source payload: {0}")]
    ParseFailure(String),
}

/// Contract implemented by every upstream source. Implementations filter
/// rows to [start, end], sort ascending by date and resolve duplicate
/// dates by keeping the last-seen row.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(
        &self,
        product: &ProductDescriptor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SourceRow>, SourceError>;
}
