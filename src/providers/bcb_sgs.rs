//! Central Bank SGS time-series client.
//!
//! The only upstream that supports server-side date filtering. Transport
//! errors are retried with a fixed backoff; a well-formed error response
//! (e.g. a retired series) is not retried but may trigger a one-time
//! substitution to the product's alternate series code.

use crate::core::{PriceSource, ProductDescriptor, SourceError, SourceLocator, SourceRow};
use crate::providers::util::{normalize_rows, with_retry};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
const RETRIES: usize = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

pub struct BcbSgsSource {
    base_url: String,
    backoff: Duration,
}

impl BcbSgsSource {
    pub fn new(base_url: &str) -> Self {
        Self::with_backoff(base_url, DEFAULT_BACKOFF)
    }

    pub fn with_backoff(base_url: &str, backoff: Duration) -> Self {
        BcbSgsSource {
            base_url: base_url.to_string(),
            backoff,
        }
    }

    async fn fetch_series(
        &self,
        series: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let url = format!("{}/dados/serie/bcdata.sgs.{}/dados", self.base_url, series);
        debug!("Requesting SGS series from {}", url);

        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let query = [
            ("formato", "json".to_string()),
            ("dataInicial", start.format("%d/%m/%Y").to_string()),
            ("dataFinal", end.format("%d/%m/%Y").to_string()),
        ];
        let response = with_retry(
            || async { client.get(&url).query(&query).send().await },
            RETRIES,
            self.backoff,
        )
        .await?;

        if !response.status().is_success() {
            // Well-formed rejection, e.g. {"erro":"Value(s) not found"}
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("SGS series {} rejected with {}: {}", series, status, body);
            return Err(SourceError::NoDataFound);
        }

        let body = response.text().await?;
        let records: Vec<SgsRecord> = serde_json::from_str(&body)
            .map_err(|e| SourceError::ParseFailure(format!("series {series}: {e}")))?;
        if records.is_empty() {
            return Err(SourceError::EmptyResponse);
        }

        let rows = records
            .into_iter()
            .filter_map(|record| {
                let Some(date) = super::util::parse_br_date(&record.data) else {
                    debug!("Skipping record with unparseable date: {}", record.data);
                    return None;
                };
                let Ok(price) = record.valor.trim().parse::<f64>() else {
                    debug!("Skipping record with unparseable value: {}", record.valor);
                    return None;
                };
                Some(SourceRow {
                    date,
                    price,
                    price_secondary: None,
                })
            })
            .collect();

        Ok(rows)
    }
}

/// Flat record shape: `{"data": "02/01/2024", "valor": "152.34"}`.
#[derive(Debug, Deserialize)]
struct SgsRecord {
    data: String,
    valor: String,
}

#[async_trait]
impl PriceSource for BcbSgsSource {
    async fn fetch(
        &self,
        product: &ProductDescriptor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let SourceLocator::CentralBankSeries { series, alternate } = &product.source else {
            return Err(SourceError::ParseFailure(format!(
                "product {} is not backed by an SGS series",
                product.code
            )));
        };

        let rows = match self.fetch_series(series, start, end).await {
            Ok(rows) => rows,
            Err(SourceError::NoDataFound) => match alternate {
                Some(alt) => {
                    warn!("SGS series {series} rejected upstream, trying alternate {alt}");
                    self.fetch_series(alt, start, end).await?
                }
                None => return Err(SourceError::NoDataFound),
            },
            Err(e) => return Err(e),
        };

        Ok(normalize_rows(rows, start, end))
    }
}
