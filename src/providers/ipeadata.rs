//! IpeaData OData time-series client.

use crate::core::{PriceSource, ProductDescriptor, SourceError, SourceLocator, SourceRow};
use crate::providers::util::normalize_rows;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

pub struct IpeadataSource {
    base_url: String,
}

impl IpeadataSource {
    pub fn new(base_url: &str) -> Self {
        IpeadataSource {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OdataEnvelope {
    value: Option<Vec<OdataRecord>>,
}

/// Value dates arrive as ISO timestamps with an offset suffix
/// (`2024-01-02T00:00:00-03:00`); values may be null for holidays.
#[derive(Debug, Deserialize)]
struct OdataRecord {
    #[serde(rename = "VALDATA")]
    date: Option<String>,
    #[serde(rename = "VALVALOR")]
    value: Option<f64>,
}

fn parse_odata_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

#[async_trait]
impl PriceSource for IpeadataSource {
    async fn fetch(
        &self,
        product: &ProductDescriptor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let SourceLocator::StatisticalSeries { series } = &product.source else {
            return Err(SourceError::ParseFailure(format!(
                "product {} is not backed by a statistical series",
                product.code
            )));
        };

        let url = format!(
            "{}/api/odata4/ValoresSerie(SERCODIGO='{}')",
            self.base_url, series
        );
        debug!("Requesting statistical series from {}", url);

        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let response = client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(SourceError::EmptyResponse);
        }

        let envelope: OdataEnvelope = serde_json::from_str(&body)
            .map_err(|e| SourceError::ParseFailure(format!("series {series}: {e}")))?;
        let records = match envelope.value {
            Some(records) if !records.is_empty() => records,
            _ => return Err(SourceError::EmptyResponse),
        };

        let rows: Vec<SourceRow> = records
            .into_iter()
            .filter_map(|record| {
                let raw_date = record.date?;
                let Some(date) = parse_odata_date(&raw_date) else {
                    debug!("Skipping record with unparseable date: {raw_date}");
                    return None;
                };
                let price = record.value?;
                Some(SourceRow {
                    date,
                    price,
                    price_secondary: None,
                })
            })
            .collect();

        Ok(normalize_rows(rows, start, end))
    }
}
