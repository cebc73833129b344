//! BCB Olinda PTAX historical dollar quotes.
//!
//! Rate lookups are a silent degrade: a failed or empty lookup resolves
//! to [`FALLBACK_RATE`] so currency reconciliation never aborts a price
//! fetch. Future dates have no historical quote and short-circuit to the
//! fallback without touching the network.

use crate::core::{FALLBACK_RATE, RateProvider};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PtaxRateProvider {
    base_url: String,
    /// Per-date memo: a series fetch looks the same date up once per row
    /// otherwise.
    memo: Mutex<HashMap<NaiveDate, f64>>,
}

#[derive(Debug, Deserialize)]
struct PtaxEnvelope {
    value: Vec<PtaxQuote>,
}

#[derive(Debug, Deserialize)]
struct PtaxQuote {
    #[serde(rename = "cotacaoCompra")]
    buy: f64,
}

impl PtaxRateProvider {
    pub fn new(base_url: &str) -> Self {
        PtaxRateProvider {
            base_url: base_url.to_string(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    async fn try_fetch(&self, date: NaiveDate) -> anyhow::Result<f64> {
        let url = format!(
            "{}/olinda/servico/PTAX/versao/v1/odata/CotacaoDolarDia(dataCotacao=@dataCotacao)",
            self.base_url
        );
        debug!("Requesting PTAX quote from {}", url);

        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let response = client
            .get(&url)
            .query(&[
                ("@dataCotacao", format!("'{}'", date.format("%m-%d-%Y"))),
                ("$format", "json".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let envelope = response.json::<PtaxEnvelope>().await?;
        let quote = envelope
            .value
            .first()
            .ok_or_else(|| anyhow::anyhow!("no quote published for {date}"))?;
        Ok(quote.buy)
    }
}

#[async_trait]
impl RateProvider for PtaxRateProvider {
    async fn rate(&self, date: NaiveDate) -> f64 {
        if date > Utc::now().date_naive() {
            return FALLBACK_RATE;
        }
        if let Some(rate) = self.memo.lock().await.get(&date) {
            return *rate;
        }
        match self.try_fetch(date).await {
            Ok(rate) => {
                self.memo.lock().await.insert(date, rate);
                rate
            }
            Err(e) => {
                debug!("PTAX lookup failed for {date}: {e}. Using fallback rate");
                FALLBACK_RATE
            }
        }
    }
}
