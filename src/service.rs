//! Historical price orchestration: catalog resolution, cache lookup,
//! source dispatch, currency reconciliation and write-back.

use crate::cache::PriceCache;
use crate::catalog::ProductCatalog;
use crate::core::{
    Currency, PricePoint, PriceSource, ProductDescriptor, RateProvider, SourceLocator, SourceRow,
};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// The only errors surfaced to callers. Every upstream failure degrades
/// to an empty series so the consumer can render "no data" instead of
/// crashing.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("unknown product code: {0}")]
    UnknownProduct(String),
}

/// One source per upstream family; the catalog descriptor decides which
/// one a product dispatches to.
pub struct SourceSet {
    pub scraped: Arc<dyn PriceSource>,
    pub statistical: Arc<dyn PriceSource>,
    pub central_bank: Arc<dyn PriceSource>,
}

pub struct PriceService {
    catalog: Arc<ProductCatalog>,
    cache: Arc<PriceCache>,
    rates: Arc<dyn RateProvider>,
    sources: SourceSet,
}

impl PriceService {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        cache: Arc<PriceCache>,
        rates: Arc<dyn RateProvider>,
        sources: SourceSet,
    ) -> Self {
        PriceService {
            catalog,
            cache,
            rates,
            sources,
        }
    }

    pub fn list_products(&self) -> Vec<ProductDescriptor> {
        self.catalog.list()
    }

    /// Returns the normalized series for `code` over [start, end], sorted
    /// strictly ascending by date with no duplicates.
    pub async fn historical_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, ServiceError> {
        if end < start {
            return Err(ServiceError::InvalidRange { start, end });
        }
        let product = self
            .catalog
            .resolve(code)
            .ok_or_else(|| ServiceError::UnknownProduct(code.to_string()))?;

        if let Some(points) = self.cache.get(code, start, end) {
            debug!("Returning cached series for {code}");
            return Ok(self.repair_usd_legs(&product, points).await);
        }

        let source = match &product.source {
            SourceLocator::IndicatorPage { .. } => &self.sources.scraped,
            SourceLocator::StatisticalSeries { .. } => &self.sources.statistical,
            SourceLocator::CentralBankSeries { .. } => &self.sources.central_bank,
        };
        let rows = match source.fetch(&product, start, end).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Source fetch failed for {code}: {e}. Returning empty series");
                return Ok(Vec::new());
            }
        };

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            match self.reconcile(&product, row).await {
                Some(point) => points.push(point),
                None => debug!("Dropping non-numeric price row for {code}"),
            }
        }

        self.cache.put(code, start, end, &points);
        Ok(points)
    }

    /// Computes the missing currency leg for one raw row. Returns `None`
    /// when the resulting BRL price would not be a number.
    async fn reconcile(&self, product: &ProductDescriptor, row: SourceRow) -> Option<PricePoint> {
        if !row.price.is_finite() {
            return None;
        }
        let point = match product.currency {
            Currency::Brl => {
                let (price_usd, exchange_rate) = match row.price_secondary {
                    Some(usd) => (Some(usd), None),
                    None => {
                        let rate = self.rates.rate(row.date).await;
                        (Some(row.price / rate), Some(rate))
                    }
                };
                PricePoint {
                    date: row.date,
                    price_brl: row.price,
                    price_usd,
                    exchange_rate,
                }
            }
            Currency::Usd => match row.price_secondary {
                Some(brl) => PricePoint {
                    date: row.date,
                    price_brl: brl,
                    price_usd: Some(row.price),
                    exchange_rate: None,
                },
                None => {
                    let rate = self.rates.rate(row.date).await;
                    PricePoint {
                        date: row.date,
                        price_brl: row.price * rate,
                        price_usd: Some(row.price),
                        exchange_rate: Some(rate),
                    }
                }
            },
        };
        point.price_brl.is_finite().then_some(point)
    }

    /// Defensive repair of stale or partial cache entries: a USD-native
    /// product must always expose its USD leg.
    async fn repair_usd_legs(
        &self,
        product: &ProductDescriptor,
        mut points: Vec<PricePoint>,
    ) -> Vec<PricePoint> {
        if product.currency != Currency::Usd {
            return points;
        }
        for point in &mut points {
            if point.price_usd.is_none() {
                let rate = self.rates.rate(point.date).await;
                point.price_usd = Some(point.price_brl / rate);
                point.exchange_rate = Some(rate);
            }
        }
        points
    }
}
