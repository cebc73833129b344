//! Product catalog types

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Currency a product is quoted in at its primary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Brl,
    Usd,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Brl => write!(f, "BRL"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// Source-specific identifier used to request a product's series upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocator {
    /// Slug of a CEPEA indicator page, e.g. `boi-gordo`.
    IndicatorPage { slug: String },
    /// IpeaData OData series code.
    StatisticalSeries { series: String },
    /// BCB SGS series code. `alternate` is tried once when the primary
    /// series is rejected upstream.
    CentralBankSeries {
        series: String,
        alternate: Option<String>,
    },
}

impl SourceLocator {
    /// Short label for display purposes.
    pub fn label(&self) -> &'static str {
        match self {
            SourceLocator::IndicatorPage { .. } => "CEPEA",
            SourceLocator::StatisticalSeries { .. } => "IpeaData",
            SourceLocator::CentralBankSeries { .. } => "BCB/SGS",
        }
    }
}

/// Immutable description of a tracked commodity. Built once at
/// catalog-build time and persisted to the descriptor store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    /// Stable product code, e.g. `BGI`.
    pub code: String,
    pub display_name: String,
    /// Unit label, e.g. `60kg sack`.
    pub unit: String,
    /// Currency the primary source quotes in.
    pub currency: Currency,
    pub source: SourceLocator,
}
