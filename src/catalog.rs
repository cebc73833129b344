//! Product catalog: compiled-in descriptor table persisted to the store.

use crate::core::{Currency, ProductDescriptor, SourceLocator};
use crate::store::Store;
use anyhow::Result;
use fjall::PartitionHandle;
use tracing::{debug, warn};

const DESCRIPTORS_KEY: &str = "descriptors";

/// Maps stable product codes to per-source identifiers. The descriptor
/// list is built once from the compiled-in table and persisted with no
/// TTL; the persisted copy is read on subsequent calls and rewritten if
/// it turns out corrupt.
pub struct ProductCatalog {
    partition: PartitionHandle,
}

/// Compiled-in product table. CEPEA indicators quote in BRL and publish a
/// USD column on the same page; the SGS soybean series carries an
/// alternate code because the primary has been retired upstream before.
fn builtin_descriptors() -> Vec<ProductDescriptor> {
    let scraped = |code: &str, name: &str, unit: &str, slug: &str| ProductDescriptor {
        code: code.to_string(),
        display_name: name.to_string(),
        unit: unit.to_string(),
        currency: Currency::Brl,
        source: SourceLocator::IndicatorPage {
            slug: slug.to_string(),
        },
    };

    vec![
        scraped("BGI", "Boi Gordo (CEPEA/B3)", "15 kg/@", "boi-gordo"),
        scraped("MIL", "Milho (CEPEA/B3)", "60kg sack", "milho"),
        scraped("CAF", "Café Arábica (CEPEA)", "60kg sack", "cafe"),
        scraped("ACU", "Açúcar Cristal (CEPEA)", "50kg sack", "acucar"),
        ProductDescriptor {
            code: "SOJ".to_string(),
            display_name: "Soja Paranaguá (BCB/SGS)".to_string(),
            unit: "60kg sack".to_string(),
            currency: Currency::Brl,
            source: SourceLocator::CentralBankSeries {
                series: "7461".to_string(),
                alternate: Some("7811".to_string()),
            },
        },
        ProductDescriptor {
            code: "ALG".to_string(),
            display_name: "Algodão em Pluma (IpeaData)".to_string(),
            unit: "15 kg/@".to_string(),
            currency: Currency::Brl,
            source: SourceLocator::StatisticalSeries {
                series: "PRECOS12_ALGODAO12".to_string(),
            },
        },
        ProductDescriptor {
            code: "SOJ-CBOT".to_string(),
            display_name: "Soybeans (CBOT, via IpeaData)".to_string(),
            unit: "bu".to_string(),
            currency: Currency::Usd,
            source: SourceLocator::StatisticalSeries {
                series: "GM366_SOJA366".to_string(),
            },
        },
    ]
}

impl ProductCatalog {
    pub fn new(store: &Store) -> Result<Self> {
        Ok(Self {
            partition: store.partition("catalog")?,
        })
    }

    /// Returns all known products, building and persisting the descriptor
    /// list on first use.
    pub fn list(&self) -> Vec<ProductDescriptor> {
        match self.partition.get(DESCRIPTORS_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<ProductDescriptor>>(&bytes) {
                Ok(descriptors) if !descriptors.is_empty() => {
                    debug!("Loaded {} descriptors from store", descriptors.len());
                    return descriptors;
                }
                Ok(_) => warn!("Persisted catalog is empty, rebuilding from builtin table"),
                Err(e) => warn!("Persisted catalog is corrupt ({e}), rebuilding"),
            },
            Ok(None) => debug!("No persisted catalog, building from builtin table"),
            Err(e) => warn!("Catalog store read failed ({e}), using builtin table"),
        }

        let descriptors = builtin_descriptors();
        self.persist(&descriptors);
        descriptors
    }

    pub fn resolve(&self, code: &str) -> Option<ProductDescriptor> {
        self.list().into_iter().find(|d| d.code == code)
    }

    fn persist(&self, descriptors: &[ProductDescriptor]) {
        let res = serde_json::to_vec(descriptors)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| {
                self.partition
                    .insert(DESCRIPTORS_KEY, bytes)
                    .map_err(anyhow::Error::from)
            });
        if let Err(e) = res {
            // Best effort: the builtin table remains available in-process
            warn!("Failed to persist catalog: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_builds_and_persists() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let catalog = ProductCatalog::new(&store).unwrap();

        let products = catalog.list();
        assert!(!products.is_empty());
        assert!(products.iter().any(|p| p.code == "BGI"));

        // A second read comes from the persisted copy
        let persisted = catalog.partition.get(DESCRIPTORS_KEY).unwrap();
        assert!(persisted.is_some());
        assert_eq!(catalog.list(), products);
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let catalog = ProductCatalog::new(&store).unwrap();

        let bgi = catalog.resolve("BGI").unwrap();
        assert_eq!(bgi.display_name, "Boi Gordo (CEPEA/B3)");
        assert_eq!(bgi.currency, Currency::Brl);
        assert!(matches!(
            bgi.source,
            SourceLocator::IndicatorPage { ref slug } if slug == "boi-gordo"
        ));

        assert!(catalog.resolve("UNKNOWN_CODE").is_none());
    }

    #[test]
    fn test_corrupt_persisted_catalog_falls_back_to_builtin() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let catalog = ProductCatalog::new(&store).unwrap();

        catalog
            .partition
            .insert(DESCRIPTORS_KEY, b"not json at all")
            .unwrap();

        let products = catalog.list();
        assert!(products.iter().any(|p| p.code == "SOJ"));

        // The corrupt copy was rewritten
        let bytes = catalog.partition.get(DESCRIPTORS_KEY).unwrap().unwrap();
        let restored: Vec<ProductDescriptor> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored, products);
    }

    #[test]
    fn test_soj_carries_alternate_series() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let catalog = ProductCatalog::new(&store).unwrap();

        let soj = catalog.resolve("SOJ").unwrap();
        match soj.source {
            SourceLocator::CentralBankSeries { series, alternate } => {
                assert_eq!(series, "7461");
                assert_eq!(alternate.as_deref(), Some("7811"));
            }
            other => panic!("Expected a central bank series, got {other:?}"),
        }
    }
}
