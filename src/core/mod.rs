//! Core business logic abstractions

pub mod log;
pub mod price;
pub mod product;
pub mod rate;

// Re-export main types for cleaner imports
pub use price::{PricePoint, PriceSource, SourceError, SourceRow};
pub use product::{Currency, ProductDescriptor, SourceLocator};
pub use rate::{FALLBACK_RATE, RateProvider};
