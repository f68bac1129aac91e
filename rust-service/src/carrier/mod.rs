//! Carrier detection from tracking numbers.
//!
//! ```text
//! input → normalize → catalog patterns (declaration order) → ranked results
//! ```
//!
//! Classification is a pure function of the catalog and the input: no
//! network calls, no randomness.

pub mod catalog;
pub mod classifier;
pub mod display;
pub mod report;

pub use catalog::{CarrierSignature, Catalog, CatalogError, FALLBACK_REGION, FALLBACK_SERVICE_NAME};
pub use classifier::{normalize, ClassificationResult, Classifier, DEFAULT_CONFIDENCE};
pub use report::{ClassificationReport, TrackingMatch};
