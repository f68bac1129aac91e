//! Courier Detect - carrier detection for e-commerce tracking numbers.
//!
//! This library provides shared modules for the two binaries:
//! - `courierdetect-web`: webhook receiver, classification API and OAuth install flow
//! - `courierdetect-classify`: command-line classifier
//!
//! ## Architecture
//!
//! ```text
//! Platform webhook → signature check → Dispatcher → topic handler
//!                                                      ↓
//!                          tracking number → Classifier → carrier
//! ```

pub mod carrier;
pub mod config;
pub mod error;
pub mod oauth;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use carrier::{Catalog, ClassificationReport, ClassificationResult, Classifier};
pub use config::Config;
pub use error::AppError;
pub use web::{router, AppState};
pub use webhook::{Dispatcher, HandlerResult, Topic, WebhookEnvelope};
