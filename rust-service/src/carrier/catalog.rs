//! Carrier signature catalog.
//!
//! The catalog is plain configuration: an ordered list of carriers, each with
//! an ordered list of tracking-number patterns. Declaration order matters, it
//! decides ranking between carriers whose patterns overlap.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service name used when a carrier does not declare one.
pub const FALLBACK_SERVICE_NAME: &str = "Standard";

/// Region used when a carrier does not declare one.
pub const FALLBACK_REGION: &str = "International";

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("carrier at position {0} has an empty name")]
    EmptyName(usize),

    #[error("duplicate carrier name: {0}")]
    DuplicateCarrier(String),

    #[error("carrier {0} declares no patterns")]
    NoPatterns(String),

    #[error("carrier {0} declares a display group of size 0")]
    ZeroDisplayGroup(String),

    #[error("carrier {carrier} pattern #{index} is invalid: {source}")]
    InvalidPattern {
        carrier: String,
        index: usize,
        #[source]
        source: regex::Error,
    },
}

/// A single carrier and the tracking-number formats it issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierSignature {
    /// Unique carrier name, e.g. "UPS"
    pub name: String,

    /// Regular expressions tried in order against the normalized number
    pub patterns: Vec<String>,

    /// Opaque display attribute for the presentation layer
    #[serde(default)]
    pub display_color: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Tracking page URL with a `{number}` placeholder
    #[serde(default)]
    pub tracking_url_template: Option<String>,

    /// Chunk sizes used when formatting a number for display
    #[serde(default)]
    pub display_groups: Vec<usize>,
}

fn default_service_name() -> String {
    FALLBACK_SERVICE_NAME.to_string()
}

fn default_region() -> String {
    FALLBACK_REGION.to_string()
}

/// Ordered, immutable set of carrier signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub carriers: Vec<CarrierSignature>,
}

impl Catalog {
    /// Create a catalog from an explicit list of signatures.
    pub fn new(carriers: Vec<CarrierSignature>) -> Self {
        Self { carriers }
    }

    /// Parse a catalog from its JSON form: `{"carriers": [...]}`.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read a JSON catalog from disk.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load the catalog at `path`, or the built-in one when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::builtin()),
        }
    }

    /// Check the structural rules that do not need compiled patterns.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for (position, carrier) in self.carriers.iter().enumerate() {
            if carrier.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(position));
            }
            if !seen.insert(carrier.name.as_str()) {
                return Err(CatalogError::DuplicateCarrier(carrier.name.clone()));
            }
            if carrier.patterns.is_empty() {
                return Err(CatalogError::NoPatterns(carrier.name.clone()));
            }
            if carrier.display_groups.contains(&0) {
                return Err(CatalogError::ZeroDisplayGroup(carrier.name.clone()));
            }
        }
        Ok(())
    }

    /// Look up a carrier by exact name.
    pub fn get(&self, name: &str) -> Option<&CarrierSignature> {
        self.carriers.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.carriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    /// The catalog shipped with the service.
    ///
    /// USPS precedes FedEx: its 20 and 22 digit formats carry a `91`-`95`
    /// prefix and are more specific than FedEx's bare digit runs.
    pub fn builtin() -> Self {
        Self::new(vec![
            signature(
                "UPS",
                &[r"1Z[0-9A-Z]{14,16}", r"T\d{10}", r"K\d{10}"],
                "#351C15",
                "UPS Ground",
                "United States",
                Some("https://www.ups.com/track?tracknum={number}"),
                &[2, 3, 3, 2, 4, 4],
            ),
            signature(
                "USPS",
                &[r"9[1-5]\d{20}", r"9[1-5]\d{18}", r"[A-Z]{2}\d{9}US"],
                "#333366",
                "Priority Mail",
                "United States",
                Some("https://tools.usps.com/go/TrackConfirmAction?tLabels={number}"),
                &[4, 4, 4, 4, 4],
            ),
            signature(
                "FedEx",
                &[r"\d{12}", r"\d{15}", r"\d{20}", r"\d{22}"],
                "#4D148C",
                "FedEx Ground",
                "United States",
                Some("https://www.fedex.com/fedextrack/?trknbr={number}"),
                &[4, 4, 4],
            ),
            signature(
                "DHL Express",
                &[r"\d{10}", r"JJD\d{18}", r"JVGL\d{16}", r"GM\d{16,18}"],
                "#FFCC00",
                "DHL Express Worldwide",
                "International",
                Some("https://www.dhl.com/en/express/tracking.html?AWB={number}"),
                &[2, 4, 4],
            ),
            signature(
                "Amazon Logistics",
                &[r"TBA\d{12}"],
                "#FF9900",
                "Amazon Shipping",
                "United States",
                Some("https://track.amazon.com/tracking/{number}"),
                &[3, 4, 4, 4],
            ),
            signature(
                "OnTrac",
                &[r"[CD]\d{14}"],
                "#0055A5",
                "OnTrac Ground",
                "United States",
                Some("https://www.ontrac.com/tracking/?number={number}"),
                &[1, 4, 4, 4, 2],
            ),
            signature(
                "Royal Mail",
                &[r"[A-Z]{2}\d{9}GB"],
                "#E60000",
                "Royal Mail Tracked 48",
                "United Kingdom",
                Some("https://www.royalmail.com/track-your-item#/tracking-results/{number}"),
                &[2, 3, 3, 3, 2],
            ),
            signature(
                "Canada Post",
                &[r"\d{16}", r"[A-Z]{2}\d{9}CA"],
                "#D52B1E",
                "Expedited Parcel",
                "Canada",
                Some("https://www.canadapost-postescanada.ca/track-reperage/en#/search?searchFor={number}"),
                &[4, 4, 4, 4],
            ),
            signature(
                "Australia Post",
                &[r"[A-Z]{2}\d{9}AU"],
                "#DC1928",
                "Parcel Post",
                "Australia",
                Some("https://auspost.com.au/mypost/track/#/details/{number}"),
                &[2, 3, 3, 3, 2],
            ),
            signature(
                "China Post",
                &[r"[A-Z]{2}\d{9}CN"],
                "#006B3F",
                "ePacket",
                "China",
                None,
                &[2, 3, 3, 3, 2],
            ),
            signature(
                "India Post",
                &[r"[A-Z]{2}\d{9}IN"],
                "#C8102E",
                "Speed Post",
                "India",
                None,
                &[2, 3, 3, 3, 2],
            ),
            signature(
                "DPD",
                &[r"\d{14}", r"\d{14}[A-Z]"],
                "#DC0032",
                "DPD Classic",
                "Europe",
                Some("https://tracking.dpd.de/status/en_US/parcel/{number}"),
                &[4, 4, 4, 2],
            ),
            signature(
                "TNT",
                &[r"\d{9}", r"GE\d{9}WW"],
                "#FF6600",
                "TNT Express",
                "Europe",
                Some("https://www.tnt.com/express/en_us/site/tracking.html?searchType=con&cons={number}"),
                &[3, 3, 3],
            ),
        ])
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn signature(
    name: &str,
    patterns: &[&str],
    display_color: &str,
    service_name: &str,
    region: &str,
    tracking_url_template: Option<&str>,
    display_groups: &[usize],
) -> CarrierSignature {
    CarrierSignature {
        name: name.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        display_color: display_color.to_string(),
        service_name: service_name.to_string(),
        region: region.to_string(),
        tracking_url_template: tracking_url_template.map(str::to_string),
        display_groups: display_groups.to_vec(),
    }
}
