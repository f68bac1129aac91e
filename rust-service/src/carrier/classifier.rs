//! Tracking-number classification against a carrier catalog.

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::catalog::{CarrierSignature, Catalog, CatalogError};

/// Confidence reported for every match.
///
/// This is a presentation heuristic, not a statistically derived value. It is
/// fixed so that classification stays deterministic; ties are broken by
/// catalog declaration order.
pub const DEFAULT_CONFIDENCE: u8 = 97;

/// One carrier that accepts a given tracking number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub carrier: String,
    /// Index of the first pattern of this carrier that matched
    pub matched_pattern: usize,
    /// Pseudo-confidence in `[0, 100]`, see [`DEFAULT_CONFIDENCE`]
    pub confidence: u8,
    pub region: String,
    /// Uppercased input with all whitespace removed
    pub normalized: String,
}

struct CompiledCarrier {
    name: String,
    region: String,
    patterns: Vec<Regex>,
}

/// Classifies tracking numbers by carrier.
///
/// Built once from a [`Catalog`]; every pattern is compiled up front and the
/// classifier is read-only afterwards, so it can be shared freely between
/// requests.
pub struct Classifier {
    catalog: Catalog,
    compiled: Vec<CompiledCarrier>,
}

impl Classifier {
    /// Validate the catalog and compile its patterns.
    ///
    /// Patterns are matched against the whole normalized number; each one is
    /// wrapped in `^(?:...)$` so catalog authors may omit the anchors.
    pub fn new(catalog: Catalog) -> Result<Self, CatalogError> {
        catalog.validate()?;

        let compiled = catalog
            .carriers
            .iter()
            .map(compile_carrier)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { catalog, compiled })
    }

    /// Return every carrier whose patterns accept `input`, best first.
    ///
    /// Each carrier contributes at most one result, for its first matching
    /// pattern. An input that matches nothing yields an empty vector.
    pub fn classify(&self, input: &str) -> Vec<ClassificationResult> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<ClassificationResult> = self
            .compiled
            .iter()
            .filter_map(|carrier| {
                let index = carrier.patterns.iter().position(|p| p.is_match(&normalized))?;
                Some(ClassificationResult {
                    carrier: carrier.name.clone(),
                    matched_pattern: index,
                    confidence: DEFAULT_CONFIDENCE,
                    region: carrier.region.clone(),
                    normalized: normalized.clone(),
                })
            })
            .collect();

        // Stable: equal confidence keeps declaration order.
        results.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        debug!(
            normalized = %normalized,
            match_count = results.len(),
            top_carrier = results.first().map(|r| r.carrier.as_str()).unwrap_or(""),
            "tracking_number_classified"
        );

        results
    }

    /// The top-ranked match, if any.
    pub fn best_match(&self, input: &str) -> Option<ClassificationResult> {
        self.classify(input).into_iter().next()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

fn compile_carrier(signature: &CarrierSignature) -> Result<CompiledCarrier, CatalogError> {
    let patterns = signature
        .patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| {
            Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
                CatalogError::InvalidPattern {
                    carrier: signature.name.clone(),
                    index,
                    source,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledCarrier {
        name: signature.name.clone(),
        region: signature.region.clone(),
        patterns,
    })
}

/// Uppercase `input` and strip every whitespace character.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}
