//! Carrier lookups used when presenting a classification.
//!
//! All of these are pure functions of the carrier name and fall back to
//! generic values for carriers the catalog does not know.

use url::form_urlencoded;

use super::catalog::{Catalog, FALLBACK_REGION, FALLBACK_SERVICE_NAME};
use super::classifier::normalize;

const NUMBER_PLACEHOLDER: &str = "{number}";

/// Search page used when a carrier has no tracking URL template.
const FALLBACK_SEARCH_URL: &str = "https://www.google.com/search?q=";

impl Catalog {
    pub fn service_name(&self, carrier: &str) -> &str {
        self.get(carrier)
            .map(|c| c.service_name.as_str())
            .unwrap_or(FALLBACK_SERVICE_NAME)
    }

    pub fn region(&self, carrier: &str) -> &str {
        self.get(carrier)
            .map(|c| c.region.as_str())
            .unwrap_or(FALLBACK_REGION)
    }

    pub fn display_color(&self, carrier: &str) -> &str {
        self.get(carrier)
            .map(|c| c.display_color.as_str())
            .unwrap_or("")
    }

    /// Tracking page for `number` at `carrier`.
    ///
    /// The number is normalized and URL-encoded before substitution. Unknown
    /// carriers, and carriers without a template, get a web search URL.
    pub fn tracking_url(&self, carrier: &str, number: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(normalize(number).as_bytes()).collect();

        match self
            .get(carrier)
            .and_then(|c| c.tracking_url_template.as_deref())
        {
            Some(template) => template.replace(NUMBER_PLACEHOLDER, &encoded),
            None => {
                let query: String =
                    form_urlencoded::byte_serialize(format!("{} tracking", carrier).as_bytes())
                        .collect();
                format!("{}{}+{}", FALLBACK_SEARCH_URL, encoded, query)
            }
        }
    }

    /// Split a number into the carrier's customary groups, e.g.
    /// `1Z 999 AA1 01 2345 6784`.
    ///
    /// Purely cosmetic: the result is never used for matching or URLs.
    /// Characters left over after the last declared group form one final
    /// group. Carriers without groups get the normalized number unchanged.
    pub fn format_for_display(&self, number: &str, carrier: &str) -> String {
        let normalized = normalize(number);
        let groups = match self.get(carrier) {
            Some(c) if !c.display_groups.is_empty() => &c.display_groups,
            _ => return normalized,
        };

        let chars: Vec<char> = normalized.chars().collect();
        let mut parts: Vec<String> = Vec::new();
        let mut offset = 0;

        for &size in groups {
            if offset >= chars.len() {
                break;
            }
            let end = (offset + size).min(chars.len());
            parts.push(chars[offset..end].iter().collect());
            offset = end;
        }
        if offset < chars.len() {
            parts.push(chars[offset..].iter().collect());
        }

        parts.join(" ")
    }
}
