//! Presentation-ready classification output.
//!
//! Shared by the HTTP classification API and the command-line front end.

use serde::Serialize;

use super::classifier::{normalize, ClassificationResult, Classifier};

/// A classification result enriched with catalog display data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingMatch {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub service_name: String,
    pub tracking_url: String,
    /// Grouped form of the number, for display only
    pub display: String,
    pub display_color: String,
}

/// Everything the widget needs to render one lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub input: String,
    pub normalized: String,
    pub matched: bool,
    pub best: Option<TrackingMatch>,
    pub results: Vec<TrackingMatch>,
}

impl Classifier {
    /// Classify `input` and attach service name, URL and display format to
    /// every match.
    pub fn report(&self, input: &str) -> ClassificationReport {
        let catalog = self.catalog();
        let results: Vec<TrackingMatch> = self
            .classify(input)
            .into_iter()
            .map(|result| TrackingMatch {
                service_name: catalog.service_name(&result.carrier).to_string(),
                tracking_url: catalog.tracking_url(&result.carrier, &result.normalized),
                display: catalog.format_for_display(&result.normalized, &result.carrier),
                display_color: catalog.display_color(&result.carrier).to_string(),
                result,
            })
            .collect();

        ClassificationReport {
            input: input.to_string(),
            normalized: normalize(input),
            matched: !results.is_empty(),
            best: results.first().cloned(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::Catalog;

    #[test]
    fn test_report_for_match() {
        let classifier = Classifier::new(Catalog::builtin()).unwrap();
        let report = classifier.report("1z999aa1234567890");

        assert!(report.matched);
        assert_eq!(report.normalized, "1Z999AA1234567890");

        let best = report.best.unwrap();
        assert_eq!(best.result.carrier, "UPS");
        assert_eq!(best.service_name, "UPS Ground");
        assert_eq!(best.display, "1Z 999 AA1 23 4567 890");
        assert_eq!(
            best.tracking_url,
            "https://www.ups.com/track?tracknum=1Z999AA1234567890"
        );
    }

    #[test]
    fn test_report_for_no_match() {
        let classifier = Classifier::new(Catalog::builtin()).unwrap();
        let report = classifier.report("not-a-tracking-number");

        assert!(!report.matched);
        assert!(report.best.is_none());
        assert!(report.results.is_empty());
        assert_eq!(report.normalized, "NOT-A-TRACKING-NUMBER");
    }

    #[test]
    fn test_report_serializes_flat_results() {
        let classifier = Classifier::new(Catalog::builtin()).unwrap();
        let json = serde_json::to_value(classifier.report("123456789012")).unwrap();

        assert_eq!(json["matched"], true);
        assert_eq!(json["results"][0]["carrier"], "FedEx");
        assert_eq!(json["results"][0]["confidence"], 97);
        assert_eq!(json["results"][0]["display"], "1234 5678 9012");
    }
}
