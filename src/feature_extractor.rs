//! Feature extraction shared by training and inference.
//!
//! Turns a canonical [`Telemetry`] record into the 11-element vector the
//! logistic model was fitted on. The trainer and the prediction service both
//! go through [`FeatureExtractor::extract`], with the thresholds and
//! vocabularies stored in the model artifact, so the two sides cannot drift.

use serde::{Deserialize, Serialize};

use crate::models::vocabulary::CategoricalVocabularies;
use crate::types::telemetry::Telemetry;

/// Number of features in the model's input vector.
pub const FEATURE_COUNT: usize = 11;

/// Feature names, in the positional order of the model coefficients.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mouseMovements_above_threshold",
    "screenWidth_above_threshold",
    "screenHeight_above_threshold",
    "browserName",
    "userAgent",
    "language_is_en_gb",
    "timeOnPage_above_threshold",
    "timeOnPage",
    "clicks_within_range",
    "keyPresses",
    "referrer",
];

/// Language tag that sets `language_is_en_gb`.
pub const EN_GB: &str = "en-GB";

/// Binarization thresholds.
///
/// Loaded from the trainer configuration and persisted in the artifact;
/// inference always uses the copy stored with the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Mouse movement must be strictly above this value
    pub mouse_movement: f64,
    /// Minimum screen width (inclusive)
    pub screen_width: f64,
    /// Minimum screen height (inclusive)
    pub screen_height: f64,
    /// Minimum time on page in seconds (inclusive)
    pub time_on_page: f64,
    /// Lower bound of the click range (inclusive)
    pub click_min: f64,
    /// Upper bound of the click range (inclusive)
    pub click_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            mouse_movement: 150.0,
            screen_width: 1536.0,
            screen_height: 864.0,
            time_on_page: 12.0,
            click_min: 6.0,
            click_max: 10.0,
        }
    }
}

impl Thresholds {
    /// Check the thresholds are finite and the click range is ordered.
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.mouse_movement,
            self.screen_width,
            self.screen_height,
            self.time_on_page,
            self.click_min,
            self.click_max,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err("thresholds must be finite numbers".to_string());
        }
        if self.click_min > self.click_max {
            return Err(format!(
                "click range is empty: min {} > max {}",
                self.click_min, self.click_max
            ));
        }
        Ok(())
    }

    pub fn mouse_movement_above(&self, value: f64) -> bool {
        value > self.mouse_movement
    }

    pub fn screen_width_above(&self, value: f64) -> bool {
        value >= self.screen_width
    }

    pub fn screen_height_above(&self, value: f64) -> bool {
        value >= self.screen_height
    }

    pub fn time_on_page_above(&self, value: f64) -> bool {
        value >= self.time_on_page
    }

    pub fn clicks_within_range(&self, value: f64) -> bool {
        (self.click_min..=self.click_max).contains(&value)
    }
}

/// Encoded feature vector, in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Look up a feature by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.values[idx])
    }
}

/// Feature extractor that transforms telemetry into model input features.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    thresholds: Thresholds,
    vocabulary: CategoricalVocabularies,
}

impl FeatureExtractor {
    /// Create an extractor from already-fitted parts.
    pub fn new(thresholds: Thresholds, vocabulary: CategoricalVocabularies) -> Self {
        Self {
            thresholds,
            vocabulary,
        }
    }

    /// Fit the categorical vocabularies over a training batch.
    pub fn fit(thresholds: Thresholds, records: &[Telemetry]) -> Self {
        Self::new(thresholds, CategoricalVocabularies::fit(records))
    }

    /// Extract the feature vector of one record.
    pub fn extract(&self, telemetry: &Telemetry) -> FeatureVector {
        let t = &self.thresholds;
        let vocab = &self.vocabulary;

        FeatureVector {
            values: [
                flag(t.mouse_movement_above(telemetry.mouse_movement)),
                flag(t.screen_width_above(telemetry.screen_width)),
                flag(t.screen_height_above(telemetry.screen_height)),
                vocab.browser_name.encode(&telemetry.browser_name),
                vocab.user_agent.encode(&telemetry.user_agent),
                flag(telemetry.language == EN_GB),
                flag(t.time_on_page_above(telemetry.time_on_page)),
                telemetry.time_on_page,
                flag(t.clicks_within_range(telemetry.clicks)),
                telemetry.key_presses,
                vocab.referrer.encode(&telemetry.referrer),
            ],
        }
    }

    /// Extract features for a whole batch.
    pub fn extract_batch(&self, records: &[Telemetry]) -> Vec<FeatureVector> {
        records.iter().map(|r| self.extract(r)).collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (model coefficient order).
    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURE_NAMES.to_vec()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn vocabulary(&self) -> &CategoricalVocabularies {
        &self.vocabulary
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Telemetry {
        Telemetry {
            mouse_movement: 155.0,
            screen_width: 1536.0,
            screen_height: 864.0,
            clicks: 8.0,
            time_on_page: 15.0,
            key_presses: 20.0,
            language: "en-GB".to_string(),
            browser_name: "Chrome".to_string(),
            user_agent: "UA1".to_string(),
            referrer: "direct".to_string(),
        }
    }

    fn extractor() -> FeatureExtractor {
        let mut other = record();
        other.browser_name = "Firefox".to_string();
        other.user_agent = "UA0".to_string();
        other.referrer = "search".to_string();
        FeatureExtractor::fit(Thresholds::default(), &[record(), other])
    }

    #[test]
    fn test_feature_extraction() {
        let features = extractor().extract(&record());

        assert_eq!(features.values.len(), FEATURE_COUNT);
        assert_eq!(
            features.values,
            [1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 15.0, 1.0, 20.0, 0.0]
        );
        assert_eq!(features.get("keyPresses"), Some(20.0));
        assert_eq!(features.get("unknown"), None);
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.feature_count(), 11);
        assert_eq!(extractor.feature_names().len(), 11);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = extractor();
        assert_eq!(extractor.extract(&record()), extractor.extract(&record()));
    }

    #[test]
    fn test_screen_width_boundary() {
        let extractor = extractor();
        let mut r = record();

        r.screen_width = 1536.0;
        assert_eq!(extractor.extract(&r).get("screenWidth_above_threshold"), Some(1.0));

        r.screen_width = 1535.0;
        assert_eq!(extractor.extract(&r).get("screenWidth_above_threshold"), Some(0.0));
    }

    #[test]
    fn test_click_range_boundaries() {
        let extractor = extractor();
        let mut r = record();

        for (clicks, expected) in [(5.0, 0.0), (6.0, 1.0), (10.0, 1.0), (11.0, 0.0)] {
            r.clicks = clicks;
            assert_eq!(
                extractor.extract(&r).get("clicks_within_range"),
                Some(expected),
                "clicks = {clicks}"
            );
        }
    }

    #[test]
    fn test_threshold_operators() {
        let extractor = extractor();
        let mut r = record();

        r.mouse_movement = 150.0;
        r.time_on_page = 12.0;
        let features = extractor.extract(&r);
        assert_eq!(features.get("mouseMovements_above_threshold"), Some(0.0));
        assert_eq!(features.get("timeOnPage_above_threshold"), Some(1.0));

        r.screen_height = 863.0;
        r.language = "en-US".to_string();
        let features = extractor.extract(&r);
        assert_eq!(features.get("screenHeight_above_threshold"), Some(0.0));
        assert_eq!(features.get("language_is_en_gb"), Some(0.0));
    }

    #[test]
    fn test_unknown_category_encodes_negative() {
        let mut r = record();
        r.browser_name = "Lynx".to_string();

        let features = extractor().extract(&r);
        assert_eq!(features.get("browserName"), Some(-1.0));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Thresholds::default().validate().is_ok());

        let inverted = Thresholds {
            click_min: 11.0,
            ..Thresholds::default()
        };
        assert!(inverted.validate().is_err());
    }
}
