//! Frozen string vocabularies fitted at training time
//!
//! Categorical columns are encoded through a dictionary built once from the
//! training rows and persisted in the model artifact, so a given browser name
//! maps to the same code at training and at inference time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::telemetry::Telemetry;

/// Sorted, de-duplicated set of category values; a value's code is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryVocabulary {
    values: Vec<String>,
}

impl CategoryVocabulary {
    /// Code assigned to values not seen at training time.
    pub const UNKNOWN_CODE: f64 = -1.0;

    /// Fit a vocabulary over the given values.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            values: distinct.into_iter().collect(),
        }
    }

    /// Code of a value, if it was part of the fitted set.
    pub fn code(&self, value: &str) -> Option<usize> {
        self.values
            .binary_search_by(|probe| probe.as_str().cmp(value))
            .ok()
    }

    /// Numeric encoding of a value; unknown values map to [`Self::UNKNOWN_CODE`].
    pub fn encode(&self, value: &str) -> f64 {
        self.code(value)
            .map(|code| code as f64)
            .unwrap_or(Self::UNKNOWN_CODE)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// True when values are strictly increasing (required for lookups).
    pub fn is_well_formed(&self) -> bool {
        self.values.windows(2).all(|pair| pair[0] < pair[1])
    }
}

/// Vocabularies for every categorical feature column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalVocabularies {
    pub browser_name: CategoryVocabulary,
    pub user_agent: CategoryVocabulary,
    pub referrer: CategoryVocabulary,
}

impl CategoricalVocabularies {
    /// Fit all vocabularies over a batch of training records.
    pub fn fit(records: &[Telemetry]) -> Self {
        Self {
            browser_name: CategoryVocabulary::fit(records.iter().map(|r| &r.browser_name)),
            user_agent: CategoryVocabulary::fit(records.iter().map(|r| &r.user_agent)),
            referrer: CategoryVocabulary::fit(records.iter().map(|r| &r.referrer)),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.browser_name.is_well_formed()
            && self.user_agent.is_well_formed()
            && self.referrer.is_well_formed()
    }
}

/// Names of the two label classes; class code `i` is `classes[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabels {
    classes: Vec<String>,
}

impl ClassLabels {
    /// Collect the distinct labels in sorted order.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let CategoryVocabulary { values } = CategoryVocabulary::fit(labels);
        Self { classes: values }
    }

    /// Class code of a label.
    pub fn code(&self, label: &str) -> Option<u8> {
        self.classes
            .binary_search_by(|probe| probe.as_str().cmp(label))
            .ok()
            .and_then(|idx| u8::try_from(idx).ok())
    }

    /// Label of a class code.
    pub fn name(&self, code: u8) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.classes
    }
}
