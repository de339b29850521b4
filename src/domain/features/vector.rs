use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Indicator values computed for one bar.
///
/// Values are keyed by indicator name in a BTreeMap so iteration order, and
/// therefore serialization, is stable. The date is the bar the vector was
/// computed at; the prediction it feeds refers to the next session, so only
/// bars up to and including `date` may contribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    date: NaiveDate,
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn name_set(&self) -> BTreeSet<&str> {
        self.values.keys().map(|k| k.as_str()).collect()
    }

    /// Narrows the vector to the named features, silently skipping names the
    /// vector does not carry. Strict set-exact checking happens at predict
    /// time; this is only the per-model projection step.
    pub fn project(&self, names: &[String]) -> FeatureVector {
        let mut out = FeatureVector::new(self.date);
        for name in names {
            if let Some(v) = self.values.get(name) {
                out.insert(name.clone(), *v);
            }
        }
        out
    }
}
