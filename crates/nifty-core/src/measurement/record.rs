use super::width::FeatureMeasurement;
use crate::domain::{EngineError, EngineResult, canonicalize_key, feature_key};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Every measurement taken on one feature, plus the user's annotations.
///
/// The four lists are parallel: each measurement pushes one entry to each and
/// undo pops one from each.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementRecord {
    #[serde(default, alias = "results")]
    ew: Vec<f64>,
    #[serde(default)]
    range: Vec<[f64; 2]>,
    #[serde(default)]
    mode: Vec<f64>,
    #[serde(default)]
    fwhm: Vec<Option<f64>>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    marked: bool,
}

impl MeasurementRecord {
    pub fn ew(&self) -> &[f64] {
        &self.ew
    }

    pub fn ranges(&self) -> &[[f64; 2]] {
        &self.range
    }

    pub fn modes(&self) -> &[f64] {
        &self.mode
    }

    pub fn fwhm(&self) -> &[Option<f64>] {
        &self.fwhm
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn len(&self) -> usize {
        self.ew.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ew.is_empty()
    }

    pub fn is_consistent(&self) -> bool {
        let count = self.ew.len();
        self.range.len() == count && self.mode.len() == count && self.fwhm.len() == count
    }

    pub fn last(&self) -> Option<FeatureMeasurement> {
        Some(FeatureMeasurement {
            equivalent_width: *self.ew.last()?,
            window: *self.range.last()?,
            mode: *self.mode.last()?,
            fwhm: *self.fwhm.last()?,
        })
    }

    pub(crate) fn push(&mut self, measurement: FeatureMeasurement) {
        self.ew.push(measurement.equivalent_width);
        self.range.push(measurement.window);
        self.mode.push(measurement.mode);
        self.fwhm.push(measurement.fwhm);
    }

    pub(crate) fn pop(&mut self) -> Option<FeatureMeasurement> {
        let measurement = self.last()?;
        self.ew.pop();
        self.range.pop();
        self.mode.pop();
        self.fwhm.pop();
        Some(measurement)
    }

    pub(crate) fn toggle_mark(&mut self) -> bool {
        self.marked = !self.marked;
        self.marked
    }

    pub(crate) fn set_note(&mut self, text: impl Into<String>) {
        self.notes = text.into();
    }

    pub(crate) fn append_note(&mut self, text: &str) {
        self.notes.push_str(text);
        self.notes.push('\n');
    }
}

/// A record together with the feature it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub wavelength: f64,
    pub key: String,
    pub record: MeasurementRecord,
}

/// Records of every feature, in feature-list order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordBook {
    entries: Vec<FeatureRecord>,
}

impl RecordBook {
    pub fn empty_for(features: &[f64], decimals: usize) -> Self {
        Self {
            entries: features
                .iter()
                .map(|wavelength| FeatureRecord {
                    wavelength: *wavelength,
                    key: feature_key(*wavelength, decimals),
                    record: MeasurementRecord::default(),
                })
                .collect(),
        }
    }

    /// Rebuilds a book from persisted records.
    ///
    /// Loaded keys are re-canonicalised first; the resulting key set must
    /// equal the feature key set exactly.
    pub fn restore(
        features: &[f64],
        decimals: usize,
        loaded: BTreeMap<String, MeasurementRecord>,
    ) -> EngineResult<Self> {
        let loaded_count = loaded.len();
        let mismatch = || EngineError::RecordMismatch {
            expected: features.len(),
            loaded: loaded_count,
        };

        let mut by_key = BTreeMap::new();
        for (key, record) in loaded {
            let canonical = canonicalize_key(&key, decimals).ok_or_else(mismatch)?;
            if !record.is_consistent() {
                return Err(EngineError::invalid_input(format!(
                    "record '{key}' has lists of unequal length"
                )));
            }
            if by_key.insert(canonical, record).is_some() {
                return Err(mismatch());
            }
        }

        let mut book = Self::empty_for(features, decimals);
        let expected: BTreeSet<&str> = book.entries.iter().map(|entry| entry.key.as_str()).collect();
        let found: BTreeSet<&str> = by_key.keys().map(String::as_str).collect();
        if expected != found {
            return Err(mismatch());
        }

        for entry in &mut book.entries {
            if let Some(record) = by_key.remove(&entry.key) {
                entry.record = record;
            }
        }
        Ok(book)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FeatureRecord> {
        self.entries.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut FeatureRecord> {
        self.entries.get_mut(index)
    }

    pub fn by_key(&self, key: &str) -> Option<&MeasurementRecord> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.record)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.entries.iter()
    }

    /// Number of features with at least one measurement.
    pub fn measured_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.record.is_empty())
            .count()
    }

    pub fn marked_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.record.is_marked())
            .count()
    }

    pub fn to_map(&self) -> BTreeMap<String, MeasurementRecord> {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.record.clone()))
            .collect()
    }
}
