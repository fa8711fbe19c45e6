//! Single-owner facade over one spectral model and its measurement session.
//!
//! The workbench keeps the two in step: moving the selection drops the
//! continuum fit, shifting the test spectrum refits the picked points, and
//! restoring a measurement file re-applies its velocity shifts.

use crate::common::EngineConfig;
use crate::domain::{EngineResult, ShiftTarget};
use crate::io::MeasurementFile;
use crate::measurement::{FeatureMeasurement, MeasurementRecord, MeasurementSession, RestoreOutcome};
use crate::numerics::LinearFit;
use crate::selection::MaskSet;
use crate::spectrum::{ModelInputs, RangeDirection, ShiftOutcome, SpectrumModel};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreReport {
    pub records: RestoreOutcome,
    pub applied_shifts: Vec<ShiftOutcome>,
    /// Shift keys that named no known target; when non-empty no shift was applied.
    pub ignored_shift_keys: Vec<String>,
}

/// Flat view of the active feature, used by front ends for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchStatus {
    pub selection: usize,
    pub feature_count: usize,
    pub feature: f64,
    pub key: String,
    pub range_factor: f64,
    pub range_shift: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub samples_in_range: usize,
    pub velocity_shifts: BTreeMap<String, f64>,
    pub fit_points: usize,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub ew: Vec<f64>,
    pub mode: Vec<f64>,
    pub fwhm: Vec<Option<f64>>,
    pub marked: bool,
    pub notes: String,
    pub measured_features: usize,
    pub marked_features: usize,
}

#[derive(Debug, Clone)]
pub struct Workbench {
    model: SpectrumModel,
    session: MeasurementSession,
}

impl Workbench {
    pub fn new(config: EngineConfig, inputs: ModelInputs) -> EngineResult<Self> {
        let model = SpectrumModel::initialize(config, inputs)?;
        let session = MeasurementSession::new(&model);
        Ok(Self { model, session })
    }

    pub fn model(&self) -> &SpectrumModel {
        &self.model
    }

    pub fn session(&self) -> &MeasurementSession {
        &self.session
    }

    pub fn active_record(&self) -> Option<&MeasurementRecord> {
        self.session.active_record(&self.model)
    }

    pub fn select_next(&mut self, step: usize) {
        self.model.select_next(step);
        self.session.reset_fit();
    }

    pub fn select_previous(&mut self, step: usize) {
        self.model.select_previous(step);
        self.session.reset_fit();
    }

    pub fn select_index(&mut self, index: usize) {
        self.model.select_index(index);
        self.session.reset_fit();
    }

    pub fn grow_range(&mut self, factor: f64) {
        self.model.grow_range(factor);
    }

    pub fn shrink_range(&mut self, factor: f64) {
        self.model.shrink_range(factor);
    }

    pub fn zoom_in(&mut self) {
        self.model.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.model.zoom_out();
    }

    pub fn shift_range_window(&mut self, direction: RangeDirection, factor: f64) {
        self.model.shift_range_window(direction, factor);
    }

    pub fn pan_up(&mut self) {
        self.model.pan_up();
    }

    pub fn pan_down(&mut self) {
        self.model.pan_down();
    }

    pub fn reset_range_shift(&mut self) {
        self.model.reset_range_shift();
    }

    pub fn apply_velocity_shift(&mut self, target: ShiftTarget, delta_kms: f64) -> ShiftOutcome {
        let outcome = self.model.apply_velocity_shift(target, delta_kms);
        self.after_shift(outcome);
        outcome
    }

    pub fn shift_up(&mut self, target: ShiftTarget) -> ShiftOutcome {
        let outcome = self.model.shift_up(target);
        self.after_shift(outcome);
        outcome
    }

    pub fn shift_down(&mut self, target: ShiftTarget) -> ShiftOutcome {
        let outcome = self.model.shift_down(target);
        self.after_shift(outcome);
        outcome
    }

    fn after_shift(&mut self, outcome: ShiftOutcome) {
        if !matches!(
            outcome,
            ShiftOutcome::Applied {
                target: ShiftTarget::Data,
                ..
            }
        ) {
            return;
        }
        if let Err(error) = self.session.refit(&self.model) {
            tracing::warn!(%error, "continuum could not be refitted after the data shift, fit cleared");
            self.session.reset_fit();
        }
    }

    pub fn add_fit_points(&mut self, min: f64, max: f64) -> EngineResult<LinearFit> {
        self.session.add_fit_points(&self.model, min, max)
    }

    pub fn reset_fit(&mut self) {
        self.session.reset_fit();
    }

    pub fn measure_equivalent_width(&mut self, min: f64, max: f64) -> EngineResult<FeatureMeasurement> {
        self.session.measure_equivalent_width(&self.model, min, max)
    }

    pub fn delete_last_measurement(&mut self) -> EngineResult<FeatureMeasurement> {
        self.session.delete_last_measurement(&self.model)
    }

    pub fn toggle_mark(&mut self) -> EngineResult<bool> {
        self.session.toggle_mark(&self.model)
    }

    pub fn set_note(&mut self, text: impl Into<String>) -> EngineResult<()> {
        self.session.set_note(&self.model, text)
    }

    pub fn append_note(&mut self, text: &str) -> EngineResult<()> {
        self.session.append_note(&self.model, text)
    }

    pub fn reset_measurements(&mut self) {
        self.session.reset_measurements(&self.model);
    }

    pub fn compute_masks(&self) -> MaskSet {
        self.model.compute_masks()
    }

    /// Records of every feature plus the non-zero velocity shifts.
    pub fn snapshot(&self) -> MeasurementFile {
        let shifts = self.model.velocity_shifts().non_zero();
        MeasurementFile {
            records: self.session.records().to_map(),
            velocity_shifts: (!shifts.is_empty()).then_some(shifts),
        }
    }

    pub fn restore(&mut self, file: MeasurementFile) -> RestoreReport {
        let MeasurementFile {
            records,
            velocity_shifts,
        } = file;

        self.session.reset_fit();
        self.model.reset_velocity_shifts();
        let records = self.session.restore_records(&self.model, records);

        let mut applied_shifts = Vec::new();
        let mut ignored_shift_keys = Vec::new();
        if let Some(shifts) = velocity_shifts {
            let mut parsed = Vec::with_capacity(shifts.len());
            for (key, velocity_kms) in shifts {
                match ShiftTarget::from_name(&key) {
                    Some(target) => parsed.push((target, velocity_kms)),
                    None => ignored_shift_keys.push(key),
                }
            }

            if ignored_shift_keys.is_empty() {
                applied_shifts = parsed
                    .into_iter()
                    .map(|(target, velocity_kms)| self.model.set_velocity_shift(target, velocity_kms))
                    .collect();
            } else {
                tracing::warn!(
                    keys = ?ignored_shift_keys,
                    "unknown velocity shift keys, stored shifts ignored"
                );
            }
        }

        RestoreReport {
            records,
            applied_shifts,
            ignored_shift_keys,
        }
    }

    pub fn status(&self) -> WorkbenchStatus {
        let bounds = self.model.range_bounds();
        let masks = self.model.compute_masks();
        let fit = self.session.fit();
        let record = self.active_record().cloned().unwrap_or_default();

        WorkbenchStatus {
            selection: self.model.selection(),
            feature_count: self.model.features().len(),
            feature: self.model.selected_feature(),
            key: self.model.selected_key(),
            range_factor: self.model.range_factor(),
            range_shift: self.model.range_shift(),
            range_min: bounds.min,
            range_max: bounds.max,
            samples_in_range: masks.data_count(),
            velocity_shifts: self
                .model
                .velocity_shifts()
                .iter()
                .map(|(target, value)| (target.as_str().to_string(), value))
                .collect(),
            fit_points: fit.indices().len(),
            slope: fit.slope(),
            intercept: fit.intercept(),
            ew: record.ew().to_vec(),
            mode: record.modes().to_vec(),
            fwhm: record.fwhm().to_vec(),
            marked: record.is_marked(),
            notes: record.notes().to_string(),
            measured_features: self.session.records().measured_count(),
            marked_features: self.session.records().marked_count(),
        }
    }
}
