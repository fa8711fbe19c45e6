use super::arrays::{LineCatalog, Spectrum, SpectrumColumns, doppler_factor};
use super::range::{RangeBounds, RangeDirection, RangeWindow};
use super::shift::{ShiftOutcome, VelocityShiftState};
use crate::common::EngineConfig;
use crate::domain::{CatalogKind, EngineError, EngineResult, ShiftTarget, feature_key};
use crate::selection::{MaskSet, compute_mask};
use std::collections::BTreeMap;

/// Everything a model is built from. Only `data` and `features` are required.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelInputs {
    pub data: SpectrumColumns,
    pub features: Vec<f64>,
    pub reference: Option<SpectrumColumns>,
    pub stellar_lines: Option<Vec<f64>>,
    pub interstellar_lines: Option<Vec<f64>>,
}

impl ModelInputs {
    pub fn new(data: SpectrumColumns, features: Vec<f64>) -> Self {
        Self {
            data,
            features,
            ..Self::default()
        }
    }
}

/// Canonical spectral state: arrays, feature selection, range of interest and
/// velocity shifts.
///
/// Shifting or moving the window never recomputes masks or fits; callers
/// refresh whatever derived state they hold once a batch of changes is done.
#[derive(Debug, Clone)]
pub struct SpectrumModel {
    config: EngineConfig,
    data: Spectrum,
    reference: Option<Spectrum>,
    features: Vec<f64>,
    catalogs: BTreeMap<CatalogKind, LineCatalog>,
    shifts: VelocityShiftState,
    selection: usize,
    range: RangeWindow,
}

impl SpectrumModel {
    pub fn initialize(config: EngineConfig, inputs: ModelInputs) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|error| EngineError::invalid_input(error.to_string()))?;

        let ModelInputs {
            data,
            features,
            reference,
            stellar_lines,
            interstellar_lines,
        } = inputs;

        let features = normalize_features(features, config.key_decimals)?;
        let data = Spectrum::from_columns(data, "test")?;
        let reference = reference
            .map(|columns| Spectrum::from_columns(columns, "reference"))
            .transpose()?;

        let mut catalogs = BTreeMap::new();
        for (kind, lines) in [
            (CatalogKind::Stellar, stellar_lines),
            (CatalogKind::Interstellar, interstellar_lines),
        ] {
            if let Some(lines) = lines {
                catalogs.insert(kind, LineCatalog::new(lines, kind.as_str())?);
            }
        }

        tracing::debug!(
            samples = data.len(),
            features = features.len(),
            reference = reference.is_some(),
            catalogs = catalogs.len(),
            "spectrum model initialized"
        );

        Ok(Self {
            range: RangeWindow::new(config.range_factor),
            config,
            data,
            reference,
            features,
            catalogs,
            shifts: VelocityShiftState::default(),
            selection: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data(&self) -> &Spectrum {
        &self.data
    }

    pub fn wavelength(&self) -> &[f64] {
        self.data.wavelength()
    }

    pub fn flux(&self) -> &[f64] {
        self.data.flux()
    }

    pub fn reference(&self) -> Option<&Spectrum> {
        self.reference.as_ref()
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn catalog(&self, kind: CatalogKind) -> Option<&LineCatalog> {
        self.catalogs.get(&kind)
    }

    pub fn catalogs(&self) -> impl Iterator<Item = (CatalogKind, &LineCatalog)> {
        self.catalogs.iter().map(|(kind, catalog)| (*kind, catalog))
    }

    pub fn has_target(&self, target: ShiftTarget) -> bool {
        match target {
            ShiftTarget::Data => true,
            ShiftTarget::Reference => self.reference.is_some(),
            ShiftTarget::Catalog(kind) => self.catalogs.contains_key(&kind),
        }
    }

    pub fn velocity_shifts(&self) -> &VelocityShiftState {
        &self.shifts
    }

    pub fn velocity_shift(&self, target: ShiftTarget) -> f64 {
        self.shifts.get(target)
    }

    pub fn feature_key(&self, wavelength: f64) -> String {
        feature_key(wavelength, self.config.key_decimals)
    }

    /// Adds `delta_kms` to the target's shift and rebuilds its working
    /// wavelengths as `base * (1 + v/c)`.
    pub fn apply_velocity_shift(&mut self, target: ShiftTarget, delta_kms: f64) -> ShiftOutcome {
        let velocity_kms = self.shifts.get(target) + delta_kms;
        self.shift_to(target, velocity_kms)
    }

    pub fn set_velocity_shift(&mut self, target: ShiftTarget, velocity_kms: f64) -> ShiftOutcome {
        self.shift_to(target, velocity_kms)
    }

    pub fn shift_up(&mut self, target: ShiftTarget) -> ShiftOutcome {
        self.apply_velocity_shift(target, self.config.velocity_step)
    }

    pub fn shift_down(&mut self, target: ShiftTarget) -> ShiftOutcome {
        self.apply_velocity_shift(target, -self.config.velocity_step)
    }

    /// Puts every loaded target back on its base wavelengths.
    pub fn reset_velocity_shifts(&mut self) {
        for target in ShiftTarget::ALL {
            if self.has_target(target) && self.shifts.get(target) != 0.0 {
                self.shifts.set(target, 0.0);
                self.rescale_target(target, 0.0, 1.0);
            }
        }
    }

    fn shift_to(&mut self, target: ShiftTarget, velocity_kms: f64) -> ShiftOutcome {
        if !self.has_target(target) {
            tracing::info!("No {} data available for shifting.", target);
            return ShiftOutcome::TargetAbsent { target };
        }

        // A factor <= 0 would fold the grid and break its ordering.
        let factor = doppler_factor(velocity_kms, self.config.speed_of_light);
        if !(factor.is_finite() && factor > 0.0) {
            tracing::warn!(%target, velocity_kms, "velocity shift rejected, Doppler factor must stay positive");
            return ShiftOutcome::Rejected {
                target,
                velocity_kms,
            };
        }

        self.shifts.set(target, velocity_kms);
        self.rescale_target(target, velocity_kms, factor);
        ShiftOutcome::Applied {
            target,
            velocity_kms,
        }
    }

    fn rescale_target(&mut self, target: ShiftTarget, velocity_kms: f64, factor: f64) {
        match target {
            ShiftTarget::Data => self.data.rescale(factor),
            ShiftTarget::Reference => {
                if let Some(reference) = self.reference.as_mut() {
                    reference.rescale(factor);
                }
            }
            ShiftTarget::Catalog(kind) => {
                if let Some(catalog) = self.catalogs.get_mut(&kind) {
                    catalog.rescale(factor);
                }
            }
        }
        tracing::debug!(%target, velocity_kms, factor, "velocity shift applied");
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn selected_feature(&self) -> f64 {
        self.features[self.selection]
    }

    pub fn selected_key(&self) -> String {
        self.feature_key(self.selected_feature())
    }

    pub fn select_next(&mut self, step: usize) {
        let count = self.features.len();
        self.select_index((self.selection + step % count) % count);
    }

    pub fn select_previous(&mut self, step: usize) {
        let count = self.features.len();
        self.select_index((self.selection + count - step % count) % count);
    }

    /// Jumps to `index` (wrapped) and resets the window offset.
    pub fn select_index(&mut self, index: usize) {
        self.selection = index % self.features.len();
        self.reset_range_shift();
    }

    pub fn range_factor(&self) -> f64 {
        self.range.factor()
    }

    pub fn range_shift(&self) -> f64 {
        self.range.shift()
    }

    pub fn range_bounds(&self) -> RangeBounds {
        self.range.bounds(self.selected_feature())
    }

    pub fn grow_range(&mut self, factor: f64) {
        self.scale_range(1.0 + factor);
    }

    pub fn shrink_range(&mut self, factor: f64) {
        self.scale_range(1.0 - factor);
    }

    pub fn zoom_in(&mut self) {
        self.shrink_range(self.config.range_step);
    }

    pub fn zoom_out(&mut self) {
        self.grow_range(self.config.range_step);
    }

    fn scale_range(&mut self, scale: f64) {
        let requested = self.range.factor() * scale;
        let clamped = self.config.clamp_range_factor(requested);
        if clamped != requested {
            tracing::debug!(requested, clamped, "range factor clamped");
        }
        self.range.set_factor(clamped);
    }

    pub fn shift_range_window(&mut self, direction: RangeDirection, factor: f64) {
        let center = self.selected_feature();
        self.range.pan(center, direction, factor);
    }

    pub fn pan_up(&mut self) {
        self.shift_range_window(RangeDirection::Up, self.config.range_shift_step);
    }

    pub fn pan_down(&mut self) {
        self.shift_range_window(RangeDirection::Down, self.config.range_shift_step);
    }

    pub fn reset_range_shift(&mut self) {
        self.range.reset_shift();
    }

    pub fn compute_masks(&self) -> MaskSet {
        let RangeBounds { min, max } = self.range_bounds();
        MaskSet {
            data: compute_mask(min, max, self.data.wavelength()),
            reference: self
                .reference
                .as_ref()
                .map(|reference| compute_mask(min, max, reference.wavelength())),
            features: compute_mask(min, max, &self.features),
            catalogs: self
                .catalogs
                .iter()
                .map(|(kind, catalog)| (*kind, compute_mask(min, max, catalog.lines())))
                .collect(),
        }
    }
}

/// Sorts the features and drops those whose key repeats an earlier one.
fn normalize_features(mut features: Vec<f64>, key_decimals: usize) -> EngineResult<Vec<f64>> {
    if features.is_empty() {
        return Err(EngineError::invalid_input("feature list is empty"));
    }
    if let Some(index) = features.iter().position(|value| !value.is_finite()) {
        return Err(EngineError::invalid_input(format!(
            "feature wavelength must be finite at index {index}, got {}",
            features[index]
        )));
    }

    features.sort_unstable_by(f64::total_cmp);
    let before = features.len();
    features.dedup_by(|later, kept| {
        feature_key(*later, key_decimals) == feature_key(*kept, key_decimals)
    });
    if features.len() < before {
        tracing::info!(
            dropped = before - features.len(),
            "features sharing a record key were merged"
        );
    }
    Ok(features)
}
