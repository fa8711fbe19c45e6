use crate::domain::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Relativistic-free Doppler factor `1 + v/c`.
pub fn doppler_factor(velocity_kms: f64, speed_of_light: f64) -> f64 {
    1.0 + velocity_kms / speed_of_light
}

/// Raw `(wavelength, flux)` columns as handed over by a loader.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SpectrumColumns {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
}

impl SpectrumColumns {
    pub fn new(wavelength: Vec<f64>, flux: Vec<f64>) -> Self {
        Self { wavelength, flux }
    }
}

/// A spectrum with an immutable base wavelength grid and a shifted working copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    base_wavelength: Vec<f64>,
    wavelength: Vec<f64>,
    flux: Vec<f64>,
}

impl Spectrum {
    pub fn from_columns(columns: SpectrumColumns, label: &str) -> EngineResult<Self> {
        let SpectrumColumns { wavelength, flux } = columns;

        if wavelength.is_empty() {
            return Err(EngineError::invalid_input(format!(
                "{label} spectrum has no wavelength samples"
            )));
        }
        if flux.is_empty() {
            return Err(EngineError::invalid_input(format!(
                "{label} spectrum has no flux samples"
            )));
        }
        if wavelength.len() != flux.len() {
            return Err(EngineError::invalid_input(format!(
                "{label} spectrum length mismatch: wavelength={}, flux={}",
                wavelength.len(),
                flux.len()
            )));
        }
        if let Some(index) = wavelength.iter().position(|value| !value.is_finite()) {
            return Err(EngineError::invalid_input(format!(
                "{label} spectrum wavelength must be finite at index {index}, got {}",
                wavelength[index]
            )));
        }
        if let Some(index) = wavelength.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(EngineError::invalid_input(format!(
                "{label} spectrum wavelength must be non-decreasing, index {} has {} after {}",
                index + 1,
                wavelength[index + 1],
                wavelength[index]
            )));
        }

        Ok(Self {
            base_wavelength: wavelength.clone(),
            wavelength,
            flux,
        })
    }

    pub fn base_wavelength(&self) -> &[f64] {
        &self.base_wavelength
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.wavelength = self
            .base_wavelength
            .iter()
            .map(|value| value * factor)
            .collect();
    }
}

/// Catalog of reference line positions; displayed and shifted, never measured.
#[derive(Debug, Clone, PartialEq)]
pub struct LineCatalog {
    base_lines: Vec<f64>,
    lines: Vec<f64>,
}

impl LineCatalog {
    pub fn new(mut lines: Vec<f64>, label: &str) -> EngineResult<Self> {
        if let Some(index) = lines.iter().position(|value| !value.is_finite()) {
            return Err(EngineError::invalid_input(format!(
                "{label} line catalog entry must be finite at index {index}, got {}",
                lines[index]
            )));
        }
        lines.sort_unstable_by(f64::total_cmp);

        Ok(Self {
            base_lines: lines.clone(),
            lines,
        })
    }

    pub fn base_lines(&self) -> &[f64] {
        &self.base_lines
    }

    pub fn lines(&self) -> &[f64] {
        &self.lines
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.lines = self.base_lines.iter().map(|value| value * factor).collect();
    }
}
