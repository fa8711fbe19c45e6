use crate::domain::{EngineError, EngineResult};
use crate::numerics::{IndexSpan, LineFitError, LinearFit, least_squares_line};
use std::collections::BTreeSet;

/// Continuum points picked for the active feature and the linear fit through them.
///
/// Only indices into the working test spectrum are stored; the fit points are
/// projected from the arrays whenever the line is refitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitAccumulator {
    indices: BTreeSet<usize>,
    fit: Option<LinearFit>,
    fitted_line: Vec<f64>,
    normalized: Vec<f64>,
}

impl FitAccumulator {
    pub fn indices(&self) -> &BTreeSet<usize> {
        &self.indices
    }

    pub fn line(&self) -> Option<LinearFit> {
        self.fit
    }

    pub fn slope(&self) -> Option<f64> {
        self.fit.map(|fit| fit.slope)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fit.map(|fit| fit.intercept)
    }

    pub fn fitted_line(&self) -> &[f64] {
        &self.fitted_line
    }

    pub fn normalized(&self) -> &[f64] {
        &self.normalized
    }

    pub fn has_fit(&self) -> bool {
        !self.normalized.is_empty()
    }

    /// `(wavelength, flux)` of the accumulated continuum points.
    pub fn fit_points(&self, wavelength: &[f64], flux: &[f64]) -> (Vec<f64>, Vec<f64>) {
        project(&self.indices, wavelength, flux)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Unions `span` into the index set and refits. On error nothing changes.
    pub fn extend(
        &mut self,
        span: IndexSpan,
        wavelength: &[f64],
        flux: &[f64],
    ) -> EngineResult<LinearFit> {
        let mut candidate = self.indices.clone();
        candidate.extend(span.indices());
        self.commit(candidate, wavelength, flux)
    }

    /// Refits the current index set against (possibly shifted) arrays.
    pub fn refit(&mut self, wavelength: &[f64], flux: &[f64]) -> EngineResult<LinearFit> {
        let indices = self.indices.clone();
        self.commit(indices, wavelength, flux)
    }

    fn commit(
        &mut self,
        indices: BTreeSet<usize>,
        wavelength: &[f64],
        flux: &[f64],
    ) -> EngineResult<LinearFit> {
        let (fit_x, fit_y) = project(&indices, wavelength, flux);
        let fit = least_squares_line(&fit_x, &fit_y).map_err(|error| match error {
            LineFitError::Underdetermined { distinct } => {
                EngineError::UnderdeterminedFit { distinct }
            }
            LineFitError::LengthMismatch { .. } => EngineError::invalid_input(error.to_string()),
        })?;

        let fitted_line: Vec<f64> = wavelength.iter().map(|x| fit.evaluate(*x)).collect();
        if let Some(index) = fitted_line.iter().position(|value| *value == 0.0) {
            return Err(EngineError::DegenerateFit {
                index,
                wavelength: wavelength[index],
            });
        }
        let normalized = flux
            .iter()
            .zip(&fitted_line)
            .map(|(flux, continuum)| flux / continuum)
            .collect();

        self.indices = indices;
        self.fit = Some(fit);
        self.fitted_line = fitted_line;
        self.normalized = normalized;
        Ok(fit)
    }
}

fn project(indices: &BTreeSet<usize>, wavelength: &[f64], flux: &[f64]) -> (Vec<f64>, Vec<f64>) {
    indices
        .iter()
        .filter(|index| **index < wavelength.len() && **index < flux.len())
        .map(|index| (wavelength[*index], flux[*index]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::FitAccumulator;
    use crate::domain::EngineError;
    use crate::numerics::IndexSpan;

    const WAVELENGTH: [f64; 5] = [100.0, 101.0, 102.0, 103.0, 104.0];
    const FLUX: [f64; 5] = [1.0, 1.0, 0.5, 1.0, 1.0];

    #[test]
    fn accumulated_continuum_normalizes_dip() {
        let mut fit = FitAccumulator::default();
        fit.extend(IndexSpan { lower: 0, upper: 1 }, &WAVELENGTH, &FLUX)
            .expect("first span fits");
        fit.extend(IndexSpan { lower: 3, upper: 4 }, &WAVELENGTH, &FLUX)
            .expect("second span fits");

        assert_eq!(fit.indices().iter().copied().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
        assert_eq!(fit.slope(), Some(0.0));
        assert_eq!(fit.intercept(), Some(1.0));
        assert_eq!(fit.normalized(), &FLUX);
        assert_eq!(fit.fitted_line(), &[1.0; 5]);

        let (points_x, points_y) = fit.fit_points(&WAVELENGTH, &FLUX);
        assert_eq!(points_x, vec![100.0, 101.0, 103.0, 104.0]);
        assert_eq!(points_y, vec![1.0; 4]);
    }

    #[test]
    fn single_point_is_underdetermined_and_leaves_state_untouched() {
        let mut fit = FitAccumulator::default();
        let error = fit
            .extend(IndexSpan { lower: 2, upper: 2 }, &WAVELENGTH, &FLUX)
            .expect_err("single point should fail");
        assert_eq!(error, EngineError::UnderdeterminedFit { distinct: 1 });
        assert_eq!(fit, FitAccumulator::default());
    }

    #[test]
    fn zero_crossing_continuum_is_degenerate() {
        let wavelength = [-1.0, 0.0, 1.0];
        let flux = [-1.0, 0.0, 1.0];
        let mut fit = FitAccumulator::default();
        let error = fit
            .extend(IndexSpan { lower: 0, upper: 2 }, &wavelength, &flux)
            .expect_err("continuum through zero should fail");
        assert_eq!(
            error,
            EngineError::DegenerateFit {
                index: 1,
                wavelength: 0.0
            }
        );
        assert!(!fit.has_fit());
    }

    #[test]
    fn refit_follows_shifted_wavelengths() {
        let flux = [1.0, 2.0, 3.0];
        let mut fit = FitAccumulator::default();
        fit.extend(IndexSpan { lower: 0, upper: 2 }, &[1.0, 2.0, 3.0], &flux)
            .expect("fit");
        let shifted = fit.refit(&[2.0, 4.0, 6.0], &flux).expect("refit");
        assert!((shifted.slope - 0.5).abs() < 1.0e-12);
        assert!(shifted.intercept.abs() < 1.0e-12);
    }

    #[test]
    fn reset_clears_every_derived_value() {
        let mut fit = FitAccumulator::default();
        fit.extend(IndexSpan { lower: 0, upper: 4 }, &WAVELENGTH, &FLUX)
            .expect("fit");
        fit.reset();
        assert!(fit.indices().is_empty());
        assert_eq!(fit.slope(), None);
        assert!(fit.fitted_line().is_empty());
        assert!(fit.normalized().is_empty());
    }
}
