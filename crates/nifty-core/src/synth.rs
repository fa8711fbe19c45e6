//! Synthetic absorption spectra for demos and tests.

use crate::domain::{EngineError, EngineResult};
use crate::spectrum::SpectrumColumns;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpectrumSpec {
    /// Wavelength coverage `(start, end)`, both included.
    pub x_range: (f64, f64),
    /// Gaussian sigma range, in samples.
    pub sigma_range: (f64, f64),
    /// Depth range of each dip relative to the unit continuum.
    pub strength_range: (f64, f64),
    pub number_of_values: usize,
    pub number_of_features: usize,
    pub signal_to_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticSpectrumSpec {
    fn default() -> Self {
        Self {
            x_range: (100.0, 200.0),
            sigma_range: (1.0, 5.0),
            strength_range: (0.0, 1.0),
            number_of_values: 300,
            number_of_features: 3,
            signal_to_noise: 10.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpectrum {
    pub columns: SpectrumColumns,
    /// Wavelengths at the dip centres, sorted.
    pub features: Vec<f64>,
}

impl SyntheticSpectrumSpec {
    fn validate(&self) -> EngineResult<()> {
        if self.number_of_values < 2 {
            return Err(EngineError::invalid_input(format!(
                "synthetic spectrum needs at least 2 samples, got {}",
                self.number_of_values
            )));
        }
        if !(self.x_range.0.is_finite() && self.x_range.1.is_finite())
            || self.x_range.0 >= self.x_range.1
        {
            return Err(EngineError::invalid_input(format!(
                "synthetic wavelength range must be increasing, got {:?}",
                self.x_range
            )));
        }
        if !self.signal_to_noise.is_finite() || self.signal_to_noise <= 0.0 {
            return Err(EngineError::invalid_input(format!(
                "signal to noise must be > 0, got {}",
                self.signal_to_noise
            )));
        }
        if self.sigma_range.0 <= 0.0 || self.sigma_range.1 < self.sigma_range.0 {
            return Err(EngineError::invalid_input(format!(
                "sigma range must be positive and ordered, got {:?}",
                self.sigma_range
            )));
        }
        if self.strength_range.1 < self.strength_range.0 {
            return Err(EngineError::invalid_input(format!(
                "strength range must be ordered, got {:?}",
                self.strength_range
            )));
        }
        Ok(())
    }
}

/// Unit continuum with zero-mean uniform noise of amplitude `1/sn` and
/// Gaussian dips at random samples.
pub fn create_spectrum(spec: &SyntheticSpectrumSpec) -> EngineResult<SyntheticSpectrum> {
    spec.validate()?;
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let count = spec.number_of_values;
    let (start, end) = spec.x_range;
    let step = (end - start) / (count - 1) as f64;
    let wavelength: Vec<f64> = (0..count).map(|index| start + step * index as f64).collect();

    let noise: Vec<f64> = (0..count)
        .map(|_| rng.random::<f64>() / spec.signal_to_noise)
        .collect();
    let mean_noise = noise.iter().sum::<f64>() / count as f64;
    let mut flux: Vec<f64> = noise.iter().map(|value| 1.0 + value - mean_noise).collect();

    let mut features = Vec::with_capacity(spec.number_of_features);
    for _ in 0..spec.number_of_features {
        let sigma = between(&mut rng, spec.sigma_range);
        let strength = between(&mut rng, spec.strength_range);
        let center = rng.random_range(0..count);
        features.push(wavelength[center]);

        for (index, value) in flux.iter_mut().enumerate() {
            let offset = (index as f64 - center as f64) / sigma;
            *value -= strength * (-0.5 * offset * offset).exp();
        }
    }
    features.sort_unstable_by(f64::total_cmp);

    tracing::debug!(
        samples = count,
        features = features.len(),
        seed = spec.seed,
        "synthetic spectrum created"
    );
    Ok(SyntheticSpectrum {
        columns: SpectrumColumns::new(wavelength, flux),
        features,
    })
}

fn between(rng: &mut StdRng, (low, high): (f64, f64)) -> f64 {
    low + rng.random::<f64>() * (high - low)
}
