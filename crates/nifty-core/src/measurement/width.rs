use crate::numerics::{IndexSpan, first_argmin, interpolate_crossing, sign_changes, stable_sum};
use serde::{Deserialize, Serialize};

/// Scalars derived from one absorption window of the normalized spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureMeasurement {
    pub equivalent_width: f64,
    /// Wavelengths at the first and last sample of the measured span.
    pub window: [f64; 2],
    pub mode: f64,
    pub fwhm: Option<f64>,
}

/// Equivalent width, mode wavelength and FWHM over `span`.
///
/// The equivalent width is a left Riemann sum of `1 - normalized` over the
/// half-open interval `span.lower..span.upper`; mode and FWHM use the closed
/// span. FWHM is `None` when the half-depth level is crossed fewer than twice.
pub fn measure_feature(wavelength: &[f64], normalized: &[f64], span: IndexSpan) -> FeatureMeasurement {
    let equivalent_width = stable_sum(
        (span.lower..span.upper)
            .map(|index| (1.0 - normalized[index]) * (wavelength[index + 1] - wavelength[index])),
    );

    let local_x = &wavelength[span.indices()];
    let local_y = &normalized[span.indices()];

    let (mode, minimum) = match first_argmin(local_y) {
        Some(index) => (local_x[index], local_y[index]),
        None => (local_x[0], 1.0),
    };
    let half_depth = (1.0 + minimum) / 2.0;

    FeatureMeasurement {
        equivalent_width,
        window: [wavelength[span.lower], wavelength[span.upper]],
        mode,
        fwhm: full_width_at_level(local_x, local_y, half_depth),
    }
}

fn full_width_at_level(x: &[f64], y: &[f64], level: f64) -> Option<f64> {
    let changes = sign_changes(y, level);
    let (first, last) = match changes.as_slice() {
        [first, .., last] => (*first, *last),
        _ => return None,
    };

    let left = interpolate_crossing(x[first], y[first], x[first + 1], y[first + 1], level);
    let right = interpolate_crossing(x[last], y[last], x[last + 1], y[last + 1], level);
    Some(right - left)
}

#[cfg(test)]
mod tests {
    use super::measure_feature;
    use crate::numerics::IndexSpan;

    const WAVELENGTH: [f64; 5] = [100.0, 101.0, 102.0, 103.0, 104.0];

    #[test]
    fn triangular_dip_measures_half_angstrom() {
        let normalized = [1.0, 1.0, 0.5, 1.0, 1.0];
        let measurement = measure_feature(
            &WAVELENGTH,
            &normalized,
            IndexSpan { lower: 0, upper: 4 },
        );
        assert!((measurement.equivalent_width - 0.5).abs() < 1.0e-12);
        assert_eq!(measurement.mode, 102.0);
        let fwhm = measurement.fwhm.expect("two half-depth crossings");
        assert!((fwhm - 1.0).abs() < 1.0e-12);
        assert_eq!(measurement.window, [100.0, 104.0]);
    }

    #[test]
    fn flat_window_has_no_width_and_no_fwhm() {
        let normalized = [1.0; 5];
        let measurement = measure_feature(
            &WAVELENGTH,
            &normalized,
            IndexSpan { lower: 1, upper: 3 },
        );
        assert_eq!(measurement.equivalent_width, 0.0);
        assert_eq!(measurement.mode, 101.0);
        assert_eq!(measurement.fwhm, None);
        assert_eq!(measurement.window, [101.0, 103.0]);
    }

    #[test]
    fn first_of_equal_minima_is_the_mode() {
        let normalized = [1.0, 0.4, 0.9, 0.4, 1.0];
        let measurement = measure_feature(
            &WAVELENGTH,
            &normalized,
            IndexSpan { lower: 0, upper: 4 },
        );
        assert_eq!(measurement.mode, 101.0);
        // Outermost crossings of 0.7: 100.5 on the way down, 103.5 on the way up.
        let fwhm = measurement.fwhm.expect("fwhm");
        assert!((fwhm - 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn single_sample_span_has_zero_width() {
        let normalized = [1.0, 1.0, 0.5, 1.0, 1.0];
        let measurement = measure_feature(
            &WAVELENGTH,
            &normalized,
            IndexSpan { lower: 2, upper: 2 },
        );
        assert_eq!(measurement.equivalent_width, 0.0);
        assert_eq!(measurement.mode, 102.0);
        assert_eq!(measurement.fwhm, None);
    }
}
