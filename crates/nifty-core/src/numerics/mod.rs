//! Small numeric kernels shared by the fit and measurement code.

use crate::common::constants::SPAN_GUARD_SAMPLES;

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

/// Inclusive index range `[lower, upper]` into a sorted wavelength array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpan {
    pub lower: usize,
    pub upper: usize,
}

impl IndexSpan {
    pub fn indices(self) -> std::ops::RangeInclusive<usize> {
        self.lower..=self.upper
    }
}

/// Locates the samples of `sorted` covered by the window `[xmin, xmax]`.
///
/// Both bounds are left insertion points; the lower one is moved down by
/// [`SPAN_GUARD_SAMPLES`] so an edge sample just outside a selection is kept,
/// the upper one is clamped to the last index. Reversed bounds are swapped.
pub fn index_span(sorted: &[f64], xmin: f64, xmax: f64) -> Option<IndexSpan> {
    if sorted.is_empty() {
        return None;
    }

    let (xmin, xmax) = if xmin <= xmax {
        (xmin, xmax)
    } else {
        (xmax, xmin)
    };
    let lower = sorted.partition_point(|value| *value < xmin);
    let upper = sorted.partition_point(|value| *value < xmax);

    let last = sorted.len() - 1;
    let upper = upper.min(last);
    let lower = lower.saturating_sub(SPAN_GUARD_SAMPLES).min(upper);

    Some(IndexSpan { lower, upper })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineFitError {
    #[error("line fit input length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("line fit needs at least 2 distinct abscissae, got {distinct}")]
    Underdetermined { distinct: usize },
}

pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Ordinary least squares line through `(x, y)`, minimising vertical residuals.
pub fn least_squares_line(x: &[f64], y: &[f64]) -> Result<LinearFit, LineFitError> {
    if x.len() != y.len() {
        return Err(LineFitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }

    let distinct = distinct_count(x);
    if distinct < 2 {
        return Err(LineFitError::Underdetermined { distinct });
    }

    let count = x.len() as f64;
    let x_mean = stable_sum(x.iter().copied()) / count;
    let y_mean = stable_sum(y.iter().copied()) / count;

    let sxx = stable_sum(x.iter().map(|xi| (xi - x_mean) * (xi - x_mean)));
    let sxy = stable_sum(
        x.iter()
            .zip(y)
            .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean)),
    );
    if sxx == 0.0 {
        return Err(LineFitError::Underdetermined { distinct });
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Index of the first minimum, ignoring NaN samples.
pub fn first_argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in values.iter().copied().enumerate() {
        if value.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, current)| value < current) {
            best = Some((index, value));
        }
    }
    best.map(|(index, _)| index)
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Positions `i` where the sign of `values[i] - level` differs from the sign
/// of `values[i + 1] - level`.
pub fn sign_changes(values: &[f64], level: f64) -> Vec<usize> {
    values
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| sign(pair[0] - level) != sign(pair[1] - level))
        .map(|(index, _)| index)
        .collect()
}

/// Abscissa where the segment `(x0, y0)-(x1, y1)` reaches `y`.
pub fn interpolate_crossing(x0: f64, y0: f64, x1: f64, y1: f64, y: f64) -> f64 {
    if y1 == y0 {
        return x0;
    }
    x0 + (y - y0) * (x1 - x0) / (y1 - y0)
}
