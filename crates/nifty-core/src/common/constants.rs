//! Physical constants and default step sizes of the measurement engine.

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KMS: f64 = 299_792.458_f64;

pub const DEFAULT_RANGE_FACTOR: f64 = 0.01;
pub const DEFAULT_RANGE_STEP: f64 = 0.1;
pub const DEFAULT_RANGE_SHIFT_STEP: f64 = 0.1;
/// Velocity increment of a single shift-up/shift-down action in km/s.
pub const DEFAULT_VELOCITY_STEP: f64 = 1.0;
pub const MIN_RANGE_FACTOR: f64 = 1.0e-5;
pub const MAX_RANGE_FACTOR: f64 = 1.0;
pub const FEATURE_KEY_DECIMALS: usize = 4;

/// Guard samples added below the lower edge of every index span.
pub const SPAN_GUARD_SAMPLES: usize = 2;

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_RANGE_FACTOR, DEFAULT_RANGE_SHIFT_STEP, DEFAULT_RANGE_STEP, MAX_RANGE_FACTOR,
        MIN_RANGE_FACTOR, SPEED_OF_LIGHT_KMS,
    };

    #[test]
    fn default_range_factor_lies_inside_clamp() {
        assert!(MIN_RANGE_FACTOR > 0.0);
        assert!((MIN_RANGE_FACTOR..=MAX_RANGE_FACTOR).contains(&DEFAULT_RANGE_FACTOR));
    }

    #[test]
    fn step_sizes_keep_shrinking_positive() {
        for step in [DEFAULT_RANGE_STEP, DEFAULT_RANGE_SHIFT_STEP] {
            assert!(step > 0.0 && step < 1.0);
        }
        assert!(SPEED_OF_LIGHT_KMS.is_finite());
    }
}
