//! Immutable engine configuration.
//!
//! Every tunable of the engine lives here and is handed to the model at
//! construction time. The JSON form accepts any subset of the fields; missing
//! fields keep their defaults.

use super::constants::{
    DEFAULT_RANGE_FACTOR, DEFAULT_RANGE_SHIFT_STEP, DEFAULT_RANGE_STEP, DEFAULT_VELOCITY_STEP,
    FEATURE_KEY_DECIMALS, MAX_RANGE_FACTOR, MIN_RANGE_FACTOR, SPEED_OF_LIGHT_KMS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub speed_of_light: f64,
    pub range_factor: f64,
    pub range_step: f64,
    pub range_shift_step: f64,
    pub velocity_step: f64,
    pub min_range_factor: f64,
    pub max_range_factor: f64,
    pub key_decimals: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed_of_light: SPEED_OF_LIGHT_KMS,
            range_factor: DEFAULT_RANGE_FACTOR,
            range_step: DEFAULT_RANGE_STEP,
            range_shift_step: DEFAULT_RANGE_SHIFT_STEP,
            velocity_step: DEFAULT_VELOCITY_STEP,
            min_range_factor: MIN_RANGE_FACTOR,
            max_range_factor: MAX_RANGE_FACTOR,
            key_decimals: FEATURE_KEY_DECIMALS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        let positive = [
            ("speedOfLight", self.speed_of_light),
            ("rangeFactor", self.range_factor),
            ("rangeShiftStep", self.range_shift_step),
            ("velocityStep", self.velocity_step),
            ("minRangeFactor", self.min_range_factor),
            ("maxRangeFactor", self.max_range_factor),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineConfigError::Invalid {
                    field,
                    reason: format!("must be finite and > 0, got {value}"),
                });
            }
        }

        if !(self.range_step > 0.0 && self.range_step < 1.0) {
            return Err(EngineConfigError::Invalid {
                field: "rangeStep",
                reason: format!("must lie in (0, 1), got {}", self.range_step),
            });
        }

        if self.min_range_factor > self.max_range_factor {
            return Err(EngineConfigError::Invalid {
                field: "minRangeFactor",
                reason: format!(
                    "must not exceed maxRangeFactor ({} > {})",
                    self.min_range_factor, self.max_range_factor
                ),
            });
        }

        if !(self.min_range_factor..=self.max_range_factor).contains(&self.range_factor) {
            return Err(EngineConfigError::Invalid {
                field: "rangeFactor",
                reason: format!(
                    "must lie in [{}, {}], got {}",
                    self.min_range_factor, self.max_range_factor, self.range_factor
                ),
            });
        }

        Ok(())
    }

    pub fn clamp_range_factor(&self, factor: f64) -> f64 {
        factor.clamp(self.min_range_factor, self.max_range_factor)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("failed to read engine config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse engine config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid engine config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub fn load_engine_config(config_path: impl AsRef<Path>) -> Result<EngineConfig, EngineConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| EngineConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    let config: EngineConfig =
        serde_json::from_str(&source).map_err(|source| EngineConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, EngineConfigError, load_engine_config};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default()
            .validate()
            .expect("defaults should validate");
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("nifty.json");
        fs::write(&path, r#"{ "velocityStep": 5.0, "keyDecimals": 2 }"#)
            .expect("config should be written");

        let config = load_engine_config(&path).expect("config should load");
        assert_eq!(config.velocity_step, 5.0);
        assert_eq!(config.key_decimals, 2);
        assert_eq!(config.range_factor, EngineConfig::default().range_factor);
    }

    #[test]
    fn range_step_outside_unit_interval_is_rejected() {
        let config = EngineConfig {
            range_step: 1.0,
            ..EngineConfig::default()
        };
        let error = config.validate().expect_err("range step 1.0 should fail");
        assert!(matches!(
            error,
            EngineConfigError::Invalid {
                field: "rangeStep",
                ..
            }
        ));
    }

    #[test]
    fn missing_config_file_reports_path() {
        let error = load_engine_config("does/not/exist.json").expect_err("missing file");
        assert!(error.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn range_factor_clamp_uses_configured_bounds() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_range_factor(0.0), config.min_range_factor);
        assert_eq!(config.clamp_range_factor(10.0), config.max_range_factor);
        assert_eq!(config.clamp_range_factor(0.02), 0.02);
    }
}
