pub mod config;
pub mod constants;
pub mod units;

pub use config::{EngineConfig, EngineConfigError, load_engine_config};
pub use units::WavelengthUnit;
