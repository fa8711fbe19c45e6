mod fit;
mod record;
mod session;
mod width;

pub use fit::FitAccumulator;
pub use record::{FeatureRecord, MeasurementRecord, RecordBook};
pub use session::{MeasurementSession, RestoreOutcome};
pub use width::{FeatureMeasurement, measure_feature};
