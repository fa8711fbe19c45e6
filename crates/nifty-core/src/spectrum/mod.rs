mod arrays;
mod model;
mod range;
mod shift;

pub use arrays::{LineCatalog, Spectrum, SpectrumColumns, doppler_factor};
pub use model::{ModelInputs, SpectrumModel};
pub use range::{RangeBounds, RangeDirection, RangeWindow};
pub use shift::{ShiftOutcome, VelocityShiftState};
