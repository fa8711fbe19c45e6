//! Loaders for spectra, feature lists and line catalogs, and persistence of
//! measurement files.

mod features;
mod records;
mod spectrum;

pub use features::{expand_catalog_patterns, load_feature_list, load_line_catalog};
pub use records::{MeasurementFile, load_measurement_file, save_measurement_file};
pub use spectrum::{SpectrumFormat, SpectrumRequest, load_spectrum};

use crate::domain::{EngineError, NiftyError, NiftyErrorCategory};
use std::path::PathBuf;

pub type IoResult<T> = Result<T, IoError>;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("format '{format}' is not supported for '{}'", path.display())]
    UnsupportedFormat { path: PathBuf, format: String },
    #[error("'{}' is missing {what}", path.display())]
    MissingData { path: PathBuf, what: String },
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IoError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        Self::MissingData {
            path: path.into(),
            what: what.into(),
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Read { .. } => "IO.READ",
            Self::Parse { .. } => "INPUT.PARSE",
            Self::Write { .. } => "IO.WRITE",
            Self::UnsupportedFormat { .. } => "INPUT.UNSUPPORTED_FORMAT",
            Self::MissingData { .. } => "INPUT.MISSING_DATA",
            Self::InvalidGlob { .. } => "INPUT.INVALID_GLOB",
            Self::Engine(error) => error.placeholder(),
        }
    }

    pub fn category(&self) -> NiftyErrorCategory {
        match self {
            Self::Read { .. } | Self::Write { .. } => NiftyErrorCategory::IoSystemError,
            Self::Parse { .. }
            | Self::UnsupportedFormat { .. }
            | Self::MissingData { .. }
            | Self::InvalidGlob { .. } => NiftyErrorCategory::InputValidationError,
            Self::Engine(error) => error.category(),
        }
    }
}

impl From<IoError> for NiftyError {
    fn from(error: IoError) -> Self {
        Self::new(error.category(), error.placeholder(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::IoError;
    use crate::domain::{EngineError, NiftyError, NiftyErrorCategory};
    use std::path::PathBuf;

    #[test]
    fn io_errors_map_to_diagnostics() {
        let read = IoError::Read {
            path: PathBuf::from("spectrum.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let diagnostic = NiftyError::from(read);
        assert_eq!(diagnostic.category(), NiftyErrorCategory::IoSystemError);
        assert_eq!(diagnostic.exit_code(), 3);
        assert_eq!(
            diagnostic.diagnostic_line(),
            "ERROR: [IO.READ] failed to read 'spectrum.txt': gone"
        );

        let unsupported = IoError::UnsupportedFormat {
            path: PathBuf::from("spectrum.fits"),
            format: "fits".to_string(),
        };
        assert_eq!(
            NiftyError::from(unsupported).placeholder(),
            "INPUT.UNSUPPORTED_FORMAT"
        );

        let engine = IoError::from(EngineError::UnknownUnit {
            unit: "parsec".to_string(),
        });
        assert_eq!(engine.placeholder(), "INPUT.UNKNOWN_UNIT");
        assert_eq!(engine.category(), NiftyErrorCategory::InputValidationError);
    }
}
