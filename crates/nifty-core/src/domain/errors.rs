use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NiftyResult<T> = Result<T, NiftyError>;
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NiftyErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl NiftyErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Failures raised by the measurement engine.
///
/// The fit, measurement and record variants are recoverable: the operation
/// that raised them left the model untouched and the caller may keep going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("unknown wavelength unit '{unit}'")]
    UnknownUnit { unit: String },
    #[error("continuum fit needs at least 2 distinct wavelengths, got {distinct}")]
    UnderdeterminedFit { distinct: usize },
    #[error("fitted continuum is zero at index {index} (wavelength {wavelength})")]
    DegenerateFit { index: usize, wavelength: f64 },
    #[error("no continuum fit available for feature {feature}")]
    NoFit { feature: String },
    #[error("no measurement recorded for feature {feature}")]
    EmptyCollection { feature: String },
    #[error("loaded measurements cover {loaded} feature(s) that do not match the {expected} loaded feature(s)")]
    RecordMismatch { expected: usize, loaded: usize },
}

impl EngineError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INPUT.INVALID",
            Self::UnknownUnit { .. } => "INPUT.UNKNOWN_UNIT",
            Self::UnderdeterminedFit { .. } => "RUN.UNDERDETERMINED_FIT",
            Self::DegenerateFit { .. } => "RUN.DEGENERATE_FIT",
            Self::NoFit { .. } => "RUN.NO_FIT",
            Self::EmptyCollection { .. } => "RUN.EMPTY_COLLECTION",
            Self::RecordMismatch { .. } => "INPUT.RECORD_MISMATCH",
        }
    }

    pub const fn category(&self) -> NiftyErrorCategory {
        match self {
            Self::InvalidInput { .. } | Self::UnknownUnit { .. } | Self::RecordMismatch { .. } => {
                NiftyErrorCategory::InputValidationError
            }
            Self::UnderdeterminedFit { .. }
            | Self::DegenerateFit { .. }
            | Self::NoFit { .. }
            | Self::EmptyCollection { .. } => NiftyErrorCategory::ComputationError,
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidInput { .. } | Self::UnknownUnit { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiftyError {
    category: NiftyErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl NiftyError {
    pub fn new(
        category: NiftyErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            NiftyErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NiftyErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NiftyErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NiftyErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> NiftyErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl From<EngineError> for NiftyError {
    fn from(error: EngineError) -> Self {
        Self::new(error.category(), error.placeholder(), error.to_string())
    }
}

impl Display for NiftyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for NiftyError {}
