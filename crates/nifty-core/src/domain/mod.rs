pub mod errors;

pub use errors::{EngineError, EngineResult, NiftyError, NiftyErrorCategory, NiftyResult};

use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CatalogKind {
    Stellar,
    Interstellar,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [Self::Stellar, Self::Interstellar];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stellar => "stellar",
            Self::Interstellar => "interstellar",
        }
    }
}

impl Display for CatalogKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Array family a velocity shift is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShiftTarget {
    Data,
    Reference,
    Catalog(CatalogKind),
}

impl ShiftTarget {
    pub const ALL: [ShiftTarget; 4] = [
        Self::Data,
        Self::Reference,
        Self::Catalog(CatalogKind::Stellar),
        Self::Catalog(CatalogKind::Interstellar),
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Reference => "ref",
            Self::Catalog(kind) => kind.as_str(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "data" => Some(Self::Data),
            "ref" | "reference" => Some(Self::Reference),
            "stellar" | "stellar_lines" => Some(Self::Catalog(CatalogKind::Stellar)),
            "interstellar" | "interstellar_lines" => {
                Some(Self::Catalog(CatalogKind::Interstellar))
            }
            _ => None,
        }
    }
}

impl Display for ShiftTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for ShiftTarget {
    type Err = EngineError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name).ok_or_else(|| {
            EngineError::invalid_input(format!(
                "unknown shift target '{name}', expected one of data, ref, stellar, interstellar"
            ))
        })
    }
}

/// Canonical persistence key of a feature wavelength.
///
/// The value is rounded to `decimals` places and trailing zeros are trimmed,
/// keeping at least one fractional digit: `100.0 -> "100.0"`,
/// `5780.48 -> "5780.48"`.
pub fn feature_key(wavelength: f64, decimals: usize) -> String {
    let mut key = format!("{wavelength:.decimals$}");
    if key.contains('.') {
        while key.ends_with('0') {
            key.pop();
        }
        if key.ends_with('.') {
            key.push('0');
        }
    } else if wavelength.is_finite() {
        key.push_str(".0");
    }
    key
}

/// Re-canonicalises a key read from disk; `None` when it is not a number.
pub fn canonicalize_key(key: &str, decimals: usize) -> Option<String> {
    let value = key.trim().parse::<f64>().ok()?;
    value.is_finite().then(|| feature_key(value, decimals))
}
