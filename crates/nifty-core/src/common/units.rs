//! Wavelength unit table. Every loaded wavelength array is converted to
//! Angstrom by a multiplicative factor.

use crate::domain::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WavelengthUnit {
    #[default]
    Angstrom,
    Nanometer,
    Micrometer,
    Millimeter,
}

impl WavelengthUnit {
    /// Table order doubles as the tie-break order of [`WavelengthUnit::best_match`].
    pub const ALL: [WavelengthUnit; 4] = [
        Self::Angstrom,
        Self::Nanometer,
        Self::Micrometer,
        Self::Millimeter,
    ];

    pub const fn angstrom_factor(self) -> f64 {
        match self {
            Self::Angstrom => 1.0,
            Self::Nanometer => 10.0,
            Self::Micrometer => 1.0e4,
            Self::Millimeter => 1.0e7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Angstrom => "angstrom",
            Self::Nanometer => "nanometer",
            Self::Micrometer => "micrometer",
            Self::Millimeter => "millimeter",
        }
    }

    pub fn to_angstrom(self, values: &[f64]) -> Vec<f64> {
        let factor = self.angstrom_factor();
        values.iter().map(|value| value * factor).collect()
    }

    /// Picks the unit that places the most `features` inside the coverage of
    /// `wavelength` (already in Angstrom). Returns `None` when no unit places
    /// a single feature inside the spectrum.
    pub fn best_match(features: &[f64], wavelength: &[f64]) -> Option<Self> {
        let (low, high) = coverage(wavelength)?;

        let mut best: Option<(Self, usize)> = None;
        for unit in Self::ALL {
            let factor = unit.angstrom_factor();
            let inside = features
                .iter()
                .filter(|feature| (low..=high).contains(&(**feature * factor)))
                .count();
            if inside == 0 {
                continue;
            }
            if best.is_none_or(|(_, best_inside)| inside > best_inside) {
                best = Some((unit, inside));
            }
        }

        best.map(|(unit, _)| unit)
    }
}

fn coverage(wavelength: &[f64]) -> Option<(f64, f64)> {
    let mut finite = wavelength.iter().copied().filter(|value| value.is_finite());
    let first = finite.next()?;
    Some(finite.fold((first, first), |(low, high), value| {
        (low.min(value), high.max(value))
    }))
}

impl Display for WavelengthUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for WavelengthUnit {
    type Err = EngineError;

    fn from_str(unit: &str) -> Result<Self, Self::Err> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "a" | "aa" | "angstrom" | "angstroms" => Ok(Self::Angstrom),
            "nm" | "nanometer" | "nanometers" | "nanometre" => Ok(Self::Nanometer),
            "um" | "µm" | "micron" | "microns" | "micrometer" | "micrometers" => {
                Ok(Self::Micrometer)
            }
            "mm" | "millimeter" | "millimeters" | "millimetre" => Ok(Self::Millimeter),
            _ => Err(EngineError::UnknownUnit {
                unit: unit.to_string(),
            }),
        }
    }
}
