use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDirection {
    Up,
    Down,
}

impl RangeDirection {
    const fn sign(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBounds {
    pub min: f64,
    pub max: f64,
}

impl RangeBounds {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Strict containment, matching the mask semantics.
    pub fn contains(&self, value: f64) -> bool {
        self.min < value && value < self.max
    }
}

impl Display for RangeBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.4}, {:.4}]", self.min, self.max)
    }
}

/// Relative half-width and absolute offset of the window around a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeWindow {
    factor: f64,
    shift: f64,
}

impl RangeWindow {
    pub fn new(factor: f64) -> Self {
        Self { factor, shift: 0.0 }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn bounds(&self, center: f64) -> RangeBounds {
        RangeBounds {
            min: center * (1.0 - self.factor) + self.shift,
            max: center * (1.0 + self.factor) + self.shift,
        }
    }

    pub(crate) fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }

    pub(crate) fn pan(&mut self, center: f64, direction: RangeDirection, step: f64) {
        self.shift += direction.sign() * self.bounds(center).width() * step;
    }

    pub(crate) fn reset_shift(&mut self) {
        self.shift = 0.0;
    }
}
