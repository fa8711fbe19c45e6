use crate::domain::ShiftTarget;
use std::collections::BTreeMap;

/// Accumulated velocity shift in km/s per target; every target starts at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityShiftState {
    shifts: BTreeMap<ShiftTarget, f64>,
}

impl Default for VelocityShiftState {
    fn default() -> Self {
        Self {
            shifts: ShiftTarget::ALL
                .into_iter()
                .map(|target| (target, 0.0))
                .collect(),
        }
    }
}

impl VelocityShiftState {
    pub fn get(&self, target: ShiftTarget) -> f64 {
        self.shifts.get(&target).copied().unwrap_or(0.0)
    }

    pub(crate) fn set(&mut self, target: ShiftTarget, velocity_kms: f64) {
        self.shifts.insert(target, velocity_kms);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShiftTarget, f64)> + '_ {
        self.shifts.iter().map(|(target, value)| (*target, *value))
    }

    /// Targets with a non-zero shift, keyed by their persisted name.
    pub fn non_zero(&self) -> BTreeMap<String, f64> {
        self.iter()
            .filter(|(_, value)| *value != 0.0)
            .map(|(target, value)| (target.as_str().to_string(), value))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShiftOutcome {
    Applied {
        target: ShiftTarget,
        velocity_kms: f64,
    },
    /// The target array was never loaded; nothing changed.
    TargetAbsent { target: ShiftTarget },
    /// The resulting velocity would give a non-positive Doppler factor;
    /// nothing changed.
    Rejected {
        target: ShiftTarget,
        velocity_kms: f64,
    },
}

impl ShiftOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
