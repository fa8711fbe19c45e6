//! Inclusion masks restricting arrays to the current range of interest.

use crate::domain::CatalogKind;
use std::collections::BTreeMap;

/// `true` where `window_min < value < window_max`; boundary values are excluded.
pub fn compute_mask(window_min: f64, window_max: f64, values: &[f64]) -> Vec<bool> {
    values
        .iter()
        .map(|value| window_min < *value && *value < window_max)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaskSet {
    pub data: Vec<bool>,
    pub reference: Option<Vec<bool>>,
    pub features: Vec<bool>,
    pub catalogs: BTreeMap<CatalogKind, Vec<bool>>,
}

impl MaskSet {
    pub fn catalog(&self, kind: CatalogKind) -> Option<&[bool]> {
        self.catalogs.get(&kind).map(Vec::as_slice)
    }

    pub fn data_count(&self) -> usize {
        self.data.iter().filter(|inside| **inside).count()
    }
}

#[cfg(test)]
mod tests {
    use super::compute_mask;

    #[test]
    fn boundary_values_are_excluded() {
        let mask = compute_mask(100.0, 102.0, &[99.0, 100.0, 101.0, 102.0, 103.0]);
        assert_eq!(mask, vec![false, false, true, false, false]);
    }

    #[test]
    fn empty_arrays_give_empty_masks() {
        assert!(compute_mask(1.0, 4.0, &[]).is_empty());
    }
}
