//! Precomputed inverse square root table.
//!
//! The table samples `1/sqrt(x)` at `size` evenly spaced points over
//! `[min_value, max_value]`. Lookups take the nearest sample at or below the
//! requested magnitude (no interpolation) and clamp out-of-domain magnitudes
//! to the first or last sample instead of failing.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("invalid lookup domain: min={min}, max={max}, size={size} (need 0 < min < max, size >= 2)")]
    InvalidDomain { min: f32, max: f32, size: usize },
}

/// Immutable once built. Share it by reference between strategies.
#[derive(Debug, Clone)]
pub struct LookupTable {
    min_value: f32,
    max_value: f32,
    step: f32,
    samples: Box<[f32]>,
}

impl LookupTable {
    /// Build a table over `[min_value, max_value]` with `size` samples.
    ///
    /// Samples are computed with the platform square root in f64 and then
    /// rounded, so the table is monotonically non-increasing.
    pub fn build(min_value: f32, max_value: f32, size: usize) -> Result<Self, LookupError> {
        validate_domain(min_value, max_value, size)?;

        let step = (max_value - min_value) / (size - 1) as f32;
        let samples: Box<[f32]> = (0..size)
            .map(|i| {
                let x = min_value as f64 + i as f64 * step as f64;
                (1.0 / x.sqrt()) as f32
            })
            .collect();

        tracing::debug!(min_value, max_value, size, step, "built inverse sqrt lookup table");

        Ok(Self { min_value, max_value, step, samples })
    }

    /// Index of the sample used for `magnitude`, clamped into `[0, size - 1]`.
    /// NaN maps to the first sample.
    pub fn index_for(&self, magnitude: f32) -> usize {
        let last = self.samples.len() - 1;
        if magnitude >= self.max_value {
            return last;
        }
        let pos = (magnitude - self.min_value) / self.step;
        if !(pos > 0.0) {
            return 0;
        }
        // `as` saturates, floor is implied for positive values.
        (pos as usize).min(last)
    }

    pub fn estimate(&self, magnitude: f32) -> f32 {
        self.samples[self.index_for(magnitude)]
    }

    /// Sample point `x_i` for a table index.
    pub fn sample_point(&self, index: usize) -> f32 {
        (self.min_value as f64 + index as f64 * self.step as f64) as f32
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

pub(crate) fn validate_domain(min_value: f32, max_value: f32, size: usize) -> Result<(), LookupError> {
    let valid = size >= 2
        && min_value.is_finite()
        && max_value.is_finite()
        && min_value > 0.0
        && max_value > min_value;
    if valid {
        Ok(())
    } else {
        Err(LookupError::InvalidDomain { min: min_value, max: max_value, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_rejects_invalid_domains() {
        assert!(matches!(
            LookupTable::build(-1.0, 10.0, 5),
            Err(LookupError::InvalidDomain { .. })
        ));
        assert!(LookupTable::build(0.0, 10.0, 5).is_err());
        assert!(LookupTable::build(1.0, -10.0, 5).is_err());
        assert!(LookupTable::build(10.0, 1.0, 5).is_err());
        assert!(LookupTable::build(1.0, 1.0, 5).is_err());
        assert!(LookupTable::build(0.1, 100.0, 1).is_err());
        assert!(LookupTable::build(0.1, f32::INFINITY, 100).is_err());
        assert!(LookupTable::build(f32::NAN, 100.0, 100).is_err());
    }

    #[test]
    fn test_build_samples_endpoints() {
        let table = LookupTable::build(1.0, 100.0, 100).unwrap();
        assert_eq!(table.len(), 100);
        assert_eq!(table.samples()[0], 1.0);
        assert!((table.samples()[99] - 0.1).abs() < 1e-6);
        assert!((table.step() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_25_within_quantization_error() {
        let table = LookupTable::build(0.1, 100.0, 100).unwrap();
        let got = table.estimate(25.0);

        let below = table.sample_point(table.index_for(25.0));
        assert!(below <= 25.0);
        let derivative = 0.5 * below.powf(-1.5);
        let bound = table.step() * derivative;

        assert!((got - 0.2).abs() <= bound, "estimate(25) = {got}, bound {bound}");
    }

    #[test]
    fn test_clamps_out_of_domain() {
        let table = LookupTable::build(0.1, 100.0, 100).unwrap();
        let low = table.estimate(0.1);
        let high = table.estimate(100.0);

        assert_eq!(table.estimate(0.0), low);
        assert_eq!(table.estimate(-5.0), low);
        assert_eq!(table.estimate(0.05), low);
        assert_eq!(table.estimate(f32::NAN), low);
        assert_eq!(table.estimate(100.5), high);
        assert_eq!(table.estimate(1e9), high);
        assert_eq!(table.estimate(f32::INFINITY), high);
        assert_eq!(table.index_for(100.0), 99);
    }

    #[test]
    fn test_nearest_below_without_interpolation() {
        let table = LookupTable::build(1.0, 5.0, 5).unwrap();
        // Samples at 1, 2, 3, 4, 5
        assert_eq!(table.estimate(2.0), table.samples()[1]);
        assert_eq!(table.estimate(2.99), table.samples()[1]);
        assert_eq!(table.estimate(3.0), table.samples()[2]);
    }

    proptest! {
        #[test]
        fn prop_table_is_non_increasing(min in 0.001f32..10.0, span in 0.01f32..1000.0, size in 2usize..2048) {
            let table = LookupTable::build(min, min + span, size).unwrap();
            for pair in table.samples().windows(2) {
                prop_assert!(pair[1] <= pair[0]);
            }
        }

        #[test]
        fn prop_estimate_error_bounded_by_one_step(x in 0.1f32..100.0) {
            let table = LookupTable::build(0.1, 100.0, 100).unwrap();
            let index = table.index_for(x);
            let below = table.sample_point(index);
            let exact = 1.0 / x.sqrt();
            let bound = table.step() * 0.5 * below.powf(-1.5);

            prop_assert_eq!(table.estimate(x), table.samples()[index]);
            // Small slack for f32 rounding of the sample grid
            prop_assert!((table.estimate(x) - exact).abs() <= bound * 1.001 + 1e-6);
        }
    }
}
