//! Vector Normalization
//!
//! Implements two distinct modes, which are NOT interchangeable:
//! 1. L2 (vector-magnitude) mode: one estimate of 1/sqrt(sum of squares),
//!    every element scaled by it. Produces a unit vector.
//! 2. Elementwise (per-element) mode: every element is scaled by the estimate
//!    of its own magnitude, `v = v * rsqrt(|v|)`. Does NOT produce a unit vector.

use crate::core::strategy::Strategy;
use crate::simd::{get_sum_of_squares, SumSquaresFunc};
use serde::{Deserialize, Serialize};

// Stack scratch for elementwise mode; a multiple of every backend's lane count.
const SCRATCH_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    L2,
    Elementwise,
}

impl NormalizeMode {
    pub fn name(self) -> &'static str {
        match self {
            NormalizeMode::L2 => "l2",
            NormalizeMode::Elementwise => "elementwise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizeOutcome {
    /// L2 mode reports the single scale applied; elementwise reports 1.0.
    Scaled { scale: f32 },
    /// Empty or all-zero vector, left untouched.
    Degenerate,
}

/// Holds the sum-of-squares kernel picked once at construction.
#[derive(Clone, Copy)]
pub struct Normalizer {
    sum_of_squares: SumSquaresFunc,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self { sum_of_squares: get_sum_of_squares() }
    }

    pub fn normalize(&self, vector: &mut [f32], strategy: &Strategy<'_>, mode: NormalizeMode) -> NormalizeOutcome {
        match mode {
            NormalizeMode::L2 => self.l2_normalize(vector, strategy),
            NormalizeMode::Elementwise => Self::elementwise_normalize(vector, strategy),
        }
    }

    pub fn sum_of_squares(&self, vector: &[f32]) -> f32 {
        unsafe { (self.sum_of_squares)(vector) }
    }

    /// L2 Normalize a vector in-place.
    /// x = x * rsqrt(sum(x^2))
    pub fn l2_normalize(&self, vector: &mut [f32], strategy: &Strategy<'_>) -> NormalizeOutcome {
        let sum_sq = self.sum_of_squares(vector);

        // Overflowed sums fall through and propagate as IEEE inf/NaN.
        if sum_sq == 0.0 {
            return NormalizeOutcome::Degenerate;
        }

        let inv_norm = strategy.estimate(sum_sq);
        for val in vector.iter_mut() {
            *val *= inv_norm;
        }
        NormalizeOutcome::Scaled { scale: inv_norm }
    }

    /// Scale every element by the estimate of its own magnitude.
    /// Zero elements stay zero.
    pub fn elementwise_normalize(vector: &mut [f32], strategy: &Strategy<'_>) -> NormalizeOutcome {
        if vector.iter().all(|&v| v == 0.0) {
            return NormalizeOutcome::Degenerate;
        }

        let mut magnitudes = [0.0f32; SCRATCH_LEN];
        let mut scales = [0.0f32; SCRATCH_LEN];

        for chunk in vector.chunks_mut(SCRATCH_LEN) {
            let n = chunk.len();
            for (magnitude, val) in magnitudes.iter_mut().zip(chunk.iter()) {
                *magnitude = val.abs();
            }
            strategy.estimate_slice(&magnitudes[..n], &mut scales[..n]);

            for ((val, &magnitude), &scale) in chunk.iter_mut().zip(&magnitudes[..n]).zip(&scales[..n]) {
                if magnitude > 0.0 {
                    *val *= scale;
                }
            }
        }
        NormalizeOutcome::Scaled { scale: 1.0 }
    }

    /// Normalize every `dim`-wide row of `data`. Returns the number of
    /// degenerate rows.
    pub fn normalize_rows(&self, data: &mut [f32], dim: usize, strategy: &Strategy<'_>, mode: NormalizeMode) -> usize {
        if dim == 0 {
            return 0;
        }
        let mut degenerate = 0;
        for (row, vector) in data.chunks_exact_mut(dim).enumerate() {
            if self.normalize(vector, strategy, mode) == NormalizeOutcome::Degenerate {
                tracing::warn!(row, "degenerate vector left unnormalized");
                degenerate += 1;
            }
        }
        degenerate
    }
}
