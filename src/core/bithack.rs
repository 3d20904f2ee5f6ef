//! "Fast inverse square root": magic-constant initial estimate from the
//! IEEE-754 bit pattern, refined with Newton-Raphson steps on
//! `f(y) = 1/y^2 - x`. Subnormal inputs are lifted into the normal range
//! first, where the magic constant's linear fit holds.

use crate::core::lift_subnormal;

/// Single precision magic constant.
pub const MAGIC: u32 = 0x5f3759df;

/// Upper bound on refinement steps. Past two, f32 rounding dominates.
pub const MAX_ITERATIONS: u8 = 4;

/// Reinterpret the bits of `x`, shift, subtract from [`MAGIC`], reinterpret back.
/// Bit casts only, no numeric conversion.
#[inline]
pub fn initial_estimate(x: f32) -> f32 {
    let i = x.to_bits();
    f32::from_bits(MAGIC.wrapping_sub(i >> 1))
}

/// One Newton-Raphson step: `y * (1.5 - 0.5 * x * y * y)`.
#[inline]
pub fn newton_step(x: f32, y: f32) -> f32 {
    y * (1.5 - 0.5 * x * y * y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitHackNewton {
    iterations: u8,
}

impl Default for BitHackNewton {
    fn default() -> Self {
        Self { iterations: 1 }
    }
}

impl BitHackNewton {
    /// `iterations` is clamped to [`MAX_ITERATIONS`].
    pub fn new(iterations: u8) -> Self {
        Self { iterations: iterations.min(MAX_ITERATIONS) }
    }

    pub fn iterations(&self) -> u8 {
        self.iterations
    }

    /// Returns 0 for `x <= 0` (and NaN) instead of touching the bits.
    #[inline]
    pub fn estimate(&self, x: f32) -> f32 {
        if !(x > 0.0) {
            return 0.0;
        }
        let (x, rescale) = lift_subnormal(x);
        let mut y = initial_estimate(x);
        for _ in 0..self.iterations {
            y = newton_step(x, y);
        }
        y * rescale
    }
}
