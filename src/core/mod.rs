pub mod bithack;
pub mod hardware;
pub mod lookup;
pub mod normalize;
pub mod runtime;
pub mod strategy;

// 2^24 moves every positive subnormal into the normal range;
// 1/sqrt(2^24) = 2^-12 undoes it on the result.
const SUBNORMAL_LIFT: f32 = 16_777_216.0;
const SUBNORMAL_RESCALE: f32 = 4096.0;

/// Returns `(x', r)` with `1/sqrt(x) == r / sqrt(x')` and `x'` normal
/// whenever `x` is a positive subnormal. Other values pass through with `r = 1`.
#[inline]
pub(crate) fn lift_subnormal(x: f32) -> (f32, f32) {
    if x > 0.0 && x < f32::MIN_POSITIVE {
        (x * SUBNORMAL_LIFT, SUBNORMAL_RESCALE)
    } else {
        (x, 1.0)
    }
}
