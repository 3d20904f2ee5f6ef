#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// `rsqrtps` over whole 4-lane batches, optionally followed by
/// `y = y * (1.5 - 0.5 * x * y * y)`.
///
/// Lanes holding 0 or +inf produce NaN once refined (`0 * inf`).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse")]
pub unsafe fn rsqrt_batch_sse(input: &[f32], output: &mut [f32], refine: bool) {
    let n = input.len();
    assert_eq!(n, output.len());
    debug_assert_eq!(n % 4, 0);

    let half = _mm_set1_ps(0.5);
    let three_halves = _mm_set1_ps(1.5);
    let mut i = 0;

    while i + 4 <= n {
        let x = _mm_loadu_ps(input.as_ptr().add(i));
        let mut y = _mm_rsqrt_ps(x);
        if refine {
            let xyy = _mm_mul_ps(_mm_mul_ps(x, y), y);
            y = _mm_mul_ps(y, _mm_sub_ps(three_halves, _mm_mul_ps(half, xyy)));
        }
        _mm_storeu_ps(output.as_mut_ptr().add(i), y);
        i += 4;
    }
}
