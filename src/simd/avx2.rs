#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// `vrsqrtps` over whole 8-lane batches, optionally refined with one
/// Newton-Raphson step per lane.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx")]
pub unsafe fn rsqrt_batch_avx(input: &[f32], output: &mut [f32], refine: bool) {
    let n = input.len();
    assert_eq!(n, output.len());
    debug_assert_eq!(n % 8, 0);

    let half = _mm256_set1_ps(0.5);
    let three_halves = _mm256_set1_ps(1.5);
    let mut i = 0;

    while i + 8 <= n {
        let x = _mm256_loadu_ps(input.as_ptr().add(i));
        let mut y = _mm256_rsqrt_ps(x);
        if refine {
            let xyy = _mm256_mul_ps(_mm256_mul_ps(x, y), y);
            y = _mm256_mul_ps(y, _mm256_sub_ps(three_halves, _mm256_mul_ps(half, xyy)));
        }
        _mm256_storeu_ps(output.as_mut_ptr().add(i), y);
        i += 8;
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn sum_of_squares_avx2(v: &[f32]) -> f32 {
    let n = v.len();
    let mut sum256 = _mm256_setzero_ps();
    let mut i = 0;

    // Process 8 floats at a time
    while i + 8 <= n {
        let x = _mm256_loadu_ps(v.as_ptr().add(i));
        // FMA: sum = sum + x * x
        sum256 = _mm256_fmadd_ps(x, x, sum256);
        i += 8;
    }

    // Reduce to 128 bits
    let sum128 = _mm_add_ps(_mm256_castps256_ps128(sum256), _mm256_extractf128_ps(sum256, 1));
    let sum128 = _mm_hadd_ps(sum128, sum128);
    let sum128 = _mm_hadd_ps(sum128, sum128);

    let mut sum = _mm_cvtss_f32(sum128);

    // Handle remaining elements
    while i < n {
        let x = *v.get_unchecked(i);
        sum += x * x;
        i += 1;
    }

    sum
}
