use std::arch::aarch64::*;

/// `vrsqrte` over whole 4-lane batches; refinement uses `vrsqrts`,
/// which computes `(3 - a * b) / 2`.
#[target_feature(enable = "neon")]
pub unsafe fn rsqrt_batch_neon(input: &[f32], output: &mut [f32], refine: bool) {
    let n = input.len();
    assert_eq!(n, output.len());
    debug_assert_eq!(n % 4, 0);

    let mut i = 0;
    while i + 4 <= n {
        let x = vld1q_f32(input.as_ptr().add(i));
        let mut y = vrsqrteq_f32(x);
        if refine {
            y = vmulq_f32(y, vrsqrtsq_f32(vmulq_f32(x, y), y));
        }
        vst1q_f32(output.as_mut_ptr().add(i), y);
        i += 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsqrt_neon_refined() {
        let input = [4.0f32, 16.0, 25.0, 100.0];
        let mut output = [0.0f32; 4];
        unsafe { rsqrt_batch_neon(&input, &mut output, true) };
        let expected = [0.5f32, 0.25, 0.2, 0.1];
        for i in 0..4 {
            assert!((output[i] - expected[i]).abs() / expected[i] < 1e-4);
        }
    }
}
