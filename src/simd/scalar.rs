pub fn sum_of_squares(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum()
}

/// Exact per-lane `1/sqrt`. Refinement is a no-op here.
pub unsafe fn rsqrt_batch_scalar(input: &[f32], output: &mut [f32], _refine: bool) {
    assert_eq!(input.len(), output.len());
    for (x, y) in input.iter().zip(output.iter_mut()) {
        *y = 1.0 / x.sqrt();
    }
}
