pub mod avx2;
#[cfg(target_arch = "aarch64")]
pub mod neon;
pub mod scalar;
pub mod sse;

use crate::core::hardware::CpuFeatures;

/// Width of the fixed batch exposed by `SimdApprox::estimate_batch` (one SSE register).
pub const LANE_WIDTH: usize = 4;

/// Writes a reciprocal square root estimate of every `input` lane into `output`.
/// Both slices have equal length, a multiple of the backend's lane count.
/// The `bool` requests one Newton-Raphson refinement per lane.
pub type RsqrtBatchFunc = unsafe fn(&[f32], &mut [f32], bool);

pub type SumSquaresFunc = unsafe fn(&[f32]) -> f32;

/// Hardware family used for the batched rsqrt approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `vrsqrtps` on 256-bit registers.
    Avx,
    /// `rsqrtps` on 128-bit registers.
    Sse,
    /// `vrsqrte` + `vrsqrts` on aarch64.
    Neon,
    /// Exact `1/sqrt` per lane, for targets without an approximation instruction.
    Scalar,
}

impl Backend {
    pub fn select(features: CpuFeatures) -> Self {
        if cfg!(target_arch = "x86_64") {
            if features.contains(CpuFeatures::AVX) {
                return Backend::Avx;
            }
            if features.contains(CpuFeatures::SSE) {
                return Backend::Sse;
            }
        }
        if cfg!(target_arch = "aarch64") && features.contains(CpuFeatures::NEON) {
            return Backend::Neon;
        }
        Backend::Scalar
    }

    pub fn detect() -> Self {
        Self::select(CpuFeatures::detect())
    }

    /// Number of f32 lanes one kernel invocation consumes.
    pub fn lanes(self) -> usize {
        match self {
            Backend::Avx => 8,
            Backend::Sse | Backend::Neon | Backend::Scalar => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Avx => "avx",
            Backend::Sse => "sse",
            Backend::Neon => "neon",
            Backend::Scalar => "scalar",
        }
    }

    /// Documented worst-case relative error of the raw hardware estimate.
    pub fn raw_relative_error(self) -> f32 {
        match self {
            // Intel SDM: |rel err| <= 1.5 * 2^-12
            Backend::Avx | Backend::Sse => 1.5 / 4096.0,
            Backend::Neon => 1.0 / 256.0,
            Backend::Scalar => 1e-6,
        }
    }

    /// Relative error bound after one Newton-Raphson step.
    pub fn refined_relative_error(self) -> f32 {
        match self {
            Backend::Avx | Backend::Sse => 1e-5,
            Backend::Neon => 1e-4,
            Backend::Scalar => 1e-6,
        }
    }

    pub fn rsqrt_batch(self) -> RsqrtBatchFunc {
        match self {
            #[cfg(target_arch = "x86_64")]
            Backend::Avx => avx2::rsqrt_batch_avx,
            #[cfg(target_arch = "x86_64")]
            Backend::Sse => sse::rsqrt_batch_sse,
            #[cfg(target_arch = "aarch64")]
            Backend::Neon => neon::rsqrt_batch_neon,
            _ => scalar::rsqrt_batch_scalar,
        }
    }
}

pub fn get_sum_of_squares() -> SumSquaresFunc {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return avx2::sum_of_squares_avx2;
        }
    }

    // Fallback
    wrapper_scalar
}

unsafe fn wrapper_scalar(v: &[f32]) -> f32 {
    scalar::sum_of_squares(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection_respects_features() {
        assert_eq!(Backend::select(CpuFeatures::empty()), Backend::Scalar);
        if cfg!(target_arch = "x86_64") {
            assert_eq!(Backend::select(CpuFeatures::SSE), Backend::Sse);
            assert_eq!(Backend::select(CpuFeatures::SSE | CpuFeatures::AVX), Backend::Avx);
        } else {
            assert_ne!(Backend::select(CpuFeatures::SSE | CpuFeatures::AVX), Backend::Avx);
        }
    }

    #[test]
    fn test_detected_backend_kernel_runs() {
        let backend = Backend::detect();
        let lanes = backend.lanes();
        let input: Vec<f32> = (1..=lanes * 2).map(|i| (i * i) as f32).collect();
        let mut output = vec![0.0; input.len()];

        unsafe { backend.rsqrt_batch()(&input, &mut output, true) };

        for (i, (&x, &y)) in input.iter().zip(output.iter()).enumerate() {
            let expected = 1.0 / (i + 1) as f32;
            let rel = (y - expected).abs() / expected;
            assert!(rel <= backend.refined_relative_error(), "rsqrt({x}) = {y}, rel {rel}");
        }
    }

    #[test]
    fn test_sum_of_squares_dispatch_matches_scalar() {
        let v: Vec<f32> = (0..37).map(|i| i as f32 * 0.25 - 3.0).collect();
        let expected = scalar::sum_of_squares(&v);
        let got = unsafe { get_sum_of_squares()(&v) };
        assert!((got - expected).abs() <= expected * 1e-5);
    }
}
