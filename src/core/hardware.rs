//! Hardware Detection Module
//! Queries CPU features at runtime.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuFeatures: u32 {
        const SSE     = 1 << 0;
        const AVX     = 1 << 1;
        const AVX2    = 1 << 2;
        const FMA     = 1 << 3;
        const AVX512F = 1 << 4;
        const NEON    = 1 << 5;
    }
}

impl CpuFeatures {
    pub fn detect() -> Self {
        let mut features = CpuFeatures::empty();

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if is_x86_feature_detected!("sse") {
                features |= CpuFeatures::SSE;
            }
            if is_x86_feature_detected!("avx") {
                features |= CpuFeatures::AVX;
            }
            if is_x86_feature_detected!("avx2") {
                features |= CpuFeatures::AVX2;
            }
            if is_x86_feature_detected!("fma") {
                features |= CpuFeatures::FMA;
            }
            if is_x86_feature_detected!("avx512f") {
                features |= CpuFeatures::AVX512F;
            }
        }

        // NEON is mandatory on aarch64.
        #[cfg(target_arch = "aarch64")]
        {
            features |= CpuFeatures::NEON;
        }

        features
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Serializable snapshot of the host, embedded in run reports.
#[derive(Debug, Clone, Serialize)]
pub struct CpuSummary {
    pub arch: &'static str,
    pub features: Vec<&'static str>,
    pub backend: &'static str,
}

impl CpuSummary {
    pub fn current() -> Self {
        let features = CpuFeatures::detect();
        Self {
            arch: std::env::consts::ARCH,
            features: features.names(),
            backend: crate::simd::Backend::select(features).name(),
        }
    }
}
