//! Inverse square root strategies for L2 feature normalization.
//!
//! Three interchangeable approximations of `1/sqrt(x)` (lookup table,
//! bit-hack Newton-Raphson, SIMD hardware rsqrt) plus an exact reference,
//! a normalizer that applies them to feature vectors, and the CSV/timing
//! plumbing used by the benchmark binaries.

pub mod config;
pub mod core;
pub mod harness;
pub mod io;
pub mod simd;

pub use crate::core::lookup::{LookupError, LookupTable};
pub use crate::core::normalize::{NormalizeMode, NormalizeOutcome, Normalizer};
pub use crate::core::strategy::{SimdApprox, Strategy, StrategyKind};
