//! The closed set of inverse square root strategies, selected at call time.

use crate::core::bithack::BitHackNewton;
use crate::core::lift_subnormal;
use crate::core::lookup::LookupTable;
use crate::simd::{Backend, RsqrtBatchFunc, LANE_WIDTH};
use serde::{Deserialize, Serialize};

// Widest backend (AVX) lane count, sizes the tail scratch batch.
const MAX_LANES: usize = 8;

/// Name-only tag of a strategy, used by config files and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Exact,
    Lookup,
    Bithack,
    Simd,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] =
        [StrategyKind::Exact, StrategyKind::Lookup, StrategyKind::Bithack, StrategyKind::Simd];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Exact => "exact",
            StrategyKind::Lookup => "lookup",
            StrategyKind::Bithack => "bithack",
            StrategyKind::Simd => "simd",
        }
    }
}

/// Hardware reciprocal square root over batches of lanes.
#[derive(Clone, Copy)]
pub struct SimdApprox {
    backend: Backend,
    kernel: RsqrtBatchFunc,
    refine: bool,
}

impl std::fmt::Debug for SimdApprox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimdApprox")
            .field("backend", &self.backend)
            .field("refine", &self.refine)
            .finish()
    }
}

impl SimdApprox {
    /// Uses the best backend the running CPU supports.
    pub fn new(refine: bool) -> Self {
        let backend = Backend::detect();
        tracing::debug!(backend = backend.name(), lanes = backend.lanes(), refine, "selected rsqrt backend");
        Self::with_backend(backend, refine)
    }

    /// Exact per-lane fallback, identical on every target.
    pub fn portable(refine: bool) -> Self {
        Self::with_backend(Backend::Scalar, refine)
    }

    fn with_backend(backend: Backend, refine: bool) -> Self {
        Self { backend, kernel: backend.rsqrt_batch(), refine }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn refine(&self) -> bool {
        self.refine
    }

    /// Fixed-width batch: one SSE register worth of magnitudes.
    pub fn estimate_batch(&self, lanes: [f32; LANE_WIDTH]) -> [f32; LANE_WIDTH] {
        let mut out = [0.0; LANE_WIDTH];
        self.estimate_slice(&lanes, &mut out);
        out
    }

    /// Broadcasts `x` into one batch and reads lane 0.
    pub fn estimate(&self, x: f32) -> f32 {
        self.estimate_batch([x; LANE_WIDTH])[0]
    }

    /// Whole batches go straight to the kernel. A trailing partial batch is
    /// padded with 1.0, run through the same kernel, and only its valid lanes
    /// are copied back, so no element is skipped.
    ///
    /// The hardware flushes subnormal inputs to zero, so when any are present
    /// every batch goes through [`Self::run_batch`], which lifts them first.
    pub fn estimate_slice(&self, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), output.len());
        let lanes = self.backend.lanes();

        if input.iter().any(|&x| x > 0.0 && x < f32::MIN_POSITIVE) {
            for (batch_in, batch_out) in input.chunks(lanes).zip(output.chunks_mut(lanes)) {
                self.run_batch(batch_in, batch_out);
            }
            return;
        }

        let whole = input.len() - input.len() % lanes;

        // The backend was chosen by runtime feature detection.
        unsafe { (self.kernel)(&input[..whole], &mut output[..whole], self.refine) };

        if whole < input.len() {
            self.run_batch(&input[whole..], &mut output[whole..]);
        }
    }

    /// At most one batch of lanes through a padded scratch register.
    fn run_batch(&self, input: &[f32], output: &mut [f32]) {
        let lanes = self.backend.lanes();
        let mut padded_in = [1.0f32; MAX_LANES];
        let mut rescale = [1.0f32; MAX_LANES];
        let mut padded_out = [0.0f32; MAX_LANES];

        for (i, &x) in input.iter().enumerate() {
            (padded_in[i], rescale[i]) = lift_subnormal(x);
        }
        unsafe { (self.kernel)(&padded_in[..lanes], &mut padded_out[..lanes], self.refine) };
        for (i, y) in output.iter_mut().enumerate() {
            *y = padded_out[i] * rescale[i];
        }
    }
}

/// One inverse square root strategy. The lookup variant borrows a table built
/// once up front.
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'t> {
    /// Platform `1 / sqrt(x)`; the accuracy reference.
    Exact,
    LookupTable(&'t LookupTable),
    BitHackNewton(BitHackNewton),
    SimdApprox(SimdApprox),
}

impl<'t> Strategy<'t> {
    pub fn from_kind(kind: StrategyKind, table: &'t LookupTable, iterations: u8, simd_refine: bool) -> Self {
        match kind {
            StrategyKind::Exact => Strategy::Exact,
            StrategyKind::Lookup => Strategy::LookupTable(table),
            StrategyKind::Bithack => Strategy::BitHackNewton(BitHackNewton::new(iterations)),
            StrategyKind::Simd => Strategy::SimdApprox(SimdApprox::new(simd_refine)),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Exact => StrategyKind::Exact,
            Strategy::LookupTable(_) => StrategyKind::Lookup,
            Strategy::BitHackNewton(_) => StrategyKind::Bithack,
            Strategy::SimdApprox(_) => StrategyKind::Simd,
        }
    }

    #[inline]
    pub fn estimate(&self, x: f32) -> f32 {
        match self {
            Strategy::Exact => 1.0 / x.sqrt(),
            Strategy::LookupTable(table) => table.estimate(x),
            Strategy::BitHackNewton(bithack) => bithack.estimate(x),
            Strategy::SimdApprox(simd) => simd.estimate(x),
        }
    }

    /// Elementwise estimates of `input` into `output`.
    pub fn estimate_slice(&self, input: &[f32], output: &mut [f32]) {
        match self {
            Strategy::SimdApprox(simd) => simd.estimate_slice(input, output),
            _ => {
                assert_eq!(input.len(), output.len());
                for (x, y) in input.iter().zip(output.iter_mut()) {
                    *y = self.estimate(*x);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_error(got: f32, x: f32) -> f32 {
        let expected = 1.0 / x.sqrt();
        (got - expected).abs() / expected
    }

    #[test]
    fn test_simd_estimate_batch_within_backend_bounds() {
        let raw = SimdApprox::new(false);
        let refined = SimdApprox::new(true);
        let lanes = [1e-3f32, 1.0, 1e3, 1e6];

        let raw_out = raw.estimate_batch(lanes);
        let refined_out = refined.estimate_batch(lanes);

        for i in 0..LANE_WIDTH {
            assert!(relative_error(raw_out[i], lanes[i]) <= raw.backend().raw_relative_error());
            assert!(relative_error(refined_out[i], lanes[i]) <= refined.backend().refined_relative_error());
        }
    }

    #[test]
    fn test_simd_slice_covers_trailing_partial_batch() {
        let simd = SimdApprox::new(true);
        // 11 is not a multiple of 4 or 8
        let input: Vec<f32> = (1..=11).map(|i| (i * i) as f32).collect();
        let mut output = vec![f32::NAN; input.len()];

        simd.estimate_slice(&input, &mut output);

        for (i, &y) in output.iter().enumerate() {
            let expected = 1.0 / (i + 1) as f32;
            assert!(
                (y - expected).abs() / expected <= simd.backend().refined_relative_error(),
                "element {i} = {y}"
            );
        }
    }

    #[test]
    fn test_simd_subnormal_lanes_stay_finite() {
        let tiny = f32::from_bits(1);
        for simd in [SimdApprox::new(true), SimdApprox::new(false), SimdApprox::portable(true)] {
            let bound = if simd.refine() {
                simd.backend().refined_relative_error()
            } else {
                simd.backend().raw_relative_error()
            };

            // 11 elements: whole batches plus a tail, all through the lifted path
            let input = [1e-40f32, 4.0, tiny, 1e-39, 25.0, 3e-42, 1.0, 9.0, 1e-45, 100.0, 1e-40];
            let mut output = [0.0f32; 11];
            simd.estimate_slice(&input, &mut output);

            for (&x, &y) in input.iter().zip(output.iter()) {
                let expected = 1.0 / (x as f64).sqrt();
                assert!(y.is_finite() && y > 0.0, "{:?} rsqrt({x:e}) = {y}", simd.backend());
                let rel = ((y as f64 - expected) / expected).abs();
                assert!(rel <= bound as f64, "{:?} rsqrt({x:e}) = {y}, rel {rel}", simd.backend());
            }

            let single = simd.estimate(1e-40);
            assert!(((single as f64) * 1e-20 - 1.0).abs() < bound as f64 + 1e-4, "estimate(1e-40) = {single}");
        }
    }

    #[test]
    fn test_simd_scalar_estimate_matches_batch_lane() {
        let simd = SimdApprox::new(false);
        assert_eq!(simd.estimate(25.0), simd.estimate_batch([25.0; LANE_WIDTH])[0]);
    }

    #[test]
    fn test_portable_backend_is_exact() {
        let simd = SimdApprox::portable(true);
        assert_eq!(simd.backend(), Backend::Scalar);
        assert_eq!(simd.estimate(25.0), 0.2);
    }

    #[test]
    fn test_every_strategy_estimates_25() {
        let table = LookupTable::build(0.1, 100.0, 100).unwrap();
        for kind in StrategyKind::ALL {
            let strategy = Strategy::from_kind(kind, &table, 1, true);
            assert_eq!(strategy.kind(), kind);
            let got = strategy.estimate(25.0);
            assert!((got - 0.2).abs() < 0.005, "{} estimate(25) = {got}", kind.name());
        }
    }

    #[test]
    fn test_estimate_slice_matches_scalar_for_non_simd() {
        let table = LookupTable::build(0.1, 100.0, 100).unwrap();
        let input = [0.5f32, 3.0, 42.0, 99.0, 150.0];
        for strategy in [Strategy::Exact, Strategy::LookupTable(&table), Strategy::BitHackNewton(BitHackNewton::new(2))] {
            let mut output = [0.0f32; 5];
            strategy.estimate_slice(&input, &mut output);
            for (x, y) in input.iter().zip(output.iter()) {
                assert_eq!(*y, strategy.estimate(*x));
            }
        }
    }

    #[test]
    fn test_strategy_kind_serde_names() {
        let json = serde_json::to_string(&StrategyKind::Bithack).unwrap();
        assert_eq!(json, "\"bithack\"");
        let kind: StrategyKind = serde_json::from_str("\"simd\"").unwrap();
        assert_eq!(kind, StrategyKind::Simd);
    }
}
