//! Times one strategy over a feature matrix and measures its error against
//! the exact reference.

use crate::config::BenchConfig;
use crate::core::hardware::CpuSummary;
use crate::core::normalize::{NormalizeMode, NormalizeOutcome, Normalizer};
use crate::core::strategy::{Strategy, StrategyKind};
use crate::io::matrix::FeatureMatrix;
use crate::io::usage::{ResourceSample, UsageDelta};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("histogram error: {0}")]
    Histogram(#[from] hdrhistogram::errors::CreationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("repeats must be at least 1")]
    ZeroRepeats,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencySummary {
    pub p50_ns: u64,
    pub p99_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
}

impl LatencySummary {
    fn from_histogram(hist: &Histogram<u64>) -> Self {
        Self {
            p50_ns: hist.value_at_quantile(0.50),
            p99_ns: hist.value_at_quantile(0.99),
            max_ns: hist.max(),
            mean_ns: hist.mean(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub strategy: StrategyKind,
    pub mode: NormalizeMode,
    /// Hardware family, for the SIMD strategy only.
    pub backend: Option<&'static str>,
    pub vectors: usize,
    pub dim: usize,
    pub repeats: usize,
    pub degenerate: usize,
    pub usage: UsageDelta,
    pub latency: LatencySummary,
    pub max_abs_error: f32,
    pub mean_abs_error: f64,
    /// Output elements that came out NaN or infinite.
    pub non_finite: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub runs: Vec<StrategyRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub cpu: CpuSummary,
    pub config: BenchConfig,
    pub files: Vec<FileReport>,
}

impl BenchReport {
    pub fn new(config: BenchConfig) -> Self {
        Self { cpu: CpuSummary::current(), config, files: Vec::new() }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), HarnessError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[derive(Default)]
pub struct Harness {
    normalizer: Normalizer,
}

impl Harness {
    pub fn new() -> Self {
        Self { normalizer: Normalizer::new() }
    }

    /// Normalize a copy of `matrix` `repeats` times with `strategy`.
    /// Returns the run summary and the output of the last pass.
    pub fn run(
        &self,
        matrix: &FeatureMatrix,
        strategy: &Strategy<'_>,
        mode: NormalizeMode,
        repeats: usize,
    ) -> Result<(StrategyRun, FeatureMatrix), HarnessError> {
        if repeats == 0 {
            return Err(HarnessError::ZeroRepeats);
        }

        let mut reference = matrix.clone();
        self.normalizer.normalize_rows(reference.as_mut_slice(), matrix.dim(), &Strategy::Exact, mode);

        // 3 significant digits, same as the latency histograms elsewhere
        let mut hist = Histogram::<u64>::new(3)?;
        let mut usage: Option<UsageDelta> = None;
        let mut degenerate = 0;
        let mut output = matrix.clone();

        for _ in 0..repeats {
            output = matrix.clone();
            degenerate = 0;

            let before = ResourceSample::capture();
            let start = Instant::now();
            for vector in output.iter_rows_mut() {
                let t = Instant::now();
                let outcome = self.normalizer.normalize(vector, strategy, mode);
                hist.saturating_record(t.elapsed().as_nanos() as u64);
                if outcome == NormalizeOutcome::Degenerate {
                    degenerate += 1;
                }
            }
            let elapsed = start.elapsed();
            let after = ResourceSample::capture();

            let mut delta = UsageDelta::between(&before, &after);
            delta.wall = elapsed;
            match usage.as_mut() {
                Some(total) => total.accumulate(&delta),
                None => usage = Some(delta),
            }
        }

        let (max_abs_error, mean_abs_error, non_finite) = compare(output.as_slice(), reference.as_slice());
        let backend = match strategy {
            Strategy::SimdApprox(simd) => Some(simd.backend().name()),
            _ => None,
        };

        let run = StrategyRun {
            strategy: strategy.kind(),
            mode,
            backend,
            vectors: matrix.rows(),
            dim: matrix.dim(),
            repeats,
            degenerate,
            usage: usage.ok_or(HarnessError::ZeroRepeats)?,
            latency: LatencySummary::from_histogram(&hist),
            max_abs_error,
            mean_abs_error,
            non_finite,
        };

        tracing::info!(
            strategy = run.strategy.name(),
            mode = mode.name(),
            vectors = run.vectors,
            wall = ?run.usage.wall,
            p50_ns = run.latency.p50_ns,
            max_abs_error = run.max_abs_error,
            "strategy run complete"
        );

        Ok((run, output))
    }
}

/// Max and mean absolute difference over finite outputs, plus the count of
/// non-finite ones.
fn compare(output: &[f32], reference: &[f32]) -> (f32, f64, usize) {
    let mut max = 0.0f32;
    let mut sum = 0.0f64;
    let mut finite = 0usize;
    let mut non_finite = 0usize;

    for (&got, &expected) in output.iter().zip(reference.iter()) {
        if !got.is_finite() {
            non_finite += 1;
            continue;
        }
        let diff = (got - expected).abs();
        max = max.max(diff);
        sum += diff as f64;
        finite += 1;
    }

    let mean = if finite == 0 { 0.0 } else { sum / finite as f64 };
    (max, mean, non_finite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bithack::BitHackNewton;
    use crate::core::lookup::LookupTable;
    use tempfile::NamedTempFile;

    fn sample_matrix() -> FeatureMatrix {
        FeatureMatrix::from_flat(2, vec![3.0, 4.0, 0.0, 0.0, 1.0, 2.0, 5.0, 5.0])
    }

    #[test]
    fn test_exact_run_has_no_error() {
        let harness = Harness::new();
        let (run, output) = harness.run(&sample_matrix(), &Strategy::Exact, NormalizeMode::L2, 3).unwrap();

        assert_eq!(run.vectors, 4);
        assert_eq!(run.dim, 2);
        assert_eq!(run.repeats, 3);
        assert_eq!(run.degenerate, 1);
        assert_eq!(run.max_abs_error, 0.0);
        assert_eq!(run.non_finite, 0);
        assert!(run.backend.is_none());
        assert!((output.row(0)[0] - 0.6).abs() < 1e-6);
        assert!((output.row(0)[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_bithack_error_is_small_but_nonzero() {
        let harness = Harness::new();
        let strategy = Strategy::BitHackNewton(BitHackNewton::new(1));
        let (run, _) = harness.run(&sample_matrix(), &strategy, NormalizeMode::L2, 1).unwrap();

        assert!(run.max_abs_error > 0.0);
        assert!(run.max_abs_error < 0.002);
    }

    #[test]
    fn test_lookup_run_reports_quantization_error() {
        let table = LookupTable::build(0.1, 100.0, 100).unwrap();
        let harness = Harness::new();
        let (run, _) = harness
            .run(&sample_matrix(), &Strategy::LookupTable(&table), NormalizeMode::L2, 1)
            .unwrap();

        assert!(run.max_abs_error > 0.0 && run.max_abs_error < 0.15);
        assert_eq!(run.strategy, StrategyKind::Lookup);
    }

    #[test]
    fn test_zero_repeats_rejected() {
        let harness = Harness::new();
        assert!(matches!(
            harness.run(&sample_matrix(), &Strategy::Exact, NormalizeMode::L2, 0),
            Err(HarnessError::ZeroRepeats)
        ));
    }

    #[test]
    fn test_report_json_export() -> Result<(), Box<dyn std::error::Error>> {
        let harness = Harness::new();
        let (run, _) = harness.run(&sample_matrix(), &Strategy::Exact, NormalizeMode::Elementwise, 1)?;
        let mut report = BenchReport::new(BenchConfig::default());
        report.files.push(FileReport { path: PathBuf::from("sample.csv"), runs: vec![run] });

        let temp_file = NamedTempFile::new()?;
        report.write_json(temp_file.path())?;

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(temp_file.path())?)?;
        assert_eq!(value["files"][0]["runs"][0]["strategy"], "exact");
        assert_eq!(value["files"][0]["runs"][0]["mode"], "elementwise");
        assert!(value["cpu"]["backend"].is_string());
        Ok(())
    }

    #[test]
    fn test_compare_skips_non_finite() {
        let (max, mean, non_finite) = compare(&[1.0, f32::NAN, 2.5], &[1.0, 1.0, 2.0]);
        assert_eq!(max, 0.5);
        assert_eq!(mean, 0.25);
        assert_eq!(non_finite, 1);
    }
}
