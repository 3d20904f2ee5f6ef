use clap::Parser;
use rsqrt_engine::config::BenchConfig;
use rsqrt_engine::core::runtime::RuntimeConfig;
use rsqrt_engine::harness::{BenchReport, FileReport, Harness, StrategyRun};
use rsqrt_engine::io::csv::{self as csv_io, CsvLayout};
use rsqrt_engine::io::matrix::FeatureMatrix;
use rsqrt_engine::{LookupTable, NormalizeMode, Strategy, StrategyKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_INPUT: &str = "data.csv";

#[derive(Parser, Debug)]
#[command(author, version, about = "Normalize CSV feature vectors with each inverse sqrt strategy and report resource usage", long_about = None)]
struct Args {
    /// CSV files to normalize (default: data.csv)
    files: Vec<PathBuf>,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    format: Option<CsvLayout>,

    /// Strategy to run (repeatable)
    #[arg(short, long = "strategy", value_enum)]
    strategies: Vec<StrategyKind>,

    #[arg(short, long, value_enum)]
    mode: Option<NormalizeMode>,

    #[arg(long)]
    table_min: Option<f32>,

    #[arg(long)]
    table_max: Option<f32>,

    #[arg(long)]
    table_size: Option<usize>,

    /// Newton-Raphson steps for the bit-hack strategy
    #[arg(short, long)]
    iterations: Option<u8>,

    /// Return the raw hardware rsqrt estimate
    #[arg(long)]
    no_refine: bool,

    #[arg(short, long)]
    repeats: Option<usize>,

    #[arg(long)]
    pin_core: Option<usize>,

    #[arg(long)]
    print_vectors: bool,

    /// Write a JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(BenchConfig, Option<PathBuf>), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if !self.files.is_empty() {
            config.files = self.files;
        }
        if config.files.is_empty() {
            config.files.push(PathBuf::from(DEFAULT_INPUT));
        }
        if let Some(layout) = self.format {
            config.layout = layout;
        }
        if !self.strategies.is_empty() {
            config.strategies = self.strategies;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(min) = self.table_min {
            config.table.min_value = min;
        }
        if let Some(max) = self.table_max {
            config.table.max_value = max;
        }
        if let Some(size) = self.table_size {
            config.table.size = size;
        }
        if let Some(iterations) = self.iterations {
            config.newton_iterations = iterations;
        }
        if self.no_refine {
            config.simd_refine = false;
        }
        if let Some(repeats) = self.repeats {
            config.repeats = repeats;
        }
        if self.pin_core.is_some() {
            config.pin_core = self.pin_core;
        }
        if self.print_vectors {
            config.print_vectors = true;
        }

        config.validate()?;
        Ok((config, self.report))
    }
}

fn print_vectors(matrix: &FeatureMatrix) {
    for row in matrix.iter_rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
        println!("{}", line.join(" "));
    }
}

fn print_run(run: &StrategyRun) {
    let backend = run.backend.map(|b| format!(" [{}]", b)).unwrap_or_default();
    println!("--- {} ({}){} ---", run.strategy.name(), run.mode.name(), backend);
    println!("Vectors: {} x {} (repeats {}, degenerate {})", run.vectors, run.dim, run.repeats, run.degenerate);
    println!("Wall time: {:.6} seconds", run.usage.wall.as_secs_f64());
    println!("User time: {:.6} seconds", run.usage.user_time.as_secs_f64());
    println!("System time: {:.6} seconds", run.usage.system_time.as_secs_f64());
    println!("Maximum resident set size: {} kilobytes", run.usage.max_rss_kb);
    println!(
        "Per-vector latency: p50 {} ns, p99 {} ns, max {} ns",
        run.latency.p50_ns, run.latency.p99_ns, run.latency.max_ns
    );
    println!("Error vs exact: max {:.3e}, mean {:.3e}", run.max_abs_error, run.mean_abs_error);
    if run.non_finite > 0 {
        println!("Non-finite outputs: {}", run.non_finite);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (config, report_path) = Args::parse().into_config()?;

    if let Some(core_id) = config.pin_core {
        RuntimeConfig::pin_thread(core_id);
    }

    let table = LookupTable::build(config.table.min_value, config.table.max_value, config.table.size)?;
    let strategies: Vec<Strategy> = config
        .strategies
        .iter()
        .map(|&kind| Strategy::from_kind(kind, &table, config.newton_iterations, config.simd_refine))
        .collect();

    let harness = Harness::new();
    let mut report = BenchReport::new(config.clone());
    println!("=== Inverse Sqrt Benchmark: backend={} ===", report.cpu.backend);

    for path in &config.files {
        let matrix = match csv_io::load(path, config.layout) {
            Ok(matrix) => matrix,
            Err(e) => {
                tracing::error!(?path, error = %e, "skipping file");
                continue;
            }
        };
        println!("\nFile {:?}: {} vectors, dim {}", path, matrix.rows(), matrix.dim());

        let mut runs = Vec::with_capacity(strategies.len());
        for strategy in &strategies {
            let (run, output) = harness.run(&matrix, strategy, config.mode, config.repeats)?;
            if config.print_vectors {
                println!("Normalized features ({}):", run.strategy.name());
                print_vectors(&output);
            }
            print_run(&run);
            runs.push(run);
        }
        report.files.push(FileReport { path: path.clone(), runs });
    }

    if let Some(path) = report_path {
        report.write_json(&path)?;
        println!("\nExported report to {:?}", path);
    }
    Ok(())
}
