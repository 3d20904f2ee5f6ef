use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsqrt_engine::io::csv::write_rows;
use rsqrt_engine::io::matrix::FeatureMatrix;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Write random feature vectors as CSV", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 10_000)]
    rows: usize,

    #[arg(short, long, default_value_t = 128)]
    dim: usize,

    #[arg(short, long, default_value = "data.csv")]
    output: PathBuf,

    /// Values are drawn uniformly from [-scale, scale)
    #[arg(short, long, default_value_t = 1.0)]
    scale: f32,

    #[arg(long)]
    seed: Option<u64>,

    /// Write a single vector of `dim` values on one line
    #[arg(long)]
    flat: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.dim == 0 || args.scale <= 0.0 {
        eprintln!("Error: --dim and --scale must be positive");
        std::process::exit(1);
    }

    let rows = if args.flat { 1 } else { args.rows };
    println!("Generating {} vectors of dimension {}...", rows, args.dim);
    let start = Instant::now();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let data: Vec<f32> = (0..rows * args.dim).map(|_| rng.gen_range(-args.scale..args.scale)).collect();
    let matrix = FeatureMatrix::from_flat(args.dim, data);

    println!("Saving to {:?}...", args.output);
    write_rows(&args.output, &matrix)?;
    println!("Done in {:.2?}", start.elapsed());

    Ok(())
}
