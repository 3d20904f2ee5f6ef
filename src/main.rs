use rsqrt_engine::core::bithack::BitHackNewton;
use rsqrt_engine::{LookupTable, NormalizeMode, Normalizer, SimdApprox, Strategy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Inverse Sqrt Demo ===");

    // 1. Build the lookup table once
    println!("\n[1] Building lookup table over [0.1, 100.0], 100 samples...");
    let table = LookupTable::build(0.1, 100.0, 100)?;
    println!("    step = {:.5}", table.step());

    // 2. Strategies
    let simd = SimdApprox::new(true);
    let strategies = [
        Strategy::Exact,
        Strategy::LookupTable(&table),
        Strategy::BitHackNewton(BitHackNewton::default()),
        Strategy::SimdApprox(simd),
    ];
    println!("\n[2] SIMD backend: {} ({} lanes)", simd.backend().name(), simd.backend().lanes());

    // 3. Estimate 1/sqrt(25)
    println!("\n[3] estimate(25.0), exact = 0.2");
    for strategy in &strategies {
        let y = strategy.estimate(25.0);
        println!("    - {:<8} {:.7} (rel err {:.2e})", strategy.kind().name(), y, (y - 0.2).abs() / 0.2);
    }

    // 4. Normalize [3, 4] in both modes
    let normalizer = Normalizer::new();
    for mode in [NormalizeMode::L2, NormalizeMode::Elementwise] {
        println!("\n[4] normalize [3.0, 4.0], mode = {}", mode.name());
        for strategy in &strategies {
            let mut v = [3.0f32, 4.0];
            normalizer.normalize(&mut v, strategy, mode);
            println!("    - {:<8} {:?}", strategy.kind().name(), v);
        }
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
