use clap::Args;
use serde_json::Value;

use dcf_valuation_core::benchmarks::{industry_benchmark, industry_thresholds};

/// Arguments for an industry benchmark lookup
#[derive(Args)]
pub struct BenchmarkArgs {
    /// Industry string, e.g. "Software—Application"
    #[arg(long, default_value = "")]
    pub industry: String,

    /// Sector fallback, e.g. "Technology"
    #[arg(long, default_value = "")]
    pub sector: String,
}

pub fn run_benchmark(args: BenchmarkArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let benchmark = industry_benchmark(&args.industry, &args.sector);
    let thresholds = industry_thresholds(&benchmark);

    Ok(serde_json::json!({
        "benchmark": benchmark,
        "thresholds": thresholds,
    }))
}
