use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use dcf_valuation_core::orchestrator::overrides::ValuationOverrides;
use dcf_valuation_core::orchestrator::{run_valuation, ValuationRequest};
use dcf_valuation_core::types::{FinancialData, WaccInputs};

use crate::input;

/// The statement bundle plus market rates a valuation request consumes.
#[derive(Deserialize)]
pub struct ValueInput {
    pub financial_data: FinancialData,
    pub wacc_inputs: WaccInputs,
}

/// Arguments for a full three-method valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to a JSON file with { financial_data, wacc_inputs }
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON file with { dcf, monte_carlo } overrides
    #[arg(long)]
    pub overrides: Option<String>,

    /// Carry the full Monte Carlo sample vector in the response
    #[arg(long)]
    pub include_distribution: bool,

    /// Request identifier echoed in the response meta
    #[arg(long, default_value = "cli")]
    pub request_id: String,

    /// Ticker symbol (defaults to the bundle's symbol)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Monte Carlo iterations per terminal method
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Seed for reproducible Monte Carlo runs
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bundle: ValueInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for a valuation".into());
    };

    let mut overrides: Option<ValuationOverrides> = match args.overrides {
        Some(ref path) => Some(input::file::read_json(path)?),
        None => None,
    };

    // --iterations and --seed are conveniences layered on the override tree
    if args.iterations.is_some() || args.seed.is_some() {
        let overrides = overrides.get_or_insert_with(ValuationOverrides::default);
        let patch = overrides
            .monte_carlo
            .get_or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = patch {
            if let Some(iterations) = args.iterations {
                map.insert("iterations".into(), iterations.into());
            }
            if let Some(seed) = args.seed {
                map.insert("seed".into(), seed.into());
            }
        }
    }

    let symbol = args
        .symbol
        .unwrap_or_else(|| bundle.financial_data.symbol.clone());

    let request = ValuationRequest {
        symbol,
        financial_data: bundle.financial_data,
        wacc_inputs: bundle.wacc_inputs,
        overrides,
        include_distribution: args.include_distribution,
        request_id: args.request_id,
    };

    let response = run_valuation(&request)?;
    Ok(serde_json::to_value(response)?)
}
