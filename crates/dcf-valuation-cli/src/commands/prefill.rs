use clap::Args;
use serde_json::Value;

use dcf_valuation_core::valuation::prefill::prefill;

use crate::commands::value::ValueInput;
use crate::input;

/// Arguments for inspecting the prefilled input set
#[derive(Args)]
pub struct PrefillArgs {
    /// Path to a JSON file with { financial_data, wacc_inputs }
    #[arg(long)]
    pub input: Option<String>,

    /// Ticker symbol (defaults to the bundle's symbol)
    #[arg(long)]
    pub symbol: Option<String>,
}

pub fn run_prefill(args: PrefillArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bundle: ValueInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for prefill".into());
    };

    let symbol = args
        .symbol
        .unwrap_or_else(|| bundle.financial_data.symbol.clone());
    let (inputs, audit) = prefill(&symbol, &bundle.financial_data, &bundle.wacc_inputs);

    Ok(serde_json::json!({
        "dcf_inputs": inputs,
        "audit": audit,
    }))
}
