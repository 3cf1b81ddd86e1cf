use clap::Args;
use serde_json::Value;

use dcf_valuation_core::valuation::market_implied::calculate_market_implied;
use dcf_valuation_core::valuation::prefill::prefill;

use crate::commands::value::ValueInput;
use crate::input;

/// Arguments for the reverse-DCF pass
#[derive(Args)]
pub struct ReverseDcfArgs {
    /// Path to a JSON file with { financial_data, wacc_inputs }
    #[arg(long)]
    pub input: Option<String>,

    /// Discount rate to invert against (defaults to the prefilled WACC)
    #[arg(long)]
    pub wacc: Option<f64>,
}

pub fn run_reverse_dcf(args: ReverseDcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bundle: ValueInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for reverse DCF".into());
    };

    let (inputs, _) = prefill(
        &bundle.financial_data.symbol,
        &bundle.financial_data,
        &bundle.wacc_inputs,
    );
    let wacc = args.wacc.unwrap_or(inputs.wacc);
    let implied = calculate_market_implied(&bundle.financial_data, wacc, &inputs);

    Ok(serde_json::to_value(implied)?)
}
