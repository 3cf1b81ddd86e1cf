//! Request-level glue: prefill, overrides, the three terminal-method
//! pipelines, and the Layer C validation pass.

pub mod overrides;
pub mod response;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::monte_carlo::params::{create_default_params, MonteCarloParams};
use crate::monte_carlo::simulation::run_monte_carlo;
use crate::types::{FinancialData, WaccInputs};
use crate::valuation::dcf::{calculate_dcf, DcfInputs, TerminalMethod};
use crate::valuation::market_implied::calculate_market_implied;
use crate::valuation::prefill::prefill;
use crate::valuation::structural::run_structural_check;
use crate::ValuationResult;

use overrides::{
    apply_dcf_overrides, merge_monte_carlo_overrides, take_iterations_override,
    ValuationOverrides,
};
use response::{
    AgentValuationResponse, EffectiveInputs, MethodResult, MethodResults, MonteCarloByMethod,
    ResponseMeta, ValidationSection, API_VERSION,
};

/// Minimum spread the terminal growth rate must keep below the WACC.
const MIN_WACC_SPREAD: f64 = 0.005;

/// One valuation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub symbol: String,
    pub financial_data: FinancialData,
    pub wacc_inputs: WaccInputs,
    #[serde(default)]
    pub overrides: Option<ValuationOverrides>,
    #[serde(default)]
    pub include_distribution: bool,
    pub request_id: String,
}

/// Run a full valuation: prefill, apply overrides, evaluate all three
/// terminal methods with their structural checks and Monte Carlo runs, and
/// validate against the market price.
///
/// Numerically degenerate inputs never fail the request; the only fatal
/// condition is a structurally invalid override.
pub fn run_valuation(request: &ValuationRequest) -> ValuationResult<AgentValuationResponse> {
    let data = &request.financial_data;

    // 1. Prefill from the statement bundle
    let (mut inputs, audit) = prefill(&request.symbol, data, &request.wacc_inputs);
    let mut warnings = audit.warnings.clone();

    // 2. Caller overrides
    let mut mc_patch: Option<Value> = None;
    if let Some(overrides) = &request.overrides {
        if let Some(dcf_overrides) = &overrides.dcf {
            apply_dcf_overrides(&mut inputs, dcf_overrides, &mut warnings)?;
        }
        mc_patch = overrides.monte_carlo.clone();
    }

    // 3. Sanity clamps, with or without overrides
    apply_sanity_clamps(&mut inputs, &mut warnings);

    // The iterations clamp applies once per request, not once per method
    let iterations_override = mc_patch
        .as_mut()
        .and_then(|patch| take_iterations_override(patch, &mut warnings));

    // 4. The three terminal-method pipelines
    let run_method = |method: TerminalMethod| -> ValuationResult<(MethodResult, MonteCarloParams)> {
        let mut method_inputs = inputs.clone();
        method_inputs.terminal_method = method;

        let dcf = calculate_dcf(&method_inputs, data);
        let layer_b = run_structural_check(&method_inputs, &dcf, data);

        let mut params = create_default_params(&method_inputs, Some(data));
        if let Some(iterations) = iterations_override {
            params.iterations = iterations;
        }
        if let Some(patch) = &mc_patch {
            params = merge_monte_carlo_overrides(&params, patch)?;
        }

        let mut monte_carlo = run_monte_carlo(&params, &method_inputs, data);
        if !request.include_distribution {
            monte_carlo.value_distribution = Vec::new();
        }

        Ok((
            MethodResult {
                dcf,
                layer_b,
                monte_carlo,
            },
            params,
        ))
    };

    let (perpetuity_result, perpetuity_params) = run_method(TerminalMethod::Perpetuity)?;
    let (roic_result, roic_params) = run_method(TerminalMethod::RoicDriven)?;
    let (fade_result, fade_params) = run_method(TerminalMethod::Fade)?;

    // 5. Layer C once, with the effective discount rate
    let layer_c = calculate_market_implied(data, inputs.wacc, &inputs);

    Ok(AgentValuationResponse {
        meta: ResponseMeta {
            request_id: request.request_id.clone(),
            symbol: request.symbol.clone(),
            company_name: data.company_name.clone(),
            generated_at: Utc::now().to_rfc3339(),
            api_version: API_VERSION.to_string(),
            core_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        effective_inputs: EffectiveInputs {
            dcf_inputs: inputs,
            monte_carlo_by_method: MonteCarloByMethod {
                perpetuity: perpetuity_params,
                roic_driven: roic_params,
                fade: fade_params,
            },
        },
        results: MethodResults {
            perpetuity: perpetuity_result,
            roic_driven: roic_result,
            fade: fade_result,
        },
        validation: ValidationSection { layer_c },
        warnings,
    })
}

/// Keep the terminal assumptions inside the model's admissible region.
/// The fade pipeline always runs, so its start-growth floor is enforced for
/// every request, not only when fade is the selected base method.
fn apply_sanity_clamps(inputs: &mut DcfInputs, warnings: &mut Vec<String>) {
    if inputs.terminal_growth_rate >= inputs.wacc {
        let adjusted = inputs.wacc - MIN_WACC_SPREAD;
        warnings.push(format!(
            "Terminal growth of {} is not below the WACC of {}; adjusted to {adjusted}",
            inputs.terminal_growth_rate, inputs.wacc
        ));
        inputs.terminal_growth_rate = adjusted;
    }
    if inputs.fade_start_growth < inputs.terminal_growth_rate {
        warnings.push(format!(
            "Fade start growth of {} is below the terminal growth of {}; raised to match",
            inputs.fade_start_growth, inputs.terminal_growth_rate
        ));
        inputs.fade_start_growth = inputs.terminal_growth_rate;
    }
}
