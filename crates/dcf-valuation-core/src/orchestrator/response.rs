use serde::{Deserialize, Serialize};

use crate::monte_carlo::params::MonteCarloParams;
use crate::monte_carlo::simulation::MonteCarloResult;
use crate::valuation::dcf::{DcfInputs, DcfResult};
use crate::valuation::market_implied::MarketImplied;
use crate::valuation::structural::StructuralCheck;

pub const API_VERSION: &str = "1";

/// Request-level identity and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub symbol: String,
    pub company_name: String,
    /// ISO-8601 UTC timestamp.
    pub generated_at: String,
    pub api_version: String,
    pub core_version: String,
}

/// One terminal method's full result triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    pub dcf: DcfResult,
    pub layer_b: StructuralCheck,
    pub monte_carlo: MonteCarloResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResults {
    pub perpetuity: MethodResult,
    pub roic_driven: MethodResult,
    pub fade: MethodResult,
}

/// The Monte Carlo parameter tree actually used for each method, after
/// defaults, analyst dispersion and caller overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloByMethod {
    pub perpetuity: MonteCarloParams,
    pub roic_driven: MonteCarloParams,
    pub fade: MonteCarloParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveInputs {
    pub dcf_inputs: DcfInputs,
    pub monte_carlo_by_method: MonteCarloByMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    pub layer_c: MarketImplied,
}

/// The full valuation report for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentValuationResponse {
    pub meta: ResponseMeta,
    pub effective_inputs: EffectiveInputs,
    pub results: MethodResults,
    pub validation: ValidationSection,
    pub warnings: Vec<String>,
}
