use serde::{Deserialize, Serialize};

use crate::benchmarks::{industry_benchmark, industry_thresholds};
use crate::numeric::clamp;
use crate::types::FinancialData;

use super::dcf::DcfInputs;

/// Flags raised when the market-implied assumptions look unattainable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feasibility {
    pub margin_exceeds_industry_max: bool,
    pub roic_exceeds_historical_max: bool,
    pub growth_exceeds_historical_frequency: bool,
}

/// Layer C: the long-run assumptions the current market price implies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketImplied {
    pub implied_growth_rate: f64,
    pub implied_steady_state_margin: f64,
    pub implied_roic: f64,
    /// Higher PE implies a slower fade (lower speed).
    pub implied_fade_speed: f64,
    pub feasibility: Feasibility,
    /// How often companies have historically delivered what the price
    /// demands; a score from 1 (almost never) to 50 (routine).
    pub historical_frequency: f64,
}

/// Reverse-solve Gordon growth and its companions from the market price.
pub fn calculate_market_implied(
    data: &FinancialData,
    wacc: f64,
    inputs: &DcfInputs,
) -> MarketImplied {
    let market_cap = data.current_price * data.shares_outstanding;
    let ev = market_cap - data.net_cash;

    let benchmark = industry_benchmark(&data.industry, &data.sector);
    let thresholds = industry_thresholds(&benchmark);

    // Gordon inversion with TTM FCF as the numerator:
    // EV = FCF * (1+g) / (wacc - g)  =>  g = (EV*wacc - FCF) / (EV + FCF)
    let implied_growth_rate = if data.ttm_fcf > 0.0 && ev > 0.0 {
        clamp((ev * wacc - data.ttm_fcf) / (ev + data.ttm_fcf), -0.10, 0.30)
    } else {
        0.0
    };

    let current_op_margin = if data.ttm_revenue != 0.0 {
        data.ttm_operating_income / data.ttm_revenue
    } else {
        0.0
    };

    // Steady-state margin scaled by required versus delivered FCF yield
    let fcf_yield = if data.ttm_fcf > 0.0 && ev > 0.0 {
        data.ttm_fcf / ev
    } else {
        0.0
    };
    let required_fcf_yield = (wacc - implied_growth_rate).max(0.0);
    let multiple = if required_fcf_yield > 0.0 && fcf_yield > 0.0 {
        required_fcf_yield / fcf_yield
    } else {
        1.0
    };
    let implied_steady_state_margin = current_op_margin * multiple;

    let reinvestment = reinvestment_rate(inputs);
    let implied_roic = if implied_growth_rate > 0.0 && reinvestment > 0.0 {
        implied_growth_rate / reinvestment
    } else {
        current_op_margin * 0.8 * 2.0
    };

    let implied_fade_speed = if data.pe > 0.0 {
        clamp(20.0 / data.pe, 0.1, 1.0)
    } else {
        1.0
    };

    let feasibility = Feasibility {
        margin_exceeds_industry_max: implied_steady_state_margin > thresholds.margin_error,
        roic_exceeds_historical_max: implied_roic > thresholds.roic_error,
        growth_exceeds_historical_frequency: implied_growth_rate > 0.15,
    };

    let mut score: f64 = 50.0;
    if implied_growth_rate > 0.20 {
        score -= 30.0;
    } else if implied_growth_rate > 0.15 {
        score -= 20.0;
    } else if implied_growth_rate > 0.10 {
        score -= 10.0;
    }
    if implied_roic > thresholds.roic_error {
        score -= 25.0;
    } else if implied_roic > thresholds.roic_warning {
        score -= 15.0;
    } else if implied_roic > 1.2 * benchmark.after_tax_roic {
        score -= 5.0;
    }
    if implied_steady_state_margin > thresholds.margin_error {
        score -= 20.0;
    } else if implied_steady_state_margin > thresholds.margin_warning {
        score -= 10.0;
    } else if implied_steady_state_margin > 1.2 * benchmark.operating_margin {
        score -= 5.0;
    }

    MarketImplied {
        implied_growth_rate,
        implied_steady_state_margin,
        implied_roic,
        implied_fade_speed,
        feasibility,
        historical_frequency: score.max(1.0),
    }
}

/// Reinvestment rate implied by the input drivers.
///
/// Chain: the last explicit-year driver first; when that is non-finite or
/// non-positive, the same terms averaged across all drivers; when that still
/// fails, the 0.4 literal. The chain is material to the implied ROIC.
fn reinvestment_rate(inputs: &DcfInputs) -> f64 {
    if let Some(last) = inputs.drivers.last() {
        let rate = (last.capex_percent - last.da_percent + last.wc_change_percent)
            / (last.operating_margin * (1.0 - last.tax_rate));
        if rate.is_finite() && rate > 0.0 {
            return rate;
        }

        let n = inputs.drivers.len() as f64;
        let avg_capex: f64 = inputs.drivers.iter().map(|d| d.capex_percent).sum::<f64>() / n;
        let avg_da: f64 = inputs.drivers.iter().map(|d| d.da_percent).sum::<f64>() / n;
        let avg_wc: f64 = inputs.drivers.iter().map(|d| d.wc_change_percent).sum::<f64>() / n;
        let avg_margin: f64 = inputs.drivers.iter().map(|d| d.operating_margin).sum::<f64>() / n;
        let avg_tax: f64 = inputs.drivers.iter().map(|d| d.tax_rate).sum::<f64>() / n;
        let avg_rate = (avg_capex - avg_da + avg_wc) / (avg_margin * (1.0 - avg_tax));
        if avg_rate.is_finite() && avg_rate > 0.0 {
            return avg_rate;
        }
    }
    0.4
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
