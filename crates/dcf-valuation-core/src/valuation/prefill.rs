use serde::{Deserialize, Serialize};

use crate::numeric::clamp;
use crate::types::{FinancialData, Rate, WaccInputs};

use super::dcf::{DcfInputs, TerminalMethod, ValueDrivers};

/// Number of explicit forecast years produced by the prefill engine.
const DEFAULT_EXPLICIT_YEARS: usize = 5;
/// Long-run nominal growth anchor for the terminal assumptions.
const DEFAULT_TERMINAL_GROWTH: Rate = 0.025;
const DEFAULT_FADE_YEARS: u32 = 10;
/// Used when the bundle carries no usable historical ROIC.
const DEFAULT_STEADY_STATE_ROIC: Rate = 0.15;
const WACC_FALLBACK: Rate = 0.10;

/// Decomposition of the WACC build-up plus any data-quality warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefillAudit {
    pub cost_of_equity: Rate,
    pub cost_of_debt: Rate,
    pub equity_weight: f64,
    pub debt_weight: f64,
    pub effective_tax_rate: Rate,
    pub calculated_wacc: Rate,
    pub final_wacc: Rate,
    pub warnings: Vec<String>,
}

/// Turn a raw statement bundle into a complete DCF input set.
///
/// Deterministic and non-raising: missing or degenerate inputs fall back to
/// conservative defaults and surface as audit warnings.
pub fn prefill(
    symbol: &str,
    data: &FinancialData,
    wacc_inputs: &WaccInputs,
) -> (DcfInputs, PrefillAudit) {
    let mut warnings = Vec::new();

    // --- WACC build-up ---
    let cost_of_equity = wacc_inputs.risk_free_rate + data.beta * wacc_inputs.market_risk_premium;
    let cost_of_debt = implied_cost_of_debt(data);

    let total_capital = data.market_cap + data.total_debt;
    let equity_weight = if total_capital > 0.0 {
        data.market_cap / total_capital
    } else {
        0.8
    };
    let debt_weight = 1.0 - equity_weight;

    let effective_tax_rate = if data.effective_tax_rate.is_finite() {
        data.effective_tax_rate
    } else {
        0.21
    };

    let calculated_wacc = equity_weight * cost_of_equity
        + debt_weight * cost_of_debt * (1.0 - effective_tax_rate);
    let final_wacc = if calculated_wacc.is_finite() {
        clamp(calculated_wacc, 0.06, 0.15)
    } else {
        warnings.push(format!(
            "WACC could not be computed from the input bundle; falling back to {WACC_FALLBACK}"
        ));
        WACC_FALLBACK
    };

    // --- Anchors ---
    let base_revenue = if data.latest_annual_revenue > 0.0 {
        data.latest_annual_revenue
    } else {
        data.ttm_revenue
    };
    let base_net_income = if data.latest_annual_net_income > 0.0 {
        data.latest_annual_net_income
    } else {
        data.ttm_net_income
    };

    // --- Drivers ---
    let mut drivers = default_drivers(data, effective_tax_rate);
    apply_analyst_growth_path(&mut drivers, data, base_revenue);

    let fade_start_growth = drivers[DEFAULT_EXPLICIT_YEARS - 1].revenue_growth;
    let steady_state_roic =
        if data.historical_roic.is_finite() && data.historical_roic > 0.0 {
            data.historical_roic
        } else {
            warnings.push(format!(
                "Historical ROIC unavailable; terminal assumptions anchored at {DEFAULT_STEADY_STATE_ROIC}"
            ));
            DEFAULT_STEADY_STATE_ROIC
        };

    let inputs = DcfInputs {
        symbol: symbol.to_string(),
        explicit_period_years: DEFAULT_EXPLICIT_YEARS,
        drivers,
        terminal_method: TerminalMethod::Perpetuity,
        terminal_growth_rate: DEFAULT_TERMINAL_GROWTH,
        steady_state_roic,
        fade_years: DEFAULT_FADE_YEARS,
        fade_start_growth,
        fade_start_roic: steady_state_roic,
        wacc: final_wacc,
        base_revenue,
        base_net_income,
    };

    let audit = PrefillAudit {
        cost_of_equity,
        cost_of_debt,
        equity_weight,
        debt_weight,
        effective_tax_rate,
        calculated_wacc,
        final_wacc,
        warnings,
    };

    (inputs, audit)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Cost of debt from interest expense over total debt, banded to keep a bad
/// quarter of statement data from distorting the discount rate.
fn implied_cost_of_debt(data: &FinancialData) -> Rate {
    if data.total_debt <= 0.0 || data.interest_expense < 0.0 {
        return 0.06;
    }
    let rate = data.interest_expense / data.total_debt;
    if rate < 0.02 {
        0.04
    } else if rate > 0.15 {
        0.10
    } else {
        rate
    }
}

fn default_drivers(data: &FinancialData, effective_tax_rate: Rate) -> Vec<ValueDrivers> {
    let mut template = ValueDrivers {
        revenue_growth: 0.10,
        gross_margin: 0.40,
        operating_margin: 0.20,
        tax_rate: 0.21,
        da_percent: 0.03,
        capex_percent: 0.04,
        wc_change_percent: 0.01,
    };

    // Overlay observed values where the bundle has something usable
    if data.operating_margin > 0.0 {
        template.operating_margin = data.operating_margin;
    }
    if data.gross_margin > 0.0 {
        template.gross_margin = data.gross_margin;
    }
    if effective_tax_rate > 0.0 {
        template.tax_rate = effective_tax_rate;
    }
    if data.historical_da_percent > 0.0 {
        template.da_percent = data.historical_da_percent;
    }
    if data.historical_capex_percent > 0.0 {
        template.capex_percent = data.historical_capex_percent;
    }
    if data.historical_wc_change_percent > 0.0 {
        template.wc_change_percent = data.historical_wc_change_percent;
    }

    vec![template; DEFAULT_EXPLICIT_YEARS]
}

/// Replace the default growth ladder with one implied by the analyst panel.
///
/// Preferred path: walk the consensus revenue estimates year by year; years
/// beyond the panel decay at 10% per year. Fallback when the walk is not
/// possible but two fiscal years exist: seed from the FY1-to-FY2 growth rate
/// and taper it across the ladder.
fn apply_analyst_growth_path(
    drivers: &mut [ValueDrivers],
    data: &FinancialData,
    base_revenue: f64,
) {
    let estimates = &data.analyst_estimates;

    let first_positive = estimates
        .first()
        .map(|e| e.revenue_avg > 0.0)
        .unwrap_or(false);

    if first_positive && base_revenue > 0.0 {
        let mut prev = base_revenue;
        let mut last_growth = 0.0;
        for (i, driver) in drivers.iter_mut().enumerate() {
            match estimates.get(i).filter(|e| e.revenue_avg > 0.0) {
                Some(estimate) => {
                    last_growth = estimate.revenue_avg / prev - 1.0;
                    prev = estimate.revenue_avg;
                }
                None => {
                    last_growth *= 0.9;
                }
            }
            driver.revenue_growth = last_growth;
        }
        return;
    }

    if estimates.len() >= 2 && estimates[0].revenue_avg > 0.0 && estimates[1].revenue_avg > 0.0 {
        let g = estimates[1].revenue_avg / estimates[0].revenue_avg - 1.0;
        for (i, driver) in drivers.iter_mut().enumerate() {
            let taper = [1.0, 0.9, 0.8, 0.7, 0.6];
            driver.revenue_growth = g * taper[i.min(taper.len() - 1)];
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalystEstimate;

    fn market_rates() -> WaccInputs {
        WaccInputs {
            risk_free_rate: 0.045,
            market_risk_premium: 0.05,
            country_risk_premium: 0.0,
        }
    }

    fn sample_data() -> FinancialData {
        FinancialData {
            symbol: "TEST".into(),
            current_price: 150.0,
            market_cap: 3.0e11,
            shares_outstanding: 2.0e9,
            beta: 1.1,
            ttm_revenue: 1.0e9,
            ttm_operating_income: 2.0e8,
            ttm_net_income: 1.6e8,
            ttm_fcf: 1.8e8,
            ttm_eps: 8.0,
            gross_margin: 0.40,
            operating_margin: 0.20,
            total_cash: 5.0e10,
            total_debt: 3.0e10,
            net_cash: 2.0e10,
            total_equity: 1.0e11,
            historical_da_percent: 0.03,
            historical_capex_percent: 0.04,
            historical_wc_change_percent: 0.01,
            historical_roic: 0.15,
            effective_tax_rate: 0.21,
            interest_expense: 1.5e9,
            sector: "Technology".into(),
            industry: "Software—Application".into(),
            analyst_estimates: vec![
                AnalystEstimate {
                    fiscal_year: 2026,
                    revenue_low: 1.02e9,
                    revenue_avg: 1.08e9,
                    revenue_high: 1.16e9,
                    eps_low: 7.0,
                    eps_avg: 8.0,
                    eps_high: 9.0,
                    num_analysts: 20,
                },
                AnalystEstimate {
                    fiscal_year: 2027,
                    revenue_low: 1.09e9,
                    revenue_avg: 1.15e9,
                    revenue_high: 1.24e9,
                    eps_low: 8.0,
                    eps_avg: 9.0,
                    eps_high: 10.0,
                    num_analysts: 18,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_wacc_decomposition() {
        let data = sample_data();
        let (inputs, audit) = prefill("TEST", &data, &market_rates());

        // Ke = 0.045 + 1.1 * 0.05 = 0.10
        assert!((audit.cost_of_equity - 0.10).abs() < 1e-12);
        // Kd = 1.5e9 / 3e10 = 0.05
        assert!((audit.cost_of_debt - 0.05).abs() < 1e-12);
        // Weights: 3e11 / 3.3e11
        assert!((audit.equity_weight - 3.0e11 / 3.3e11).abs() < 1e-12);
        // WACC inside the clamp band, passed through unchanged
        assert!((audit.calculated_wacc - audit.final_wacc).abs() < 1e-12);
        assert_eq!(inputs.wacc, audit.final_wacc);
        assert!(audit.warnings.is_empty());
    }

    #[test]
    fn test_country_risk_premium_does_not_enter_cost_of_equity() {
        // The bundle carries a country risk premium, but the build-up is
        // plain CAPM: rf + beta * mrp
        let data = sample_data();
        let mut rates = market_rates();
        rates.country_risk_premium = 0.03;
        let (_, audit) = prefill("TEST", &data, &rates);
        assert!((audit.cost_of_equity - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_cost_of_debt_bands() {
        let mut data = sample_data();
        data.total_debt = 0.0;
        assert_eq!(implied_cost_of_debt(&data), 0.06);

        data.total_debt = 3.0e10;
        data.interest_expense = -1.0;
        assert_eq!(implied_cost_of_debt(&data), 0.06);

        data.interest_expense = 3.0e8; // 1% of debt
        assert_eq!(implied_cost_of_debt(&data), 0.04);

        data.interest_expense = 6.0e9; // 20% of debt
        assert_eq!(implied_cost_of_debt(&data), 0.10);
    }

    #[test]
    fn test_wacc_fallback_on_non_finite_inputs() {
        let mut data = sample_data();
        data.beta = f64::NAN;
        let (inputs, audit) = prefill("TEST", &data, &market_rates());
        assert_eq!(inputs.wacc, WACC_FALLBACK);
        assert!(audit.warnings.iter().any(|w| w.contains("WACC")));
    }

    #[test]
    fn test_anchor_fallback_to_ttm() {
        let mut data = sample_data();
        data.latest_annual_revenue = 0.0;
        data.latest_annual_net_income = -5.0;
        let (inputs, _) = prefill("TEST", &data, &market_rates());
        assert_eq!(inputs.base_revenue, data.ttm_revenue);
        assert_eq!(inputs.base_net_income, data.ttm_net_income);
    }

    #[test]
    fn test_analyst_walk_with_decay() {
        let data = sample_data();
        let (inputs, _) = prefill("TEST", &data, &market_rates());

        // Year 1: 1.08e9 / 1.0e9 - 1 = 8%
        assert!((inputs.drivers[0].revenue_growth - 0.08).abs() < 1e-12);
        // Year 2: 1.15e9 / 1.08e9 - 1
        let g2 = 1.15e9 / 1.08e9 - 1.0;
        assert!((inputs.drivers[1].revenue_growth - g2).abs() < 1e-12);
        // Years 3..5 decay at 10% per year off the last observed growth
        assert!((inputs.drivers[2].revenue_growth - g2 * 0.9).abs() < 1e-12);
        assert!((inputs.drivers[3].revenue_growth - g2 * 0.81).abs() < 1e-12);
        assert!((inputs.drivers[4].revenue_growth - g2 * 0.729).abs() < 1e-12);
        // Fade starts where the explicit period ends
        assert!((inputs.fade_start_growth - g2 * 0.729).abs() < 1e-12);
    }

    #[test]
    fn test_two_estimate_taper_without_base_revenue() {
        let mut data = sample_data();
        data.latest_annual_revenue = 0.0;
        data.ttm_revenue = 0.0;
        let (inputs, _) = prefill("TEST", &data, &market_rates());

        let g = 1.15e9 / 1.08e9 - 1.0;
        let expected = [g, 0.9 * g, 0.8 * g, 0.7 * g, 0.6 * g];
        for (driver, want) in inputs.drivers.iter().zip(expected) {
            assert!((driver.revenue_growth - want).abs() < 1e-12);
        }
        assert!((inputs.fade_start_growth - 0.6 * g).abs() < 1e-12);
    }

    #[test]
    fn test_default_ladder_without_estimates() {
        let mut data = sample_data();
        data.analyst_estimates.clear();
        let (inputs, _) = prefill("TEST", &data, &market_rates());
        for driver in &inputs.drivers {
            assert_eq!(driver.revenue_growth, 0.10);
        }
    }

    #[test]
    fn test_observed_ratios_overlay_defaults() {
        let mut data = sample_data();
        data.operating_margin = 0.31;
        data.historical_capex_percent = 0.07;
        let (inputs, _) = prefill("TEST", &data, &market_rates());
        assert_eq!(inputs.drivers[0].operating_margin, 0.31);
        assert_eq!(inputs.drivers[0].capex_percent, 0.07);
        assert_eq!(inputs.drivers[0].tax_rate, 0.21);
    }

    #[test]
    fn test_roic_anchor_fallback() {
        let mut data = sample_data();
        data.historical_roic = -0.02;
        let (inputs, audit) = prefill("TEST", &data, &market_rates());
        assert_eq!(inputs.steady_state_roic, DEFAULT_STEADY_STATE_ROIC);
        assert_eq!(inputs.fade_start_roic, DEFAULT_STEADY_STATE_ROIC);
        assert!(audit.warnings.iter().any(|w| w.contains("ROIC")));
    }

    #[test]
    fn test_determinism() {
        let data = sample_data();
        let (a, _) = prefill("TEST", &data, &market_rates());
        let (b, _) = prefill("TEST", &data, &market_rates());
        assert_eq!(a.wacc.to_bits(), b.wacc.to_bits());
        for (x, y) in a.drivers.iter().zip(&b.drivers) {
            assert_eq!(x.revenue_growth.to_bits(), y.revenue_growth.to_bits());
        }
    }
}
