use serde::{Deserialize, Serialize};

use crate::types::{FinancialData, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Mechanism for the value beyond the explicit forecast period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalMethod {
    /// Gordon growth on terminal-year FCF: TV = FCF_n * (1+g) / (WACC - g)
    Perpetuity,
    /// Reinvestment-consistent perpetuity on NOPAT: payout = 1 - g/ROIC
    RoicDriven,
    /// Linear fade of growth and ROIC to steady state, then a Gordon tail
    Fade,
}

/// Operating assumptions for one explicit-period year, all as fractions of
/// revenue except `wc_change_percent`, which applies to the revenue change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValueDrivers {
    pub revenue_growth: Rate,
    pub gross_margin: Rate,
    pub operating_margin: Rate,
    pub tax_rate: Rate,
    pub da_percent: Rate,
    pub capex_percent: Rate,
    pub wc_change_percent: Rate,
}

/// A complete, internally consistent DCF input set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInputs {
    pub symbol: String,
    /// Explicit forecast horizon; at most `drivers.len()` years are used.
    pub explicit_period_years: usize,
    pub drivers: Vec<ValueDrivers>,
    pub terminal_method: TerminalMethod,
    pub terminal_growth_rate: Rate,
    pub steady_state_roic: Rate,
    pub fade_years: u32,
    pub fade_start_growth: Rate,
    pub fade_start_roic: Rate,
    pub wacc: Rate,
    pub base_revenue: Money,
    pub base_net_income: Money,
}

/// Projection for a single explicit-period year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    pub revenue: Money,
    pub operating_income: Money,
    pub nopat: Money,
    pub fcf: Money,
    pub discount_factor: f64,
    pub present_value: Money,
}

/// Output of one DCF run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfResult {
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub fair_value_per_share: f64,
    pub explicit_period_pv: Money,
    pub terminal_value_pv: Money,
    /// Percent units (0..100), unlike every other rate in the result.
    pub terminal_value_percent: f64,
    pub implied_pe: f64,
    pub implied_ev_to_fcf: f64,
    pub projections: Vec<YearProjection>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a DCF valuation under the inputs' terminal method.
///
/// The engine never raises: degenerate denominators (e.g. `wacc <= g`)
/// produce non-finite outputs that downstream consumers filter or flag.
pub fn calculate_dcf(inputs: &DcfInputs, data: &FinancialData) -> DcfResult {
    let n_years = inputs.explicit_period_years.min(inputs.drivers.len());
    if n_years == 0 {
        return zero_result();
    }

    let projections = build_projections(inputs, n_years);
    let explicit_period_pv: Money = projections.iter().map(|p| p.present_value).sum();

    // Terminal value expressed at the end of year N, pre-discount
    let last = &projections[n_years - 1];
    let terminal_value = match inputs.terminal_method {
        TerminalMethod::Perpetuity => perpetuity_terminal_value(inputs, last),
        TerminalMethod::RoicDriven => roic_driven_terminal_value(inputs, last),
        TerminalMethod::Fade => fade_terminal_value(inputs, last, n_years),
    };

    let terminal_value_pv = terminal_value / (1.0 + inputs.wacc).powi(n_years as i32);
    let enterprise_value = explicit_period_pv + terminal_value_pv;
    let equity_value = enterprise_value + data.net_cash;
    let fair_value_per_share = if data.shares_outstanding > 0.0 {
        equity_value / data.shares_outstanding
    } else {
        0.0
    };

    let implied_pe = if data.ttm_eps > 0.0 {
        fair_value_per_share / data.ttm_eps
    } else {
        0.0
    };
    let implied_ev_to_fcf = if data.ttm_fcf > 0.0 {
        enterprise_value / data.ttm_fcf
    } else {
        0.0
    };
    let terminal_value_percent = if enterprise_value != 0.0 {
        100.0 * terminal_value_pv / enterprise_value
    } else {
        0.0
    };

    DcfResult {
        enterprise_value,
        equity_value,
        fair_value_per_share,
        explicit_period_pv,
        terminal_value_pv,
        terminal_value_percent,
        implied_pe,
        implied_ev_to_fcf,
        projections,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn zero_result() -> DcfResult {
    DcfResult {
        enterprise_value: 0.0,
        equity_value: 0.0,
        fair_value_per_share: 0.0,
        explicit_period_pv: 0.0,
        terminal_value_pv: 0.0,
        terminal_value_percent: 0.0,
        implied_pe: 0.0,
        implied_ev_to_fcf: 0.0,
        projections: Vec::new(),
    }
}

fn build_projections(inputs: &DcfInputs, n_years: usize) -> Vec<YearProjection> {
    let mut projections = Vec::with_capacity(n_years);
    let mut prev_revenue = inputs.base_revenue;

    for year_idx in 0..n_years {
        let year = (year_idx + 1) as u32;
        let driver = &inputs.drivers[year_idx];

        let revenue = prev_revenue * (1.0 + driver.revenue_growth);
        let delta_revenue = revenue - prev_revenue;
        let operating_income = revenue * driver.operating_margin;
        let nopat = operating_income * (1.0 - driver.tax_rate);
        let da = revenue * driver.da_percent;
        let capex = revenue * driver.capex_percent;
        // Working-capital change scales with the revenue change, not revenue
        let wc_change = delta_revenue * driver.wc_change_percent;
        let fcf = nopat + da - capex - wc_change;

        let discount_factor = (1.0 + inputs.wacc).powi(year as i32);
        let present_value = fcf / discount_factor;

        projections.push(YearProjection {
            year,
            revenue,
            operating_income,
            nopat,
            fcf,
            discount_factor,
            present_value,
        });

        prev_revenue = revenue;
    }

    projections
}

fn perpetuity_terminal_value(inputs: &DcfInputs, last: &YearProjection) -> Money {
    let g = inputs.terminal_growth_rate;
    last.fcf * (1.0 + g) / (inputs.wacc - g)
}

fn roic_driven_terminal_value(inputs: &DcfInputs, last: &YearProjection) -> Money {
    let g = inputs.terminal_growth_rate;
    let reinvestment = g / inputs.steady_state_roic;
    let nopat_next = last.nopat * (1.0 + g);
    nopat_next * (1.0 - reinvestment) / (inputs.wacc - g)
}

/// Fade path: growth and ROIC interpolate linearly from their explicit-period
/// exit values down to steady state over `fade_years`, each year paying out
/// `1 - g/ROIC` of NOPAT, followed by a Gordon tail at steady state. The
/// result is re-expressed at time N so the caller's single terminal discount
/// recovers the fade path's PV contribution.
fn fade_terminal_value(inputs: &DcfInputs, last: &YearProjection, n_years: usize) -> Money {
    let k = inputs.fade_years.max(1);
    let g_start = inputs.fade_start_growth;
    let g_end = inputs.terminal_growth_rate;
    let roic_start = inputs.fade_start_roic;
    let roic_end = inputs.steady_state_roic;

    let mut nopat = last.nopat;
    let mut pv_sum = 0.0;

    for year in 1..=k {
        let fade_factor = 1.0 - year as f64 / k as f64;
        let g = g_end + (g_start - g_end) * fade_factor;
        let roic = roic_end + (roic_start - roic_end) * fade_factor;
        let reinvestment = if roic > 0.001 { g / roic } else { 0.0 };

        nopat *= 1.0 + g;
        let fcf = nopat * (1.0 - reinvestment);
        pv_sum += fcf / (1.0 + inputs.wacc).powi((n_years as u32 + year) as i32);
    }

    let nopat_post = nopat * (1.0 + g_end);
    let reinvestment_post = if roic_end > 0.001 { g_end / roic_end } else { 0.0 };
    let fcf_post = nopat_post * (1.0 - reinvestment_post);
    let tv_post = fcf_post / (inputs.wacc - g_end);
    pv_sum += tv_post / (1.0 + inputs.wacc).powi((n_years as u32 + k) as i32);

    pv_sum * (1.0 + inputs.wacc).powi(n_years as i32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
