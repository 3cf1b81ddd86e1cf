use serde::{Deserialize, Serialize};

/// All monetary values. IEEE-754 doubles: degenerate models propagate
/// non-finite values instead of raising, and Monte Carlo filters them out.
pub type Money = f64;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// One fiscal year of consensus analyst estimates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystEstimate {
    pub fiscal_year: i32,
    pub revenue_low: Money,
    pub revenue_avg: Money,
    pub revenue_high: Money,
    pub eps_low: f64,
    pub eps_avg: f64,
    pub eps_high: f64,
    pub num_analysts: u32,
}

/// Distribution of a valuation multiple over the company's own history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileBand {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub min: f64,
    pub max: f64,
}

/// A normalized bundle of financial statements for one company.
///
/// Upstream collaborators are responsible for currency normalization and TTM
/// aggregation; every monetary field here is in a single currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialData {
    // Identity
    pub symbol: String,
    pub company_name: String,
    pub currency: String,

    // Market
    pub current_price: Money,
    pub market_cap: Money,
    pub shares_outstanding: f64,
    pub beta: f64,

    // Trailing-twelve-month income statement
    pub ttm_revenue: Money,
    pub ttm_gross_profit: Money,
    pub ttm_operating_income: Money,
    pub ttm_net_income: Money,
    pub ttm_eps: f64,
    pub ttm_fcf: Money,
    pub ttm_sbc: Money,
    pub interest_expense: Money,

    // Derived margins
    pub gross_margin: Rate,
    pub operating_margin: Rate,
    pub net_margin: Rate,

    // Latest annual anchors
    pub latest_annual_revenue: Money,
    pub latest_annual_net_income: Money,

    // Balance sheet
    pub total_cash: Money,
    pub total_debt: Money,
    /// `total_cash - total_debt`, carried explicitly by the upstream bundle.
    pub net_cash: Money,
    pub total_equity: Money,

    // Historical ratios
    pub historical_da_percent: Rate,
    pub historical_capex_percent: Rate,
    pub historical_wc_change_percent: Rate,
    pub historical_roic: Rate,
    pub effective_tax_rate: Rate,
    pub cost_of_debt: Rate,

    // Analyst panel, ordered by fiscal year
    pub analyst_estimates: Vec<AnalystEstimate>,

    // Valuation multiples: own-history percentile bands plus current values
    pub pe_percentiles: PercentileBand,
    pub peg_percentiles: PercentileBand,
    pub pfcf_percentiles: PercentileBand,
    pub pe: f64,
    pub peg: f64,
    pub pfcf: f64,

    // Classification
    pub sector: String,
    pub industry: String,
}

/// Market-level rate inputs for the CAPM cost-of-equity build-up.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaccInputs {
    pub risk_free_rate: Rate,
    pub market_risk_premium: Rate,
    pub country_risk_premium: Rate,
}
