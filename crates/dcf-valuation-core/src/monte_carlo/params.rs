use serde::{Deserialize, Serialize};

use crate::numeric::clamp;
use crate::types::FinancialData;
use crate::valuation::dcf::DcfInputs;

pub const DEFAULT_ITERATIONS: u32 = 10_000;
pub const MAX_ITERATIONS: u32 = 20_000;

/// Distribution of a year-indexed driver path with AR(1) shocks and mean
/// reversion toward the per-year means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathDistribution {
    pub means: Vec<f64>,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub year_correlation: f64,
    pub mean_reversion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    Normal,
    Lognormal,
}

/// Distribution of a single scalar quantity, truncated to `[min, max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalarDistribution {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// The discount rate carries a distribution choice because it may be sampled
/// lognormally (rates are positively skewed and must not cross zero).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaccDistribution {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub distribution: DistributionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoicDrivenParams {
    pub steady_state_roic: ScalarDistribution,
    pub max_reinvestment_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FadeParams {
    pub fade_years: ScalarDistribution,
    pub fade_start_growth: ScalarDistribution,
    pub fade_start_roic: ScalarDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalModelParams {
    pub min_wacc_spread: f64,
    pub roic_driven: RoicDrivenParams,
    pub fade: FadeParams,
}

/// Complete configuration of one Monte Carlo run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloParams {
    pub iterations: u32,
    /// Reproducible runs when set; entropy-seeded otherwise.
    pub seed: Option<u64>,
    pub growth: PathDistribution,
    pub operating_margin: PathDistribution,
    pub wacc: WaccDistribution,
    pub terminal_growth: ScalarDistribution,
    /// Correlation of the latent draws, in fixed order
    /// [growth, margin, wacc, terminal growth].
    pub correlation: Vec<Vec<f64>>,
    pub terminal_model: TerminalModelParams,
}

/// The latent-variable correlation structure: growth, margin and terminal
/// growth move together; the discount rate moves weakly against all three.
const CORRELATION: [[f64; 4]; 4] = [
    [1.0, 0.35, -0.20, 0.45],
    [0.35, 1.0, -0.15, 0.25],
    [-0.20, -0.15, 1.0, -0.10],
    [0.45, 0.25, -0.10, 1.0],
];

/// Build default Monte Carlo parameters around a DCF input set.
///
/// Dispersion defaults are proportional to the year-1 assumption levels;
/// when the bundle carries analyst estimates, the consensus high/low spread
/// replaces the proportional growth and margin standard deviations.
pub fn create_default_params(
    inputs: &DcfInputs,
    financial_data: Option<&FinancialData>,
) -> MonteCarloParams {
    let n_years = inputs.explicit_period_years.min(inputs.drivers.len()).max(1);
    let drivers = &inputs.drivers[..n_years.min(inputs.drivers.len())];

    let year1_growth = drivers.first().map(|d| d.revenue_growth).unwrap_or(0.0);
    let year1_margin = drivers.first().map(|d| d.operating_margin).unwrap_or(0.0);

    let mut growth = PathDistribution {
        means: drivers.iter().map(|d| d.revenue_growth).collect(),
        std_dev: (year1_growth.abs() * 0.35).max(0.002),
        min: -0.15,
        max: 0.30,
        year_correlation: 0.5,
        mean_reversion: 0.35,
    };
    let mut operating_margin = PathDistribution {
        means: drivers.iter().map(|d| d.operating_margin).collect(),
        std_dev: (year1_margin.abs() * 0.20).max(0.002),
        min: 0.01,
        max: 0.60,
        year_correlation: 0.5,
        mean_reversion: 0.35,
    };

    if let Some(data) = financial_data {
        apply_analyst_dispersion(
            &mut growth,
            &mut operating_margin,
            data,
            year1_growth,
            year1_margin,
        );
    }

    MonteCarloParams {
        iterations: DEFAULT_ITERATIONS,
        seed: None,
        growth,
        operating_margin,
        wacc: WaccDistribution {
            mean: inputs.wacc,
            std_dev: (inputs.wacc.abs() * 0.15).max(0.0015),
            min: 0.02,
            max: 0.20,
            distribution: DistributionKind::Lognormal,
        },
        terminal_growth: ScalarDistribution {
            mean: inputs.terminal_growth_rate,
            std_dev: (inputs.terminal_growth_rate.abs() * 0.2).max(0.001),
            min: 0.0,
            max: 0.06,
        },
        correlation: CORRELATION.iter().map(|row| row.to_vec()).collect(),
        terminal_model: TerminalModelParams {
            min_wacc_spread: 0.005,
            roic_driven: RoicDrivenParams {
                steady_state_roic: ScalarDistribution {
                    mean: inputs.steady_state_roic,
                    std_dev: (inputs.steady_state_roic.abs() * 0.25).max(0.005),
                    min: 0.03,
                    max: 0.50,
                },
                max_reinvestment_rate: 0.80,
            },
            fade: FadeParams {
                fade_years: ScalarDistribution {
                    mean: inputs.fade_years as f64,
                    std_dev: (inputs.fade_years as f64 * 0.2).max(1.0),
                    min: 3.0,
                    max: 20.0,
                },
                fade_start_growth: ScalarDistribution {
                    mean: inputs.fade_start_growth,
                    std_dev: (inputs.fade_start_growth.abs() * 0.2).max(0.005),
                    min: 0.0,
                    max: 0.40,
                },
                fade_start_roic: ScalarDistribution {
                    mean: inputs.fade_start_roic,
                    std_dev: (inputs.fade_start_roic.abs() * 0.2).max(0.005),
                    min: 0.03,
                    max: 0.60,
                },
            },
        },
    }
}

/// Treat the FY1 consensus high/low spread as a ~4-sigma range.
fn apply_analyst_dispersion(
    growth: &mut PathDistribution,
    operating_margin: &mut PathDistribution,
    data: &FinancialData,
    year1_growth: f64,
    year1_margin: f64,
) {
    let Some(fy1) = data.analyst_estimates.first() else {
        return;
    };

    if fy1.revenue_high > 0.0 && fy1.revenue_low > 0.0 && fy1.revenue_avg > 0.0
        && data.ttm_revenue > 0.0
    {
        let range = (fy1.revenue_high - fy1.revenue_low) / data.ttm_revenue;
        growth.std_dev = clamp(range / 4.0, 0.002, year1_growth.abs() * 0.8);
    }

    if fy1.eps_high > 0.0 && fy1.eps_low > 0.0 && fy1.eps_avg > 0.0 {
        let eps_range = (fy1.eps_high - fy1.eps_low) / fy1.eps_avg;
        operating_margin.std_dev = clamp(
            eps_range / 4.0 * year1_margin.abs(),
            0.002,
            year1_margin.abs() * 0.8,
        );
    }
}
