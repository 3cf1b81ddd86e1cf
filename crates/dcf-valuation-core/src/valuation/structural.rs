use serde::{Deserialize, Serialize};

use crate::benchmarks::{industry_benchmark, industry_thresholds};
use crate::numeric::mean;
use crate::types::FinancialData;

use super::dcf::{DcfInputs, DcfResult};

/// Does the assumed growth follow from ROIC times the reinvestment the
/// drivers actually fund?
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConsistency {
    pub implied_growth: f64,
    pub assumed_growth: f64,
    pub deviation: f64,
    pub is_valid: bool,
}

/// CapEx funding relative to depreciation in the terminal explicit year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapexDaRatio {
    pub current: f64,
    pub target: f64,
    pub is_reasonable: bool,
}

/// Cash conversion of the projected terminal year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcfQuality {
    pub fcf_to_ni: f64,
    pub industry_range: (f64, f64),
    pub is_reasonable: bool,
}

/// Layer B: accounting and economic identities the input set must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralCheck {
    pub growth_consistency: GrowthConsistency,
    pub capex_da_ratio: CapexDaRatio,
    pub fcf_quality: FcfQuality,
    pub has_warnings: bool,
    pub warnings: Vec<String>,
}

const MAX_GROWTH_DEVIATION: f64 = 0.05;
const CAPEX_DA_RANGE: (f64, f64) = (0.8, 1.5);
const FCF_TO_NI_RANGE: (f64, f64) = (0.6, 1.2);

/// Audit a DCF assumption set against its own result.
pub fn run_structural_check(
    inputs: &DcfInputs,
    result: &DcfResult,
    data: &FinancialData,
) -> StructuralCheck {
    let mut warnings = Vec::new();
    let n_years = inputs.explicit_period_years.min(inputs.drivers.len());
    let drivers = &inputs.drivers[..n_years];

    let growth_consistency = check_growth_consistency(drivers, data, &mut warnings);
    let capex_da_ratio = check_capex_da(drivers);
    let fcf_quality = check_fcf_quality(result);

    if !growth_consistency.is_valid {
        warnings.push(format!(
            "Assumed revenue growth ({:.1}%) deviates from the growth funded by reinvestment ({:.1}%)",
            growth_consistency.assumed_growth * 100.0,
            growth_consistency.implied_growth * 100.0
        ));
    }
    if !capex_da_ratio.is_reasonable {
        warnings.push(format!(
            "CapEx/D&A ratio of {:.2} is outside the sustainable band [{:.1}, {:.1}]",
            capex_da_ratio.current, CAPEX_DA_RANGE.0, CAPEX_DA_RANGE.1
        ));
    }
    if !fcf_quality.is_reasonable {
        warnings.push(format!(
            "Projected FCF/NOPAT of {:.2} is outside the typical range [{:.1}, {:.1}]",
            fcf_quality.fcf_to_ni, FCF_TO_NI_RANGE.0, FCF_TO_NI_RANGE.1
        ));
    }
    if result.terminal_value_percent > 80.0 {
        warnings.push(format!(
            "Terminal value is {:.1}% of enterprise value; the explicit period carries little weight",
            result.terminal_value_percent
        ));
    }
    if inputs.terminal_growth_rate >= inputs.wacc {
        warnings.push(format!(
            "Terminal growth ({:.2}%) is not below WACC ({:.2}%)",
            inputs.terminal_growth_rate * 100.0,
            inputs.wacc * 100.0
        ));
    }
    if inputs.terminal_growth_rate > 0.04 {
        warnings.push(format!(
            "Terminal growth of {:.2}% exceeds long-run nominal GDP growth",
            inputs.terminal_growth_rate * 100.0
        ));
    }

    StructuralCheck {
        growth_consistency,
        capex_da_ratio,
        fcf_quality,
        has_warnings: !warnings.is_empty(),
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

fn check_growth_consistency(
    drivers: &[super::dcf::ValueDrivers],
    data: &FinancialData,
    warnings: &mut Vec<String>,
) -> GrowthConsistency {
    let avg_op_margin = mean(&drivers.iter().map(|d| d.operating_margin).collect::<Vec<_>>());
    let avg_tax = mean(&drivers.iter().map(|d| d.tax_rate).collect::<Vec<_>>());
    let avg_capex = mean(&drivers.iter().map(|d| d.capex_percent).collect::<Vec<_>>());
    let avg_da = mean(&drivers.iter().map(|d| d.da_percent).collect::<Vec<_>>());
    let avg_wc = mean(&drivers.iter().map(|d| d.wc_change_percent).collect::<Vec<_>>());
    let assumed_growth = mean(&drivers.iter().map(|d| d.revenue_growth).collect::<Vec<_>>());

    let net_nopat_margin = avg_op_margin * (1.0 - avg_tax);
    let raw_reinvestment = (avg_capex - avg_da + avg_wc) / net_nopat_margin;
    let reinvestment_rate = if raw_reinvestment.is_finite() && raw_reinvestment > 0.0 {
        raw_reinvestment
    } else {
        0.0
    };

    let implied_growth = data.historical_roic * reinvestment_rate;
    let deviation = (assumed_growth - implied_growth).abs();

    let benchmark = industry_benchmark(&data.industry, &data.sector);
    let thresholds = industry_thresholds(&benchmark);
    let roic_floor = (-0.10_f64).min(benchmark.after_tax_roic - 0.30);
    if data.historical_roic < roic_floor || data.historical_roic > thresholds.roic_error {
        warnings.push(format!(
            "Historical ROIC of {:.1}% is far from the industry median of {:.1}%",
            data.historical_roic * 100.0,
            benchmark.after_tax_roic * 100.0
        ));
    }

    GrowthConsistency {
        implied_growth,
        assumed_growth,
        deviation,
        is_valid: deviation < MAX_GROWTH_DEVIATION,
    }
}

fn check_capex_da(drivers: &[super::dcf::ValueDrivers]) -> CapexDaRatio {
    let last = drivers.last();
    let current = match last {
        Some(d) if d.da_percent != 0.0 => d.capex_percent / d.da_percent,
        _ => 0.0,
    };
    CapexDaRatio {
        current,
        target: 1.0,
        is_reasonable: current >= CAPEX_DA_RANGE.0 && current <= CAPEX_DA_RANGE.1,
    }
}

fn check_fcf_quality(result: &DcfResult) -> FcfQuality {
    let fcf_to_ni = match result.projections.last() {
        Some(last) if last.nopat > 0.0 => last.fcf / last.nopat,
        _ => 0.0,
    };
    FcfQuality {
        fcf_to_ni,
        industry_range: FCF_TO_NI_RANGE,
        is_reasonable: fcf_to_ni >= FCF_TO_NI_RANGE.0 && fcf_to_ni <= FCF_TO_NI_RANGE.1,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
