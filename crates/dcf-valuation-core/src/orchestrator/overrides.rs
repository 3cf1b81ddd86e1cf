use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValuationError;
use crate::monte_carlo::params::{MonteCarloParams, MAX_ITERATIONS};
use crate::numeric::clamp;
use crate::valuation::dcf::DcfInputs;
use crate::ValuationResult;

/// Caller overrides for one valuation request. Unknown keys are tolerated
/// for forward compatibility; absent fields are no-ops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationOverrides {
    pub dcf: Option<DcfOverrides>,
    /// Recursive patch of the Monte Carlo parameter tree: object nodes are
    /// merged, arrays and scalars are replaced.
    pub monte_carlo: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfOverrides {
    pub wacc: Option<f64>,
    pub terminal_growth_rate: Option<f64>,
    pub steady_state_roic: Option<f64>,
    pub fade_years: Option<f64>,
    pub fade_start_growth: Option<f64>,
    pub fade_start_roic: Option<f64>,
    pub explicit_period_years: Option<f64>,
    pub base_revenue: Option<f64>,
    pub base_net_income: Option<f64>,
    pub drivers: Option<Vec<DriverPatch>>,
}

/// Per-year driver patch, addressed by 1-based explicit-period year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverPatch {
    pub year: i64,
    pub revenue_growth: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub tax_rate: Option<f64>,
    pub da_percent: Option<f64>,
    pub capex_percent: Option<f64>,
    pub wc_change_percent: Option<f64>,
}

/// Require a finite value, reporting the failing override path otherwise.
fn finite(value: f64, path: &str) -> ValuationResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValuationError::InvalidOverride {
            path: path.to_string(),
            reason: "must be a finite number".to_string(),
        })
    }
}

/// Apply the recognized DCF overrides onto prefilled inputs.
///
/// Values are validated then clamped into their admissible ranges. A
/// non-finite value is fatal; a driver patch addressing a year outside the
/// table is dropped with a warning (the documented legacy behavior).
pub fn apply_dcf_overrides(
    inputs: &mut DcfInputs,
    overrides: &DcfOverrides,
    warnings: &mut Vec<String>,
) -> ValuationResult<()> {
    if let Some(wacc) = overrides.wacc {
        inputs.wacc = clamp(finite(wacc, "dcf.wacc")?, 0.02, 0.30);
    }
    if let Some(g) = overrides.terminal_growth_rate {
        inputs.terminal_growth_rate = clamp(finite(g, "dcf.terminal_growth_rate")?, -0.05, 0.15);
    }
    if let Some(roic) = overrides.steady_state_roic {
        inputs.steady_state_roic = clamp(finite(roic, "dcf.steady_state_roic")?, 0.001, 1.0);
    }
    if let Some(years) = overrides.fade_years {
        let years = finite(years, "dcf.fade_years")?.round();
        inputs.fade_years = clamp(years, 1.0, 30.0) as u32;
    }
    if let Some(g) = overrides.fade_start_growth {
        inputs.fade_start_growth = clamp(finite(g, "dcf.fade_start_growth")?, -0.05, 0.50);
    }
    if let Some(roic) = overrides.fade_start_roic {
        inputs.fade_start_roic = clamp(finite(roic, "dcf.fade_start_roic")?, 0.001, 1.0);
    }
    if let Some(years) = overrides.explicit_period_years {
        let years = finite(years, "dcf.explicit_period_years")?.round();
        if years < 1.0 || years > inputs.drivers.len() as f64 {
            return Err(ValuationError::InvalidOverride {
                path: "dcf.explicit_period_years".to_string(),
                reason: format!(
                    "must be an integer in [1, {}], got {years}",
                    inputs.drivers.len()
                ),
            });
        }
        inputs.explicit_period_years = years as usize;
    }
    if let Some(revenue) = overrides.base_revenue {
        inputs.base_revenue = finite(revenue, "dcf.base_revenue")?.max(0.0);
    }
    if let Some(income) = overrides.base_net_income {
        inputs.base_net_income = finite(income, "dcf.base_net_income")?;
    }

    if let Some(patches) = &overrides.drivers {
        for patch in patches {
            apply_driver_patch(inputs, patch, warnings)?;
        }
    }

    Ok(())
}

fn apply_driver_patch(
    inputs: &mut DcfInputs,
    patch: &DriverPatch,
    warnings: &mut Vec<String>,
) -> ValuationResult<()> {
    let year = patch.year;
    if year < 1 || year as usize > inputs.drivers.len() {
        warnings.push(format!(
            "Driver override for year {year} is outside the explicit period (1..={}) and was ignored",
            inputs.drivers.len()
        ));
        return Ok(());
    }
    let driver = &mut inputs.drivers[(year - 1) as usize];

    let path = |field: &str| format!("dcf.drivers[year={year}].{field}");
    if let Some(v) = patch.revenue_growth {
        driver.revenue_growth = finite(v, &path("revenue_growth"))?;
    }
    if let Some(v) = patch.gross_margin {
        driver.gross_margin = finite(v, &path("gross_margin"))?;
    }
    if let Some(v) = patch.operating_margin {
        driver.operating_margin = finite(v, &path("operating_margin"))?;
    }
    if let Some(v) = patch.tax_rate {
        driver.tax_rate = finite(v, &path("tax_rate"))?;
    }
    if let Some(v) = patch.da_percent {
        driver.da_percent = finite(v, &path("da_percent"))?;
    }
    if let Some(v) = patch.capex_percent {
        driver.capex_percent = finite(v, &path("capex_percent"))?;
    }
    if let Some(v) = patch.wc_change_percent {
        driver.wc_change_percent = finite(v, &path("wc_change_percent"))?;
    }
    Ok(())
}

/// Split the `iterations` key off a Monte Carlo override tree, clamped to
/// [1, 20000]. Returns the sanitized iteration count, leaving the remainder
/// of the tree for the per-method deep merge.
pub fn take_iterations_override(
    patch: &mut Value,
    warnings: &mut Vec<String>,
) -> Option<u32> {
    let object = patch.as_object_mut()?;
    let raw = object.remove("iterations")?;
    let requested = raw.as_f64()?;
    let clamped = clamp(requested.round(), 1.0, MAX_ITERATIONS as f64) as u32;
    if clamped as f64 != requested {
        warnings.push(format!(
            "monte_carlo.iterations of {requested} clamped to {clamped}"
        ));
    }
    Some(clamped)
}

/// Deep-merge a Monte Carlo override tree into default parameters: object
/// nodes merge, arrays and scalars replace, missing keys keep defaults.
pub fn merge_monte_carlo_overrides(
    params: &MonteCarloParams,
    patch: &Value,
) -> ValuationResult<MonteCarloParams> {
    let mut tree = serde_json::to_value(params)?;
    deep_merge(&mut tree, patch);
    serde_json::from_value(tree).map_err(|e| ValuationError::InvalidOverride {
        path: "monte_carlo".to_string(),
        reason: e.to_string(),
    })
}

fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, patch_value),
                    None => {
                        // Unknown keys are tolerated; keep them in the tree,
                        // deserialization ignores what it does not know
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::params::create_default_params;
    use crate::valuation::dcf::{TerminalMethod, ValueDrivers};
    use serde_json::json;

    fn sample_inputs() -> DcfInputs {
        let driver = ValueDrivers {
            revenue_growth: 0.08,
            gross_margin: 0.40,
            operating_margin: 0.20,
            tax_rate: 0.21,
            da_percent: 0.03,
            capex_percent: 0.04,
            wc_change_percent: 0.01,
        };
        DcfInputs {
            symbol: "TEST".into(),
            explicit_period_years: 5,
            drivers: vec![driver; 5],
            terminal_method: TerminalMethod::Perpetuity,
            terminal_growth_rate: 0.025,
            steady_state_roic: 0.15,
            fade_years: 10,
            fade_start_growth: 0.06,
            fade_start_roic: 0.18,
            wacc: 0.09,
            base_revenue: 1.0e9,
            base_net_income: 1.6e8,
        }
    }

    #[test]
    fn test_wacc_override_passes_through() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            wacc: Some(0.11),
            ..Default::default()
        };
        apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).unwrap();
        assert!((inputs.wacc - 0.11).abs() < 1e-12);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            wacc: Some(0.90),
            terminal_growth_rate: Some(-0.50),
            fade_years: Some(100.0),
            ..Default::default()
        };
        apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).unwrap();
        assert_eq!(inputs.wacc, 0.30);
        assert_eq!(inputs.terminal_growth_rate, -0.05);
        assert_eq!(inputs.fade_years, 30);
    }

    #[test]
    fn test_non_finite_override_is_fatal_with_path() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            wacc: Some(f64::NAN),
            ..Default::default()
        };
        let err = apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).unwrap_err();
        match err {
            ValuationError::InvalidOverride { path, .. } => assert_eq!(path, "dcf.wacc"),
            other => panic!("expected InvalidOverride, got {other:?}"),
        }
    }

    #[test]
    fn test_driver_patch_by_year() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            drivers: Some(vec![DriverPatch {
                year: 2,
                operating_margin: Some(0.25),
                ..Default::default()
            }]),
            ..Default::default()
        };
        apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).unwrap();
        assert_eq!(inputs.drivers[1].operating_margin, 0.25);
        assert_eq!(inputs.drivers[0].operating_margin, 0.20);
    }

    #[test]
    fn test_driver_patch_out_of_range_year_warns_and_ignores() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            drivers: Some(vec![DriverPatch {
                year: 6,
                operating_margin: Some(0.25),
                ..Default::default()
            }]),
            ..Default::default()
        };
        apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).unwrap();
        assert!(warnings.iter().any(|w| w.contains("year 6")));
        assert!(inputs.drivers.iter().all(|d| d.operating_margin == 0.20));
    }

    #[test]
    fn test_non_finite_driver_field_reports_full_path() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            drivers: Some(vec![DriverPatch {
                year: 3,
                operating_margin: Some(f64::INFINITY),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let err = apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).unwrap_err();
        match err {
            ValuationError::InvalidOverride { path, .. } => {
                assert_eq!(path, "dcf.drivers[year=3].operating_margin");
            }
            other => panic!("expected InvalidOverride, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_period_years_out_of_range_is_fatal() {
        let mut inputs = sample_inputs();
        let mut warnings = Vec::new();
        let overrides = DcfOverrides {
            explicit_period_years: Some(9.0),
            ..Default::default()
        };
        assert!(apply_dcf_overrides(&mut inputs, &overrides, &mut warnings).is_err());
    }

    #[test]
    fn test_iterations_clamp_warns_with_both_values() {
        let mut patch = json!({ "iterations": 999999.0, "growth": { "std_dev": 0.05 } });
        let mut warnings = Vec::new();
        let iterations = take_iterations_override(&mut patch, &mut warnings).unwrap();
        assert_eq!(iterations, 20_000);
        assert!(warnings
            .iter()
            .any(|w| w.contains("clamped") && w.contains("999999") && w.contains("20000")));
        // The key is consumed; the rest of the tree is left for merging
        assert!(patch.get("iterations").is_none());
        assert!(patch.get("growth").is_some());
    }

    #[test]
    fn test_iterations_in_range_does_not_warn() {
        let mut patch = json!({ "iterations": 2500 });
        let mut warnings = Vec::new();
        let iterations = take_iterations_override(&mut patch, &mut warnings).unwrap();
        assert_eq!(iterations, 2_500);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_deep_merge_replaces_scalars_and_arrays() {
        let inputs = sample_inputs();
        let defaults = create_default_params(&inputs, None);
        let patch = json!({
            "growth": { "std_dev": 0.07, "means": [0.2, 0.1] },
            "seed": 7,
        });
        let merged = merge_monte_carlo_overrides(&defaults, &patch).unwrap();
        assert_eq!(merged.growth.std_dev, 0.07);
        assert_eq!(merged.growth.means, vec![0.2, 0.1]);
        // Untouched siblings keep their defaults
        assert_eq!(merged.growth.min, defaults.growth.min);
        assert_eq!(merged.operating_margin.std_dev, defaults.operating_margin.std_dev);
        assert_eq!(merged.seed, Some(7));
    }

    #[test]
    fn test_deep_merge_tolerates_unknown_keys() {
        let inputs = sample_inputs();
        let defaults = create_default_params(&inputs, None);
        let patch = json!({ "not_a_real_knob": { "x": 1 } });
        let merged = merge_monte_carlo_overrides(&defaults, &patch).unwrap();
        assert_eq!(merged.iterations, defaults.iterations);
    }

    #[test]
    fn test_deep_merge_nested_terminal_model() {
        let inputs = sample_inputs();
        let defaults = create_default_params(&inputs, None);
        let patch = json!({
            "terminal_model": { "fade": { "fade_years": { "max": 15.0 } } }
        });
        let merged = merge_monte_carlo_overrides(&defaults, &patch).unwrap();
        assert_eq!(merged.terminal_model.fade.fade_years.max, 15.0);
        assert_eq!(
            merged.terminal_model.fade.fade_years.min,
            defaults.terminal_model.fade.fade_years.min
        );
        assert_eq!(
            merged.terminal_model.min_wacc_spread,
            defaults.terminal_model.min_wacc_spread
        );
    }
}
