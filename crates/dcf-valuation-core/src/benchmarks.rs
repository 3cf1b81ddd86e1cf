//! Static industry benchmark table.
//!
//! Median operating margins and after-tax ROIC by industry, aggregated from
//! published US sector datasets. Lookups fall back from the exact industry
//! string to the sector default, then to the market aggregate.

use serde::{Deserialize, Serialize};

use crate::numeric::clamp;

/// Median profitability profile for an industry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndustryBenchmark {
    pub operating_margin: f64,
    pub after_tax_roic: f64,
    pub number_of_firms: u32,
}

/// Warning and error bars derived from an industry median.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndustryThresholds {
    pub margin_warning: f64,
    pub margin_error: f64,
    pub roic_warning: f64,
    pub roic_error: f64,
}

/// Whole-market aggregate, the lookup of last resort.
const MARKET_AGGREGATE: IndustryBenchmark = IndustryBenchmark {
    operating_margin: 0.12,
    after_tax_roic: 0.10,
    number_of_firms: 5878,
};

const INDUSTRY_TABLE: &[(&str, IndustryBenchmark)] = &[
    (
        "Software—Application",
        IndustryBenchmark { operating_margin: 0.24, after_tax_roic: 0.17, number_of_firms: 278 },
    ),
    (
        "Software—Infrastructure",
        IndustryBenchmark { operating_margin: 0.26, after_tax_roic: 0.18, number_of_firms: 142 },
    ),
    (
        "Semiconductors",
        IndustryBenchmark { operating_margin: 0.23, after_tax_roic: 0.16, number_of_firms: 72 },
    ),
    (
        "Semiconductor Equipment & Materials",
        IndustryBenchmark { operating_margin: 0.22, after_tax_roic: 0.15, number_of_firms: 34 },
    ),
    (
        "Consumer Electronics",
        IndustryBenchmark { operating_margin: 0.14, after_tax_roic: 0.13, number_of_firms: 21 },
    ),
    (
        "Information Technology Services",
        IndustryBenchmark { operating_margin: 0.13, after_tax_roic: 0.12, number_of_firms: 64 },
    ),
    (
        "Internet Content & Information",
        IndustryBenchmark { operating_margin: 0.20, after_tax_roic: 0.15, number_of_firms: 58 },
    ),
    (
        "Internet Retail",
        IndustryBenchmark { operating_margin: 0.06, after_tax_roic: 0.09, number_of_firms: 36 },
    ),
    (
        "Communication Equipment",
        IndustryBenchmark { operating_margin: 0.12, after_tax_roic: 0.11, number_of_firms: 48 },
    ),
    (
        "Entertainment",
        IndustryBenchmark { operating_margin: 0.10, after_tax_roic: 0.07, number_of_firms: 42 },
    ),
    (
        "Telecom Services",
        IndustryBenchmark { operating_margin: 0.15, after_tax_roic: 0.06, number_of_firms: 49 },
    ),
    (
        "Drug Manufacturers—General",
        IndustryBenchmark { operating_margin: 0.25, after_tax_roic: 0.14, number_of_firms: 17 },
    ),
    (
        "Biotechnology",
        IndustryBenchmark { operating_margin: 0.08, after_tax_roic: 0.06, number_of_firms: 598 },
    ),
    (
        "Medical Devices",
        IndustryBenchmark { operating_margin: 0.16, after_tax_roic: 0.11, number_of_firms: 121 },
    ),
    (
        "Healthcare Plans",
        IndustryBenchmark { operating_margin: 0.05, after_tax_roic: 0.12, number_of_firms: 11 },
    ),
    (
        "Banks—Diversified",
        IndustryBenchmark { operating_margin: 0.30, after_tax_roic: 0.09, number_of_firms: 9 },
    ),
    (
        "Banks—Regional",
        IndustryBenchmark { operating_margin: 0.32, after_tax_roic: 0.08, number_of_firms: 312 },
    ),
    (
        "Insurance—Diversified",
        IndustryBenchmark { operating_margin: 0.14, after_tax_roic: 0.08, number_of_firms: 24 },
    ),
    (
        "Asset Management",
        IndustryBenchmark { operating_margin: 0.28, after_tax_roic: 0.10, number_of_firms: 88 },
    ),
    (
        "Credit Services",
        IndustryBenchmark { operating_margin: 0.27, after_tax_roic: 0.11, number_of_firms: 43 },
    ),
    (
        "Oil & Gas Integrated",
        IndustryBenchmark { operating_margin: 0.13, after_tax_roic: 0.10, number_of_firms: 12 },
    ),
    (
        "Oil & Gas E&P",
        IndustryBenchmark { operating_margin: 0.21, after_tax_roic: 0.09, number_of_firms: 76 },
    ),
    (
        "Specialty Retail",
        IndustryBenchmark { operating_margin: 0.07, after_tax_roic: 0.12, number_of_firms: 63 },
    ),
    (
        "Restaurants",
        IndustryBenchmark { operating_margin: 0.12, after_tax_roic: 0.11, number_of_firms: 41 },
    ),
    (
        "Auto Manufacturers",
        IndustryBenchmark { operating_margin: 0.07, after_tax_roic: 0.08, number_of_firms: 19 },
    ),
    (
        "Aerospace & Defense",
        IndustryBenchmark { operating_margin: 0.10, after_tax_roic: 0.10, number_of_firms: 58 },
    ),
    (
        "Railroads",
        IndustryBenchmark { operating_margin: 0.35, after_tax_roic: 0.11, number_of_firms: 8 },
    ),
    (
        "Utilities—Regulated Electric",
        IndustryBenchmark { operating_margin: 0.20, after_tax_roic: 0.05, number_of_firms: 37 },
    ),
    (
        "Beverages—Non-Alcoholic",
        IndustryBenchmark { operating_margin: 0.19, after_tax_roic: 0.13, number_of_firms: 14 },
    ),
    (
        "Household & Personal Products",
        IndustryBenchmark { operating_margin: 0.17, after_tax_roic: 0.14, number_of_firms: 29 },
    ),
];

const SECTOR_TABLE: &[(&str, IndustryBenchmark)] = &[
    (
        "Technology",
        IndustryBenchmark { operating_margin: 0.21, after_tax_roic: 0.15, number_of_firms: 744 },
    ),
    (
        "Communication Services",
        IndustryBenchmark { operating_margin: 0.15, after_tax_roic: 0.09, number_of_firms: 261 },
    ),
    (
        "Healthcare",
        IndustryBenchmark { operating_margin: 0.12, after_tax_roic: 0.09, number_of_firms: 1120 },
    ),
    (
        "Financial Services",
        IndustryBenchmark { operating_margin: 0.24, after_tax_roic: 0.09, number_of_firms: 870 },
    ),
    (
        "Consumer Cyclical",
        IndustryBenchmark { operating_margin: 0.09, after_tax_roic: 0.10, number_of_firms: 521 },
    ),
    (
        "Consumer Defensive",
        IndustryBenchmark { operating_margin: 0.10, after_tax_roic: 0.11, number_of_firms: 219 },
    ),
    (
        "Industrials",
        IndustryBenchmark { operating_margin: 0.11, after_tax_roic: 0.10, number_of_firms: 618 },
    ),
    (
        "Energy",
        IndustryBenchmark { operating_margin: 0.16, after_tax_roic: 0.09, number_of_firms: 231 },
    ),
    (
        "Basic Materials",
        IndustryBenchmark { operating_margin: 0.13, after_tax_roic: 0.09, number_of_firms: 212 },
    ),
    (
        "Real Estate",
        IndustryBenchmark { operating_margin: 0.25, after_tax_roic: 0.05, number_of_firms: 246 },
    ),
    (
        "Utilities",
        IndustryBenchmark { operating_margin: 0.19, after_tax_roic: 0.05, number_of_firms: 96 },
    ),
];

/// Look up the benchmark for a classification: exact industry match first,
/// then the sector default, then the market aggregate.
pub fn industry_benchmark(industry: &str, sector: &str) -> IndustryBenchmark {
    let industry = industry.trim();
    if let Some((_, b)) = INDUSTRY_TABLE.iter().find(|(name, _)| *name == industry) {
        return *b;
    }
    let sector = sector.trim();
    if let Some((_, b)) = SECTOR_TABLE.iter().find(|(name, _)| *name == sector) {
        return *b;
    }
    MARKET_AGGREGATE
}

/// Derive warning/error bars as bounded multiples of the industry median.
pub fn industry_thresholds(benchmark: &IndustryBenchmark) -> IndustryThresholds {
    let margin_base = benchmark.operating_margin.max(0.05);
    let roic_base = benchmark.after_tax_roic.max(0.05);
    IndustryThresholds {
        margin_warning: clamp(margin_base * 1.5, 0.0, 0.50),
        margin_error: clamp(margin_base * 2.0, 0.0, 0.60),
        roic_warning: clamp(roic_base * 1.3, 0.0, 0.60),
        roic_error: clamp(roic_base * 1.6, 0.0, 0.80),
    }
}
