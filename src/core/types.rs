use serde::{Deserialize, Serialize};

use super::calendar::YearMonth;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Goal {
    pub name: String,
    pub target_amount: f64,
    pub target_date: Option<YearMonth>,
    pub created_at: Option<YearMonth>,
}

impl Goal {
    /// Target amount with negative and non-finite values treated as zero.
    pub fn sanitized_target(&self) -> f64 {
        non_negative(self.target_amount)
    }
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyNet {
    pub month: YearMonth,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub expenses: f64,
}

impl MonthlyNet {
    pub fn new(month: YearMonth, income: f64, expenses: f64) -> Self {
        Self {
            month,
            income,
            expenses,
        }
    }

    pub fn net(&self) -> f64 {
        finite_or_zero(self.income) - finite_or_zero(self.expenses)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub month: YearMonth,
    pub actual: f64,
    pub ideal: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProjection {
    pub suggested_monthly: f64,
    pub current_saved: f64,
    pub remaining_amount: f64,
    pub months_remaining: u32,
    pub points: Vec<ProjectionPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub current_saved: f64,
    pub percent: f64,
    pub ideal_to_date: f64,
    pub ahead_behind_amount: f64,
    pub is_ahead: bool,
    pub months_remaining: u32,
    pub suggested_monthly: f64,
}

/// A dated income or expense record as supplied by the transaction store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Entry {
    pub date: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyLedger {
    pub months: Vec<MonthlyNet>,
    pub skipped_entries: usize,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetClass {
    #[default]
    #[serde(alias = "stocks")]
    Stock,
    Crypto,
    #[serde(alias = "mf", alias = "mutualFund", alias = "mutual_fund")]
    MutualFund,
}

impl AssetClass {
    pub fn profile(self) -> AssetProfile {
        match self {
            AssetClass::Stock => AssetProfile {
                expected_return: 0.10,
                volatility: 0.20,
            },
            AssetClass::Crypto => AssetProfile {
                expected_return: 0.25,
                volatility: 0.80,
            },
            AssetClass::MutualFund => AssetProfile {
                expected_return: 0.08,
                volatility: 0.12,
            },
        }
    }
}

/// Annual expected return and volatility, both as fractions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfile {
    pub expected_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationInputs {
    pub starting_capital: f64,
    pub profile: AssetProfile,
    pub risk_level: u8,
    pub years: f64,
    pub start: YearMonth,
}

impl SimulationInputs {
    pub fn new(
        starting_capital: f64,
        asset_class: AssetClass,
        risk_level: u8,
        years: f64,
        start: YearMonth,
    ) -> Self {
        Self {
            starting_capital,
            profile: asset_class.profile(),
            risk_level,
            years,
            start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationPoint {
    pub date: YearMonth,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub path: Vec<SimulationPoint>,
    pub final_value: f64,
    pub cagr: f64,
    pub growth_percent: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPoint {
    pub date: YearMonth,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub paths: u32,
    pub bands: Vec<BandPoint>,
    pub median_final_value: f64,
    pub p10_final_value: f64,
    pub p90_final_value: f64,
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub(crate) fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}
