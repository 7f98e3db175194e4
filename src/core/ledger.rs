use std::collections::BTreeMap;

use super::calendar::YearMonth;
use super::types::{Entry, MonthlyLedger, MonthlyNet, finite_or_zero};

/// Folds dated income and expense entries into one row per month, sorted
/// chronologically. Entries whose date cannot be read as a month are
/// counted in `skipped_entries` and otherwise ignored.
pub fn monthly_series(income: &[Entry], expenses: &[Entry]) -> MonthlyLedger {
    let mut by_month: BTreeMap<YearMonth, MonthlyNet> = BTreeMap::new();
    let mut skipped_entries = 0;

    for (entries, is_income) in [(income, true), (expenses, false)] {
        for entry in entries {
            let Ok(month) = entry.date.parse::<YearMonth>() else {
                skipped_entries += 1;
                continue;
            };
            let row = by_month
                .entry(month)
                .or_insert_with(|| MonthlyNet::new(month, 0.0, 0.0));
            let amount = finite_or_zero(entry.amount);
            if is_income {
                row.income += amount;
            } else {
                row.expenses += amount;
            }
        }
    }

    MonthlyLedger {
        months: by_month.into_values().collect(),
        skipped_entries,
    }
}

/// Net savings keyed by month. Repeated months are summed.
pub(crate) fn net_by_month(series: &[MonthlyNet]) -> BTreeMap<YearMonth, f64> {
    let mut nets = BTreeMap::new();
    for row in series {
        *nets.entry(row.month).or_insert(0.0) += row.net();
    }
    nets
}
