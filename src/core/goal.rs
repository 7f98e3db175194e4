use super::calendar::YearMonth;
use super::ledger::net_by_month;
use super::types::{Goal, GoalProgress, GoalProjection, MonthlyNet, ProjectionPoint};

/// Builds the savings chart for `goal` as seen from `as_of`: cumulative
/// actual savings per month plus the linear glide path needed to reach the
/// target on time.
pub fn project_goal(goal: &Goal, series: &[MonthlyNet], as_of: YearMonth) -> GoalProjection {
    let Some(target_month) = goal.target_date else {
        return GoalProjection::default();
    };

    let nets = net_by_month(series);
    let first_known = nets.keys().next().copied();
    let last_known = nets.keys().next_back().copied();
    let window_start = first_known.unwrap_or(as_of);

    let mut running = 0.0;
    let mut points: Vec<ProjectionPoint> = window_start
        .range_inclusive(target_month)
        .map(|month| {
            if last_known.is_some_and(|last| month <= last) {
                running += nets.get(&month).copied().unwrap_or(0.0);
            }
            ProjectionPoint {
                month,
                actual: running,
                ideal: None,
            }
        })
        .collect();

    let current_saved = saved_to_date(series);
    let months_remaining = months_remaining(as_of, target_month);
    let remaining_amount = remaining_amount(goal.sanitized_target(), current_saved);
    let suggested_monthly = suggested_monthly(remaining_amount, months_remaining);

    let start_index = points
        .iter()
        .position(|p| p.month == as_of)
        .or_else(|| points.iter().position(|p| p.month > as_of))
        .unwrap_or(0);
    let mut ideal = current_saved;
    for (offset, point) in points.iter_mut().skip(start_index).enumerate() {
        if offset > 0 {
            ideal += suggested_monthly;
        }
        point.ideal = Some(ideal);
    }

    GoalProjection {
        suggested_monthly,
        current_saved,
        remaining_amount,
        months_remaining,
        points,
    }
}

/// Headline progress numbers for a goal card.
pub fn summarize_goal(goal: &Goal, series: &[MonthlyNet], as_of: YearMonth) -> GoalProgress {
    let target = goal.sanitized_target();
    let current_saved = saved_to_date(series);

    let percent = if target > 0.0 {
        (current_saved / target * 100.0).round().clamp(0.0, 100.0)
    } else {
        0.0
    };

    let Some(target_month) = goal.target_date else {
        return GoalProgress {
            current_saved,
            percent,
            ideal_to_date: 0.0,
            ahead_behind_amount: current_saved,
            is_ahead: current_saved >= 0.0,
            months_remaining: 0,
            suggested_monthly: remaining_amount(target, current_saved),
        };
    };

    let start = goal
        .created_at
        .or_else(|| series.iter().map(|row| row.month).min())
        .unwrap_or(as_of);
    let total_months = start.months_until(target_month).max(1);
    let elapsed_months = start.months_until(as_of).clamp(0, total_months);
    let ideal_to_date = target * (elapsed_months as f64 / total_months as f64);

    let months_remaining = months_remaining(as_of, target_month);
    let ahead_behind_amount = current_saved - ideal_to_date;

    GoalProgress {
        current_saved,
        percent,
        ideal_to_date,
        ahead_behind_amount,
        is_ahead: ahead_behind_amount >= 0.0,
        months_remaining,
        suggested_monthly: suggested_monthly(
            remaining_amount(target, current_saved),
            months_remaining,
        ),
    }
}

/// Total net savings across every supplied month. Both the chart and the
/// progress card use this figure.
fn saved_to_date(series: &[MonthlyNet]) -> f64 {
    series.iter().map(MonthlyNet::net).sum()
}

/// A zero target is already met, even when net savings are negative.
fn remaining_amount(target: f64, current_saved: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (target - current_saved).max(0.0)
}

fn months_remaining(as_of: YearMonth, target_month: YearMonth) -> u32 {
    as_of
        .months_until(target_month)
        .clamp(0, u32::MAX as i64) as u32
}

fn suggested_monthly(remaining_amount: f64, months_remaining: u32) -> f64 {
    if months_remaining > 0 {
        remaining_amount / months_remaining as f64
    } else {
        remaining_amount
    }
}
