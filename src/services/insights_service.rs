//! Dashboard aggregates over a user's expenses.
//!
//! These produce the rows a chart renderer consumes; rendering itself lives
//! elsewhere.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{total_amount, ExpenseRecord};
use crate::utils::format_amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedTotal {
    pub label: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeReadings {
    pub this_month: i64,
    pub last_month: i64,
    pub this_year: i64,
    pub monthly_budget: i64,
    /// Positive when over budget.
    pub budget_difference: i64,
    pub budget_used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTile {
    pub icon: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// Totals per expense name, in first-seen order.
pub fn totals_by_name(expenses: &[ExpenseRecord]) -> Vec<NamedTotal> {
    let mut totals: Vec<NamedTotal> = Vec::new();
    for expense in expenses {
        match totals.iter_mut().find(|t| t.label == expense.name) {
            Some(total) => total.amount = total.amount.saturating_add(expense.amount),
            None => totals.push(NamedTotal {
                label: expense.name.clone(),
                amount: expense.amount,
            }),
        }
    }
    totals
}

/// Totals per calendar year, ascending. Dates before 1901 are ignored.
pub fn totals_by_year(expenses: &[ExpenseRecord]) -> Vec<YearTotal> {
    let mut by_year: HashMap<i32, i64> = HashMap::new();
    for expense in expenses.iter().filter(|e| e.date.year() > 1900) {
        let total = by_year.entry(expense.date.year()).or_default();
        *total = total.saturating_add(expense.amount);
    }
    let mut totals: Vec<YearTotal> = by_year
        .into_iter()
        .map(|(year, amount)| YearTotal { year, amount })
        .collect();
    totals.sort_by_key(|t| t.year);
    totals
}

fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

fn in_month(expense: &ExpenseRecord, year: i32, month: u32) -> bool {
    expense.date.year() == year && expense.date.month() == month
}

/// `None` when nothing was spent this year or last year.
pub fn gauge_readings(
    expenses: &[ExpenseRecord],
    today: NaiveDate,
    monthly_budget: i64,
) -> Option<GaugeReadings> {
    let recent: Vec<&ExpenseRecord> = expenses
        .iter()
        .filter(|e| e.date.year() >= today.year() - 1)
        .collect();
    if recent.is_empty() {
        return None;
    }

    let (prev_year, prev_month) = previous_month(today);
    let sum = |pred: &dyn Fn(&ExpenseRecord) -> bool| -> i64 {
        total_amount(recent.iter().copied().filter(|e| pred(*e)))
    };
    let this_month = sum(&|e: &ExpenseRecord| in_month(e, today.year(), today.month()));
    let last_month = sum(&|e: &ExpenseRecord| in_month(e, prev_year, prev_month));
    let this_year = sum(&|e: &ExpenseRecord| e.date.year() == today.year());

    let budget_used_percent = if monthly_budget > 0 {
        this_month as f64 / monthly_budget as f64 * 100.0
    } else {
        0.0
    };

    Some(GaugeReadings {
        this_month,
        last_month,
        this_year,
        monthly_budget,
        budget_difference: this_month.saturating_sub(monthly_budget),
        budget_used_percent,
    })
}

/// The six dashboard status tiles for the current month.
pub fn status_tiles(
    expenses: &[ExpenseRecord],
    today: NaiveDate,
    monthly_budget: i64,
    currency: &str,
) -> Vec<StatusTile> {
    let this_month: Vec<&ExpenseRecord> = expenses
        .iter()
        .filter(|e| in_month(e, today.year(), today.month()))
        .collect();
    let total_spent = total_amount(this_month.iter().copied());
    let daily_avg = total_spent as f64 / today.day() as f64;

    // Most frequent name by count; ties go to the name seen first.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for expense in &this_month {
        match counts.iter_mut().find(|(name, _)| *name == expense.name) {
            Some((_, count)) => *count += 1,
            None => counts.push((expense.name.as_str(), 1)),
        }
    }
    let mut top: Option<(&str, usize)> = None;
    for (name, count) in &counts {
        if top.map_or(true, |(_, best)| *count > best) {
            top = Some((*name, *count));
        }
    }

    let (top_value, frequent_value) = match top {
        Some((name, count)) => {
            let top_total = total_amount(this_month.iter().copied().filter(|e| e.name == name));
            (
                format!("{}: {}", name, format_amount(currency, top_total)),
                format!("{} ({}×)", name, count),
            )
        }
        None => (
            format!("N/A: {}", format_amount(currency, 0)),
            "N/A (0×)".to_string(),
        ),
    };

    let budget_diff = total_spent.saturating_sub(monthly_budget);
    let budget_status = format!(
        "{} {}",
        format_amount(currency, budget_diff.saturating_abs()),
        if budget_diff > 0 { "over 🔴" } else { "under 🟢" }
    );

    vec![
        StatusTile {
            icon: "💰",
            label: "Total This Month",
            value: format_amount(currency, total_spent),
        },
        StatusTile {
            icon: "📊",
            label: "Daily Avg",
            value: format!("{}/day", format_amount(currency, daily_avg.round() as i64)),
        },
        StatusTile {
            icon: "🧊",
            label: "Transactions",
            value: this_month.len().to_string(),
        },
        StatusTile {
            icon: "📈",
            label: "Top Category",
            value: top_value,
        },
        StatusTile {
            icon: "🎯",
            label: "Budget Status",
            value: budget_status,
        },
        StatusTile {
            icon: "🔁",
            label: "Most Frequent",
            value: frequent_value,
        },
    ]
}

/// The `n` most recent expenses, newest first.
pub fn latest(expenses: &[ExpenseRecord], n: usize) -> Vec<ExpenseRecord> {
    let mut sorted = expenses.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(n);
    sorted
}
