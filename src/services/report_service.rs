use chrono::{Datelike, NaiveDate};

use crate::models::{total_amount, ExpenseRecord, ProfileField, ProfileSnapshot};
use crate::utils::{format_amount, render_profile_field};

/// Plain-text budget report a user can download.
pub fn budget_report(
    profile: &ProfileSnapshot,
    expenses: &[ExpenseRecord],
    today: NaiveDate,
    currency: &str,
) -> String {
    let mut lines = vec![
        "FinTracker Budget Report".to_string(),
        format!("Generated on: {}", today.format("%Y-%m-%d")),
        String::new(),
        "== Profile ==".to_string(),
    ];
    for field in ProfileField::ALL {
        lines.push(format!(
            "{}: {}",
            field.label(),
            render_profile_field(profile, field, currency)
        ));
    }

    lines.push(String::new());
    lines.push("== Expenses ==".to_string());
    if expenses.is_empty() {
        lines.push("No expenses recorded.".to_string());
    }
    for expense in expenses {
        lines.push(format!(
            "{} | {} | {} | {}",
            expense.date.format("%Y-%m-%d"),
            expense.name,
            format_amount(currency, expense.amount),
            expense.category
        ));
    }

    let total = total_amount(expenses);
    let this_month = total_amount(
        expenses
            .iter()
            .filter(|e| e.date.year() == today.year() && e.date.month() == today.month()),
    );
    lines.push(format!("Total expenses: {}", format_amount(currency, total)));
    lines.push(format!("Spent this month: {}", format_amount(currency, this_month)));

    lines.push(String::new());
    lines.push("== Budget Status ==".to_string());
    lines.push(match profile.monthly_budget() {
        None => "Monthly budget not set.".to_string(),
        Some(budget) if this_month > budget => format!(
            "❌ Over Budget by {}",
            format_amount(currency, this_month.saturating_sub(budget))
        ),
        Some(budget) => format!(
            "✅ Within Budget ({} remaining)",
            format_amount(currency, budget.saturating_sub(this_month))
        ),
    });

    let mut report = lines.join("\n");
    report.push('\n');
    report
}
