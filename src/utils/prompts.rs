use crate::errors::GenerationError;
use crate::models::{ExpenseSnapshot, ProfileField, ProfileSnapshot, ProfileValue};
use crate::utils::format_amount;

pub const ERROR_PREFIX: &str = "❌ AI Error:";

/// Display form of one profile field: currency for money, `N/A` when unset.
pub fn render_profile_field(profile: &ProfileSnapshot, field: ProfileField, currency: &str) -> String {
    match profile.get(field) {
        None => "N/A".to_string(),
        Some(value) if field.is_monetary() && value.as_number().is_some() => {
            format_amount(currency, value.as_number().unwrap_or_default())
        }
        Some(ProfileValue::Number(n)) => n.to_string(),
        Some(ProfileValue::Text(text)) => text.trim().to_string(),
    }
}

/// Prompt asking the model for a short budget summary of the given snapshots.
///
/// Formatting is deterministic: the same snapshots always yield the same prompt.
pub fn budget_summary_prompt(
    profile: &ProfileSnapshot,
    expenses: &ExpenseSnapshot,
    currency: &str,
) -> String {
    let profile_lines = ProfileField::ALL
        .iter()
        .map(|field| format!("{}: {}", field.label(), render_profile_field(profile, *field, currency)))
        .collect::<Vec<_>>()
        .join("\n");

    let expense_lines = if expenses.is_empty() {
        "- No expenses recorded".to_string()
    } else {
        expenses
            .records()
            .iter()
            .map(|e| {
                let category = if e.category.trim().is_empty() {
                    "N/A"
                } else {
                    e.category.trim()
                };
                format!(
                    "- {} | {} | {} | {}",
                    e.date.format("%Y-%m-%d"),
                    e.name,
                    format_amount(currency, e.amount),
                    category
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let categories = expenses.categories();
    let category_line = if categories.is_empty() {
        String::new()
    } else {
        format!("\n\nExpense Categories: {}", categories.join(", "))
    };

    format!(
        r#"User Financial Profile:
{}

Recent Expenses:
{}{}

Give a short budget summary and 2 suggestions."#,
        profile_lines, expense_lines, category_line
    )
}

/// Drop everything from the first occurrence of `marker` onward.
///
/// An empty marker leaves the text untouched apart from trailing whitespace.
pub fn strip_from_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    if marker.is_empty() {
        return text.trim_end();
    }
    match text.find(marker) {
        Some(index) => text[..index].trim_end(),
        None => text.trim_end(),
    }
}

/// Text stored in place of a summary when generation fails.
pub fn generation_error_text(err: &GenerationError) -> String {
    format!("{} {}", ERROR_PREFIX, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseRecord;
    use chrono::NaiveDate;

    fn profile() -> ProfileSnapshot {
        ProfileSnapshot::new()
            .with(ProfileField::AnnualIncome, 1_200_000)
            .with(ProfileField::MonthlyBudget, "12000")
            .with(ProfileField::Occupation, "Engineer")
            .with(ProfileField::FinancialGoal, "Save 1 Cr")
    }

    fn expenses() -> ExpenseSnapshot {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        ExpenseSnapshot::from(vec![
            ExpenseRecord::new("Coffee", 100, date, "Food"),
            ExpenseRecord::new("Metro", 60, date, "Transport"),
            ExpenseRecord::new("Lunch", 250, date, "Food"),
        ])
    }

    #[test]
    fn prompt_renders_currency_and_unset_fields() {
        let prompt = budget_summary_prompt(&profile(), &expenses(), "₹");
        assert!(prompt.contains("Annual Income: ₹1,200,000"));
        assert!(prompt.contains("Monthly Budget: ₹12,000"));
        assert!(prompt.contains("Age: N/A"));
        assert!(prompt.contains("Location: N/A"));
        assert!(prompt.contains("- 2025-07-01 | Coffee | ₹100 | Food"));
    }

    #[test]
    fn monetary_text_that_is_not_a_number_is_shown_verbatim() {
        let profile = ProfileSnapshot::new()
            .with(ProfileField::AnnualIncome, " about 12 lakh ")
            .with(ProfileField::Age, 25);
        assert_eq!(
            render_profile_field(&profile, ProfileField::AnnualIncome, "₹"),
            "about 12 lakh"
        );
        assert_eq!(render_profile_field(&profile, ProfileField::Age, "₹"), "25");
    }

    #[test]
    fn prompt_lists_deduplicated_categories() {
        let prompt = budget_summary_prompt(&profile(), &expenses(), "₹");
        assert!(prompt.contains("Expense Categories: Food, Transport"));
    }

    #[test]
    fn prompt_without_expenses_omits_categories() {
        let prompt = budget_summary_prompt(&profile(), &ExpenseSnapshot::default(), "₹");
        assert!(prompt.contains("- No expenses recorded"));
        assert!(!prompt.contains("Expense Categories:"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(
            budget_summary_prompt(&profile(), &expenses(), "$"),
            budget_summary_prompt(&profile(), &expenses(), "$")
        );
    }

    #[test]
    fn strips_from_marker_onward() {
        let text = "Here are your insights.\n\nWould you like to export them?";
        assert_eq!(
            strip_from_marker(text, "Would you like"),
            "Here are your insights."
        );
    }

    #[test]
    fn strip_without_match_or_marker_keeps_text() {
        assert_eq!(strip_from_marker("Spend less.\n", "Would you like"), "Spend less.");
        assert_eq!(strip_from_marker("Would you like tea?", ""), "Would you like tea?");
    }

    #[test]
    fn error_text_is_clearly_marked() {
        let text = generation_error_text(&GenerationError::EmptyResponse);
        assert_eq!(
            text,
            "❌ AI Error: No valid response received from model."
        );
    }
}
