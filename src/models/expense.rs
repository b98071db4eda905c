use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub name: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub category: String,
}

impl ExpenseRecord {
    pub fn new(
        name: impl Into<String>,
        amount: i64,
        date: NaiveDate,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            date,
            category: category.into(),
        }
    }

    pub fn canonical(&self) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("amount", Value::from(self.amount)),
            ("category", Value::from(self.category.as_str())),
            ("date", Value::from(self.date.format("%Y-%m-%d").to_string())),
            ("name", Value::from(self.name.as_str())),
        ])
    }
}

/// The most recent expenses for a user, most-recent-first.
///
/// Order is part of the fingerprint, so it is never re-sorted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSnapshot {
    records: Vec<ExpenseRecord>,
}

impl ExpenseSnapshot {
    /// Takes records already ordered most-recent-first and keeps the first `limit`.
    pub fn new(mut records: Vec<ExpenseRecord>, limit: usize) -> Self {
        records.truncate(limit);
        Self { records }
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct non-empty categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for record in &self.records {
            let category = record.category.trim();
            if !category.is_empty() && !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }
}

impl From<Vec<ExpenseRecord>> for ExpenseSnapshot {
    fn from(records: Vec<ExpenseRecord>) -> Self {
        Self { records }
    }
}

/// Column an expense listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseSort {
    Amount,
    Date,
}

impl ExpenseSort {
    /// `None` for unknown keys; listings then keep insertion order.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "amount" => Some(ExpenseSort::Amount),
            "date" => Some(ExpenseSort::Date),
            _ => None,
        }
    }
}

/// Sum of amounts, saturating instead of overflowing.
pub fn total_amount<'a, I>(expenses: I) -> i64
where
    I: IntoIterator<Item = &'a ExpenseRecord>,
{
    expenses
        .into_iter()
        .fold(0i64, |total, e| total.saturating_add(e.amount))
}

pub const MAX_EXPENSE_AMOUNT: i64 = 1_000_000_000_000;

/// Expense submitted by a user, validated before it reaches storage.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewExpense {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// At most `MAX_EXPENSE_AMOUNT`.
    #[validate(range(min = 0, max = 1000000000000))]
    pub amount: i64,
    pub date: NaiveDate,
    #[validate(length(max = 100))]
    pub category: String,
}
