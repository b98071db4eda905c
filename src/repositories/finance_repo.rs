use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::PathBuf;

use super::FinanceRepository;
use crate::errors::StorageError;
use crate::models::{
    ExpenseRecord, ExpenseSort, NewExpense, ProfileField, ProfileSnapshot, ProfileUpdate,
    ProfileValue,
};

#[derive(Clone)]
pub struct SqliteFinanceRepo {
    path: PathBuf,
}

impl SqliteFinanceRepo {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let repo = Self { path };
        repo.init()?;
        Ok(repo)
    }

    fn init(&self) -> Result<(), StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                annual_income INTEGER,
                monthly_budget INTEGER,
                occupation TEXT,
                age INTEGER,
                location TEXT,
                financial_goal TEXT
            );
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                expense_date TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, expense_date);",
        )?;
        Ok(())
    }

    fn read_profile(conn: &Connection, user_id: &str) -> Result<ProfileSnapshot, StorageError> {
        let profile = conn
            .query_row(
                "SELECT annual_income, monthly_budget, occupation, age, location, financial_goal
                 FROM user_profiles
                 WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let mut profile = ProfileSnapshot::new();
                    profile.set_opt(ProfileField::AnnualIncome, row.get::<_, Option<i64>>(0)?);
                    profile.set_opt(ProfileField::MonthlyBudget, row.get::<_, Option<i64>>(1)?);
                    profile.set_opt(ProfileField::Occupation, row.get::<_, Option<String>>(2)?);
                    profile.set_opt(ProfileField::Age, row.get::<_, Option<i64>>(3)?);
                    profile.set_opt(ProfileField::Location, row.get::<_, Option<String>>(4)?);
                    profile.set_opt(ProfileField::FinancialGoal, row.get::<_, Option<String>>(5)?);
                    Ok(profile)
                },
            )
            .optional()?;
        Ok(profile.unwrap_or_default())
    }

    pub fn profile(&self, user_id: &str) -> Result<ProfileSnapshot, StorageError> {
        let conn = Connection::open(&self.path)?;
        Self::read_profile(&conn, user_id)
    }

    fn read_expense(row: &Row<'_>) -> rusqlite::Result<ExpenseRecord> {
        Ok(ExpenseRecord {
            name: row.get(0)?,
            amount: row.get(1)?,
            date: row.get::<_, NaiveDate>(2)?,
            category: row.get(3)?,
        })
    }

    /// Expenses newest first; ties on date fall back to insertion order, newest first.
    pub fn expenses(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ExpenseRecord>, StorageError> {
        let conn = Connection::open(&self.path)?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT name, amount, expense_date, category
             FROM expenses
             WHERE user_id = ?1
             ORDER BY expense_date DESC, id DESC
             LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![user_id, limit], Self::read_expense)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Expenses ordered by `sort`, or in insertion order when `sort` is `None`.
    /// Rows that tie on the sort column keep insertion order.
    pub fn expense_list(
        &self,
        user_id: &str,
        sort: Option<ExpenseSort>,
        descending: bool,
    ) -> Result<Vec<ExpenseRecord>, StorageError> {
        let direction = if descending { "DESC" } else { "ASC" };
        let order_by = match sort {
            Some(ExpenseSort::Amount) => format!("amount {}, id ASC", direction),
            Some(ExpenseSort::Date) => format!("expense_date {}, id ASC", direction),
            None => "id ASC".to_string(),
        };
        let conn = Connection::open(&self.path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT name, amount, expense_date, category
             FROM expenses
             WHERE user_id = ?1
             ORDER BY {}",
            order_by
        ))?;
        let records = stmt
            .query_map(params![user_id], Self::read_expense)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn insert_expense(&self, user_id: &str, expense: &NewExpense) -> Result<i64, StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.execute(
            "INSERT INTO expenses (user_id, name, amount, expense_date, category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                expense.name.trim(),
                expense.amount,
                expense.date,
                expense.category.trim()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn apply_profile_update(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileSnapshot, StorageError> {
        let mut conn = Connection::open(&self.path)?;
        let tx = conn.transaction()?;
        let mut profile = Self::read_profile(&tx, user_id)?;
        update.apply_to(&mut profile);

        let number = |field| profile.get(field).and_then(|v| v.as_number());
        let text = |field| {
            profile.get(field).map(|v| match v {
                ProfileValue::Text(t) => t.clone(),
                ProfileValue::Number(n) => n.to_string(),
            })
        };
        tx.execute(
            "INSERT INTO user_profiles
                (user_id, annual_income, monthly_budget, occupation, age, location, financial_goal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                annual_income = excluded.annual_income,
                monthly_budget = excluded.monthly_budget,
                occupation = excluded.occupation,
                age = excluded.age,
                location = excluded.location,
                financial_goal = excluded.financial_goal",
            params![
                user_id,
                number(ProfileField::AnnualIncome),
                number(ProfileField::MonthlyBudget),
                text(ProfileField::Occupation),
                number(ProfileField::Age),
                text(ProfileField::Location),
                text(ProfileField::FinancialGoal),
            ],
        )?;
        tx.commit()?;
        Ok(profile)
    }
}

#[async_trait]
impl FinanceRepository for SqliteFinanceRepo {
    async fn load_profile(&self, user_id: &str) -> Result<ProfileSnapshot, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || repo.profile(&user_id)).await?
    }

    async fn load_recent_expenses(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ExpenseRecord>, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || repo.expenses(&user_id, Some(limit))).await?
    }

    async fn load_all_expenses(&self, user_id: &str) -> Result<Vec<ExpenseRecord>, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || repo.expenses(&user_id, None)).await?
    }

    async fn list_expenses(
        &self,
        user_id: &str,
        sort: Option<ExpenseSort>,
        descending: bool,
    ) -> Result<Vec<ExpenseRecord>, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || repo.expense_list(&user_id, sort, descending)).await?
    }

    async fn add_expense(&self, user_id: &str, expense: &NewExpense) -> Result<i64, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        let expense = expense.clone();
        tokio::task::spawn_blocking(move || repo.insert_expense(&user_id, &expense)).await?
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileSnapshot, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        let update = update.clone();
        tokio::task::spawn_blocking(move || repo.apply_profile_update(&user_id, &update)).await?
    }
}
