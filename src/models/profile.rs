use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// The fixed set of profile fields that feed the AI summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    AnnualIncome,
    MonthlyBudget,
    Occupation,
    Age,
    Location,
    FinancialGoal,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::AnnualIncome,
        ProfileField::MonthlyBudget,
        ProfileField::Occupation,
        ProfileField::Age,
        ProfileField::Location,
        ProfileField::FinancialGoal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::AnnualIncome => "annual_income",
            ProfileField::MonthlyBudget => "monthly_budget",
            ProfileField::Occupation => "occupation",
            ProfileField::Age => "age",
            ProfileField::Location => "location",
            ProfileField::FinancialGoal => "financial_goal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::AnnualIncome => "Annual Income",
            ProfileField::MonthlyBudget => "Monthly Budget",
            ProfileField::Occupation => "Occupation",
            ProfileField::Age => "Age",
            ProfileField::Location => "Location",
            ProfileField::FinancialGoal => "Financial Goal",
        }
    }

    /// Whether values of this field are rendered with a currency symbol.
    pub fn is_monetary(&self) -> bool {
        matches!(self, ProfileField::AnnualIncome | ProfileField::MonthlyBudget)
    }

    /// Fields whose text values are read as integers when they parse.
    pub fn is_numeric(&self) -> bool {
        self.is_monetary() || matches!(self, ProfileField::Age)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Number(i64),
    Text(String),
}

impl ProfileValue {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            ProfileValue::Number(n) => Some(*n),
            ProfileValue::Text(text) => text.trim().parse().ok(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, ProfileValue::Text(text) if text.trim().is_empty())
    }
}

impl From<i64> for ProfileValue {
    fn from(value: i64) -> Self {
        ProfileValue::Number(value)
    }
}

impl From<i32> for ProfileValue {
    fn from(value: i32) -> Self {
        ProfileValue::Number(value as i64)
    }
}

impl From<&str> for ProfileValue {
    fn from(value: &str) -> Self {
        ProfileValue::Text(value.to_string())
    }
}

impl From<String> for ProfileValue {
    fn from(value: String) -> Self {
        ProfileValue::Text(value)
    }
}

/// Point-in-time view of a user's profile, rebuilt on every cache check.
///
/// Fields that were never set and text fields that are blank are both
/// treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    values: BTreeMap<ProfileField, ProfileValue>,
}

impl ProfileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: ProfileField, value: impl Into<ProfileValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: ProfileField, value: impl Into<ProfileValue>) {
        let value = value.into();
        if value.is_blank() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn set_opt<V: Into<ProfileValue>>(&mut self, field: ProfileField, value: Option<V>) {
        match value {
            Some(value) => self.set(field, value),
            None => {
                self.values.remove(&field);
            }
        }
    }

    pub fn get(&self, field: ProfileField) -> Option<&ProfileValue> {
        self.values.get(&field)
    }

    pub fn monthly_budget(&self) -> Option<i64> {
        self.get(ProfileField::MonthlyBudget)
            .and_then(ProfileValue::as_number)
    }

    /// Canonical mapping of every field, with unset fields mapped to `null`.
    /// Numeric fields holding integer text are encoded as numbers.
    pub fn canonical(&self) -> BTreeMap<&'static str, Value> {
        ProfileField::ALL
            .iter()
            .map(|field| {
                let value = match self.values.get(field) {
                    Some(value) if field.is_numeric() && value.as_number().is_some() => {
                        Value::from(value.as_number().unwrap_or_default())
                    }
                    Some(ProfileValue::Number(n)) => Value::from(*n),
                    Some(ProfileValue::Text(text)) => Value::from(text.trim()),
                    None => Value::Null,
                };
                (field.as_str(), value)
            })
            .collect()
    }
}

/// Partial profile update submitted by a user.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(range(min = 0))]
    pub annual_income: Option<i64>,
    #[validate(range(min = 0))]
    pub monthly_budget: Option<i64>,
    #[validate(length(max = 100))]
    pub occupation: Option<String>,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i64>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 200))]
    pub financial_goal: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.annual_income.is_none()
            && self.monthly_budget.is_none()
            && self.occupation.is_none()
            && self.age.is_none()
            && self.location.is_none()
            && self.financial_goal.is_none()
    }

    /// Apply the fields present in this update on top of `profile`.
    pub fn apply_to(&self, profile: &mut ProfileSnapshot) {
        if let Some(v) = self.annual_income {
            profile.set(ProfileField::AnnualIncome, v);
        }
        if let Some(v) = self.monthly_budget {
            profile.set(ProfileField::MonthlyBudget, v);
        }
        if let Some(v) = &self.occupation {
            profile.set(ProfileField::Occupation, v.as_str());
        }
        if let Some(v) = self.age {
            profile.set(ProfileField::Age, v);
        }
        if let Some(v) = &self.location {
            profile.set(ProfileField::Location, v.as_str());
        }
        if let Some(v) = &self.financial_goal {
            profile.set(ProfileField::FinancialGoal, v.as_str());
        }
    }
}
