use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted AI summary for one user. Always replaced whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub fingerprint: String,
    pub text: String,
    pub written_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(fingerprint: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            text: text.into(),
            written_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryState {
    Fresh,
    StaleServingOldText,
    StaleServingPlaceholder,
}

impl SummaryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryState::Fresh => "fresh",
            SummaryState::StaleServingOldText => "stale",
            SummaryState::StaleServingPlaceholder => "generating",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub display_text: String,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub state: SummaryState,
    pub refresh_scheduled: bool,
}
