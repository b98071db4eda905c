use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageSettings,
    pub ai: AiConfig,
    pub summary: SummarySettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryBackend {
    Sqlite,
    Redis,
    File,
}

impl FromStr for SummaryBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(SummaryBackend::Sqlite),
            "redis" => Ok(SummaryBackend::Redis),
            "file" => Ok(SummaryBackend::File),
            other => anyhow::bail!("unknown summary store backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub sqlite_path: String,
    pub summary_backend: SummaryBackend,
    pub redis_url: String,
    pub redis_key_prefix: String,
    pub summary_cache_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub system_prompt: String,
    pub referer: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySettings {
    pub recent_expense_limit: usize,
    pub placeholder: String,
    pub strip_marker: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub single_flight: bool,
    pub currency_symbol: String,
    pub monthly_budget_fallback: i64,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            recent_expense_limit: 20,
            placeholder: "⏳ Generating your AI budget summary…".to_string(),
            strip_marker: "Would you like".to_string(),
            workers: num_cpus::get(),
            queue_capacity: 64,
            single_flight: false,
            currency_symbol: "₹".to_string(),
            monthly_budget_fallback: 25_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                sqlite_path: "data/fintracker.db".to_string(),
                summary_backend: SummaryBackend::Sqlite,
                redis_url: "redis://127.0.0.1:6379".to_string(),
                redis_key_prefix: "fintracker:summary:".to_string(),
                summary_cache_dir: "data/ai_cache".to_string(),
            },
            ai: AiConfig {
                base_url: "https://openrouter.ai/api/v1".to_string(),
                api_key: String::new(),
                model_name: "deepseek/deepseek-r1-0528:free".to_string(),
                max_tokens: 600,
                temperature: 0.7,
                request_timeout_secs: 60,
                system_prompt: "You are a financial assistant. Give a short budget summary and 2 suggestions only.".to_string(),
                referer: "http://localhost:5000".to_string(),
                title: "FinTracker AI".to_string(),
            },
            summary: SummarySettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Config::default();

        // Storage configuration
        if let Ok(sqlite_path) = env::var("SQLITE_PATH") {
            config.storage.sqlite_path = sqlite_path;
        }
        if let Ok(backend) = env::var("SUMMARY_STORE") {
            config.storage.summary_backend = backend.parse()?;
        }
        if let Ok(redis_url) = env::var("REDIS_URL") {
            config.storage.redis_url = redis_url;
        }
        if let Ok(prefix) = env::var("REDIS_KEY_PREFIX") {
            config.storage.redis_key_prefix = prefix;
        }
        if let Ok(dir) = env::var("SUMMARY_CACHE_DIR") {
            config.storage.summary_cache_dir = dir;
        }

        // AI configuration
        if let Ok(base_url) = env::var("OPENROUTER_BASE_URL") {
            config.ai.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(api_key) = env::var("OPENROUTER_API_KEY") {
            config.ai.api_key = api_key;
        }
        if let Ok(model_name) = env::var("MODEL_NAME") {
            config.ai.model_name = model_name;
        }
        if let Ok(max_tokens) = env::var("MAX_TOKENS") {
            config.ai.max_tokens = max_tokens.parse()?;
        }
        if let Ok(temperature) = env::var("TEMPERATURE") {
            config.ai.temperature = temperature.parse()?;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECS") {
            config.ai.request_timeout_secs = timeout.parse()?;
        }
        if let Ok(system_prompt) = env::var("SYSTEM_PROMPT") {
            config.ai.system_prompt = system_prompt;
        }
        if let Ok(referer) = env::var("APP_REFERER") {
            config.ai.referer = referer;
        }
        if let Ok(title) = env::var("APP_TITLE") {
            config.ai.title = title;
        }

        // Summary cache configuration
        if let Ok(limit) = env::var("SUMMARY_RECENT_EXPENSES") {
            config.summary.recent_expense_limit = limit.parse()?;
        }
        if let Ok(placeholder) = env::var("SUMMARY_PLACEHOLDER") {
            config.summary.placeholder = placeholder;
        }
        if let Ok(marker) = env::var("SUMMARY_STRIP_MARKER") {
            config.summary.strip_marker = marker;
        }
        if let Ok(workers) = env::var("SUMMARY_WORKERS") {
            config.summary.workers = workers.parse()?;
        }
        if let Ok(capacity) = env::var("SUMMARY_QUEUE_CAPACITY") {
            config.summary.queue_capacity = capacity.parse()?;
        }
        if let Ok(single_flight) = env::var("SUMMARY_SINGLE_FLIGHT") {
            config.summary.single_flight = single_flight.parse()?;
        }
        if let Ok(symbol) = env::var("CURRENCY_SYMBOL") {
            config.summary.currency_symbol = symbol;
        }
        if let Ok(fallback) = env::var("MONTHLY_BUDGET_FALLBACK") {
            config.summary.monthly_budget_fallback = fallback.parse()?;
        }

        config.summary.workers = config.summary.workers.max(1);
        config.summary.queue_capacity = config.summary.queue_capacity.max(1);

        Ok(config)
    }
}
