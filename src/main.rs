use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

use fintracker_ai_service::config::{Config, SummaryBackend};
use fintracker_ai_service::models::{
    total_amount, ExpenseSort, NewExpense, ProfileUpdate, SummaryView,
};
use fintracker_ai_service::repositories::{
    FileSummaryStore, FinanceRepository, RedisSummaryStore, SqliteFinanceRepo, SqliteSummaryStore,
    SummaryStore,
};
use fintracker_ai_service::services::{
    budget_report, gauge_readings, latest, status_tiles, totals_by_name, totals_by_year,
    OpenRouterGenerator, SummaryService,
};
use fintracker_ai_service::utils::format_amount;

#[derive(Parser)]
#[command(name = "fintracker", version, about = "Personal finance tracker with an AI budget summary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the AI budget summary, refreshing it in the background if stale
    Summary {
        user: String,
        /// Wait for the background refresh and print the refreshed summary
        #[arg(long)]
        wait: bool,
    },
    /// Record an expense
    AddExpense {
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        amount: i64,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Update profile fields
    SetProfile {
        user: String,
        #[arg(long)]
        income: Option<i64>,
        #[arg(long)]
        budget: Option<i64>,
        #[arg(long)]
        occupation: Option<String>,
        #[arg(long)]
        age: Option<i64>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        goal: Option<String>,
    },
    /// List expenses with their total
    ListExpenses {
        user: String,
        /// `amount` or `date`; any other key keeps insertion order
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, value_enum, default_value_t = Order::Asc)]
        order: Order,
    },
    /// Print the downloadable budget report
    Report { user: String },
    /// Print dashboard aggregates as JSON
    Insights { user: String },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Order {
    Asc,
    Desc,
}

async fn build_summary_store(config: &Config) -> anyhow::Result<Arc<dyn SummaryStore>> {
    let sqlite = || -> anyhow::Result<Arc<dyn SummaryStore>> {
        Ok(Arc::new(SqliteSummaryStore::new(&config.storage.sqlite_path)?))
    };
    match config.storage.summary_backend {
        SummaryBackend::Sqlite => sqlite(),
        SummaryBackend::File => Ok(Arc::new(FileSummaryStore::new(
            &config.storage.summary_cache_dir,
        )?)),
        SummaryBackend::Redis => {
            match RedisSummaryStore::new(&config.storage.redis_url, &config.storage.redis_key_prefix)
                .await
            {
                Ok(store) => Ok(Arc::new(store)),
                Err(e) => {
                    error!("Failed to connect summary store to redis: {}; using sqlite", e);
                    sqlite()
                }
            }
        }
    }
}

fn print_summary(view: &SummaryView) {
    let refreshed = view
        .last_refreshed
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("[{} | last refreshed: {}]", view.state.as_str(), refreshed);
    println!("{}", view.display_text);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let finance = SqliteFinanceRepo::new(&config.storage.sqlite_path)
        .with_context(|| format!("opening {}", config.storage.sqlite_path))?;
    let currency = config.summary.currency_symbol.as_str();
    let today = Local::now().date_naive();

    match cli.command {
        Command::Summary { user, wait } => {
            let store = build_summary_store(&config).await?;
            let generator = Arc::new(OpenRouterGenerator::new(config.ai.clone())?);
            let service = SummaryService::start(generator, store, config.summary.clone());

            let view = service.summary_for_user(&finance, &user).await?;
            print_summary(&view);

            if wait && view.refresh_scheduled {
                service.queue().wait_idle().await;
                println!();
                print_summary(&service.summary_for_user(&finance, &user).await?);
            }
            if service.queue().in_flight() > 0 {
                info!("Waiting for background summary refresh to finish");
            }
            service.queue().shutdown().await;
        }
        Command::AddExpense {
            user,
            name,
            amount,
            date,
            category,
        } => {
            let expense = NewExpense {
                name,
                amount,
                date: date.unwrap_or(today),
                category,
            };
            expense.validate().context("invalid expense")?;
            let id = finance.add_expense(&user, &expense).await?;
            info!("Added expense {} for user {}", id, user);
        }
        Command::SetProfile {
            user,
            income,
            budget,
            occupation,
            age,
            location,
            goal,
        } => {
            let update = ProfileUpdate {
                annual_income: income,
                monthly_budget: budget,
                occupation,
                age,
                location,
                financial_goal: goal,
            };
            if update.is_empty() {
                anyhow::bail!("no profile fields given");
            }
            update.validate().context("invalid profile update")?;
            finance.update_profile(&user, &update).await?;
            info!("Updated profile for user {}", user);
        }
        Command::ListExpenses { user, sort, order } => {
            let sort_key = sort.as_deref().and_then(ExpenseSort::from_key);
            if sort.is_some() && sort_key.is_none() {
                warn!("Unknown sort key {:?}; listing in insertion order", sort);
            }
            let expenses = finance
                .list_expenses(&user, sort_key, order == Order::Desc)
                .await?;
            for expense in &expenses {
                println!(
                    "{} | {} | {} | {}",
                    expense.date.format("%Y-%m-%d"),
                    expense.name,
                    format_amount(currency, expense.amount),
                    expense.category
                );
            }
            println!("Total: {}", format_amount(currency, total_amount(&expenses)));
        }
        Command::Report { user } => {
            let profile = finance.load_profile(&user).await?;
            let expenses = finance.load_all_expenses(&user).await?;
            print!("{}", budget_report(&profile, &expenses, today, currency));
        }
        Command::Insights { user } => {
            let profile = finance.load_profile(&user).await?;
            let expenses = finance.load_all_expenses(&user).await?;
            let budget = profile
                .monthly_budget()
                .unwrap_or(config.summary.monthly_budget_fallback);
            let insights = serde_json::json!({
                "totals_by_name": totals_by_name(&expenses),
                "totals_by_year": totals_by_year(&expenses),
                "gauges": gauge_readings(&expenses, today, budget),
                "status_tiles": status_tiles(&expenses, today, budget, currency),
                "latest": latest(&expenses, 4),
            });
            println!("{}", serde_json::to_string_pretty(&insights)?);
        }
    }

    Ok(())
}
