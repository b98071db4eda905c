//! Personal finance tracker core: profile and expense storage, dashboard
//! aggregates, and an AI budget summary that is cached per user and
//! regenerated in the background when the underlying data changes.

pub mod config;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use config::Config;
pub use errors::{GenerationError, StorageError};
