//! Shared domain types and configuration for hnrank.

pub mod app_config;
pub mod config;
pub mod ranking;
pub mod time_text;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ProviderKind, MAX_RESCORE_INTERVAL_SECS};
pub use config::{load_app_config, load_app_config_from_env};
pub use ranking::{
    ArticleRecord, FeedbackEntry, Insight, NewFeedback, NewRanking, RankingSnapshot, Vote,
};
pub use time_text::{check_sort_order, parse_age_minutes, SortCheck};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
