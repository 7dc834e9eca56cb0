//! Error types for the sales bot.

use crate::config::ConfigError;

/// Main error type for the sales bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error(transparent)]
    Bot(#[from] rkl_sales_bot::error::Error),

    #[error("Boost dataset error: {0}")]
    Boost(#[from] rkl_sales_bot::error::BoostError),

    #[error("Feed client error: {0}")]
    Feed(#[from] rkl_sales_bot::error::FeedError),

    #[error("Publisher client error: {0}")]
    Publish(#[from] rkl_sales_bot::error::PublishError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] alloy::primitives::hex::FromHexError),

    #[error("Collection task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("All collection tasks stopped")]
    AllTasksStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
