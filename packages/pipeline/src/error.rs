use thiserror::Error;

use oaiharvest_harvester::HarvesterError;

use crate::config::MAX_PROVIDER_NAME_LEN;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Harvester(#[from] HarvesterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(
        "invalid provider name '{0}': must be at most {max} characters, \
         not \"all\", and not begin with \"http://\" or \"https://\"",
        max = MAX_PROVIDER_NAME_LEN
    )]
    InvalidProviderName(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no provider named '{0}'")]
    ProviderNotFound(String),

    #[error("a provider named '{0}' already exists")]
    DuplicateProvider(String),

    #[error("metadataPrefix '{prefix}' is not offered by the provider (available: {})", available.join(", "))]
    UnsupportedMetadataPrefix {
        prefix: String,
        available: Vec<String>,
    },

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
