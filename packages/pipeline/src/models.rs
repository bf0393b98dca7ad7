use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// A registered OAI-PMH provider.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub destination: String,
    #[sqlx(rename = "metadataPrefix")]
    pub metadata_prefix: String,
    /// End of the last harvest slice that completed. The Unix epoch until
    /// the first complete harvest.
    #[sqlx(rename = "lastHarvest")]
    pub last_harvest: DateTime<Utc>,
}

impl Provider {
    pub fn destination_path(&self) -> PathBuf {
        PathBuf::from(&self.destination)
    }
}

/// Values for registering a new provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProvider {
    pub name: String,
    pub url: String,
    pub destination: PathBuf,
    pub metadata_prefix: String,
}
