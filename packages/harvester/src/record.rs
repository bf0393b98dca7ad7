//! Core data types for harvested records and harvest requests.

use chrono::{DateTime, NaiveTime, Utc};

use crate::config::DEFAULT_METADATA_PREFIX;

/// One harvested unit: OAI-PMH header, metadata body and about sections.
///
/// Constructed by the protocol layer for each item of a response page and
/// consumed exactly once by the harvester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Provider-assigned identifier, stable across re-harvests.
    pub identifier: String,

    /// Server-asserted tombstone (`<header status="deleted">`).
    pub is_deleted: bool,

    /// Provider's last-modified time for this record.
    pub datestamp: DateTime<Utc>,

    /// `setSpec` values listed in the header.
    pub set_specs: Vec<String>,

    /// Serialized XML payload; `None` for deleted records.
    pub metadata: Option<String>,

    /// Serialized `<about>` sections, passed through untouched.
    pub about: Vec<String>,
}

impl Record {
    /// Create a live record with a metadata body.
    pub fn new(
        identifier: impl Into<String>,
        datestamp: DateTime<Utc>,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            is_deleted: false,
            datestamp,
            set_specs: Vec::new(),
            metadata: Some(metadata.into()),
            about: Vec::new(),
        }
    }

    /// Create a deletion notice for `identifier`.
    pub fn deleted(identifier: impl Into<String>, datestamp: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            is_deleted: true,
            datestamp,
            set_specs: Vec::new(),
            metadata: None,
            about: Vec::new(),
        }
    }
}

/// Wall-clock window outside of which harvesting pauses.
///
/// `stop` earlier than `start` describes a window that wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub stop: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, stop: NaiveTime) -> Self {
        Self { start, stop }
    }
}

/// Parameters of one harvest session against one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub base_url: String,
    pub metadata_prefix: String,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub set: Option<String>,
    pub resumption_token: Option<String>,
    pub between: Option<TimeWindow>,
    pub limit: Option<usize>,
}

impl HarvestRequest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
            from: None,
            until: None,
            set: None,
            resumption_token: None,
            between: None,
            limit: None,
        }
    }

    pub fn with_metadata_prefix(mut self, metadata_prefix: impl Into<String>) -> Self {
        self.metadata_prefix = metadata_prefix.into();
        self
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = Some(set.into());
        self
    }

    pub fn with_resumption_token(mut self, token: impl Into<String>) -> Self {
        self.resumption_token = Some(token.into());
        self
    }

    pub fn with_between(mut self, window: TimeWindow) -> Self {
        self.between = Some(window);
        self
    }

    /// Cap the number of stored records. Zero means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }
}
