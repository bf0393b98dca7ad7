//! oaiharvest harvester - pull records from OAI-PMH providers into a local store.
//!
//! This crate is the blocking core of the harvester: it speaks OAI-PMH to a
//! provider, follows resumption tokens across pages, and writes every record
//! to a [`store::RecordStore`] while honouring the provider's deletion
//! notices.
//!
//! # Example
//!
//! ```no_run
//! use oaiharvest_harvester::{
//!     DirectoryRecordStore, HarvestRequest, Harvester, OaiClient, SubdirMode,
//! };
//!
//! # fn main() -> oaiharvest_harvester::Result<()> {
//! let client = OaiClient::new()?;
//! let store = DirectoryRecordStore::new("records", SubdirMode::Flat);
//! let mut harvester = Harvester::new(client, store);
//!
//! let request = HarvestRequest::new("https://oai.example.com/oai").with_limit(100);
//! let completed = harvester.harvest(&request)?;
//! println!("completed: {completed}");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, datestamp granularity and argument parsing
//! - [`error`]: Error types and Result alias
//! - [`record`]: Records and harvest requests
//! - [`http`]: HTTP client with retry policy
//! - [`xml`]: XML navigation and fragment serialization
//! - [`oai`]: OAI-PMH verbs, paging and response parsing
//! - [`source`]: Record source trait the harvest loop pulls from
//! - [`store`]: Record stores
//! - [`schedule`]: Wall-clock window for incremental harvesting
//! - [`harvester`]: The harvest loop

pub mod config;
pub mod error;
pub mod harvester;
pub mod http;
pub mod oai;
pub mod record;
pub mod schedule;
pub mod source;
pub mod store;
pub mod xml;

pub use config::{parse_date, parse_time_of_day, Granularity, DEFAULT_METADATA_PREFIX};
pub use error::{HarvesterError, Result};
pub use harvester::Harvester;
pub use oai::{Identify, MetadataFormat, OaiClient, RecordPages};
pub use record::{HarvestRequest, Record, TimeWindow};
pub use schedule::{Clock, SystemClock};
pub use source::RecordSource;
pub use store::{DirectoryRecordStore, RecordStore, SubdirMode};

// Re-exported so callers can cancel a harvest without a direct dependency.
pub use tokio_util::sync::CancellationToken;
