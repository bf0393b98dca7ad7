//! OAI-PMH protocol layer: requests, paging and response parsing.

mod client;
mod response;

pub use client::{OaiClient, RecordPages};
pub use response::{
    parse_identify, parse_list_metadata_formats, parse_list_records, Identify, ListRecordsPage,
    MetadataFormat,
};
