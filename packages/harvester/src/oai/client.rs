//! OAI-PMH protocol client.

use std::vec;

use reqwest::blocking::Client;

use crate::config::Granularity;
use crate::error::{HarvesterError, Result};
use crate::http::{create_client, get_text};
use crate::oai::response::{
    parse_identify, parse_list_metadata_formats, parse_list_records, Identify, MetadataFormat,
};
use crate::record::{HarvestRequest, Record};
use crate::source::RecordSource;

/// Client for one or more OAI-PMH providers.
///
/// Cheap to clone; the underlying HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct OaiClient {
    http: Client,
}

impl OaiClient {
    /// Create a client with the default HTTP configuration.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(create_client()?))
    }

    /// Wrap an existing HTTP client.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Validate that `base_url` is an OAI-PMH endpoint and return its identity.
    ///
    /// A response that cannot be read as an `Identify` answer, or an HTTP
    /// client error, means the URL is not an OAI-PMH target. Transport
    /// failures are reported as they are.
    pub fn identify(&self, base_url: &str) -> Result<Identify> {
        let query = [("verb", "Identify".to_string())];
        let result = get_text(&self.http, base_url, &query).and_then(|body| parse_identify(&body));

        result.map_err(|e| match e {
            HarvesterError::XmlParse(_)
            | HarvesterError::MalformedResponse(_)
            | HarvesterError::OaiPmh { .. } => HarvesterError::NotAnOaiPmhTarget {
                url: base_url.to_string(),
                reason: e.to_string(),
            },
            HarvesterError::Http(ref source) if source.status().is_some() => {
                HarvesterError::NotAnOaiPmhTarget {
                    url: base_url.to_string(),
                    reason: e.to_string(),
                }
            }
            other => other,
        })
    }

    /// List the metadata formats a provider can disseminate.
    pub fn list_metadata_formats(&self, base_url: &str) -> Result<Vec<MetadataFormat>> {
        let query = [("verb", "ListMetadataFormats".to_string())];
        let body = get_text(&self.http, base_url, &query)?;
        parse_list_metadata_formats(&body)
    }

    /// Start a `ListRecords` session.
    ///
    /// Identifies the provider first to validate it and to learn the
    /// datestamp granularity for `from` and `until`. Pages are fetched
    /// lazily as the returned iterator is advanced.
    pub fn list_records(&self, request: &HarvestRequest) -> Result<RecordPages> {
        let identify = self.identify(&request.base_url)?;
        tracing::info!(
            repository = %identify.repository_name,
            granularity = ?identify.granularity,
            "Identified provider"
        );

        let query = first_page_query(request, identify.granularity);
        Ok(RecordPages {
            http: self.http.clone(),
            base_url: request.base_url.clone(),
            next_query: Some(query),
            buffer: Vec::new().into_iter(),
            last_token: None,
            pages: 0,
        })
    }
}

impl RecordSource for OaiClient {
    type Records = RecordPages;

    fn list_records(&self, request: &HarvestRequest) -> Result<RecordPages> {
        OaiClient::list_records(self, request)
    }
}

/// Query arguments for the first `ListRecords` request of a session.
///
/// When resuming, the token replaces `metadataPrefix` and `set`. An explicit
/// `from`/`until` is still sent after the token; how the provider treats it
/// is up to the provider.
fn first_page_query(request: &HarvestRequest, granularity: Granularity) -> Vec<(&'static str, String)> {
    let mut query = vec![("verb", "ListRecords".to_string())];

    if let Some(token) = &request.resumption_token {
        query.push(("resumptionToken", token.clone()));
        if request.from.is_some() || request.until.is_some() {
            tracing::warn!(
                from = ?request.from.map(|d| granularity.format(&d)),
                until = ?request.until.map(|d| granularity.format(&d)),
                "Sending from/until together with a resumption token; the provider may reject or ignore them"
            );
        }
        if let Some(set) = &request.set {
            tracing::warn!(set = %set, "Resuming from token; the set is taken from the token's own request");
        }
        if let Some(from) = &request.from {
            query.push(("from", granularity.format(from)));
        }
        if let Some(until) = &request.until {
            query.push(("until", granularity.format(until)));
        }
        return query;
    }

    query.push(("metadataPrefix", request.metadata_prefix.clone()));
    if let Some(from) = &request.from {
        query.push(("from", granularity.format(from)));
    }
    if let Some(until) = &request.until {
        query.push(("until", granularity.format(until)));
    }
    if let Some(set) = &request.set {
        query.push(("set", set.clone()));
    }

    query
}

/// Lazy sequence of records across `ListRecords` pages.
///
/// Each page is requested only once the records of the previous one have
/// been consumed. After an error the sequence ends.
#[derive(Debug)]
pub struct RecordPages {
    http: Client,
    base_url: String,
    next_query: Option<Vec<(&'static str, String)>>,
    buffer: vec::IntoIter<Record>,
    last_token: Option<String>,
    pages: usize,
}

impl RecordPages {
    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    fn fetch_page(&mut self, query: &[(&'static str, String)]) -> Result<bool> {
        let body = get_text(&self.http, &self.base_url, query)?;
        let page = match parse_list_records(&body) {
            Ok(page) => page,
            // Some providers answer the last continuation with an empty result
            Err(e) if e.is_no_records_match() && self.pages > 0 => {
                tracing::debug!(pages = self.pages, "Provider ended list with noRecordsMatch");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        self.pages += 1;
        tracing::debug!(
            page = self.pages,
            records = page.records.len(),
            has_more = page.resumption_token.is_some(),
            "Fetched ListRecords page"
        );

        if let Some(token) = &page.resumption_token {
            if self.last_token.as_ref() == Some(token) {
                return Err(HarvesterError::MalformedResponse(format!(
                    "provider repeated resumption token '{token}'"
                )));
            }
            self.next_query = Some(vec![
                ("verb", "ListRecords".to_string()),
                ("resumptionToken", token.clone()),
            ]);
        }
        self.last_token = page.resumption_token;
        self.buffer = page.records.into_iter();
        Ok(true)
    }
}

impl Iterator for RecordPages {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }

            let query = self.next_query.take()?;
            match self.fetch_page(&query) {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.next_query = None;
                    return Some(Err(e));
                }
            }
        }
    }
}
