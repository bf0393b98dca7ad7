//! Seam between the harvest loop and the protocol layer.

use crate::error::Result;
use crate::record::{HarvestRequest, Record};

/// Something that can produce a lazy sequence of records for a request.
///
/// The sequence must not fetch more than it needs: the harvester stops
/// pulling once its limit is reached, and nothing past that point may be
/// requested from the provider.
pub trait RecordSource {
    type Records: Iterator<Item = Result<Record>>;

    /// Open a record sequence for `request`.
    ///
    /// Failures detected before the first record (an invalid provider, for
    /// instance) are returned here; failures while paging are yielded by
    /// the iterator.
    fn list_records(&self, request: &HarvestRequest) -> Result<Self::Records>;
}
