//! The harvest loop: one session against one provider.

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::record::HarvestRequest;
use crate::schedule::{maybe_pause, Clock, SystemClock};
use crate::source::RecordSource;
use crate::store::RecordStore;

/// Pulls records from a source and applies them to a store.
///
/// A session is *completed* when the provider's record sequence was
/// exhausted. Stopping early, because of the record limit or cancellation,
/// is not an error but leaves the session incomplete, and callers must not
/// advance their last-harvest bookkeeping for it.
pub struct Harvester<S, T, C = SystemClock> {
    source: S,
    store: T,
    clock: C,
    respect_deletions: bool,
    cancel: CancellationToken,
}

impl<S, T> Harvester<S, T, SystemClock>
where
    S: RecordSource,
    T: RecordStore,
{
    pub fn new(source: S, store: T) -> Self {
        Self {
            source,
            store,
            clock: SystemClock,
            respect_deletions: true,
            cancel: CancellationToken::new(),
        }
    }
}

impl<S, T, C> Harvester<S, T, C>
where
    S: RecordSource,
    T: RecordStore,
    C: Clock,
{
    /// Replace the clock used by the incremental gate.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Harvester<S, T, C2> {
        Harvester {
            source: self.source,
            store: self.store,
            clock,
            respect_deletions: self.respect_deletions,
            cancel: self.cancel,
        }
    }

    /// Whether deletion notices remove stored records (the default).
    pub fn with_respect_deletions(mut self, respect_deletions: bool) -> Self {
        self.respect_deletions = respect_deletions;
        self
    }

    /// Token checked at every record boundary.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn into_store(self) -> T {
        self.store
    }

    /// Run one session. Returns whether every available record was processed.
    ///
    /// `NoRecordsMatch` and all other failures are returned as errors.
    pub fn harvest(&mut self, request: &HarvestRequest) -> Result<bool> {
        let prefix = request.metadata_prefix.as_str();
        let mut records = self.source.list_records(request)?;

        let mut stored = 0usize;
        let mut deleted = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(stored, deleted, "Harvest cancelled");
                return Ok(false);
            }

            if let Some(limit) = request.limit.filter(|&limit| limit > 0) {
                if stored >= limit {
                    tracing::info!(limit, deleted, "Stopping harvest; record limit reached");
                    return Ok(false);
                }
            }

            if maybe_pause(request.between.as_ref(), &self.clock, &self.cancel)
                && self.cancel.is_cancelled()
            {
                tracing::warn!(stored, deleted, "Harvest cancelled");
                return Ok(false);
            }

            let Some(item) = records.next() else {
                tracing::info!(stored, deleted, "Harvest completed");
                return Ok(true);
            };
            let record = item?;

            if !record.is_deleted {
                self.store.write(&record, prefix)?;
                stored += 1;
            } else if self.respect_deletions {
                tracing::debug!(
                    identifier = %record.identifier,
                    prefix,
                    "Respecting server request to delete record"
                );
                self.store.delete(&record, prefix)?;
                deleted += 1;
            } else {
                tracing::debug!(
                    identifier = %record.identifier,
                    prefix,
                    "Ignoring server request to delete record"
                );
            }
        }
    }
}
