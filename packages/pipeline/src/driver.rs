//! Harvest driver: resolves providers, runs one session per provider and
//! advances the registry's bookkeeping when a session completes.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use oaiharvest_harvester::{
    DirectoryRecordStore, HarvestRequest, Harvester, OaiClient, SubdirMode, TimeWindow,
    DEFAULT_METADATA_PREFIX,
};

use crate::config::ALL_PROVIDERS;
use crate::error::Result;
use crate::models::Provider;
use crate::registry::{self, is_url};

/// Options for one run of the harvest command, shared by every provider.
///
/// Unset values fall back to the registered provider's settings and then to
/// the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub metadata_prefix: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub set: Option<String>,
    pub between: Option<TimeWindow>,
    pub dir: Option<PathBuf>,
    pub respect_deletions: bool,
    pub limit: Option<usize>,
    pub subdirs: SubdirMode,
    pub resume_from: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            metadata_prefix: None,
            from: None,
            until: None,
            set: None,
            between: None,
            dir: None,
            respect_deletions: true,
            limit: None,
            subdirs: SubdirMode::Flat,
            resume_from: None,
        }
    }
}

/// A provider to harvest from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A base URL given on the command line.
    Url(String),
    Registered(Provider),
}

impl Target {
    pub fn label(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Registered(provider) => &provider.name,
        }
    }
}

/// Everything needed to run, and account for, one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPlan {
    /// Registered name whose `lastHarvest` advances on completion.
    pub provider_name: Option<String>,
    pub request: HarvestRequest,
    pub destination: PathBuf,
    /// End of the harvest slice: `--until` if given, else the session start.
    pub harvested_until: DateTime<Utc>,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// Every available record was processed.
    Completed,
    /// The provider had no records for the request.
    NothingToHarvest,
    /// Stopped early by the record limit or cancellation.
    Incomplete,
}

impl HarvestOutcome {
    /// Whether the provider's `lastHarvest` may advance.
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Completed | Self::NothingToHarvest)
    }
}

/// Counts of session outcomes over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub incomplete: usize,
    pub failed: usize,
    pub unknown: usize,
}

/// Provider arguments resolved against the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub targets: Vec<Target>,
    /// Names that are neither URLs nor registered.
    pub unknown: Vec<String>,
}

/// Turn provider arguments into harvest targets.
///
/// Arguments are deduplicated, `all` expands to every registered provider,
/// and names missing from the registry are logged and skipped.
pub async fn resolve_targets(pool: &SqlitePool, providers: &[String]) -> Result<ResolvedTargets> {
    let mut names: Vec<String> = Vec::new();
    for provider in providers {
        if provider == ALL_PROVIDERS {
            names.extend(
                registry::list_providers(pool)
                    .await?
                    .into_iter()
                    .map(|p| p.name),
            );
        } else {
            names.push(provider.clone());
        }
    }

    let mut seen = HashSet::new();
    let mut resolved = ResolvedTargets::default();
    for name in names {
        if !seen.insert(name.clone()) {
            continue;
        }
        if is_url(&name) {
            resolved.targets.push(Target::Url(name));
            continue;
        }
        match registry::find_provider(pool, &name).await? {
            Some(provider) => resolved.targets.push(Target::Registered(provider)),
            None => {
                tracing::error!(provider = %name, "Provider does not exist in the registry");
                resolved.unknown.push(name);
            }
        }
    }

    Ok(resolved)
}

/// Work out the request for one target.
///
/// Command-line values override registered ones, which override the
/// defaults. An explicit `from` overrides the recorded `lastHarvest`, and
/// resuming from a token suppresses the `lastHarvest`-derived `from`.
pub fn plan_harvest(target: &Target, options: &RunOptions, started_at: DateTime<Utc>) -> HarvestPlan {
    let (base_url, provider) = match target {
        Target::Url(url) => (url.as_str(), None),
        Target::Registered(provider) => (provider.url.as_str(), Some(provider)),
    };

    let metadata_prefix = match (&options.metadata_prefix, provider) {
        (Some(prefix), Some(p)) => {
            if *prefix != p.metadata_prefix {
                tracing::warn!(
                    provider = %p.name,
                    "Value for --metadataPrefix overrides registered value"
                );
            }
            prefix.clone()
        }
        (Some(prefix), None) => prefix.clone(),
        (None, Some(p)) => p.metadata_prefix.clone(),
        (None, None) => DEFAULT_METADATA_PREFIX.to_string(),
    };

    let destination = match (&options.dir, provider) {
        (Some(dir), Some(p)) => {
            tracing::warn!(provider = %p.name, "Value for --dir overrides registered destination");
            dir.clone()
        }
        (Some(dir), None) => dir.clone(),
        (None, Some(p)) => p.destination_path(),
        (None, None) => PathBuf::from("."),
    };

    let from = match (options.from, provider) {
        (Some(from), Some(p)) => {
            tracing::warn!(provider = %p.name, "Value for --from overrides recorded lastHarvest");
            Some(from)
        }
        (Some(from), None) => Some(from),
        (None, Some(_)) if options.resume_from.is_some() => None,
        // The epoch means "never harvested": ask for everything
        (None, Some(p)) => (p.last_harvest.timestamp() > 0).then_some(p.last_harvest),
        (None, None) => None,
    };

    let mut request = HarvestRequest::new(base_url).with_metadata_prefix(metadata_prefix);
    request.from = from;
    request.until = options.until;
    request.set = options.set.clone();
    request.resumption_token = options.resume_from.clone();
    request.between = options.between;
    request.limit = options.limit;

    HarvestPlan {
        provider_name: provider.map(|p| p.name.clone()),
        request,
        destination,
        harvested_until: options.until.unwrap_or(started_at),
    }
}

/// Run one session and update the registry if it completed.
#[tracing::instrument(skip_all, fields(provider = %plan.request.base_url))]
pub async fn execute_plan(
    pool: &SqlitePool,
    plan: &HarvestPlan,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> Result<HarvestOutcome> {
    let request = plan.request.clone();
    let destination = plan.destination.clone();
    let subdirs = options.subdirs;
    let respect_deletions = options.respect_deletions;
    let cancel = cancel.clone();

    let result = tokio::task::spawn_blocking(move || {
        let store = DirectoryRecordStore::new(destination, subdirs);
        let mut harvester = Harvester::new(OaiClient::new()?, store)
            .with_respect_deletions(respect_deletions)
            .with_cancellation(cancel);
        harvester.harvest(&request)
    })
    .await?;

    let outcome = match result {
        Ok(true) => HarvestOutcome::Completed,
        Ok(false) => HarvestOutcome::Incomplete,
        Err(e) if e.is_no_records_match() => {
            tracing::info!("0 records to harvest");
            tracing::debug!(
                from = ?plan.request.from,
                until = ?plan.request.until,
                set = ?plan.request.set,
                metadata_prefix = %plan.request.metadata_prefix,
                "The combination of from, until, set and metadataPrefix results in an empty list"
            );
            HarvestOutcome::NothingToHarvest
        }
        Err(e) => return Err(e.into()),
    };

    match (&plan.provider_name, outcome.is_complete()) {
        (Some(name), true) => {
            registry::update_last_harvest(pool, name, plan.harvested_until).await?;
            tracing::info!(last_harvest = %plan.harvested_until, "Recorded completed harvest");
        }
        (_, false) => {
            tracing::warn!("Harvesting incomplete; additional records were available from the server");
        }
        (None, true) => {}
    }

    Ok(outcome)
}

/// Harvest from every provider in turn.
///
/// A failure for one provider is logged and the run carries on with the
/// next; only registry failures while resolving providers abort the run.
pub async fn run(
    pool: &SqlitePool,
    providers: &[String],
    options: &RunOptions,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let resolved = resolve_targets(pool, providers).await?;
    let mut summary = RunSummary {
        unknown: resolved.unknown.len(),
        ..RunSummary::default()
    };

    for target in &resolved.targets {
        if cancel.is_cancelled() {
            tracing::warn!(provider = %target.label(), "Run cancelled; skipping provider");
            summary.incomplete += 1;
            continue;
        }

        match target {
            Target::Registered(p) => {
                tracing::info!(provider = %p.name, url = %p.url, "Harvesting from registered provider")
            }
            Target::Url(url) => tracing::info!(url = %url, "Harvesting from base URL"),
        }

        let plan = plan_harvest(target, options, Utc::now());
        match execute_plan(pool, &plan, options, cancel).await {
            Ok(outcome) if outcome.is_complete() => summary.completed += 1,
            Ok(_) => summary.incomplete += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::error!(
                    provider = %target.label(),
                    from = ?plan.request.from,
                    until = ?plan.request.until,
                    set = ?plan.request.set,
                    metadata_prefix = %plan.request.metadata_prefix,
                    error = %e,
                    "Harvest failed"
                );
            }
        }
    }

    Ok(summary)
}
