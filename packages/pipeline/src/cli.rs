//! Command-line interfaces: `oai-harvest` and `oai-reg`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use console::style;
use tokio_util::sync::CancellationToken;

use oaiharvest_harvester::{
    parse_date, parse_time_of_day, SubdirMode, TimeWindow, DEFAULT_METADATA_PREFIX,
};

use crate::config::{expand_tilde, PipelineConfig, DATABASE_ENV, MAX_PROVIDER_NAME_LEN};
use crate::db;
use crate::driver::{self, RunOptions};
use crate::error::{PipelineError, Result};
use crate::models::{NewProvider, Provider};
use crate::registry;

/// Harvest records from OAI-PMH providers.
#[derive(Debug, Parser)]
#[command(name = "oai-harvest")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("deletions").args(["delete", "no_delete"])))]
#[command(group(ArgGroup::new("subdirs").args(["create_subdirs", "subdirs_on"])))]
pub struct HarvestCli {
    /// Provider to harvest from: a base URL, the short name of a registered
    /// provider, or "all" for every registered provider
    #[arg(required = true, value_name = "PROVIDER")]
    pub providers: Vec<String>,

    /// Path to the provider registry database
    #[arg(long = "db", visible_alias = "database", env = DATABASE_ENV, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// metadataPrefix of the format in which records are harvested
    #[arg(short = 'p', long = "metadataPrefix", value_name = "PREFIX")]
    pub metadata_prefix: Option<String>,

    /// Harvest only records added or modified after this date
    #[arg(short = 'f', long = "from", value_name = "YYYY-MM-DD", value_parser = date_arg)]
    pub from: Option<DateTime<Utc>>,

    /// Harvest only records added or modified up to this date
    #[arg(short = 'u', long, value_name = "YYYY-MM-DD", value_parser = date_arg)]
    pub until: Option<DateTime<Utc>>,

    /// Harvest only records within this set
    #[arg(short = 's', long)]
    pub set: Option<String>,

    /// Only harvest between these local times of day, pausing otherwise
    #[arg(short = 'b', long, num_args = 2, value_names = ["HH:MM", "HH:MM"])]
    pub between: Option<Vec<String>>,

    /// Where to write harvested records (default: registered destination,
    /// or the current directory)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Respect the server's deletion notices by deleting local files (default)
    #[arg(long)]
    pub delete: bool,

    /// Ignore the server's deletion notices
    #[arg(long)]
    pub no_delete: bool,

    /// Maximum number of records to store from each provider
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Create sub-directories for identifiers containing "/"
    #[arg(long)]
    pub create_subdirs: bool,

    /// Create sub-directories, splitting identifiers on this character
    #[arg(long, value_name = "CHAR")]
    pub subdirs_on: Option<char>,

    /// Resume an interrupted harvest from this resumption token
    #[arg(short = 'r', long, value_name = "TOKEN")]
    pub resume_from: Option<String>,
}

impl HarvestCli {
    /// Per-run options shared by every provider.
    pub fn run_options(&self) -> Result<RunOptions> {
        let between = match self.between.as_deref() {
            Some([start, stop]) => Some(TimeWindow::new(
                parse_time_of_day(start)?,
                parse_time_of_day(stop)?,
            )),
            Some(_) => {
                return Err(PipelineError::Config(
                    "--between takes exactly two times of day".into(),
                ))
            }
            None => None,
        };

        let subdirs = match (self.subdirs_on, self.create_subdirs) {
            (Some(c), _) => SubdirMode::Split(c),
            (None, true) => SubdirMode::slashes(),
            (None, false) => SubdirMode::Flat,
        };

        Ok(RunOptions {
            metadata_prefix: self.metadata_prefix.clone(),
            from: self.from,
            until: self.until,
            set: self.set.clone(),
            between,
            dir: self.dir.as_deref().map(expand_tilde),
            respect_deletions: !self.no_delete,
            limit: self.limit.filter(|&limit| limit > 0),
            subdirs,
            resume_from: self.resume_from.clone(),
        })
    }
}

fn date_arg(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_date(value).map_err(|e| e.to_string())
}

/// Run `oai-harvest`.
pub async fn run_harvest(cli: HarvestCli) -> Result<()> {
    let options = cli.run_options()?;
    let config = PipelineConfig::resolve(cli.database.as_deref())?;
    let pool = db::open(&config).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping at the next record");
            on_signal.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted again; exiting immediately");
                std::process::exit(130);
            }
        }
    });

    let result = driver::run(&pool, &cli.providers, &options, &cancel).await;
    pool.close().await;
    let summary = result?;

    eprintln!(
        "{} {} completed, {} incomplete, {} failed, {} unknown",
        style("Harvest finished:").bold(),
        style(summary.completed).green(),
        style(summary.incomplete).yellow(),
        style(summary.failed).red(),
        summary.unknown,
    );
    Ok(())
}

/// Manage the registry of OAI-PMH providers.
#[derive(Debug, Parser)]
#[command(name = "oai-reg")]
#[command(version, about, long_about = None)]
pub struct RegistryCli {
    /// Path to the provider registry database
    #[arg(short = 'd', long = "database", visible_alias = "db", env = DATABASE_ENV, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: RegistryCommand,
}

#[derive(Debug, Subcommand)]
pub enum RegistryCommand {
    /// Add a new OAI-PMH provider
    Add {
        /// Short identifying name for the provider
        name: String,

        /// Base URL of the provider
        url: String,

        /// metadataPrefix of the format in which records are harvested
        #[arg(short = 'p', long = "metadataPrefix", default_value = DEFAULT_METADATA_PREFIX)]
        metadata_prefix: String,

        /// Where to write harvested records (default: current directory)
        #[arg(short = 'd', long = "dir")]
        dest: Option<PathBuf>,
    },

    /// Remove registered OAI-PMH providers
    Rm {
        /// Short names of the providers to remove
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List registered OAI-PMH providers
    #[command(group(ArgGroup::new("column").args(["url", "dest", "metadata_prefix", "last_harvest"])))]
    List {
        /// List providers with their base URLs
        #[arg(short = 'u', long)]
        url: bool,

        /// List providers with their destinations
        #[arg(short = 'd', long)]
        dest: bool,

        /// List providers with their metadataPrefixes
        #[arg(short = 'p', long = "metadataPrefix")]
        metadata_prefix: bool,

        /// List providers with the time of their last completed harvest
        #[arg(short = 'l', long = "lastHarvest")]
        last_harvest: bool,
    },
}

/// Column shown next to the name by `oai-reg list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListColumn {
    NextHarvest,
    Url,
    Destination,
    MetadataPrefix,
    LastHarvest,
}

impl ListColumn {
    fn label(self) -> &'static str {
        match self {
            Self::NextHarvest => "URL for next harvest",
            Self::Url => "Base URL",
            Self::Destination => "Destination",
            Self::MetadataPrefix => "metadataPrefix",
            Self::LastHarvest => "Last Completed Harvest Time",
        }
    }

    fn value(self, provider: &Provider) -> String {
        match self {
            Self::NextHarvest => registry::next_harvest_url(provider),
            Self::Url => provider.url.clone(),
            Self::Destination => provider.destination.clone(),
            Self::MetadataPrefix => provider.metadata_prefix.clone(),
            Self::LastHarvest => provider.last_harvest.to_rfc3339(),
        }
    }
}

/// Render the `oai-reg list` table.
pub fn format_provider_table(providers: &[Provider], column: ListColumn) -> String {
    let label = column.label();
    let mut out = format!(
        "{:<width$} {label}\n{} {}\n",
        "name",
        "=".repeat(MAX_PROVIDER_NAME_LEN),
        "=".repeat(label.len()),
        width = MAX_PROVIDER_NAME_LEN
    );
    for provider in providers {
        out.push_str(&format!(
            "{:<width$} {}\n",
            provider.name,
            column.value(provider),
            width = MAX_PROVIDER_NAME_LEN
        ));
    }
    out
}

/// Hint listing the formats a provider offers, for a rejected `--metadataPrefix`.
pub fn format_available_prefixes(available: &[String]) -> String {
    if available.is_empty() {
        return "The provider does not list any metadata formats".to_string();
    }
    let mut out = format!("{}\n", style("Available metadataPrefix values:").bold());
    for prefix in available {
        out.push_str(&format!("  {prefix}\n"));
    }
    out.push_str("Run `oai-reg add` again with -p/--metadataPrefix set to one of these");
    out
}

/// Run `oai-reg`.
pub async fn run_registry(cli: RegistryCli) -> Result<()> {
    let config = PipelineConfig::resolve(cli.database.as_deref())?;
    let pool = db::open(&config).await?;
    let result = registry_command(&pool, cli.command).await;
    pool.close().await;
    result
}

async fn registry_command(pool: &sqlx::SqlitePool, command: RegistryCommand) -> Result<()> {
    match command {
        RegistryCommand::Add {
            name,
            url,
            metadata_prefix,
            dest,
        } => {
            let destination = match dest {
                Some(dir) => std::path::absolute(expand_tilde(&dir))?,
                None => {
                    let cwd = std::env::current_dir()?;
                    tracing::info!(
                        destination = %cwd.display(),
                        "Destination not supplied; using the current directory"
                    );
                    cwd
                }
            };
            let provider = registry::register_provider(
                pool,
                &NewProvider {
                    name,
                    url,
                    destination,
                    metadata_prefix,
                },
            )
            .await
            .inspect_err(|e| {
                if let PipelineError::UnsupportedMetadataPrefix { available, .. } = e {
                    eprintln!("{}", format_available_prefixes(available));
                }
            })?;
            println!(
                "{} {}",
                style("URL for next harvest:").green().bold(),
                registry::next_harvest_url(&provider)
            );
        }
        RegistryCommand::Rm { names } => {
            for name in names {
                match registry::remove_provider(pool, &name).await {
                    Ok(()) => {}
                    Err(PipelineError::ProviderNotFound(_)) => {
                        tracing::error!(provider = %name, "No provider with this name; not deleted");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        RegistryCommand::List {
            url,
            dest,
            metadata_prefix,
            last_harvest,
        } => {
            let column = if url {
                ListColumn::Url
            } else if dest {
                ListColumn::Destination
            } else if metadata_prefix {
                ListColumn::MetadataPrefix
            } else if last_harvest {
                ListColumn::LastHarvest
            } else {
                ListColumn::NextHarvest
            };
            let providers = registry::list_providers(pool).await?;
            print!("{}", format_provider_table(&providers, column));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_harvest_cli_defaults() {
        let cli = HarvestCli::try_parse_from(["oai-harvest", "ucl"]).unwrap();
        let options = cli.run_options().unwrap();

        assert_eq!(cli.providers, vec!["ucl"]);
        assert_eq!(options, RunOptions::default());
    }

    #[test]
    fn test_harvest_cli_all_flags() {
        let cli = HarvestCli::try_parse_from([
            "oai-harvest",
            "--db",
            "/tmp/reg.db",
            "-p",
            "mods",
            "-f",
            "2024-01-01",
            "-u",
            "2024-02-01",
            "-s",
            "theses",
            "-b",
            "23:00",
            "01:00",
            "-d",
            "/tmp/out",
            "--no-delete",
            "-l",
            "50",
            "--subdirs-on",
            ":",
            "-r",
            "tok",
            "ucl",
            "https://oai.example.com/oai",
        ])
        .unwrap();
        let options = cli.run_options().unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("/tmp/reg.db")));
        assert_eq!(cli.providers.len(), 2);
        assert_eq!(options.metadata_prefix.as_deref(), Some("mods"));
        assert_eq!(
            options.from,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            options.until,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(options.set.as_deref(), Some("theses"));
        assert!(options.between.is_some());
        assert_eq!(options.dir, Some(PathBuf::from("/tmp/out")));
        assert!(!options.respect_deletions);
        assert_eq!(options.limit, Some(50));
        assert_eq!(options.subdirs, SubdirMode::Split(':'));
        assert_eq!(options.resume_from.as_deref(), Some("tok"));
    }

    #[test]
    fn test_harvest_cli_rejects_bad_date() {
        assert!(HarvestCli::try_parse_from(["oai-harvest", "-f", "2024-13-01", "ucl"]).is_err());
    }

    #[test]
    fn test_harvest_cli_requires_provider() {
        assert!(HarvestCli::try_parse_from(["oai-harvest"]).is_err());
    }

    #[test]
    fn test_harvest_cli_deletion_flags_conflict() {
        assert!(
            HarvestCli::try_parse_from(["oai-harvest", "--delete", "--no-delete", "x"]).is_err()
        );
    }

    #[test]
    fn test_harvest_cli_create_subdirs_splits_on_slash() {
        let cli = HarvestCli::try_parse_from(["oai-harvest", "--create-subdirs", "x"]).unwrap();
        assert_eq!(cli.run_options().unwrap().subdirs, SubdirMode::Split('/'));
    }

    #[test]
    fn test_harvest_cli_zero_limit_is_unlimited() {
        let cli = HarvestCli::try_parse_from(["oai-harvest", "-l", "0", "x"]).unwrap();
        assert_eq!(cli.run_options().unwrap().limit, None);
    }

    #[test]
    fn test_harvest_cli_bad_between() {
        let cli = HarvestCli::try_parse_from(["oai-harvest", "-b", "9", "17:00", "x"]).unwrap();
        assert!(cli.run_options().is_err());
    }

    #[test]
    fn test_registry_cli_add() {
        let cli = RegistryCli::try_parse_from([
            "oai-reg",
            "-d",
            "/tmp/reg.db",
            "add",
            "ucl",
            "https://oai.example.com/oai",
            "-d",
            "~/ucl",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("/tmp/reg.db")));
        let RegistryCommand::Add {
            name,
            url,
            metadata_prefix,
            dest,
        } = cli.command
        else {
            panic!("expected add");
        };
        assert_eq!(name, "ucl");
        assert_eq!(url, "https://oai.example.com/oai");
        assert_eq!(metadata_prefix, "oai_dc");
        assert_eq!(dest, Some(PathBuf::from("~/ucl")));
    }

    #[test]
    fn test_registry_cli_list_columns_are_exclusive() {
        assert!(RegistryCli::try_parse_from(["oai-reg", "list", "-u", "-p"]).is_err());
        assert!(RegistryCli::try_parse_from(["oai-reg", "list", "-l"]).is_ok());
    }

    #[test]
    fn test_format_available_prefixes() {
        let hint = format_available_prefixes(&["oai_dc".to_string(), "mods".to_string()]);
        assert!(hint.contains("  oai_dc\n  mods\n"));
        assert!(hint.contains("--metadataPrefix"));

        assert_eq!(
            format_available_prefixes(&[]),
            "The provider does not list any metadata formats"
        );
    }

    #[test]
    fn test_format_provider_table() {
        let providers = vec![Provider {
            id: 1,
            name: "ucl".into(),
            url: "https://oai.example.com/oai".into(),
            destination: "/data/ucl".into(),
            metadata_prefix: "oai_dc".into(),
            last_harvest: DateTime::<Utc>::UNIX_EPOCH,
        }];

        let table = format_provider_table(&providers, ListColumn::Destination);
        assert_eq!(
            table,
            "name            Destination\n\
             =============== ===========\n\
             ucl             /data/ucl\n"
        );
    }
}
