use clap::Parser;
use console::style;

use oaiharvest_pipeline::cli::{run_harvest, HarvestCli};
use oaiharvest_pipeline::config::{PipelineConfig, HARVEST_LOG_FILE};
use oaiharvest_pipeline::logging;

#[tokio::main]
async fn main() {
    let cli = HarvestCli::parse();
    let log_directory = PipelineConfig::resolve(cli.database.as_deref())
        .ok()
        .map(|config| config.log_directory());
    let guard = logging::init(log_directory.as_deref(), HARVEST_LOG_FILE, "info");

    if let Err(e) = run_harvest(cli).await {
        tracing::debug!(error = %e, "Exiting with error");
        eprintln!("{} {e}", style("Error:").red().bold());
        drop(guard);
        std::process::exit(1);
    }
}
