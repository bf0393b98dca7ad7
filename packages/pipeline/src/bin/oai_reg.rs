use clap::Parser;
use console::style;

use oaiharvest_pipeline::cli::{run_registry, RegistryCli};
use oaiharvest_pipeline::config::{PipelineConfig, REGISTRY_LOG_FILE};
use oaiharvest_pipeline::logging;

#[tokio::main]
async fn main() {
    let cli = RegistryCli::parse();
    let log_directory = PipelineConfig::resolve(cli.database.as_deref())
        .ok()
        .map(|config| config.log_directory());
    // Registry commands are quiet on the console unless something goes wrong
    let guard = logging::init(log_directory.as_deref(), REGISTRY_LOG_FILE, "warn");

    if let Err(e) = run_registry(cli).await {
        tracing::debug!(error = %e, "Exiting with error");
        eprintln!("{} {e}", style("Error:").red().bold());
        drop(guard);
        std::process::exit(1);
    }
}
