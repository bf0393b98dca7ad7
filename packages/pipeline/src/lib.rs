//! Provider registry and harvest driver for the `oai-harvest` and `oai-reg`
//! command-line tools.
//!
//! Registered providers live in a SQLite database together with the time of
//! their last completed harvest, so that each run only asks for records
//! changed since the previous one.

pub mod cli;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;

pub use config::PipelineConfig;
pub use db::{create_pool, open, run_migrations};
pub use driver::{HarvestOutcome, HarvestPlan, RunOptions, RunSummary, Target};
pub use error::{PipelineError, Result};
pub use models::{NewProvider, Provider};
