pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpComplianceClient, MockComplianceService};
pub use config::{cli::LocalStorage, toml_config::PublisherConfig, RunOptions};
pub use core::engine::PublishEngine;
pub use utils::error::{PublishError, Result};
