pub mod cli;
pub mod toml_config;

use crate::domain::model::PublishMode;
#[cfg(feature = "cli")]
use crate::utils::error::{PublishError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
use std::path::{Path, PathBuf};

/// 這次執行要跑哪些階段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub ensure_dictionaries: bool,
    pub inject: bool,
    pub increment_version: bool,
    pub publish: Option<PublishMode>,
    pub preview: bool,
    pub fallback_to_import: bool,
}

impl RunOptions {
    pub fn patches_rule_pack(&self) -> bool {
        self.inject || self.increment_version
    }

    pub fn needs_rule_pack(&self) -> bool {
        self.patches_rule_pack() || self.publish.is_some()
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "sit-publish")]
#[command(about = "Sync keyword dictionaries and publish the SIT rule pack")]
pub struct CliConfig {
    /// Repository root (defaults to the tool's own directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file, relative to the root unless absolute
    #[arg(long, default_value = toml_config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Create or update the keyword dictionaries
    #[arg(long)]
    pub ensure_dictionaries: bool,

    /// Replace placeholder identities in the rule pack
    #[arg(long)]
    pub inject: bool,

    /// Increment the build component of the rule pack version
    #[arg(long)]
    pub increment_version: bool,

    /// Import the rule pack as a new package
    #[arg(long, conflicts_with = "update")]
    pub import: bool,

    /// Update the existing rule package
    #[arg(long)]
    pub update: bool,

    /// Preview changes without writing files or mutating remote objects
    #[arg(long, visible_alias = "dry-run")]
    pub what_if: bool,

    /// Fall back to import when the update target does not exist
    #[arg(long)]
    pub fallback_to_import: Option<bool>,

    /// Emit JSON logs
    #[arg(long)]
    pub log_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn root_dir(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")))
    }

    pub fn config_path(&self) -> PathBuf {
        resolve_under(&self.root_dir(), &self.config)
    }

    fn any_phase_selected(&self) -> bool {
        self.ensure_dictionaries || self.inject || self.increment_version || self.import || self.update
    }

    /// 沒有指定任何階段時，預設執行 ensure-dictionaries + inject
    pub fn run_options(&self, default_fallback: bool) -> RunOptions {
        let (ensure_dictionaries, inject) = if self.any_phase_selected() {
            (self.ensure_dictionaries, self.inject)
        } else {
            (true, true)
        };

        let publish = if self.import {
            Some(PublishMode::Import)
        } else if self.update {
            Some(PublishMode::Update)
        } else {
            None
        };

        RunOptions {
            ensure_dictionaries,
            inject,
            increment_version: self.increment_version,
            publish,
            preview: self.what_if,
            fallback_to_import: self.fallback_to_import.unwrap_or(default_fallback),
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let root = self.root_dir();
        if !root.is_dir() {
            return Err(PublishError::missing_path(
                "repository root",
                root.display().to_string(),
            ));
        }
        if self.import && self.update {
            return Err(PublishError::ConfigValidationError {
                field: "--import/--update".to_string(),
                message: "choose either --import or --update".to_string(),
            });
        }
        Ok(())
    }
}

pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
