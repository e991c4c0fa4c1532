use crate::config::toml_config::PublisherConfig;
use crate::config::RunOptions;
use crate::core::dictionary_sync::DictionarySynchronizer;
use crate::core::keywords::load_keyword_lists;
use crate::core::publish::PublishForwarder;
use crate::core::rule_pack::RulePackPatcher;
use crate::domain::model::{IdentityMap, PublishOutcome, RunSummary};
use crate::domain::ports::{ComplianceService, Storage};
use crate::utils::error::{PublishError, Result};
use chrono::Utc;
use std::collections::HashSet;

/// 依序執行：dictionaries -> rule pack patch -> publish
pub struct PublishEngine<S: Storage, C: ComplianceService> {
    storage: S,
    service: C,
    config: PublisherConfig,
    options: RunOptions,
}

impl<S: Storage, C: ComplianceService> PublishEngine<S, C> {
    pub fn new(storage: S, service: C, config: PublisherConfig, options: RunOptions) -> Self {
        Self {
            storage,
            service,
            config,
            options,
        }
    }

    /// 在任何遠端呼叫之前確認需要的本地檔案都存在
    async fn preflight(&self) -> Result<()> {
        if self.options.ensure_dictionaries && !self.storage.exists(&self.config.keywords.directory).await
        {
            return Err(PublishError::missing_path(
                "keyword directory",
                self.config.keywords.directory.clone(),
            ));
        }
        if self.options.needs_rule_pack() && !self.storage.exists(&self.config.rule_pack.path).await {
            return Err(PublishError::missing_path(
                "rule pack",
                self.config.rule_pack.path.clone(),
            ));
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let options = &self.options;
        let mut summary = RunSummary::new(options.preview);
        if options.preview {
            tracing::info!("🔍 WHAT-IF MODE - no files or remote objects will be modified");
        }

        self.preflight().await?;

        let lists = if options.ensure_dictionaries {
            load_keyword_lists(&self.storage, &self.config.keywords, |name| {
                self.config.description_for(name)
            })
            .await?
        } else {
            Vec::new()
        };

        let synchronizer = DictionarySynchronizer::new(&self.service, options.preview);
        let mut identities = IdentityMap::new();

        if options.ensure_dictionaries {
            tracing::info!("📚 Ensuring {} keyword dictionaries...", lists.len());
            let (results, synced) = synchronizer.sync_all(&lists).await?;
            for (name, identity) in synced.iter() {
                identities.insert(name, identity);
            }
            summary.dictionaries = results;
        }

        if options.inject {
            let handled: HashSet<&str> = summary
                .dictionaries
                .iter()
                .map(|r| r.name.as_str())
                .collect();
            let unresolved: Vec<&str> = self
                .config
                .placeholders
                .iter()
                .map(|b| b.dictionary.as_str())
                .filter(|name| !handled.contains(name) && identities.get(name).is_none())
                .collect();
            if !unresolved.is_empty() {
                tracing::debug!("Looking up {} existing dictionaries", unresolved.len());
                let existing = synchronizer.resolve_existing(unresolved).await;
                for (name, identity) in existing.iter() {
                    identities.insert(name, identity);
                }
            }
        }

        let patcher = RulePackPatcher::new(
            &self.storage,
            &self.config.rule_pack,
            &self.config.placeholders,
        );

        let patched = if options.patches_rule_pack() {
            tracing::info!("📝 Patching rule pack {}...", self.config.rule_pack.path);
            let patched = patcher
                .patch(
                    &identities,
                    options.inject,
                    options.increment_version,
                    options.preview,
                )
                .await?;
            let missing = patched.report.missing_identities();
            if !missing.is_empty() {
                tracing::warn!(
                    "⚠️ Partial injection: {} placeholder(s) left unresolved: {}",
                    missing.len(),
                    missing.join(", ")
                );
            }
            summary.patch = Some(patched.report.clone());
            Some(patched)
        } else {
            None
        };

        if let Some(mode) = options.publish {
            let rule_pack = match patched {
                Some(patched) => patched,
                None => patcher.read().await?,
            };

            let unresolved = patcher.unresolved(&rule_pack.text);
            summary.publish = Some(if unresolved.is_empty() {
                PublishForwarder::new(&self.service, options.fallback_to_import, options.preview)
                    .publish(&rule_pack.bytes, mode)
                    .await?
            } else {
                tracing::warn!(
                    "⚠️ Skipping {}: rule pack still contains placeholders {}",
                    mode,
                    unresolved.join(", ")
                );
                PublishOutcome::Skipped { unresolved }
            });
        }

        summary.finished_at = Some(Utc::now());
        Ok(summary)
    }
}
