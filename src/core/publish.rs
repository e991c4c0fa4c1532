use crate::domain::model::{PublishMode, PublishOutcome};
use crate::domain::ports::ComplianceService;
use crate::utils::error::{PublishError, Result};

/// 把 rule pack bytes 送到 import 或 update
pub struct PublishForwarder<'a, C: ComplianceService + ?Sized> {
    service: &'a C,
    fallback_to_import: bool,
    preview: bool,
}

impl<'a, C: ComplianceService + ?Sized> PublishForwarder<'a, C> {
    pub fn new(service: &'a C, fallback_to_import: bool, preview: bool) -> Self {
        Self {
            service,
            fallback_to_import,
            preview,
        }
    }

    pub async fn publish(&self, bytes: &[u8], mode: PublishMode) -> Result<PublishOutcome> {
        if self.preview {
            tracing::info!("[what-if] Would {} rule package ({} bytes)", mode, bytes.len());
            return Ok(match mode {
                PublishMode::Import => PublishOutcome::WouldImport,
                PublishMode::Update => PublishOutcome::WouldUpdate,
            });
        }

        match mode {
            PublishMode::Import => {
                self.import(bytes).await?;
                Ok(PublishOutcome::Imported)
            }
            PublishMode::Update => self.update(bytes).await,
        }
    }

    async fn import(&self, bytes: &[u8]) -> Result<()> {
        tracing::info!("📤 Importing rule package ({} bytes)", bytes.len());
        self.service
            .import_rule_package(bytes)
            .await
            .map_err(|e| PublishError::ImportFailedError {
                message: e.to_string(),
            })?;
        tracing::info!("✅ Rule package imported");
        Ok(())
    }

    async fn update(&self, bytes: &[u8]) -> Result<PublishOutcome> {
        tracing::info!("📤 Updating rule package ({} bytes)", bytes.len());
        match self.service.update_rule_package(bytes).await {
            Ok(()) => {
                tracing::info!("✅ Rule package updated");
                Ok(PublishOutcome::Updated)
            }
            Err(e) if e.is_not_found() && self.fallback_to_import => {
                tracing::warn!("⚠️ Rule package not found remotely ({}), importing instead", e);
                self.service
                    .import_rule_package(bytes)
                    .await
                    .map_err(|e| PublishError::ImportFailedError {
                        message: format!("fallback import after update not found: {}", e),
                    })?;
                tracing::info!("✅ Rule package imported");
                Ok(PublishOutcome::UpdatedViaImport)
            }
            Err(e) if e.is_not_found() => Err(PublishError::UpdateFailedError {
                message: format!("{} (fallback to import is disabled)", e),
            }),
            Err(e) => Err(PublishError::UpdateFailedError {
                message: e.to_string(),
            }),
        }
    }
}
