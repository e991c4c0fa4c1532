use crate::core::keywords::parse_terms;
use crate::domain::model::{
    DictionarySyncResult, IdentityMap, KeywordList, NewDictionary, RemoteDictionary, SyncOutcome,
};
use crate::domain::ports::ComplianceService;
use crate::utils::error::{PublishError, RemoteError, RemoteOperation, Result};

/// 確保每個 keyword list 在遠端都有同名、同內容的 dictionary
pub struct DictionarySynchronizer<'a, C: ComplianceService + ?Sized> {
    service: &'a C,
    preview: bool,
}

impl<'a, C: ComplianceService + ?Sized> DictionarySynchronizer<'a, C> {
    pub fn new(service: &'a C, preview: bool) -> Self {
        Self { service, preview }
    }

    /// 依名稱完全比對查詢遠端 dictionary
    async fn find(&self, name: &str) -> std::result::Result<Option<RemoteDictionary>, RemoteError> {
        let dictionaries = self.service.list_dictionaries().await?;
        Ok(dictionaries.into_iter().find(|d| d.name == name))
    }

    pub async fn sync(&self, list: &KeywordList) -> Result<DictionarySyncResult> {
        let existing = match self.find(&list.name).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not look up dictionary '{}', skipping: {}",
                    list.name,
                    e
                );
                return Ok(DictionarySyncResult {
                    name: list.name.clone(),
                    outcome: SyncOutcome::Skipped {
                        reason: e.to_string(),
                    },
                    identity: None,
                });
            }
        };

        let (outcome, fallback_identity) = match existing {
            Some(remote) if content_matches(&remote, list) => {
                tracing::debug!("Dictionary '{}' is up to date", list.name);
                return Ok(DictionarySyncResult {
                    name: list.name.clone(),
                    outcome: SyncOutcome::Unchanged,
                    identity: Some(remote.identity),
                });
            }
            Some(remote) if self.preview => {
                tracing::info!("[what-if] Would update dictionary '{}'", list.name);
                return Ok(DictionarySyncResult {
                    name: list.name.clone(),
                    outcome: SyncOutcome::WouldUpdate,
                    identity: Some(remote.identity),
                });
            }
            None if self.preview => {
                tracing::info!("[what-if] Would create dictionary '{}'", list.name);
                return Ok(DictionarySyncResult {
                    name: list.name.clone(),
                    outcome: SyncOutcome::WouldCreate,
                    identity: None,
                });
            }
            Some(remote) => self.update_existing(&remote, list).await?,
            None => {
                let identity = self.create(list).await?;
                tracing::info!("✅ Created dictionary '{}'", list.name);
                (SyncOutcome::Created, identity)
            }
        };

        let identity = self.requery_identity(&list.name, fallback_identity).await;

        Ok(DictionarySyncResult {
            name: list.name.clone(),
            outcome,
            identity: Some(identity),
        })
    }

    async fn update_existing(
        &self,
        remote: &RemoteDictionary,
        list: &KeywordList,
    ) -> Result<(SyncOutcome, String)> {
        match self
            .service
            .update_dictionary(&remote.identity, &list.content())
            .await
        {
            Ok(()) => {
                tracing::info!("✅ Updated dictionary '{}'", list.name);
                Ok((SyncOutcome::Updated, remote.identity.clone()))
            }
            Err(e) if e.is_unsupported() => {
                tracing::warn!(
                    "⚠️ In-place update unsupported for '{}', recreating (identity will change)",
                    list.name
                );
                self.service
                    .delete_dictionary(&remote.identity)
                    .await
                    .map_err(|e| PublishError::remote(RemoteOperation::DeleteDictionary, e))?;
                let identity = self.create(list).await?;
                Ok((SyncOutcome::Recreated, identity))
            }
            Err(e) => Err(PublishError::remote(RemoteOperation::UpdateDictionary, e)),
        }
    }

    async fn create(&self, list: &KeywordList) -> Result<String> {
        self.service
            .create_dictionary(&NewDictionary::from(list))
            .await
            .map_err(|e| PublishError::remote(RemoteOperation::CreateDictionary, e))
    }

    /// 變更後重新查詢，以服務端的 identity 為準
    async fn requery_identity(&self, name: &str, fallback: String) -> String {
        match self.find(name).await {
            Ok(Some(remote)) => {
                if remote.identity != fallback {
                    tracing::debug!(
                        "Dictionary '{}' identity resolved to {} (was {})",
                        name,
                        remote.identity,
                        fallback
                    );
                }
                remote.identity
            }
            Ok(None) => {
                tracing::warn!(
                    "⚠️ Dictionary '{}' not listed after mutation, using {}",
                    name,
                    fallback
                );
                fallback
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not re-query dictionary '{}', using {}: {}",
                    name,
                    fallback,
                    e
                );
                fallback
            }
        }
    }

    /// 依序同步所有清單；查詢失敗只跳過該項，變更失敗則中止
    pub async fn sync_all(
        &self,
        lists: &[KeywordList],
    ) -> Result<(Vec<DictionarySyncResult>, IdentityMap)> {
        let mut results = Vec::with_capacity(lists.len());
        let mut identities = IdentityMap::new();

        for list in lists {
            let result = self.sync(list).await?;
            if let Some(identity) = &result.identity {
                identities.insert(result.name.clone(), identity.clone());
            }
            results.push(result);
        }

        Ok((results, identities))
    }

    /// 只讀查詢：把已存在的 dictionary 名稱對應到 identity
    pub async fn resolve_existing<'n, I>(&self, names: I) -> IdentityMap
    where
        I: IntoIterator<Item = &'n str>,
    {
        let dictionaries = match self.service.list_dictionaries().await {
            Ok(dictionaries) => dictionaries,
            Err(e) => {
                tracing::warn!("⚠️ Could not list dictionaries: {}", e);
                return IdentityMap::new();
            }
        };

        let mut identities = IdentityMap::new();
        for name in names {
            match dictionaries.iter().find(|d| d.name == name) {
                Some(remote) => identities.insert(name, remote.identity.clone()),
                None => tracing::warn!("⚠️ Dictionary '{}' does not exist remotely", name),
            }
        }
        identities
    }
}

fn content_matches(remote: &RemoteDictionary, list: &KeywordList) -> bool {
    match &remote.content {
        Some(content) => parse_terms(content.as_bytes())
            .map(|terms| terms == list.terms)
            .unwrap_or(false),
        None => false,
    }
}
