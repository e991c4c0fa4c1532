//! adapters::mock
//!
//! In-memory compliance service for deterministic testing and offline runs.
//!
//! Dictionaries and the rule package are kept in memory, every call is
//! recorded, and individual operations can be configured to fail.
//!
//! # Example
//!
//! ```
//! use sit_publisher::adapters::mock::MockComplianceService;
//! use sit_publisher::domain::model::NewDictionary;
//! use sit_publisher::domain::ports::ComplianceService;
//!
//! # tokio_test::block_on(async {
//! let service = MockComplianceService::new();
//! let identity = service
//!     .create_dictionary(&NewDictionary {
//!         name: "Diagnosis".to_string(),
//!         description: "Diagnosis terms".to_string(),
//!         content: "asthma".to_string(),
//!     })
//!     .await
//!     .unwrap();
//!
//! let listed = service.list_dictionaries().await.unwrap();
//! assert_eq!(listed[0].identity, identity);
//! # });
//! ```

use crate::domain::model::{NewDictionary, RemoteDictionary};
use crate::domain::ports::{ComplianceService, RemoteResult};
use crate::utils::error::RemoteError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListDictionaries,
    CreateDictionary(String),
    UpdateDictionary(String),
    DeleteDictionary(String),
    ImportRulePackage(usize),
    UpdateRulePackage(usize),
}

impl MockOperation {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, MockOperation::ListDictionaries)
    }
}

/// 指定哪個操作要失敗 (之後每次呼叫都會失敗)
#[derive(Debug, Clone)]
pub enum FailOn {
    ListDictionaries(RemoteError),
    CreateDictionary(RemoteError),
    UpdateDictionary(RemoteError),
    DeleteDictionary(RemoteError),
    ImportRulePackage(RemoteError),
    UpdateRulePackage(RemoteError),
}

#[derive(Debug, Clone)]
pub struct MockComplianceService {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug)]
struct MockInner {
    dictionaries: Vec<RemoteDictionary>,
    rule_package: Option<Vec<u8>>,
    next_identity: u64,
    supports_update: bool,
    failures: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

impl Default for MockComplianceService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockComplianceService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                dictionaries: Vec::new(),
                rule_package: None,
                next_identity: 1,
                supports_update: true,
                failures: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// 模擬不支援就地更新 dictionary 的服務
    pub fn without_dictionary_update(self) -> Self {
        self.lock().supports_update = false;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        // poisoned 只會發生在測試 panic 之後
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seed_dictionary(&self, name: &str, content: &str) -> String {
        let mut inner = self.lock();
        let identity = inner.allocate_identity();
        inner.dictionaries.push(RemoteDictionary {
            identity: identity.clone(),
            name: name.to_string(),
            description: None,
            content: Some(content.to_string()),
        });
        identity
    }

    pub fn seed_rule_package(&self, bytes: &[u8]) {
        self.lock().rule_package = Some(bytes.to_vec());
    }

    pub fn dictionary(&self, name: &str) -> Option<RemoteDictionary> {
        self.lock()
            .dictionaries
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    pub fn rule_package(&self) -> Option<Vec<u8>> {
        self.lock().rule_package.clone()
    }

    pub fn fail_on(&self, failure: FailOn) {
        self.lock().failures.push(failure);
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn mutations(&self) -> Vec<MockOperation> {
        self.operations()
            .into_iter()
            .filter(MockOperation::is_mutation)
            .collect()
    }

    pub fn count<F: Fn(&MockOperation) -> bool>(&self, predicate: F) -> usize {
        self.lock().operations.iter().filter(|op| predicate(*op)).count()
    }
}

impl MockInner {
    fn allocate_identity(&mut self) -> String {
        let identity = format!("00000000-0000-4000-8000-{:012}", self.next_identity);
        self.next_identity += 1;
        identity
    }

    fn failure(&self, select: impl Fn(&FailOn) -> Option<&RemoteError>) -> RemoteResult<()> {
        match self.failures.iter().find_map(select) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ComplianceService for MockComplianceService {
    async fn list_dictionaries(&self) -> RemoteResult<Vec<RemoteDictionary>> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::ListDictionaries);
        inner.failure(|f| match f {
            FailOn::ListDictionaries(e) => Some(e),
            _ => None,
        })?;
        Ok(inner.dictionaries.clone())
    }

    async fn create_dictionary(&self, request: &NewDictionary) -> RemoteResult<String> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::CreateDictionary(request.name.clone()));
        inner.failure(|f| match f {
            FailOn::CreateDictionary(e) => Some(e),
            _ => None,
        })?;
        if inner.dictionaries.iter().any(|d| d.name == request.name) {
            return Err(RemoteError::Api {
                status: 409,
                message: format!("dictionary '{}' already exists", request.name),
            });
        }

        let identity = inner.allocate_identity();
        inner.dictionaries.push(RemoteDictionary {
            identity: identity.clone(),
            name: request.name.clone(),
            description: Some(request.description.clone()),
            content: Some(request.content.clone()),
        });
        Ok(identity)
    }

    async fn update_dictionary(&self, identity: &str, content: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::UpdateDictionary(identity.to_string()));
        inner.failure(|f| match f {
            FailOn::UpdateDictionary(e) => Some(e),
            _ => None,
        })?;
        if !inner.supports_update {
            return Err(RemoteError::Unsupported("updateDictionary".to_string()));
        }

        match inner.dictionaries.iter_mut().find(|d| d.identity == identity) {
            Some(dictionary) => {
                dictionary.content = Some(content.to_string());
                Ok(())
            }
            None => Err(RemoteError::NotFound(identity.to_string())),
        }
    }

    async fn delete_dictionary(&self, identity: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::DeleteDictionary(identity.to_string()));
        inner.failure(|f| match f {
            FailOn::DeleteDictionary(e) => Some(e),
            _ => None,
        })?;

        let before = inner.dictionaries.len();
        inner.dictionaries.retain(|d| d.identity != identity);
        if inner.dictionaries.len() == before {
            return Err(RemoteError::NotFound(identity.to_string()));
        }
        Ok(())
    }

    async fn import_rule_package(&self, bytes: &[u8]) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::ImportRulePackage(bytes.len()));
        inner.failure(|f| match f {
            FailOn::ImportRulePackage(e) => Some(e),
            _ => None,
        })?;
        inner.rule_package = Some(bytes.to_vec());
        Ok(())
    }

    async fn update_rule_package(&self, bytes: &[u8]) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::UpdateRulePackage(bytes.len()));
        inner.failure(|f| match f {
            FailOn::UpdateRulePackage(e) => Some(e),
            _ => None,
        })?;
        match inner.rule_package.as_mut() {
            Some(existing) => {
                *existing = bytes.to_vec();
                Ok(())
            }
            None => Err(RemoteError::NotFound("rule package".to_string())),
        }
    }
}
