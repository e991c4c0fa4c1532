use crate::domain::model::{NewDictionary, RemoteDictionary};
use crate::utils::error::{RemoteError, Result};
use async_trait::async_trait;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// 列出目錄下指定副檔名的檔案 (相對路徑，依名稱排序)
    fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// 合規服務的 dictionary 與 rule package 操作
#[async_trait]
pub trait ComplianceService: Send + Sync {
    async fn list_dictionaries(&self) -> RemoteResult<Vec<RemoteDictionary>>;

    /// 建立 dictionary，回傳服務指派的 identity
    async fn create_dictionary(&self, request: &NewDictionary) -> RemoteResult<String>;

    /// 不支援時回傳 `RemoteError::Unsupported`
    async fn update_dictionary(&self, identity: &str, content: &str) -> RemoteResult<()>;

    async fn delete_dictionary(&self, identity: &str) -> RemoteResult<()>;

    async fn import_rule_package(&self, bytes: &[u8]) -> RemoteResult<()>;

    /// 遠端沒有這個 rule package 時回傳 `RemoteError::NotFound`
    async fn update_rule_package(&self, bytes: &[u8]) -> RemoteResult<()>;
}
