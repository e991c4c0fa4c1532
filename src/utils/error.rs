use std::fmt;
use thiserror::Error;

/// 會中止執行的 dictionary 操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    CreateDictionary,
    UpdateDictionary,
    DeleteDictionary,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOperation::CreateDictionary => "createDictionary",
            RemoteOperation::UpdateDictionary => "updateDictionary",
            RemoteOperation::DeleteDictionary => "deleteDictionary",
        };
        f.write_str(name)
    }
}

/// 遠端合規服務回報的錯誤
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl RemoteError {
    /// 目標物件在遠端不存在 (update 找不到 rule package)
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, RemoteError::Unsupported(_))
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{operation} failed: {source}")]
    RemoteError {
        operation: RemoteOperation,
        #[source]
        source: RemoteError,
    },

    #[error("Required {kind} not found: {path}")]
    MissingPathError { kind: String, path: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Rule package update failed: {message}")]
    UpdateFailedError { message: String },

    #[error("Rule package import failed: {message}")]
    ImportFailedError { message: String },

    #[error("Document encoding error: {message}")]
    EncodingError { message: String },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 錯誤分類，用來決定是哪一個階段失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Local,
    Config,
    Dictionary,
    Publish,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PublishError {
    pub fn remote(operation: RemoteOperation, source: RemoteError) -> Self {
        PublishError::RemoteError {
            operation,
            source,
        }
    }

    pub fn missing_path(kind: impl Into<String>, path: impl Into<String>) -> Self {
        PublishError::MissingPathError {
            kind: kind.into(),
            path: path.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PublishError::IoError(_) | PublishError::MissingPathError { .. } => {
                ErrorCategory::Local
            }
            PublishError::ConfigValidationError { .. }
            | PublishError::InvalidConfigValueError { .. } => ErrorCategory::Config,
            PublishError::RemoteError { .. } => ErrorCategory::Dictionary,
            PublishError::HttpError(_)
            | PublishError::UpdateFailedError { .. }
            | PublishError::ImportFailedError { .. } => ErrorCategory::Publish,
            PublishError::EncodingError { .. } | PublishError::WriteError { .. } => {
                ErrorCategory::Document
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PublishError::ConfigValidationError { .. }
            | PublishError::InvalidConfigValueError { .. }
            | PublishError::MissingPathError { .. } => ErrorSeverity::High,
            PublishError::RemoteError { source, .. } => match source {
                RemoteError::Network(_) => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            PublishError::HttpError(_) => ErrorSeverity::Medium,
            PublishError::UpdateFailedError { .. } | PublishError::ImportFailedError { .. } => {
                ErrorSeverity::High
            }
            PublishError::IoError(_)
            | PublishError::EncodingError { .. }
            | PublishError::WriteError { .. } => ErrorSeverity::Critical,
        }
    }

    /// 失敗階段的名稱，讓操作者知道要重試哪一步
    pub fn phase(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Local => "local files",
            ErrorCategory::Config => "configuration",
            ErrorCategory::Dictionary => "ensure dictionaries",
            ErrorCategory::Publish => "publish rule package",
            ErrorCategory::Document => "rule pack rewrite",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Local | ErrorCategory::Config => 1,
            ErrorCategory::Dictionary => 2,
            ErrorCategory::Publish => 3,
            ErrorCategory::Document => 4,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        format!("[{}] {}", self.phase(), self)
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PublishError::MissingPathError { kind, .. } => {
                format!("Check --root and the {} path in the configuration file", kind)
            }
            PublishError::ConfigValidationError { .. }
            | PublishError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            PublishError::RemoteError { source, .. } => match source {
                RemoteError::AuthFailed(_) => {
                    "Refresh the service token (service.token) and run again".to_string()
                }
                RemoteError::Network(_) => {
                    "Check connectivity to service.endpoint and retry".to_string()
                }
                RemoteError::NotFound(_) => {
                    "The dictionary was removed remotely; run again to recreate it".to_string()
                }
                _ => "Inspect the service response above and retry this phase".to_string(),
            },
            PublishError::UpdateFailedError { .. } => {
                "Verify the rule package exists remotely, or publish with --import".to_string()
            }
            PublishError::ImportFailedError { .. } => {
                "A rule package with this identity may already exist; try --update".to_string()
            }
            PublishError::HttpError(_) => "Check connectivity and retry".to_string(),
            PublishError::IoError(_)
            | PublishError::EncodingError { .. }
            | PublishError::WriteError { .. } => {
                "Check file permissions and that the rule pack is UTF-8 or UTF-16LE".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_errors_map_to_dictionary_phase() {
        let err = PublishError::remote(
            RemoteOperation::CreateDictionary,
            RemoteError::Network("down".into()),
        );
        assert_eq!(err.category(), ErrorCategory::Dictionary);
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_publish_errors_map_to_publish_phase() {
        let err = PublishError::UpdateFailedError {
            message: "boom".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Publish);
        assert_eq!(err.exit_code(), 3);
        assert!(err.user_friendly_message().starts_with("[publish rule package]"));
    }

    #[test]
    fn test_missing_path_is_local() {
        let err = PublishError::missing_path("rule pack", "/nope.xml");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("/nope.xml"));
    }

    #[test]
    fn test_remote_error_predicates() {
        assert!(RemoteError::NotFound("x".into()).is_not_found());
        assert!(!RemoteError::Api {
            status: 500,
            message: "x".into()
        }
        .is_not_found());
        assert!(RemoteError::Unsupported("x".into()).is_unsupported());
    }
}
