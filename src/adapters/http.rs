use crate::config::toml_config::PublisherConfig;
use crate::domain::model::{NewDictionary, RemoteDictionary};
use crate::domain::ports::{ComplianceService, RemoteResult};
use crate::utils::error::{PublishError, RemoteError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// 合規服務的 REST 介面
#[derive(Debug, Clone)]
pub struct HttpComplianceClient {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedDictionary {
    id: String,
}

#[derive(Debug, Serialize)]
struct DictionaryContent<'a> {
    content: &'a str,
}

impl HttpComplianceClient {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let invalid = |message: String| PublishError::InvalidConfigValueError {
            field: "service.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: message,
        };
        let endpoint = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(invalid("endpoint must be a hierarchical URL".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        // 未替換的 ${VAR} 視為沒有 token
        let token = config
            .service
            .token
            .clone()
            .filter(|t| !t.trim().is_empty() && !t.starts_with("${"));
        if token.is_none() {
            tracing::debug!("No service token configured, sending anonymous requests");
        }
        Self::new(
            &config.service.endpoint,
            token,
            Duration::from_secs(config.timeout_seconds()),
        )
        .map_err(|e| match e {
            PublishError::HttpError(source) => PublishError::ConfigValidationError {
                field: "service".to_string(),
                message: format!("could not build HTTP client: {}", source),
            },
            other => other,
        })
    }

    /// 每個 segment 都會被 percent-encode，identity 裡的 `/`、`?` 不會改變路徑
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> RemoteResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        tracing::debug!("{}: API response status: {}", what, response.status());

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, what, body))
    }
}

/// 把 HTTP 狀態碼對應到 RemoteError
fn classify_status(status: StatusCode, what: &str, body: String) -> RemoteError {
    let detail = |fallback: String| if body.is_empty() { fallback } else { body.clone() };
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(detail(what.to_string())),
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
            RemoteError::Unsupported(what.to_string())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::AuthFailed(detail(status.to_string()))
        }
        _ => RemoteError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl ComplianceService for HttpComplianceClient {
    async fn list_dictionaries(&self) -> RemoteResult<Vec<RemoteDictionary>> {
        let response = self
            .send(self.client.get(self.url(&["dictionaries"])), "listDictionaries")
            .await?;
        response
            .json::<Vec<RemoteDictionary>>()
            .await
            .map_err(|e| RemoteError::Api {
                status: 200,
                message: format!("unexpected dictionary list payload: {}", e),
            })
    }

    async fn create_dictionary(&self, request: &NewDictionary) -> RemoteResult<String> {
        tracing::debug!("Creating dictionary '{}'", request.name);
        let response = self
            .send(
                self.client.post(self.url(&["dictionaries"])).json(request),
                "createDictionary",
            )
            .await?;
        let created: CreatedDictionary =
            response.json().await.map_err(|e| RemoteError::Api {
                status: 200,
                message: format!("unexpected create payload: {}", e),
            })?;
        Ok(created.id)
    }

    async fn update_dictionary(&self, identity: &str, content: &str) -> RemoteResult<()> {
        self.send(
            self.client
                .put(self.url(&["dictionaries", identity]))
                .json(&DictionaryContent { content }),
            "updateDictionary",
        )
        .await?;
        Ok(())
    }

    async fn delete_dictionary(&self, identity: &str) -> RemoteResult<()> {
        self.send(
            self.client
                .delete(self.url(&["dictionaries", identity])),
            "deleteDictionary",
        )
        .await?;
        Ok(())
    }

    async fn import_rule_package(&self, bytes: &[u8]) -> RemoteResult<()> {
        self.send(
            self.client
                .post(self.url(&["rule-packages"]))
                .header(reqwest::header::CONTENT_TYPE, "application/xml")
                .body(bytes.to_vec()),
            "importRulePackage",
        )
        .await?;
        Ok(())
    }

    async fn update_rule_package(&self, bytes: &[u8]) -> RemoteResult<()> {
        self.send(
            self.client
                .put(self.url(&["rule-packages"]))
                .header(reqwest::header::CONTENT_TYPE, "application/xml")
                .body(bytes.to_vec()),
            "updateRulePackage",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> HttpComplianceClient {
        HttpComplianceClient::new(
            &server.base_url(),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_dictionaries_sends_bearer_token() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/dictionaries")
                .header("Authorization", "Bearer secret");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"id": "11111111-aaaa", "name": "Diagnosis", "description": "d"},
                    {"id": "22222222-bbbb", "name": "Medication", "content": "aspirin"}
                ]));
        });

        let dictionaries = client(&server).list_dictionaries().await.unwrap();

        api_mock.assert();
        assert_eq!(dictionaries.len(), 2);
        assert_eq!(dictionaries[0].identity, "11111111-aaaa");
        assert_eq!(dictionaries[1].content.as_deref(), Some("aspirin"));
    }

    #[tokio::test]
    async fn test_create_dictionary_returns_identity() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/dictionaries")
                .json_body(serde_json::json!({
                    "name": "Diagnosis",
                    "description": "Diagnosis terms",
                    "content": "asthma\r\nflu"
                }));
            then.status(201)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": "33333333-cccc"}));
        });

        let identity = client(&server)
            .create_dictionary(&NewDictionary {
                name: "Diagnosis".to_string(),
                description: "Diagnosis terms".to_string(),
                content: "asthma\r\nflu".to_string(),
            })
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(identity, "33333333-cccc");
    }

    #[tokio::test]
    async fn test_update_dictionary_unsupported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/dictionaries/abc");
            then.status(405);
        });

        let err = client(&server)
            .update_dictionary("abc", "asthma")
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_update_rule_package_not_found() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/rule-packages")
                .header("Content-Type", "application/xml")
                .body("<RulePackage/>");
            then.status(404).body("rule package does not exist");
        });

        let err = client(&server)
            .update_rule_package(b"<RulePackage/>")
            .await
            .unwrap_err();

        api_mock.assert();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_import_rule_package_error_surfaces_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rule-packages");
            then.status(400).body("Version must be greater than existing");
        });

        let err = client(&server)
            .import_rule_package(b"<RulePackage/>")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RemoteError::Api {
                status: 400,
                message: "Version must be greater than existing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/dictionaries");
            then.status(401);
        });

        let err = client(&server).list_dictionaries().await.unwrap_err();
        assert!(matches!(err, RemoteError::AuthFailed(_)));
    }

    #[test]
    fn test_identity_is_escaped_as_one_path_segment() {
        let client =
            HttpComplianceClient::new("https://compliance.example.com/api/", None, Duration::from_secs(5))
                .unwrap();

        let url = client.url(&["dictionaries", "a/b?c#d"]);

        assert_eq!(
            url.as_str(),
            "https://compliance.example.com/api/dictionaries/a%2Fb%3Fc%23d"
        );
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_invalid_endpoint_is_a_config_error() {
        let err = HttpComplianceClient::new("not a url", None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, PublishError::InvalidConfigValueError { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_network_failure() {
        let client = HttpComplianceClient::new(
            "http://127.0.0.1:9",
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.list_dictionaries().await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
