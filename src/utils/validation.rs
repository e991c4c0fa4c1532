use crate::utils::error::{PublishError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: &str, reason: impl Into<String>) -> PublishError {
    PublishError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 服務位址：http(s)、可以接 path segment、不帶 query 或 fragment
pub fn validate_endpoint(field: &str, endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).map_err(|e| invalid(field, endpoint, format!("Invalid URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            endpoint,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(invalid(field, endpoint, "URL cannot carry a path"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(field, endpoint, "URL must not contain a query or fragment"));
    }
    Ok(())
}

/// 相對於 repository root 的路徑
pub fn validate_repo_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path, "Path contains null bytes"));
    }
    Ok(())
}

/// 副檔名不含開頭的點，例如 `txt`
pub fn validate_extension(field: &str, extension: &str) -> Result<()> {
    if extension.is_empty() || extension.starts_with('.') {
        return Err(invalid(field, extension, "Use the bare extension, e.g. \"txt\""));
    }
    if extension.contains(['/', '\\']) {
        return Err(invalid(field, extension, "Extension cannot contain path separators"));
    }
    Ok(())
}

/// 參照屬性必須是合法的 XML 屬性名稱
pub fn validate_attribute_name(field: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if !(valid_start && valid_rest) {
        return Err(invalid(field, name, "Not a valid XML attribute name"));
    }
    Ok(())
}

/// placeholder 會以 `attr="token"` 的形式比對
pub fn validate_token(field: &str, token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(invalid(field, token, "Token cannot be empty"));
    }
    if token.contains(['"', '<', '>', '&']) {
        return Err(invalid(field, token, "Token cannot contain XML markup characters"));
    }
    Ok(())
}

pub fn validate_dictionary_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid(field, name, "Dictionary name cannot be empty"));
    }
    if name.trim() != name {
        return Err(invalid(field, name, "Dictionary name has surrounding whitespace"));
    }
    Ok(())
}

pub fn validate_timeout(field: &str, seconds: u64) -> Result<()> {
    if !(1..=600).contains(&seconds) {
        return Err(invalid(
            field,
            &seconds.to_string(),
            "Timeout must be between 1 and 600 seconds",
        ));
    }
    Ok(())
}

pub fn validate_unique<'a, I>(field: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(invalid(field, value, "Duplicate entry"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("service.endpoint", "https://compliance.example.com/api").is_ok());
        assert!(validate_endpoint("service.endpoint", "http://127.0.0.1:8080").is_ok());
        assert!(validate_endpoint("service.endpoint", "").is_err());
        assert!(validate_endpoint("service.endpoint", "ftp://example.com").is_err());
        assert!(validate_endpoint("service.endpoint", "https://example.com/api?tenant=1").is_err());
        assert!(validate_endpoint("service.endpoint", "https://example.com/#top").is_err());
    }

    #[test]
    fn test_validate_repo_path() {
        assert!(validate_repo_path("rule_pack.path", "rulepack.xml").is_ok());
        assert!(validate_repo_path("rule_pack.path", "  ").is_err());
        assert!(validate_repo_path("rule_pack.path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("keywords.extension", "txt").is_ok());
        assert!(validate_extension("keywords.extension", ".txt").is_err());
        assert!(validate_extension("keywords.extension", "a/txt").is_err());
    }

    #[test]
    fn test_validate_attribute_name() {
        assert!(validate_attribute_name("rule_pack.reference_attribute", "idRef").is_ok());
        assert!(validate_attribute_name("rule_pack.reference_attribute", "x:id-ref").is_ok());
        assert!(validate_attribute_name("rule_pack.reference_attribute", "1id").is_err());
        assert!(validate_attribute_name("rule_pack.reference_attribute", "id ref").is_err());
        assert!(validate_attribute_name("rule_pack.reference_attribute", "").is_err());
    }

    #[test]
    fn test_validate_token_rejects_markup() {
        assert!(validate_token("placeholders.token", "00000000-0000-0000-0000-000000000001").is_ok());
        assert!(validate_token("placeholders.token", "a\"b").is_err());
        assert!(validate_token("placeholders.token", "<id>").is_err());
        assert!(validate_token("placeholders.token", " ").is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout("service.timeout_seconds", 60).is_ok());
        assert!(validate_timeout("service.timeout_seconds", 0).is_err());
        assert!(validate_timeout("service.timeout_seconds", 601).is_err());
    }

    #[test]
    fn test_validate_unique() {
        assert!(validate_unique("placeholders.token", ["a", "b"]).is_ok());
        assert!(validate_unique("placeholders.token", ["a", "b", "a"]).is_err());
    }
}
