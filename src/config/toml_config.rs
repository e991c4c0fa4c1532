use crate::domain::model::PlaceholderBinding;
use crate::utils::error::{PublishError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "sit-publish.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub rule_pack: RulePackConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    #[serde(default = "default_keywords_directory")]
    pub directory: String,
    #[serde(default = "default_keywords_extension")]
    pub extension: String,
    pub description_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulePackConfig {
    #[serde(default = "default_rule_pack_path")]
    pub path: String,
    #[serde(default = "default_reference_attribute")]
    pub reference_attribute: String,
    #[serde(default)]
    pub line_ending: LineEnding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_fallback_to_import")]
    pub fallback_to_import: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    #[default]
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

fn default_keywords_directory() -> String {
    "keywords".to_string()
}

fn default_keywords_extension() -> String {
    "txt".to_string()
}

fn default_rule_pack_path() -> String {
    "rulepack.xml".to_string()
}

fn default_reference_attribute() -> String {
    "idRef".to_string()
}

fn default_fallback_to_import() -> bool {
    true
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            directory: default_keywords_directory(),
            extension: default_keywords_extension(),
            description_prefix: None,
        }
    }
}

impl Default for RulePackConfig {
    fn default() -> Self {
        Self {
            path: default_rule_pack_path(),
            reference_attribute: default_reference_attribute(),
            line_ending: LineEnding::default(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            fallback_to_import: default_fallback_to_import(),
        }
    }
}

impl PublisherConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PublishError::missing_path(
                "configuration file",
                path.display().to_string(),
            ));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PublishError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COMPLIANCE_TOKEN})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            PublishError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_endpoint("service.endpoint", &self.service.endpoint)?;
        if let Some(timeout) = self.service.timeout_seconds {
            validation::validate_timeout("service.timeout_seconds", timeout)?;
        }

        validation::validate_repo_path("keywords.directory", &self.keywords.directory)?;
        validation::validate_extension("keywords.extension", &self.keywords.extension)?;
        validation::validate_repo_path("rule_pack.path", &self.rule_pack.path)?;
        validation::validate_attribute_name(
            "rule_pack.reference_attribute",
            &self.rule_pack.reference_attribute,
        )?;

        for binding in &self.placeholders {
            validation::validate_token("placeholders.token", &binding.token)?;
            validation::validate_dictionary_name("placeholders.dictionary", &binding.dictionary)?;
        }
        validation::validate_unique(
            "placeholders.token",
            self.placeholders.iter().map(|b| b.token.as_str()),
        )?;

        Ok(())
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.service.timeout_seconds.unwrap_or(60)
    }

    pub fn description_for(&self, dictionary: &str) -> String {
        let prefix = self
            .keywords
            .description_prefix
            .as_deref()
            .unwrap_or("Keyword dictionary for");
        format!("{} {}", prefix, dictionary)
    }
}

impl Validate for PublisherConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
