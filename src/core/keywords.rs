use crate::config::toml_config::KeywordsConfig;
use crate::domain::model::KeywordList;
use crate::domain::ports::Storage;
use crate::utils::error::{PublishError, Result};
use std::path::Path;

const UTF8_BOM: &str = "\u{feff}";

/// 把關鍵字檔案內容切成詞彙：去掉 BOM、每行 trim、略過空行
pub fn parse_terms(raw: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(raw).map_err(|e| PublishError::EncodingError {
        message: format!("keyword list is not valid UTF-8: {}", e),
    })?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// dictionary 名稱取自檔名 (不含副檔名)
pub fn dictionary_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

/// 讀取 keywords 目錄下所有清單
pub async fn load_keyword_lists<S, F>(
    storage: &S,
    config: &KeywordsConfig,
    describe: F,
) -> Result<Vec<KeywordList>>
where
    S: Storage,
    F: Fn(&str) -> String,
{
    let files = storage
        .list_files(&config.directory, &config.extension)
        .await?;

    let mut lists = Vec::with_capacity(files.len());
    for file in files {
        let Some(name) = dictionary_name(&file) else {
            tracing::warn!("⚠️ Skipping keyword file with unusable name: {}", file);
            continue;
        };
        let raw = storage.read_file(&file).await?;
        let terms = parse_terms(&raw)?;
        if terms.is_empty() {
            tracing::warn!("⚠️ Keyword list '{}' is empty", name);
        }
        tracing::debug!("Loaded keyword list '{}' ({} terms)", name, terms.len());

        lists.push(KeywordList {
            description: describe(&name),
            name,
            terms,
        });
    }

    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use tempfile::TempDir;

    #[test]
    fn test_parse_terms_normalizes_lines() {
        let raw = "\u{feff}alpha\r\n  beta  \n\n\r\ngamma".as_bytes();
        assert_eq!(parse_terms(raw).unwrap(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_parse_terms_rejects_invalid_utf8() {
        assert!(parse_terms(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_dictionary_name_from_path() {
        assert_eq!(
            dictionary_name("keywords/Diagnosis_Keywords.txt").as_deref(),
            Some("Diagnosis_Keywords")
        );
    }

    #[tokio::test]
    async fn test_load_keyword_lists() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("keywords");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Medication.txt"), "aspirin\r\nibuprofen\r\n").unwrap();
        std::fs::write(dir.join("Diagnosis.txt"), "asthma\n").unwrap();

        let storage = LocalStorage::new(temp_dir.path());
        let lists = load_keyword_lists(&storage, &KeywordsConfig::default(), |name| {
            format!("about {}", name)
        })
        .await
        .unwrap();

        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].name, "Diagnosis");
        assert_eq!(lists[0].description, "about Diagnosis");
        assert_eq!(lists[1].terms, vec!["aspirin", "ibuprofen"]);
    }
}
