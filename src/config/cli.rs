use crate::domain::ports::Storage;
use crate::utils::error::{PublishError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 以 repository root 為基準的本地檔案存取
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        crate::config::resolve_under(&self.base_path, Path::new(path))
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|source| PublishError::WriteError {
                path: full_path.display().to_string(),
                source,
            })?;
        }

        fs::write(&full_path, data).map_err(|source| PublishError::WriteError {
            path: full_path.display().to_string(),
            source,
        })
    }

    async fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }

    async fn list_files(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
        let dir_path = self.full_path(dir);
        if !dir_path.is_dir() {
            return Err(PublishError::missing_path(
                "keyword directory",
                dir_path.display().to_string(),
            ));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir_path)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if matches {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(format!("{}/{}", dir.trim_end_matches('/'), name));
                }
            }
        }
        files.sort();
        Ok(files)
    }
}
