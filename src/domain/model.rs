use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 本地關鍵字清單 (一行一個詞)，名稱取自檔名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordList {
    pub name: String,
    pub description: String,
    pub terms: Vec<String>,
}

impl KeywordList {
    /// 上傳到服務的內容：以 CRLF 連接的詞彙 (UTF-8)
    pub fn content(&self) -> String {
        self.terms.join("\r\n")
    }
}

/// 遠端服務上的 keyword dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDictionary {
    #[serde(rename = "id")]
    pub identity: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDictionary {
    pub name: String,
    pub description: String,
    pub content: String,
}

impl From<&KeywordList> for NewDictionary {
    fn from(list: &KeywordList) -> Self {
        Self {
            name: list.name.clone(),
            description: list.description.clone(),
            content: list.content(),
        }
    }
}

/// placeholder token 對應到哪個 dictionary 名稱
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderBinding {
    pub token: String,
    pub dictionary: String,
}

/// 單次執行期間 dictionary 名稱 -> identity 的對照表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    entries: BTreeMap<String, String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 後寫入者覆蓋先前的值 (delete-recreate 之後 identity 會改變)
    pub fn insert(&mut self, dictionary: impl Into<String>, identity: impl Into<String>) {
        self.entries.insert(dictionary.into(), identity.into());
    }

    pub fn get(&self, dictionary: &str) -> Option<&str> {
        self.entries.get(dictionary).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, identity)| (name.as_str(), identity.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IdentityMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = IdentityMap::new();
        for (name, identity) in iter {
            map.insert(name, identity);
        }
        map
    }
}

/// rule pack 的四段版本號，只有 build 會被這個工具修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RulePackVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl RulePackVersion {
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// build 溢位時回傳 None
    pub fn next_build(&self) -> Option<Self> {
        Some(Self {
            build: self.build.checked_add(1)?,
            ..*self
        })
    }
}

impl fmt::Display for RulePackVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub token: String,
    pub dictionary: String,
    pub identity: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// dictionary 的 identity 沒有取得
    IdentityUnavailable,
    /// 文件中找不到這個 token (已經替換過)
    NotInDocument,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::IdentityUnavailable => write!(f, "identity unavailable"),
            SkipReason::NotInDocument => write!(f, "not present in document"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPlaceholder {
    pub token: String,
    pub dictionary: String,
    pub reason: SkipReason,
}

/// Patcher 的變更摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub replaced: Vec<Replacement>,
    pub skipped: Vec<SkippedPlaceholder>,
    pub version_before: Option<RulePackVersion>,
    pub version_after: Option<RulePackVersion>,
    pub changed: bool,
    pub written: bool,
    pub preview: bool,
}

impl PatchReport {
    /// 因為缺少 identity 而沒有替換的 token
    pub fn missing_identities(&self) -> Vec<&str> {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::IdentityUnavailable)
            .map(|s| s.token.as_str())
            .collect()
    }

    pub fn version_incremented(&self) -> bool {
        matches!(
            (self.version_before, self.version_after),
            (Some(before), Some(after)) if before != after
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
    Recreated,
    WouldCreate,
    WouldUpdate,
    Skipped { reason: String },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Created => write!(f, "created"),
            SyncOutcome::Updated => write!(f, "updated"),
            SyncOutcome::Unchanged => write!(f, "unchanged"),
            SyncOutcome::Recreated => write!(f, "recreated (identity changed)"),
            SyncOutcome::WouldCreate => write!(f, "would create"),
            SyncOutcome::WouldUpdate => write!(f, "would update"),
            SyncOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionarySyncResult {
    pub name: String,
    pub outcome: SyncOutcome,
    pub identity: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Import,
    Update,
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishMode::Import => write!(f, "import"),
            PublishMode::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Imported,
    Updated,
    UpdatedViaImport,
    WouldImport,
    WouldUpdate,
    Skipped { unresolved: Vec<String> },
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Imported => write!(f, "imported"),
            PublishOutcome::Updated => write!(f, "updated"),
            PublishOutcome::UpdatedViaImport => write!(f, "not found remotely, imported instead"),
            PublishOutcome::WouldImport => write!(f, "would import"),
            PublishOutcome::WouldUpdate => write!(f, "would update"),
            PublishOutcome::Skipped { unresolved } => {
                write!(f, "skipped, unresolved placeholders: {}", unresolved.join(", "))
            }
        }
    }
}

/// 一次執行的完整結果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub preview: bool,
    pub dictionaries: Vec<DictionarySyncResult>,
    pub patch: Option<PatchReport>,
    pub publish: Option<PublishOutcome>,
}

impl RunSummary {
    pub fn new(preview: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            preview,
            dictionaries: Vec::new(),
            patch: None,
            publish: None,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.preview {
            writeln!(f, "[what-if] No files or remote objects were modified")?;
        }

        if !self.dictionaries.is_empty() {
            writeln!(f, "Dictionaries:")?;
            for result in &self.dictionaries {
                match &result.identity {
                    Some(identity) => {
                        writeln!(f, "  {} -> {} ({})", result.name, identity, result.outcome)?
                    }
                    None => writeln!(f, "  {} ({})", result.name, result.outcome)?,
                }
            }
        }

        if let Some(patch) = &self.patch {
            writeln!(f, "Rule pack:")?;
            for replacement in &patch.replaced {
                writeln!(
                    f,
                    "  replaced {} -> {} ({}, {} occurrence(s))",
                    replacement.token,
                    replacement.identity,
                    replacement.dictionary,
                    replacement.occurrences
                )?;
            }
            for skipped in &patch.skipped {
                writeln!(
                    f,
                    "  skipped {} ({}): {}",
                    skipped.token, skipped.dictionary, skipped.reason
                )?;
            }
            if let (Some(before), Some(after)) = (patch.version_before, patch.version_after) {
                if before != after {
                    writeln!(f, "  version {} -> {}", before, after)?;
                }
            }
            if !patch.changed {
                writeln!(f, "  no changes")?;
            } else if patch.written {
                writeln!(f, "  file written")?;
            } else {
                writeln!(f, "  changes not written")?;
            }
        }

        if let Some(publish) = &self.publish {
            writeln!(f, "Publish: {}", publish)?;
        }

        if let Some(finished_at) = self.finished_at {
            let elapsed = finished_at - self.started_at;
            writeln!(f, "Finished in {} ms", elapsed.num_milliseconds())?;
        }

        Ok(())
    }
}
