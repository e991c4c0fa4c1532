use crate::config::toml_config::RulePackConfig;
use crate::core::document::RulePackDocument;
use crate::domain::model::{
    IdentityMap, PatchReport, PlaceholderBinding, Replacement, RulePackVersion, SkipReason,
    SkippedPlaceholder,
};
use crate::domain::ports::Storage;
use crate::utils::error::{PublishError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"<Version\s+major="(\d+)"\s+minor="(\d+)"\s+build="(\d+)"\s+revision="(\d+)"\s*/>"#,
        )
        .expect("version pattern is valid")
    })
}

/// 在文件中的寫法：`idRef="<token>"`
fn reference(attribute: &str, value: &str) -> String {
    format!("{}=\"{}\"", attribute, value)
}

/// 找出唯一的 Version 元素；不存在、格式不符或出現多次都回傳 None
pub fn find_version(text: &str) -> Option<RulePackVersion> {
    let mut matches = version_pattern().captures_iter(text);
    let caps = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    let part = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    Some(RulePackVersion::new(part(1)?, part(2)?, part(3)?, part(4)?))
}

/// 只把 build 加一，其他內容 (包含空白) 保持不變
pub fn increment_build(text: &str) -> Option<(String, RulePackVersion, RulePackVersion)> {
    let before = find_version(text)?;
    let after = before.next_build()?;
    let build = version_pattern().captures(text)?.get(3)?;

    let mut patched = String::with_capacity(text.len() + 1);
    patched.push_str(&text[..build.start()]);
    patched.push_str(&after.build.to_string());
    patched.push_str(&text[build.end()..]);
    Some((patched, before, after))
}

/// 仍留在文件中的 placeholder token
pub fn unresolved_placeholders(
    text: &str,
    bindings: &[PlaceholderBinding],
    attribute: &str,
) -> Vec<String> {
    bindings
        .iter()
        .filter(|b| text.contains(&reference(attribute, &b.token)))
        .map(|b| b.token.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedText {
    pub text: String,
    pub report: PatchReport,
}

/// 純文字層的替換：placeholder -> identity，並視需要遞增 build
pub fn patch_text(
    text: &str,
    bindings: &[PlaceholderBinding],
    identities: &IdentityMap,
    attribute: &str,
    inject: bool,
    increment_version: bool,
) -> PatchedText {
    let mut report = PatchReport::default();
    let mut patched = text.to_string();

    if inject {
        for binding in bindings {
            let needle = reference(attribute, &binding.token);
            let occurrences = patched.matches(&needle).count();
            if occurrences == 0 {
                report.skipped.push(SkippedPlaceholder {
                    token: binding.token.clone(),
                    dictionary: binding.dictionary.clone(),
                    reason: SkipReason::NotInDocument,
                });
                continue;
            }

            match identities.get(&binding.dictionary) {
                Some(identity) => {
                    patched = patched.replace(&needle, &reference(attribute, identity));
                    tracing::debug!(
                        "Replaced {} -> {} ({} occurrence(s))",
                        binding.token,
                        identity,
                        occurrences
                    );
                    report.replaced.push(Replacement {
                        token: binding.token.clone(),
                        dictionary: binding.dictionary.clone(),
                        identity: identity.to_string(),
                        occurrences,
                    });
                }
                None => {
                    tracing::warn!(
                        "⚠️ No identity for dictionary '{}', leaving placeholder {} in place",
                        binding.dictionary,
                        binding.token
                    );
                    report.skipped.push(SkippedPlaceholder {
                        token: binding.token.clone(),
                        dictionary: binding.dictionary.clone(),
                        reason: SkipReason::IdentityUnavailable,
                    });
                }
            }
        }
    }

    report.version_before = find_version(&patched);
    report.version_after = report.version_before;
    if increment_version {
        match increment_build(&patched) {
            Some((bumped, before, after)) => {
                tracing::info!("🔢 Rule pack version {} -> {}", before, after);
                patched = bumped;
                report.version_after = Some(after);
            }
            None => tracing::warn!(
                "⚠️ No single well-formed Version element, leaving version as is"
            ),
        }
    }

    report.changed = patched != text;
    PatchedText {
        text: patched,
        report,
    }
}

/// 讀取、修改並 (視需要) 寫回 rule pack 檔案
pub struct RulePackPatcher<'a, S: Storage> {
    storage: &'a S,
    config: &'a RulePackConfig,
    bindings: &'a [PlaceholderBinding],
}

/// 修改後的檔案內容，也就是要發佈的 bytes
#[derive(Debug, Clone)]
pub struct PatchedRulePack {
    pub bytes: Vec<u8>,
    pub text: String,
    pub report: PatchReport,
}

impl<'a, S: Storage> RulePackPatcher<'a, S> {
    pub fn new(storage: &'a S, config: &'a RulePackConfig, bindings: &'a [PlaceholderBinding]) -> Self {
        Self {
            storage,
            config,
            bindings,
        }
    }

    pub async fn ensure_exists(&self) -> Result<()> {
        if self.storage.exists(&self.config.path).await {
            Ok(())
        } else {
            Err(PublishError::missing_path("rule pack", self.config.path.clone()))
        }
    }

    pub async fn patch(
        &self,
        identities: &IdentityMap,
        inject: bool,
        increment_version: bool,
        preview: bool,
    ) -> Result<PatchedRulePack> {
        self.ensure_exists().await?;
        let original = self.storage.read_file(&self.config.path).await?;
        let document = RulePackDocument::decode(&original)?;

        let PatchedText { text, mut report } = patch_text(
            document.text(),
            self.bindings,
            identities,
            &self.config.reference_attribute,
            inject,
            increment_version,
        );

        report.preview = preview;
        // 文字沒變就原樣保留，只有真的改寫時才統一換行
        let bytes = if text == document.text() {
            report.changed = false;
            original
        } else {
            let bytes = document
                .with_text(text.clone())
                .encode(self.config.line_ending);
            report.changed = bytes != original;
            bytes
        };

        if !report.changed {
            tracing::info!("📄 Rule pack unchanged, nothing to write");
        } else if preview {
            tracing::info!(
                "[what-if] Would write {} ({} replacement(s))",
                self.config.path,
                report.replaced.len()
            );
        } else {
            self.storage.write_file(&self.config.path, &bytes).await?;
            report.written = true;
            tracing::info!("💾 Wrote {}", self.config.path);
        }

        Ok(PatchedRulePack {
            bytes,
            text,
            report,
        })
    }

    /// 不修改內容，原樣讀出磁碟上的 bytes
    pub async fn read(&self) -> Result<PatchedRulePack> {
        self.ensure_exists().await?;
        let bytes = self.storage.read_file(&self.config.path).await?;
        let document = RulePackDocument::decode(&bytes)?;
        Ok(PatchedRulePack {
            text: document.text().to_string(),
            report: PatchReport {
                version_before: find_version(document.text()),
                version_after: find_version(document.text()),
                ..Default::default()
            },
            bytes,
        })
    }

    pub fn unresolved(&self, text: &str) -> Vec<String> {
        unresolved_placeholders(text, self.bindings, &self.config.reference_attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Vec<PlaceholderBinding> {
        vec![
            PlaceholderBinding {
                token: "AAAA".to_string(),
                dictionary: "Diagnosis".to_string(),
            },
            PlaceholderBinding {
                token: "CCCC".to_string(),
                dictionary: "Medication".to_string(),
            },
        ]
    }

    const DOC: &str = r#"<RulePackage>
  <Version major="1" minor="2" build="3" revision="4"/>
  <Keyword idRef="AAAA"/>
  <Match idRef="CCCC"/>
</RulePackage>
"#;

    #[test]
    fn test_end_to_end_scenario() {
        let identities: IdentityMap = [("Diagnosis", "BBBB")].into_iter().collect();
        let all = bindings();

        let result = patch_text(DOC, &all[..1], &identities, "idRef", true, true);

        assert!(result.text.contains(r#"idRef="BBBB""#));
        assert!(!result.text.contains("AAAA"));
        assert_eq!(find_version(&result.text), Some(RulePackVersion::new(1, 2, 4, 4)));
        assert!(result.report.changed);
        assert!(result.report.version_incremented());
    }

    #[test]
    fn test_injection_completeness() {
        let identities: IdentityMap = [("Diagnosis", "id-1"), ("Medication", "id-2")]
            .into_iter()
            .collect();

        let result = patch_text(DOC, &bindings(), &identities, "idRef", true, false);

        assert!(unresolved_placeholders(&result.text, &bindings(), "idRef").is_empty());
        assert_eq!(result.text.matches(r#"idRef="id-1""#).count(), 1);
        assert_eq!(result.text.matches(r#"idRef="id-2""#).count(), 1);
        assert_eq!(result.report.replaced.len(), 2);
        assert!(result.report.skipped.is_empty());
    }

    #[test]
    fn test_partial_injection_reports_skipped() {
        let identities: IdentityMap = [("Medication", "id-2")].into_iter().collect();

        let result = patch_text(DOC, &bindings(), &identities, "idRef", true, false);

        assert!(result.text.contains(r#"idRef="AAAA""#));
        assert!(result.text.contains(r#"idRef="id-2""#));
        assert_eq!(result.report.missing_identities(), vec!["AAAA"]);
    }

    #[test]
    fn test_only_exact_attribute_matches_are_replaced() {
        let text = r#"<a idRef="aaaa"/><b other="AAAA"/><c idRef="AAAA-suffix"/>"#;
        let identities: IdentityMap = [("Diagnosis", "BBBB")].into_iter().collect();

        let result = patch_text(text, &bindings()[..1], &identities, "idRef", true, false);

        assert_eq!(result.text, text);
        assert!(!result.report.changed);
        assert_eq!(result.report.skipped[0].reason, SkipReason::NotInDocument);
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let text = r#"<a idRef="AAAA"/><b idRef="AAAA"/>"#;
        let identities: IdentityMap = [("Diagnosis", "BBBB")].into_iter().collect();

        let result = patch_text(text, &bindings()[..1], &identities, "idRef", true, false);

        assert_eq!(result.text, r#"<a idRef="BBBB"/><b idRef="BBBB"/>"#);
        assert_eq!(result.report.replaced[0].occurrences, 2);
    }

    #[test]
    fn test_version_increment() {
        let text = r#"<Version major="7" minor="0" build="2" revision="0"/>"#;

        let incremented = patch_text(text, &[], &IdentityMap::new(), "idRef", false, true);
        assert_eq!(
            incremented.text,
            r#"<Version major="7" minor="0" build="3" revision="0"/>"#
        );

        let untouched = patch_text(text, &[], &IdentityMap::new(), "idRef", false, false);
        assert_eq!(untouched.text, text);
        assert_eq!(untouched.report.version_before, Some(RulePackVersion::new(7, 0, 2, 0)));
    }

    #[test]
    fn test_missing_version_is_noop() {
        let text = "<RulePackage><Rules/></RulePackage>";
        let result = patch_text(text, &[], &IdentityMap::new(), "idRef", false, true);
        assert_eq!(result.text, text);
        assert!(!result.report.changed);
        assert_eq!(result.report.version_before, None);
    }

    #[test]
    fn test_malformed_or_duplicate_version_is_noop() {
        let malformed = r#"<Version major="7" minor="x" build="2" revision="0"/>"#;
        assert_eq!(
            patch_text(malformed, &[], &IdentityMap::new(), "idRef", false, true).text,
            malformed
        );

        let twice = r#"<Version major="1" minor="0" build="1" revision="0"/>
<Version major="1" minor="0" build="1" revision="0"/>"#;
        assert_eq!(
            patch_text(twice, &[], &IdentityMap::new(), "idRef", false, true).text,
            twice
        );
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let identities: IdentityMap = [("Diagnosis", "BBBB"), ("Medication", "DDDD")]
            .into_iter()
            .collect();
        let first = patch_text(DOC, &bindings(), &identities, "idRef", true, false);
        let second = patch_text(&first.text, &bindings(), &IdentityMap::new(), "idRef", true, false);

        assert!(first.report.changed);
        assert!(!second.report.changed);
        assert_eq!(second.text, first.text);
    }
}
