use anyhow::Result;
use httpmock::prelude::*;
use sit_publisher::domain::model::{PublishMode, PublishOutcome, SyncOutcome};
use sit_publisher::{
    HttpComplianceClient, LocalStorage, PublishEngine, PublishError, PublisherConfig, RunOptions,
};
use std::fs;
use tempfile::TempDir;

const PLACEHOLDER: &str = "00000000-0000-0000-0000-0000000000d1";

fn setup_repo(server: &MockServer) -> Result<(TempDir, PublisherConfig)> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join("keywords"))?;
    fs::write(temp_dir.path().join("keywords/Diagnosis.txt"), "asthma\nflu\n")?;
    fs::write(
        temp_dir.path().join("rulepack.xml"),
        format!(
            "<RulePackage>\n<Version major=\"2\" minor=\"0\" build=\"9\" revision=\"0\"/>\n<Keyword idRef=\"{}\"/>\n</RulePackage>\n",
            PLACEHOLDER
        ),
    )?;

    let config = PublisherConfig::from_toml_str(&format!(
        r#"
[service]
endpoint = "{}/api"
token = "test-token"
timeout_seconds = 5

[rule_pack]
line_ending = "lf"

[[placeholders]]
token = "{}"
dictionary = "Diagnosis"
"#,
        server.base_url(),
        PLACEHOLDER
    ))?;
    Ok((temp_dir, config))
}

#[tokio::test]
async fn test_full_run_against_http_service() -> Result<()> {
    let server = MockServer::start();
    let (repo, config) = setup_repo(&server)?;

    let list_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/dictionaries")
            .header("Authorization", "Bearer test-token");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([
                {"id": "9f1c2d3e-0000-4000-8000-000000000042", "name": "Diagnosis", "content": "asthma"}
            ]));
    });
    let update_dictionary_mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/dictionaries/9f1c2d3e-0000-4000-8000-000000000042")
            .json_body(serde_json::json!({"content": "asthma\r\nflu"}));
        then.status(204);
    });
    let update_pack_mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/rule-packages")
            .body_contains("idRef=\"9f1c2d3e-0000-4000-8000-000000000042\"")
            .body_contains("build=\"10\"");
        then.status(200);
    });

    let options = RunOptions {
        ensure_dictionaries: true,
        inject: true,
        increment_version: true,
        publish: Some(PublishMode::Update),
        preview: false,
        fallback_to_import: true,
    };
    let service = HttpComplianceClient::from_config(&config)?;
    let engine = PublishEngine::new(LocalStorage::new(repo.path()), service, config, options);

    let summary = engine.run().await?;

    list_mock.assert_hits(2);
    update_dictionary_mock.assert();
    update_pack_mock.assert();

    assert_eq!(summary.dictionaries[0].outcome, SyncOutcome::Updated);
    assert_eq!(summary.publish, Some(PublishOutcome::Updated));

    let text = fs::read_to_string(repo.path().join("rulepack.xml"))?;
    assert!(text.contains("build=\"10\""));
    assert!(!text.contains(PLACEHOLDER));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_service_skips_dictionary() -> Result<()> {
    let server = MockServer::start();
    let (repo, config) = setup_repo(&server)?;

    let list_mock = server.mock(|when, then| {
        when.method(GET).path("/api/dictionaries");
        then.status(503).body("maintenance");
    });

    let options = RunOptions {
        ensure_dictionaries: true,
        inject: true,
        ..Default::default()
    };
    let service = HttpComplianceClient::from_config(&config)?;
    let engine = PublishEngine::new(LocalStorage::new(repo.path()), service, config, options);

    let summary = engine.run().await?;

    list_mock.assert_hits(1);
    assert!(matches!(
        summary.dictionaries[0].outcome,
        SyncOutcome::Skipped { .. }
    ));
    let patch = summary.patch.unwrap();
    assert_eq!(patch.missing_identities(), vec![PLACEHOLDER]);
    assert!(!patch.changed);
    Ok(())
}

#[tokio::test]
async fn test_import_rejected_by_service() -> Result<()> {
    let server = MockServer::start();
    let (repo, config) = setup_repo(&server)?;
    fs::write(
        repo.path().join("rulepack.xml"),
        "<RulePackage>\n<Keyword idRef=\"resolved\"/>\n</RulePackage>\n",
    )?;

    let import_mock = server.mock(|when, then| {
        when.method(POST).path("/api/rule-packages");
        then.status(409).body("A rule package with this id already exists");
    });

    let options = RunOptions {
        publish: Some(PublishMode::Import),
        ..Default::default()
    };
    let service = HttpComplianceClient::from_config(&config)?;
    let engine = PublishEngine::new(LocalStorage::new(repo.path()), service, config, options);

    let err = engine.run().await.unwrap_err();

    import_mock.assert();
    assert!(matches!(err, PublishError::ImportFailedError { .. }));
    assert!(err.to_string().contains("already exists"));
    Ok(())
}
