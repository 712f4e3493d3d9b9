//! Orchestrator integration tests.
//!
//! Tests the flow: config file + environment -> relay build -> summary.

use std::io::Write;

use alertik_daemon::orchestrator::Orchestrator;
use serial_test::serial;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(content.as_bytes())
        .expect("should write config");
    file
}

const SLACK_RULES: &str = r#"
[receiver]
bind = "127.0.0.1:0"

[notifiers]
slack_webhook_url = "http://127.0.0.1:9/hook"

[[events.dynamic_events]]
match_type = "regex"
match_str = "login failure for user (\\w+)"
notifier = "Slack"
mask_msg = "@1 failed to log in"
"#;

#[tokio::test]
#[serial]
async fn test_build_from_config_file() {
    // Given: A config file with one dynamic rule
    let file = write_config(SLACK_RULES);

    // When: Building the orchestrator from the file
    let orchestrator = Orchestrator::build(Some(file.path()))
        .await
        .expect("should build from file");

    // Then: The rule and its notifier are active
    assert_eq!(orchestrator.relay().rule_count(), 1);
    let summary = orchestrator.summary();
    assert_eq!(summary.notifiers, vec!["Slack".to_owned()]);
    assert_eq!(summary.bind, "127.0.0.1:0");
}

#[tokio::test]
#[serial]
async fn test_build_without_config_file_uses_defaults() {
    // Given/When: No config file and no rules in the environment
    let orchestrator = Orchestrator::build(None)
        .await
        .expect("defaults should build");

    // Then: The relay runs with zero rules on the default port
    assert_eq!(orchestrator.relay().rule_count(), 0);
    assert_eq!(orchestrator.config().receiver.bind, "0.0.0.0:5140");
    assert_eq!(orchestrator.config().dispatch.cooldown_secs, 10);
}

#[tokio::test]
#[serial]
async fn test_build_fails_for_missing_file() {
    // Given: A path that does not exist
    let path = std::path::Path::new("/nonexistent/alertik.toml");

    // When: Building
    let result = Orchestrator::build(Some(path)).await;

    // Then: The load error is reported
    let err = result.err().expect("should fail").to_string();
    assert!(err.contains("failed to load config"), "got: {}", err);
}

#[tokio::test]
#[serial]
async fn test_build_fails_for_invalid_regex() {
    // Given: A dynamic rule with an unbalanced group
    let file = write_config(
        r#"
[notifiers]
discord_webhook_url = "http://127.0.0.1:9/hook"

[[events.dynamic_events]]
match_type = "regex"
match_str = "link (down"
notifier = "Discord"
mask_msg = "down"
"#,
    );

    // When/Then: Building fails before anything binds
    assert!(Orchestrator::build(Some(file.path())).await.is_err());
}

#[tokio::test]
#[serial]
async fn test_environment_supplies_credentials() {
    // Given: A rule file without credentials, and the webhook in the environment
    let file = write_config(
        r#"
[[events.dynamic_events]]
match_type = "substr"
match_str = "link down"
notifier = "Teams"
mask_msg = "uplink lost"
"#,
    );
    // SAFETY: serialised with every other environment-reading test
    unsafe { std::env::set_var("TEAMS_WEBHOOK_URL", "http://127.0.0.1:9/teams") };

    // When: Building
    let result = Orchestrator::build(Some(file.path())).await;
    // SAFETY: as above
    unsafe { std::env::remove_var("TEAMS_WEBHOOK_URL") };

    // Then: The Teams notifier is set up from the environment
    let orchestrator = result.expect("environment credentials should be used");
    assert_eq!(orchestrator.summary().notifiers, vec!["Teams".to_owned()]);
}

#[tokio::test]
#[serial]
async fn test_environment_rules_without_credentials_fail() {
    // Given: A rule defined only through the environment, no webhook set
    let vars = [
        ("ENV_EVENTS", "1"),
        ("EVENT0_MATCH_TYPE", "substr"),
        ("EVENT0_NOTIFIER", "Discord"),
        ("EVENT0_MATCH_STR", "link down"),
        ("EVENT0_MASK_MSG", "uplink lost"),
    ];
    for (key, value) in vars {
        // SAFETY: serialised with every other environment-reading test
        unsafe { std::env::set_var(key, value) };
    }

    // When: Building
    let result = Orchestrator::build(None).await;
    for (key, _) in vars {
        // SAFETY: as above
        unsafe { std::env::remove_var(key) };
    }

    // Then: Setup fails naming the missing variable
    let err = result.err().expect("should fail").to_string();
    assert!(err.contains("DISCORD_WEBHOOK_URL"), "got: {}", err);
}
