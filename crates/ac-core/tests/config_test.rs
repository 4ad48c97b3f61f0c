use ac_core::config::{Config, FailedTaskPolicy};
use ac_core::types::Priority;

#[test]
fn default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.general.project_name, "agent-crew");
    assert_eq!(cfg.general.log_level, "info");
    assert_eq!(cfg.general.log_format, "pretty");
    assert_eq!(cfg.agents.default_eta_minutes, 30);
    assert_eq!(cfg.agents.context_limit, 2);
    assert_eq!(cfg.agents.failed_task_policy, FailedTaskPolicy::Retain);
    assert!(cfg.agents.execution_timeout_secs.is_none());
    assert_eq!(cfg.agents.worker_channel_capacity, 64);
    assert!(!cfg.registry.strict_registration);
    assert!(!cfg.coordinator.strict_registration);
    assert_eq!(cfg.coordinator.collaborative_priority(), Priority::HIGH);
    assert_eq!(cfg.coordinator.title_excerpt_chars, 50);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_roundtrip() {
    let mut cfg = Config::default();
    cfg.agents.execution_timeout_secs = Some(90);
    let toml_str = cfg.to_toml().expect("serialize to toml");
    assert!(toml_str.contains("agent-crew"));

    let parsed: Config = toml::from_str(&toml_str).expect("parse toml back");
    assert_eq!(parsed.general.project_name, cfg.general.project_name);
    assert_eq!(parsed.agents.execution_timeout_secs, Some(90));
    assert_eq!(parsed.coordinator.title_excerpt_chars, 50);
    parsed.validate().expect("config validates");
}

#[test]
fn config_partial_toml() {
    let partial = r#"
[general]
project_name = "night-shift"

[agents]
failed_task_policy = "dequeue"
"#;
    let cfg: Config = toml::from_str(partial).expect("parse partial");
    assert_eq!(cfg.general.project_name, "night-shift");
    assert_eq!(cfg.agents.failed_task_policy, FailedTaskPolicy::Dequeue);
    // defaults should fill in the rest
    assert_eq!(cfg.general.log_level, "info");
    assert_eq!(cfg.agents.default_eta_minutes, 30);
    cfg.validate().expect("config validates");
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[coordinator]\nstrict_registration = true\ncollaborative_priority = 5\n",
    )
    .unwrap();

    let cfg = Config::load_from(&path).unwrap();
    assert!(cfg.coordinator.strict_registration);
    assert_eq!(cfg.coordinator.collaborative_priority(), Priority::CRITICAL);
}

#[test]
fn load_from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from(dir.path().join("nope.toml")).unwrap_err();
    assert!(err.to_string().starts_with("io:"));
}

#[test]
fn malformed_toml_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[agents\ncontext_limit = ").unwrap();
    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().starts_with("parse:"));
}

#[test]
fn zero_timeout_fails_validation() {
    let mut cfg = Config::default();
    cfg.agents.execution_timeout_secs = Some(0);
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("execution_timeout_secs"));
}

#[test]
fn zero_worker_capacity_fails_validation() {
    let mut cfg = Config::default();
    cfg.agents.worker_channel_capacity = 0;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("worker_channel_capacity"));
}

#[test]
fn out_of_range_collaborative_priority_fails_validation() {
    let mut cfg = Config::default();
    cfg.coordinator.collaborative_priority = 9;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("collaborative_priority"));
}

#[test]
fn unknown_log_format_fails_validation() {
    let mut cfg = Config::default();
    cfg.general.log_format = "xml".into();
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("log_format"));
}
