use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("chat_cli_config_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_match_backend_contract() {
    let settings = Settings::default();
    assert_eq!(settings.base_url, "http://localhost:5001");
    assert_eq!(settings.model, "gpt-4o-mini");
    assert_eq!(settings.provider, "CHATGPT");
    assert_eq!(settings.reset_delay_ms, 2000);
    assert_eq!(settings.response_shapes, ResponseShapes::Legacy);

    let controller = settings.controller_settings();
    assert_eq!(controller.reset_delay, Duration::from_millis(2000));
    assert!(controller.show_loading_indicator);
}

#[test]
fn file_values_override_defaults() {
    let path = temp_file(
        "chat_client.toml",
        r#"
base_url = "https://chat.example.com"
identifier_field = "user_name"
reset_delay_ms = 1000
response_shapes = "strict"
"#,
    );

    let mut settings = Settings::default();
    let raw = fs::read_to_string(&path).expect("read");
    apply_file(&mut settings, toml::from_str(&raw).expect("parse"));

    assert_eq!(settings.base_url, "https://chat.example.com");
    assert_eq!(settings.identifier_field, IdentifierField::UserName);
    assert_eq!(settings.reset_delay_ms, 1000);
    assert_eq!(settings.response_shapes, ResponseShapes::Strict);
    assert_eq!(settings.model, "gpt-4o-mini");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn explicit_missing_config_is_an_error() {
    let missing = env::temp_dir().join("chat_cli_definitely_missing.toml");
    assert!(load_settings(Some(&missing)).is_err());
}

#[test]
fn unknown_config_keys_are_rejected() {
    let path = temp_file("bad.toml", "base_uri = \"http://typo\"\n");
    let err = load_settings(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn env_overrides_win_and_bad_values_are_ignored() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("CHAT_BASE_URL", "http://first"),
        ("APP__BASE_URL", "http://second"),
        ("APP__PROVIDER", "ANTHROPIC"),
        ("APP__RESET_DELAY_MS", "soon"),
        ("APP__SHOW_LOADING", "off"),
        ("APP__IDENTIFIER_FIELD", "name"),
    ]);

    let mut settings = Settings::default();
    apply_env(&mut settings, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.base_url, "http://second");
    assert_eq!(settings.provider, "ANTHROPIC");
    assert_eq!(settings.reset_delay_ms, 2000);
    assert!(!settings.show_loading);
    assert_eq!(settings.identifier_field, IdentifierField::UserName);
}
