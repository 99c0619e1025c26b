use super::*;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let settings = settings_from(None, no_env);
    assert_eq!(settings.server_bind, "127.0.0.1:8080");
    assert_eq!(settings.config_path, PathBuf::from("production.json"));
    assert!(settings.openai_api_key.is_none());
}

#[test]
fn settings_file_overrides_defaults() {
    let raw = r#"
bind_addr = "0.0.0.0:9000"
config_path = "/etc/gbt/production.json"
"#;
    let settings = settings_from(Some(raw), no_env);
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(
        settings.config_path,
        PathBuf::from("/etc/gbt/production.json")
    );
}

#[test]
fn environment_overrides_settings_file() {
    let raw = r#"bind_addr = "0.0.0.0:9000""#;
    let settings = settings_from(Some(raw), |key| match key {
        "APP__BIND_ADDR" => Some("127.0.0.1:7000".to_string()),
        "APP__CONFIG_PATH" => Some("staging.json".to_string()),
        "OPENAI_API_KEY" => Some("sk-env".to_string()),
        _ => None,
    });
    assert_eq!(settings.server_bind, "127.0.0.1:7000");
    assert_eq!(settings.config_path, PathBuf::from("staging.json"));
    assert_eq!(settings.openai_api_key.as_deref(), Some("sk-env"));
}

#[test]
fn malformed_settings_file_is_ignored() {
    let settings = settings_from(Some("bind_addr = "), no_env);
    assert_eq!(settings.server_bind, "127.0.0.1:8080");
}

#[test]
fn blank_api_key_is_treated_as_missing() {
    let settings = settings_from(None, |key| {
        (key == "OPENAI_API_KEY").then(|| "  ".to_string())
    });
    assert!(settings.openai_api_key.is_none());
}
