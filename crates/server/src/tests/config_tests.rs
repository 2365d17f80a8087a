use super::{load_settings_from, normalize_database_url, prepare_database_url, Settings};

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(None, env_of(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
        bind_addr = "0.0.0.0:8080"
        database_url = "sqlite://./var/catalog.db"
        max_form_bytes = 2048
    "#;
    let settings = load_settings_from(Some(raw), env_of(&[])).expect("settings");
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.database_url, "sqlite://./var/catalog.db");
    assert_eq!(settings.max_form_bytes, 2048);
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn prefixed_env_wins_over_plain_env_and_file() {
    let raw = r#"bind_addr = "0.0.0.0:8080""#;
    let settings = load_settings_from(
        Some(raw),
        env_of(&[
            ("SERVER_BIND", "127.0.0.1:9000"),
            ("APP__BIND_ADDR", "127.0.0.1:9001"),
            ("RUST_LOG", "debug"),
            ("APP__MAX_FORM_BYTES", "not-a-number"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.server_bind, "127.0.0.1:9001");
    assert_eq!(settings.log_filter, "debug");
    assert_eq!(settings.max_form_bytes, Settings::default().max_form_bytes);
}

#[test]
fn malformed_file_is_an_error() {
    let err = load_settings_from(Some("bind_addr = ["), env_of(&[])).expect_err("malformed");
    assert!(err.to_string().contains("catalog.toml"));
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn empty_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn keeps_memory_and_foreign_urls() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("postgres://localhost/catalog"),
        "postgres://localhost/catalog"
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn normalizes_windows_plain_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("catalog.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    assert!(temp_root.path().join("nested").exists());

    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
