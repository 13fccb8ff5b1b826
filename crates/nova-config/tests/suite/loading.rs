use nova_config::{ConfigError, DebuggerConfig, NovaConfig, DEFAULT_BATCH_HELPER_CLASS};
use pretty_assertions::assert_eq;

#[test]
fn empty_config_uses_defaults() {
    let config = NovaConfig::from_toml_str("").expect("empty config parses");
    assert_eq!(config, NovaConfig::default());
    assert!(config.debugger.batch_evaluation);
    assert_eq!(config.debugger.batch_helper_class, DEFAULT_BATCH_HELPER_CLASS);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn debugger_section_overrides_batching() {
    let config = NovaConfig::from_toml_str(
        r#"
[debugger]
batch_evaluation = false
batch_helper_class = "com.example.Batch"
"#,
    )
    .expect("config parses");

    assert_eq!(
        config.debugger,
        DebuggerConfig {
            batch_evaluation: false,
            batch_helper_class: "com.example.Batch".to_string(),
            ..DebuggerConfig::default()
        }
    );
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nova.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\njson = true\n").expect("write config");

    let config = NovaConfig::load_from_path(&path).expect("config loads");
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.toml");

    let err = NovaConfig::load_from_path(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => assert_eq!(reported, path.display().to_string()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn type_errors_do_not_echo_input() {
    let err = NovaConfig::from_toml_str("[debugger]\nbatch_evaluation = \"sometimes\"\n")
        .unwrap_err();
    let ConfigError::Toml(message) = err else {
        panic!("expected a toml error");
    };
    assert!(!message.contains("batch_evaluation = "));
}
