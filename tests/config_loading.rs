// tests/config_loading.rs

use std::fs;

use clap::Parser;
use quickscope::cli::CliArgs;
use quickscope::config::load_and_validate;
use quickscope::errors::QuickscopeError;
use quickscope::load_config;
use quickscope::types::RunPolicy;
use quickscope_test_utils::builders::ConfigFileBuilder;
use tempfile::NamedTempFile;

fn args(extra: &[&str]) -> CliArgs {
    let mut argv = vec!["quickscope"];
    argv.extend_from_slice(extra);
    CliArgs::try_parse_from(argv).unwrap()
}

fn write_temp(contents: &str) -> NamedTempFile {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    fs::write(file.path(), contents).unwrap();
    file
}

#[test]
fn full_toml_config_loads() {
    let file = write_temp(
        r#"
files = ["test/**/*-test.js", "spec/**/*.spec.ts"]
cmd = "  mocha {targets}  "

[config]
run_policy = "cancel"
queue_length = 3
use_hash = true

[resolve]
exclude = ["node_modules", "vendor"]
extensions = [".js", "ts"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.files().len(), 2);
    assert_eq!(cfg.cmd(), "mocha {targets}");
    assert_eq!(cfg.config().run_policy, RunPolicy::Cancel);
    assert_eq!(cfg.config().queue_length, 3);
    assert!(cfg.config().use_hash);
    assert_eq!(cfg.resolve().extensions, vec!["js", "ts"]);
}

#[test]
fn missing_cmd_is_config_error() {
    let file = write_temp(r#"files = "test/*.js""#);

    match load_and_validate(file.path()) {
        Err(QuickscopeError::ConfigError(msg)) => assert!(msg.contains("cmd")),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn zero_queue_length_is_config_error() {
    let file = write_temp(
        r#"
files = "test/*.js"
cmd = "mocha"

[config]
queue_length = 0
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(QuickscopeError::ConfigError(_))
    ));
}

#[test]
fn unknown_run_policy_is_toml_error() {
    let file = write_temp(
        r#"
files = "test/*.js"
cmd = "mocha"

[config]
run_policy = "sometimes"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(QuickscopeError::TomlError(_))
    ));
}

#[test]
fn cli_overrides_file_values() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Quickscope.toml"),
        "files = \"test/*.js\"\ncmd = \"mocha\"\n",
    )
    .unwrap();

    let cfg = load_config(
        dir.path(),
        &args(&["--cmd", "jest", "--files", "spec/*.js", "--run-policy", "concurrent"]),
    )
    .unwrap();

    assert_eq!(cfg.cmd(), "jest");
    assert_eq!(cfg.files(), ["spec/*.js".to_string()]);
    assert_eq!(cfg.config().run_policy, RunPolicy::Concurrent);
}

#[test]
fn package_json_section_is_used_without_a_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "name": "demo", "config": { "quickscope": { "files": "test/*.js", "cmd": "mocha" } } }"#,
    )
    .unwrap();

    let cfg = load_config(dir.path(), &args(&[])).unwrap();

    assert_eq!(cfg.files(), ["test/*.js".to_string()]);
    assert_eq!(cfg.cmd(), "mocha");
}

#[test]
fn flags_alone_are_enough_without_any_file() {
    let dir = tempfile::tempdir().unwrap();

    let cfg = load_config(dir.path(), &args(&["--files", "test/*.js", "--cmd", "mocha"])).unwrap();
    assert_eq!(cfg.cmd(), "mocha");

    let err = load_config(dir.path(), &args(&[])).unwrap_err();
    assert!(matches!(err, QuickscopeError::ConfigError(_)));
}

#[test]
fn explicit_missing_config_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_config(dir.path(), &args(&["--config", "other.toml"])).unwrap_err();
    assert!(matches!(err, QuickscopeError::ConfigError(_)));
}

#[test]
fn builder_produces_valid_config() {
    let cfg = ConfigFileBuilder::new("mocha")
        .with_files("test/**/*-test.js")
        .with_run_policy(RunPolicy::Queue)
        .with_queue_length(2)
        .with_exclude("vendor")
        .build();

    assert_eq!(cfg.config().queue_length, 2);
    assert_eq!(cfg.resolve().exclude, vec!["node_modules", "vendor"]);
}
