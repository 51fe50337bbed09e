// tests/config_file.rs

mod common;
use crate::common::*;

use std::error::Error;
use std::fs;

use serde_json::json;
use tempfile::tempdir;

use fnflow::config::{load_and_validate, load_from_path};
use fnflow::types::LogLevel;
use fnflow::{Flow, FlowError, Task};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn loads_a_full_config_file() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("fnflow.toml");
    fs::write(
        &path,
        r#"
[engine]
event_buffer = 8
max_parallel_subflows = 3

[logging]
level = "debug"
"#,
    )?;

    let config = load_and_validate(&path)?;
    assert_eq!(config.event_buffer(), 8);
    assert_eq!(config.max_parallel_subflows(), Some(3));
    assert_eq!(config.log_level(), Some(LogLevel::Debug));
    Ok(())
}

#[test]
fn missing_sections_use_defaults() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("fnflow.toml");
    fs::write(&path, "[logging]\nlevel = \"warning\"\n")?;

    let raw = load_from_path(&path)?;
    assert_eq!(raw.engine.event_buffer, 64);
    assert_eq!(raw.engine.max_parallel_subflows, 0);

    let config = load_and_validate(&path)?;
    assert_eq!(config.max_parallel_subflows(), None);
    assert_eq!(config.log_level(), Some(LogLevel::Warn));
    Ok(())
}

#[test]
fn invalid_files_are_reported() -> TestResult {
    let dir = tempdir()?;

    let missing = dir.path().join("absent.toml");
    assert!(matches!(load_and_validate(&missing), Err(FlowError::IoError(_))));

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[engine\nevent_buffer = ")?;
    assert!(matches!(load_and_validate(&broken), Err(FlowError::TomlError(_))));

    let zero = dir.path().join("zero.toml");
    fs::write(&zero, "[engine]\nevent_buffer = 0\n")?;
    assert!(matches!(load_and_validate(&zero), Err(FlowError::ConfigError(_))));
    Ok(())
}

#[tokio::test]
async fn flows_run_with_a_loaded_config() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("fnflow.toml");
    fs::write(&path, "[engine]\nevent_buffer = 1\nmax_parallel_subflows = 1\n")?;
    let config = load_and_validate(&path)?;

    let flow = with_methods(
        Flow::new()
            .task("getAuthor", Task::call(author_by_name()).arg("authorName"))
            .task("getBooks", Task::method("getAuthor.getBooks"))
            .add_flow(
                "series",
                Flow::bound_to("getBooks").task("getSeries", Task::method("getBookSeries")),
            ),
    );
    let outcome = flow
        .execute_with_config(json!({ "authorName": "Robert Jordan" }), &config)
        .await?;

    assert!(outcome.is_ok());
    assert_eq!(
        outcome.results["series"],
        json!([
            { "getSeries": series(2) },
            { "getSeries": series(2) },
            { "getSeries": series(2) },
        ])
    );
    Ok(())
}
