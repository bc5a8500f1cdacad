#[allow(dead_code)]
mod common;

use common::*;
use predicates::prelude::*;

#[test]
fn test_formats_lists_every_label() {
    let helper = PlaygroundTestHelper::new("test_formats_lists_every_label", "no-engine");
    let results = helper.run_command(&["formats"]);

    results
        .success()
        .stdout(predicate::str::contains("human   CLI (default)"))
        .stdout(predicate::str::contains("ci      CI"))
        .stdout(predicate::str::contains("json    JSON"))
        .stdout(predicate::str::contains("sarif   SARIF"))
        .stdout(predicate::str::contains("junit   JUnit"));

    helper.clean_work_dir();
}

#[test]
fn test_formats_as_json() {
    let helper = PlaygroundTestHelper::new("test_formats_as_json", "no-engine");
    let results = helper.run_command(&["formats", "--json"]);

    results
        .success()
        .stdout(predicate::str::contains(r#""format": "junit""#))
        .stdout(predicate::str::contains(r#""label": "JUnit""#))
        .stdout(predicate::str::contains(r#""selected": true"#).count(1));

    helper.clean_work_dir();
}

#[test]
fn test_version_short() {
    let helper = PlaygroundTestHelper::new("test_version_short", "no-engine");
    let results = helper.run_command(&["version", "--short"]);

    results.success().stdout(predicate::str::starts_with(format!(
        "kube-score-playground {}",
        env!("CARGO_PKG_VERSION")
    )));

    helper.clean_work_dir();
}

#[test]
fn test_unknown_format_is_rejected() {
    let helper = PlaygroundTestHelper::new("test_unknown_format_is_rejected", "no-engine");
    let results = helper.run_command(&["score", "--format", "yaml"]);

    results
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value 'yaml'"));

    helper.clean_work_dir();
}
