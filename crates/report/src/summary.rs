//! Folding the run artifact into summary counts and a failure list
//!
//! The artifact is whatever the runner (or an upstream Playwright run) wrote:
//! suites nest arbitrarily, specs hold tests, tests hold per-attempt results,
//! and any field may be absent, null or misshapen depending on the producer's
//! version. The walk therefore operates on raw `serde_json::Value` and treats
//! every field as optional; nothing in this module can fail. Missing data
//! degrades to [`TestStatus::Unknown`], never to an error.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

/// Fallback when no error text is recoverable for a failed test.
pub const UNKNOWN_ERROR: &str = "Unknown error";

const DEFAULT_PROJECT: &str = "default";

/// Classification of one leaf test, chosen by ordered rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Unknown,
}

impl TestStatus {
    /// Map a producer-reported status string, accepting only the closed set.
    fn from_reported(status: &str) -> Option<Self> {
        match status {
            "passed" => Some(TestStatus::Passed),
            "failed" => Some(TestStatus::Failed),
            "skipped" => Some(TestStatus::Skipped),
            _ => None,
        }
    }
}

/// One failed leaf test, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub title: String,
    pub full_title: String,
    pub project_name: String,
    pub file: String,
    pub error_msg: String,
}

/// Aggregate of one run. `total` counts every leaf visited; leaves that
/// classify as unknown contribute to `total` only, so the three buckets may
/// sum to less than `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<FailureRecord>,
}

/// Read and parse the artifact; any failure yields `None` rather than an
/// error, which callers degrade to an empty summary.
pub fn read_json_safe(path: &Path) -> Option<Value> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Summarize one root node or an array of roots (multiple runs merge by
/// simple concatenation of their leaves).
pub fn summarize(results: &Value) -> TestSummary {
    let mut leaves = Vec::new();
    match results {
        Value::Array(roots) => {
            for root in roots {
                collect_root(root, &mut leaves);
            }
        }
        root => collect_root(root, &mut leaves),
    }

    let mut summary = TestSummary {
        total: leaves.len(),
        ..TestSummary::default()
    };
    for leaf in leaves {
        match leaf.status {
            TestStatus::Passed => summary.passed += 1,
            TestStatus::Failed => {
                summary.failed += 1;
                summary.failures.push(leaf.record);
            }
            TestStatus::Skipped => summary.skipped += 1,
            TestStatus::Unknown => {}
        }
    }
    summary
}

/// Classify one test node. Rules in strict priority order, first match wins:
/// any failed-ish attempt dominates (a flaky retry that later passed still
/// surfaces as failed), then any skipped attempt, then an all-passed attempt
/// list, then producer-reported `status` / `expectedStatus`.
pub fn status_from_test(test: &Value) -> TestStatus {
    let attempts = test
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    fn attempt_status(attempt: &Value) -> &str {
        attempt.get("status").and_then(Value::as_str).unwrap_or("")
    }

    if attempts
        .iter()
        .any(|a| matches!(attempt_status(a), "failed" | "timedOut" | "interrupted"))
    {
        return TestStatus::Failed;
    }
    if attempts.iter().any(|a| attempt_status(a) == "skipped") {
        return TestStatus::Skipped;
    }
    if !attempts.is_empty() && attempts.iter().all(|a| attempt_status(a) == "passed") {
        return TestStatus::Passed;
    }
    if let Some(status) = test
        .get("status")
        .and_then(Value::as_str)
        .and_then(TestStatus::from_reported)
    {
        return status;
    }
    if let Some(status) = test
        .get("expectedStatus")
        .and_then(Value::as_str)
        .and_then(TestStatus::from_reported)
    {
        return status;
    }
    TestStatus::Unknown
}

struct Leaf {
    status: TestStatus,
    record: FailureRecord,
}

fn collect_root(root: &Value, acc: &mut Vec<Leaf>) {
    let project = root
        .pointer("/project/name")
        .and_then(Value::as_str)
        .map(str::to_owned);
    collect_tests(root, project.as_deref(), acc);
}

/// Depth-first pre-order: nested suites first, then this node's specs, then
/// each spec's tests, all in listed order.
fn collect_tests(node: &Value, project: Option<&str>, acc: &mut Vec<Leaf>) {
    for suite in items(node, "suites") {
        collect_tests(suite, project, acc);
    }
    for spec in items(node, "specs") {
        let file = spec
            .get("file")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let title = spec
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| file_leaf(file));

        for test in items(spec, "tests") {
            let status = status_from_test(test);
            let project_name = test
                .get("projectName")
                .and_then(Value::as_str)
                .or(project)
                .unwrap_or(DEFAULT_PROJECT);
            let full_title = test
                .get("title")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .unwrap_or(&title);

            acc.push(Leaf {
                status,
                record: FailureRecord {
                    title: title.clone(),
                    full_title: full_title.to_string(),
                    project_name: project_name.to_string(),
                    file: file.to_string(),
                    error_msg: error_message(test),
                },
            });
        }
    }
}

fn items<'a>(node: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    node.get(key)
        .and_then(Value::as_array)
        .map(|list| list.iter())
        .into_iter()
        .flatten()
}

/// Last path segment of the spec's file, used when it carries no title.
fn file_leaf(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Recover error text: the `errors` array first, then the first attempt
/// carrying an `error`, then the fallback literal.
fn error_message(test: &Value) -> String {
    if let Some(first) = test.get("errors").and_then(Value::as_array).and_then(|a| a.first()) {
        if let Some(message) = first.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        if let Some(value) = first.get("value").and_then(Value::as_str) {
            return value.to_string();
        }
        return first.to_string();
    }

    if let Some(attempts) = test.get("results").and_then(Value::as_array) {
        if let Some(error) = attempts
            .iter()
            .filter_map(|attempt| attempt.get("error"))
            .find(|e| !e.is_null())
        {
            if let Some(message) = error.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
            return error.to_string();
        }
    }

    UNKNOWN_ERROR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({"results": [{"status": "failed"}]}), TestStatus::Failed; "single failed attempt")]
    #[test_case(json!({"results": [{"status": "timedOut"}]}), TestStatus::Failed; "timed out counts as failed")]
    #[test_case(json!({"results": [{"status": "interrupted"}]}), TestStatus::Failed; "interrupted counts as failed")]
    #[test_case(json!({"results": [{"status": "failed"}, {"status": "passed"}]}), TestStatus::Failed; "failed attempt dominates later pass")]
    #[test_case(json!({"results": [{"status": "skipped"}, {"status": "passed"}]}), TestStatus::Skipped; "skipped beats passed")]
    #[test_case(json!({"results": [{"status": "passed"}, {"status": "passed"}]}), TestStatus::Passed; "all attempts passed")]
    #[test_case(json!({"results": [], "status": "passed"}), TestStatus::Passed; "empty attempts fall to status")]
    #[test_case(json!({"status": "skipped"}), TestStatus::Skipped; "top level status")]
    #[test_case(json!({"expectedStatus": "failed"}), TestStatus::Failed; "expected status fallback")]
    #[test_case(json!({"status": "flaky", "expectedStatus": "passed"}), TestStatus::Passed; "unrecognized status falls through")]
    #[test_case(json!({}), TestStatus::Unknown; "empty test is unknown")]
    #[test_case(json!({"results": "not-an-array", "status": 12}), TestStatus::Unknown; "misshapen fields are unknown")]
    fn test_status_rules(test: Value, expected: TestStatus) {
        assert_eq!(status_from_test(&test), expected);
    }

    #[test]
    fn test_status_precedence_over_expected_status() {
        let test = json!({"status": "failed", "expectedStatus": "passed"});
        assert_eq!(status_from_test(&test), TestStatus::Failed);
    }

    #[test]
    fn test_single_passing_test() {
        let tree = json!({
            "suites": [{
                "specs": [{
                    "title": "Title search returns matching items",
                    "file": "tests/e2e/filters.spec.ts",
                    "tests": [{"results": [{"status": "passed"}]}]
                }]
            }]
        });
        let summary = summarize(&tree);
        assert_eq!(
            summary,
            TestSummary {
                total: 1,
                passed: 1,
                failed: 0,
                skipped: 0,
                failures: vec![],
            }
        );
    }

    #[test]
    fn test_failure_record_fields() {
        let tree = json!({
            "suites": [{
                "specs": [{
                    "file": "tests/e2e/pagination.spec.ts",
                    "tests": [{
                        "projectName": "chromium",
                        "results": [{
                            "status": "failed",
                            "error": {"message": "Timeout 30000ms exceeded"}
                        }]
                    }]
                }]
            }]
        });
        let summary = summarize(&tree);
        assert_eq!(summary.failed, 1);
        let failure = &summary.failures[0];
        assert_eq!(failure.error_msg, "Timeout 30000ms exceeded");
        assert_eq!(failure.project_name, "chromium");
        assert_eq!(failure.file, "tests/e2e/pagination.spec.ts");
        // No spec title: the file's last segment stands in.
        assert_eq!(failure.title, "pagination.spec.ts");
    }

    #[test]
    fn test_empty_inputs_yield_zero_summary() {
        for tree in [
            json!({}),
            json!({"suites": []}),
            json!({"suites": [{"specs": []}]}),
            json!({"suites": [{"specs": [{"tests": []}]}]}),
            json!(null),
            json!([]),
        ] {
            let summary = summarize(&tree);
            assert_eq!(summary, TestSummary::default(), "input: {}", tree);
        }
    }

    #[test]
    fn test_multiple_roots_merge() {
        let roots = json!([
            {"suites": [{"specs": [{"title": "a", "tests": [{"results": [{"status": "passed"}]}]}]}]},
            {"suites": [{"specs": [{"title": "b", "tests": [{"results": [{"status": "failed"}]}]}]}]}
        ]);
        let summary = summarize(&roots);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_unknown_counts_toward_total_only() {
        let tree = json!({
            "suites": [{
                "specs": [{
                    "title": "mixed",
                    "tests": [
                        {"results": [{"status": "passed"}]},
                        {},
                        {"results": [{"status": "skipped"}]}
                    ]
                }]
            }]
        });
        let summary = summarize(&tree);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed + summary.failed + summary.skipped, 2);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let tree = json!({
            "suites": [{
                "specs": [{
                    "title": "t",
                    "tests": [{"results": [{"status": "failed", "error": {"message": "boom"}}]}]
                }]
            }]
        });
        assert_eq!(summarize(&tree), summarize(&tree));
    }

    #[test]
    fn test_failures_preserve_traversal_order() {
        let tree = json!({
            "suites": [
                {
                    "suites": [{
                        "specs": [{"title": "nested-first", "tests": [{"results": [{"status": "failed"}]}]}]
                    }],
                    "specs": [{"title": "outer-second", "tests": [{"results": [{"status": "failed"}]}]}]
                },
                {
                    "specs": [{"title": "third", "tests": [{"results": [{"status": "failed"}]}]}]
                }
            ]
        });
        let summary = summarize(&tree);
        let order: Vec<&str> = summary.failures.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(order, ["nested-first", "outer-second", "third"]);
    }

    #[test]
    fn test_project_name_falls_back_to_root_then_default() {
        let tree = json!({
            "project": {"name": "webkit"},
            "suites": [{
                "specs": [{
                    "title": "t",
                    "tests": [{"results": [{"status": "failed"}]}]
                }]
            }]
        });
        assert_eq!(summarize(&tree).failures[0].project_name, "webkit");

        let bare = json!({
            "suites": [{"specs": [{"title": "t", "tests": [{"results": [{"status": "failed"}]}]}]}]
        });
        assert_eq!(summarize(&bare).failures[0].project_name, "default");
    }

    #[test]
    fn test_error_message_priority() {
        // errors[0].message wins over attempt errors.
        let test = json!({
            "errors": [{"message": "from errors array"}],
            "results": [{"status": "failed", "error": {"message": "from attempt"}}]
        });
        assert_eq!(error_message(&test), "from errors array");

        // errors[0].value is next.
        let test = json!({"errors": [{"value": "value text"}]});
        assert_eq!(error_message(&test), "value text");

        // An opaque errors[0] is stringified.
        let test = json!({"errors": [{"code": 7}]});
        assert_eq!(error_message(&test), r#"{"code":7}"#);

        // Then the first attempt that carries an error.
        let test = json!({
            "results": [
                {"status": "passed"},
                {"status": "failed", "error": {"message": "attempt error"}}
            ]
        });
        assert_eq!(error_message(&test), "attempt error");

        // An attempt error without a message is stringified.
        let test = json!({"results": [{"error": {"stack": "trace"}}]});
        assert_eq!(error_message(&test), r#"{"stack":"trace"}"#);

        // Nothing recoverable.
        assert_eq!(error_message(&json!({})), UNKNOWN_ERROR);
    }

    #[test]
    fn test_full_title_prefers_test_title() {
        let tree = json!({
            "suites": [{
                "specs": [{
                    "title": "spec title",
                    "tests": [{"title": "test title", "results": [{"status": "failed"}]}]
                }]
            }]
        });
        let failure = &summarize(&tree).failures[0];
        assert_eq!(failure.title, "spec title");
        assert_eq!(failure.full_title, "test title");
    }

    #[test]
    fn test_read_json_safe_missing_and_corrupt() {
        assert!(read_json_safe(Path::new("/nonexistent/results.json")).is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(read_json_safe(&path).is_none());

        std::fs::write(&path, r#"{"suites": []}"#).unwrap();
        assert!(read_json_safe(&path).is_some());
    }
}
