//! Scenario runner and results artifact writer
//!
//! Runs scenarios sequentially, each attempt against a fresh browser session
//! with a hard timeout, retrying failed scenarios up to the configured count.
//! Every attempt is recorded; the full run is written to
//! `reports/results.json` as a suites/specs/tests tree for the report
//! generator to fold.

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::EnvironmentConfig;
use crate::error::HarnessResult;
use crate::session::PageSession;

/// File name of the run artifact inside the output directory.
pub const RESULTS_FILE: &str = "results.json";

pub type ScenarioFn =
    for<'a> fn(&'a PageSession, &'a EnvironmentConfig) -> BoxFuture<'a, HarnessResult<()>>;

/// One runnable test case.
pub struct Scenario {
    pub name: &'static str,
    pub file: &'static str,
    pub tags: &'static [&'static str],
    /// Reason this scenario is currently not executed, if any.
    pub skip: Option<&'static str>,
    pub run: ScenarioFn,
}

/// A titled group of scenarios.
pub struct Suite {
    pub title: &'static str,
    pub scenarios: Vec<Scenario>,
}

/// One execution attempt of a scenario.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub status: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub project_name: String,
    pub title: String,
    pub results: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecRecord {
    pub title: String,
    pub file: String,
    pub tests: Vec<TestRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteRecord {
    pub title: String,
    pub specs: Vec<SpecRecord>,
}

/// The artifact written to `reports/results.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsArtifact {
    pub suites: Vec<SuiteRecord>,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub start_time: String,
    pub duration_ms: u64,
}

/// Console-facing totals. A scenario that failed once and passed on retry
/// counts as passed here; the summary report applies its own, stricter rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct ScenarioRunner {
    config: EnvironmentConfig,
    output_dir: PathBuf,
}

impl ScenarioRunner {
    pub fn new(config: EnvironmentConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    /// Run every scenario in every suite, in listed order.
    pub async fn run_suites(&self, suites: &[Suite]) -> (ResultsArtifact, RunTotals) {
        let start = Instant::now();
        let start_time = chrono::Utc::now().to_rfc3339();
        let mut totals = RunTotals::default();
        let mut suite_records = Vec::with_capacity(suites.len());

        let scenario_count: usize = suites.iter().map(|s| s.scenarios.len()).sum();
        info!("Running {} scenario(s)...", scenario_count);

        for suite in suites {
            let mut specs = Vec::with_capacity(suite.scenarios.len());
            for scenario in &suite.scenarios {
                let record = self.run_scenario(scenario).await;
                totals.total += 1;
                match record.results.last().map(|a| a.status.as_str()) {
                    Some("passed") => {
                        totals.passed += 1;
                        let attempts = record.results.len();
                        if attempts > 1 {
                            info!("✓ {} (flaky, {} attempts)", scenario.name, attempts);
                        } else {
                            info!("✓ {}", scenario.name);
                        }
                    }
                    Some("skipped") => {
                        totals.skipped += 1;
                        info!("- {} (skipped)", scenario.name);
                    }
                    _ => {
                        totals.failed += 1;
                        let reason = record
                            .results
                            .last()
                            .and_then(|a| a.error.as_ref())
                            .map(|e| e.message.as_str())
                            .unwrap_or("unknown error");
                        error!("✗ {} - {}", scenario.name, reason);
                    }
                }
                specs.push(SpecRecord {
                    title: scenario.name.to_string(),
                    file: scenario.file.to_string(),
                    tests: vec![record],
                });
            }
            suite_records.push(SuiteRecord {
                title: suite.title.to_string(),
                specs,
            });
        }

        let artifact = ResultsArtifact {
            suites: suite_records,
            stats: RunStats {
                start_time,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        };
        (artifact, totals)
    }

    /// Run one scenario: fresh session per attempt, hard timeout, retries.
    async fn run_scenario(&self, scenario: &Scenario) -> TestRecord {
        let project_name = self.config.browser.as_str().to_string();

        if let Some(reason) = scenario.skip {
            debug!("skipping '{}': {}", scenario.name, reason);
            return TestRecord {
                project_name,
                title: scenario.name.to_string(),
                results: vec![AttemptRecord {
                    status: "skipped".to_string(),
                    duration_ms: 0,
                    error: None,
                }],
            };
        }

        let mut results = Vec::new();
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                warn!("retrying '{}' (attempt {})", scenario.name, attempt + 1);
            }
            let record = self.run_attempt(scenario).await;
            let passed = record.status == "passed";
            results.push(record);
            if passed {
                break;
            }
        }

        TestRecord {
            project_name,
            title: scenario.name.to_string(),
            results,
        }
    }

    async fn run_attempt(&self, scenario: &Scenario) -> AttemptRecord {
        let started = Instant::now();

        let session = match PageSession::open(&self.config).await {
            Ok(session) => session,
            Err(e) => {
                return AttemptRecord {
                    status: "failed".to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    error: Some(ErrorRecord {
                        message: format!("session setup failed: {}", e),
                    }),
                };
            }
        };

        let outcome = tokio::time::timeout(
            self.config.scenario_timeout,
            (scenario.run)(&session, &self.config),
        )
        .await;
        session.close().await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Ok(())) => AttemptRecord {
                status: "passed".to_string(),
                duration_ms,
                error: None,
            },
            Ok(Err(e)) => AttemptRecord {
                status: "failed".to_string(),
                duration_ms,
                error: Some(ErrorRecord {
                    message: e.to_string(),
                }),
            },
            Err(_) => AttemptRecord {
                status: "timedOut".to_string(),
                duration_ms,
                error: Some(ErrorRecord {
                    message: format!(
                        "Timeout {}ms exceeded",
                        self.config.scenario_timeout.as_millis()
                    ),
                }),
            },
        }
    }

    /// Write the artifact to `<output_dir>/results.json`, creating the
    /// directory as needed. Re-runs overwrite in place.
    pub fn write_results(&self, artifact: &ResultsArtifact) -> HarnessResult<PathBuf> {
        write_results_to(artifact, &self.output_dir)
    }
}

pub fn write_results_to(artifact: &ResultsArtifact, output_dir: &Path) -> HarnessResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(RESULTS_FILE);
    let json = serde_json::to_string_pretty(artifact)?;
    std::fs::write(&path, json)?;
    info!("Results written to: {}", path.display());
    Ok(path)
}
