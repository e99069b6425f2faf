//! E2E harness entry point
//!
//! This file is the test binary that drives the browser scenario suites.
//! Run with: cargo test --package discoverqa-harness --test e2e

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use discoverqa_harness::runner::ScenarioRunner;
use discoverqa_harness::scenarios;
use discoverqa_harness::{check_site_reachable, logging, Browser, EnvironmentConfig, HarnessResult};

#[derive(Parser, Debug)]
#[command(name = "discoverqa-e2e")]
#[command(about = "E2E scenario runner for the TMDB Discover site")]
struct Args {
    /// Base URL of the site under test (overrides BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<String>,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only scenarios whose name contains this string
    #[arg(short, long)]
    name: Option<String>,

    /// Skip the pre-run site reachability probe
    #[arg(long)]
    skip_probe: bool,

    /// Output directory for the run artifact
    #[arg(short, long, default_value = "reports")]
    output: PathBuf,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() {
    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(success) => {
            if success {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> HarnessResult<bool> {
    logging::init(&args.log_dir)?;

    let mut config = EnvironmentConfig::from_env();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(browser) = &args.browser {
        config.browser = Browser::parse(browser);
    }
    if args.headed {
        config.headless = false;
    }

    if !args.skip_probe {
        check_site_reachable(&config.base_url, Duration::from_secs(10)).await?;
    }

    let mut suites = scenarios::all_suites();
    if let Some(tag) = &args.tag {
        for suite in &mut suites {
            suite
                .scenarios
                .retain(|s| s.tags.contains(&tag.as_str()));
        }
        suites.retain(|suite| !suite.scenarios.is_empty());
    }
    if let Some(name) = &args.name {
        for suite in &mut suites {
            suite.scenarios.retain(|s| s.name.contains(name.as_str()));
        }
        suites.retain(|suite| !suite.scenarios.is_empty());
    }

    let runner = ScenarioRunner::new(config, args.output);
    let (artifact, totals) = runner.run_suites(&suites).await;
    runner.write_results(&artifact)?;

    tracing::info!(
        "Test Results: {} passed, {} failed, {} skipped ({} ms)",
        totals.passed,
        totals.failed,
        totals.skipped,
        artifact.stats.duration_ms
    );

    Ok(totals.failed == 0)
}
