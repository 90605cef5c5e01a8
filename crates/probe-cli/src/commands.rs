//! Command implementations
//!
//! Each command returns its output instead of printing it, so the binary
//! decides where it goes and tests can inspect it.

use crate::cli::{CompareArgs, RunArgs};
use anyhow::Context;
use probe_apis::Api;
use probe_runner::{CancellationToken, ReqwestTransport, RunSummary, ScenarioRunner};
use probe_scenario::store::{read_scenarios, write_scenarios};
use probe_scenario::{
    csv_report, group_counts, pending_count, scenario_map, seed_results, ComparisonReport, ResultsFile,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Build every scenario of `api` and write them to `output`
///
/// Returns the number of distinct scenarios written.
///
/// # Errors
/// Fails if the catalog cannot be composed or the file cannot be written
pub fn create_scenarios(api: Api, output: &Path) -> anyhow::Result<usize> {
    let scenarios = api
        .scenarios()
        .with_context(|| format!("failed to build {api} scenarios"))?;

    info!(api = %api, total = scenarios.len(), "created scenarios");
    for (group, count) in group_counts(&scenarios) {
        info!(group = %group, count, "scenario group");
    }

    let map = scenario_map(scenarios);
    write_scenarios(output, &map).with_context(|| format!("failed to write {}", output.display()))?;
    Ok(map.len())
}

/// Run pending scenarios, resuming from the results file
///
/// The results file doubles as checkpoint and cancellation flush, and is
/// written once more after the last pass.
///
/// # Errors
/// Fails on a missing scenarios file, an unreadable results file, invalid
/// configuration, or a failed write
pub async fn run_scenarios(
    args: &RunArgs,
    api_key: &str,
    token: &CancellationToken,
) -> anyhow::Result<RunSummary> {
    let config = args.runner_config().context("invalid runner configuration")?;
    let scenarios = read_scenarios(&args.scenarios_file)
        .with_context(|| format!("cannot run without scenarios from {}", args.scenarios_file.display()))?;

    let store = Arc::new(ResultsFile::new(&args.results_file));
    let mut results = store
        .load()
        .with_context(|| format!("failed to load results from {}", args.results_file.display()))?;
    let added = seed_results(&mut results, &scenarios);
    info!(
        scenarios = scenarios.len(),
        added,
        pending = pending_count(&results, config.max_trials),
        "loaded results"
    );

    let transport = ReqwestTransport::new(config.timeout()).context("failed to build HTTP client")?;
    let options = config
        .runner_options(args.api.path(), api_key)
        .with_header_sanitizer(args.api.header_sanitizer())
        .with_body_sanitizer(args.api.body_sanitizer());

    let mut runner = ScenarioRunner::new(results, Arc::new(transport), options)
        .with_checkpoint(store.clone())
        .with_finalizer(store.clone());
    let summary = runner
        .run_passes(config.passes, token)
        .await
        .context("scenario run failed")?;

    store
        .save(runner.results())
        .with_context(|| format!("failed to save results to {}", store.path().display()))?;

    if summary.pending > 0 {
        warn!(pending = summary.pending, outcome = ?summary.outcome, "scenarios left pending");
    }
    info!(outcome = ?summary.outcome, attempts = summary.attempts, "run finished");
    Ok(summary)
}

/// CSV report of a results file
///
/// # Errors
/// Fails if the results file cannot be read
pub fn report(results_file: &Path) -> anyhow::Result<String> {
    let results = ResultsFile::new(results_file)
        .load()
        .with_context(|| format!("failed to load results from {}", results_file.display()))?;
    Ok(csv_report(&results))
}

/// Rendered comparison of two results files
///
/// # Errors
/// Fails if either file cannot be read or a method is unknown
pub fn compare(args: &CompareArgs) -> anyhow::Result<String> {
    let left = ResultsFile::new(&args.left)
        .load()
        .with_context(|| format!("failed to load results from {}", args.left.display()))?;
    let right = ResultsFile::new(&args.right)
        .load()
        .with_context(|| format!("failed to load results from {}", args.right.display()))?;

    info!(api = %args.api, left = left.len(), right = right.len(), methods = ?args.methods, "comparing results");
    let report = ComparisonReport::build(&left, &right, &args.methods).context("comparison failed")?;
    Ok(report.render(args.verbose))
}
