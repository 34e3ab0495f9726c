//! Integration tests for run selection, ordering and parallel execution.

use std::time::Duration;

use snipcheck_core::{
    ChannelMode, Fixture, HarnessError, MatchMode, Outcome, ReportAggregator, RunConfig,
    RunController, SnippetFilter, SnippetRegistry,
};

/// Registry of `count` snippets; every third one is tagged `slow`.
fn numbered_registry(count: usize) -> SnippetRegistry {
    let mut registry = SnippetRegistry::new();
    for i in 0..count {
        let tags: &[&str] = if i % 3 == 0 { &["numbers", "slow"] } else { &["numbers"] };
        let delay = if i % 3 == 0 { 40 } else { 5 };
        registry
            .register(
                format!("n{i}"),
                move |out| {
                    std::thread::sleep(Duration::from_millis(delay));
                    out.line(i);
                    Ok(())
                },
                Some(Fixture::from_lines([i.to_string()])),
                tags,
            )
            .unwrap();
    }
    registry
}

fn parallel(n: usize) -> RunConfig {
    RunConfig {
        parallelism: n,
        ..RunConfig::default()
    }
}

/// Test: total equals the number of snippets the filter selects
#[tokio::test]
async fn test_total_matches_selection() {
    let registry = numbered_registry(7);
    let controller = RunController::new(RunConfig::default()).unwrap();

    let filter = SnippetFilter::parse("tag:slow").unwrap();
    let expected = registry.list(Some(&filter)).count();
    let mut reporter = ReportAggregator::new();
    let report = controller
        .execute(&registry, Some(&filter), 1_000, &mut reporter)
        .await
        .unwrap();

    assert_eq!(expected, 3);
    assert_eq!(report.counts.total, expected);
    let c = report.counts;
    assert_eq!(c.passed + c.failed + c.errored + c.timed_out, c.total);
    let ids: Vec<&str> = report.results.iter().map(|r| r.snippet_id.as_str()).collect();
    assert_eq!(ids, vec!["n0", "n3", "n6"]);
}

/// Test: selecting one snippet by name
#[tokio::test]
async fn test_filter_by_name() {
    let registry = numbered_registry(4);
    let controller = RunController::new(RunConfig::default()).unwrap();
    let filter = SnippetFilter::parse("n2").unwrap();
    let mut reporter = ReportAggregator::new();
    let report = controller
        .execute(&registry, Some(&filter), 1_000, &mut reporter)
        .await
        .unwrap();
    assert_eq!(report.counts.total, 1);
    assert_eq!(report.results[0].snippet_id, "n2");
    assert!(report.all_passed());
}

/// Test: a filter that selects nothing aborts before execution
#[tokio::test]
async fn test_filter_matching_nothing_is_configuration_error() {
    let registry = numbered_registry(2);
    let controller = RunController::new(RunConfig::default()).unwrap();
    let filter = SnippetFilter::parse("tag:closures").unwrap();
    let mut reporter = ReportAggregator::new();
    let err = controller
        .execute(&registry, Some(&filter), 1_000, &mut reporter)
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Configuration(_)));
    assert!(reporter.is_empty());
}

/// Test: parallel workers keep registry order in the report
#[tokio::test]
async fn test_parallel_results_in_registry_order() {
    let registry = numbered_registry(12);
    let controller = RunController::new(parallel(4)).unwrap();
    let mut reporter = ReportAggregator::new();
    let report = controller
        .execute(&registry, None, 2_000, &mut reporter)
        .await
        .unwrap();

    assert_eq!(report.counts.total, 12);
    assert_eq!(report.counts.passed, 12);
    for (i, result) in report.results.iter().enumerate() {
        assert_eq!(result.snippet_id, format!("n{i}"));
        assert_eq!(result.output.lines(), &[i.to_string()]);
    }
}

/// Test: parallel timeouts are isolated per worker
#[tokio::test]
async fn test_parallel_timeouts_isolated() {
    let mut registry = SnippetRegistry::new();
    registry
        .register(
            "stuck",
            |out| {
                std::thread::sleep(Duration::from_millis(400));
                out.line("never seen");
                Ok(())
            },
            None,
            &[],
        )
        .unwrap();
    for i in 0..3 {
        registry
            .register(
                format!("quick{i}"),
                move |out| {
                    out.line(format!("quick {i}"));
                    Ok(())
                },
                Some(Fixture::from_lines([format!("quick {i}")])),
                &[],
            )
            .unwrap();
    }

    let controller = RunController::new(parallel(2)).unwrap();
    let mut reporter = ReportAggregator::new();
    let report = controller
        .execute(&registry, None, 100, &mut reporter)
        .await
        .unwrap();

    assert_eq!(report.results[0].outcome, Outcome::TimedOut);
    assert!(report.results[1..].iter().all(|r| r.outcome == Outcome::Passed));
    assert_eq!(report.exit_code(), 2);
}

/// Test: parallel mode on a shared channel is rejected up front
#[test]
fn test_parallel_shared_channel_rejected() {
    let config = RunConfig {
        parallelism: 3,
        channel: ChannelMode::Shared,
        match_mode: MatchMode::Exact,
    };
    let err = RunController::new(config).unwrap_err();
    assert!(matches!(err, HarnessError::Configuration(_)));
}

/// Test: fixtures loaded from disk grade like inline ones
#[tokio::test]
async fn test_fixture_file_and_trailing_whitespace_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greet.expected");
    std::fs::write(&path, "Hello, Taylor!\nOh no, it's Taylor again...\n").unwrap();

    let mut registry = SnippetRegistry::new();
    registry
        .register(
            "greet",
            |out| {
                out.line("Hello, Taylor!   ");
                out.line("Oh no, it's Taylor again...");
                Ok(())
            },
            Some(Fixture::load(&path).unwrap()),
            &["day5", "functions"],
        )
        .unwrap();

    let exact = RunController::new(RunConfig::default()).unwrap();
    let mut reporter = ReportAggregator::new();
    let report = exact
        .execute(&registry, None, 1_000, &mut reporter)
        .await
        .unwrap();
    assert_eq!(report.results[0].outcome, Outcome::Failed);
    assert_eq!(report.results[0].diff.as_ref().unwrap().index, 0);

    let lenient = RunController::new(RunConfig {
        match_mode: MatchMode::TrimTrailingWhitespace,
        ..RunConfig::default()
    })
    .unwrap();
    let mut reporter = ReportAggregator::new();
    let report = lenient
        .execute(&registry, None, 1_000, &mut reporter)
        .await
        .unwrap();
    assert_eq!(report.results[0].outcome, Outcome::Passed);
    assert_eq!(
        report.results[0].fixture_digest.as_deref(),
        Some(Fixture::load(&path).unwrap().digest().as_str())
    );
}

/// Test: empty registry yields an empty, passing report
#[tokio::test]
async fn test_empty_registry() {
    let registry = SnippetRegistry::new();
    let controller = RunController::new(parallel(4)).unwrap();
    let mut reporter = ReportAggregator::new();
    let report = controller
        .execute(&registry, None, 1_000, &mut reporter)
        .await
        .unwrap();
    assert_eq!(report.counts.total, 0);
    assert_eq!(report.exit_code(), 0);
}

/// Test: an aggregator is good for exactly one run
#[tokio::test]
async fn test_reused_aggregator_rejected() {
    let registry = numbered_registry(3);
    let controller = RunController::new(RunConfig::default()).unwrap();
    let mut reporter = ReportAggregator::new();

    let before = chrono::Utc::now();
    let first = controller
        .execute(&registry, None, 1_000, &mut reporter)
        .await
        .unwrap();
    assert_eq!(first.counts.total, 3);
    assert!(first.started_at >= before);

    let err = controller
        .execute(&registry, None, 1_000, &mut reporter)
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Configuration(_)));
    assert_eq!(reporter.len(), 3);
}
