//! Snippet execution: capture scope, wall-clock timeout, error trapping and
//! grading against the snippet's fixture.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{warn, Instrument};

use crate::capture::{CaptureSink, CapturedOutput};
use crate::error::HarnessError;
use crate::fixture::{LineDiff, MatchMode};
use crate::obs::{emit_snippet_finished, emit_snippet_started, snippet_span};
use crate::snippet::Snippet;

/// Terminal classification of one snippet execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Errored,
    TimedOut,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Errored => "errored",
            Outcome::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one snippet. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// Snippet identifier.
    pub snippet_id: String,

    /// Terminal outcome.
    pub outcome: Outcome,

    /// Lines the body wrote before it returned or was abandoned.
    pub output: CapturedOutput,

    /// First mismatch against the fixture (`Failed` only).
    pub diff: Option<LineDiff>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Error description (`Errored` and `TimedOut`).
    pub error: Option<String>,

    /// Digest of the fixture the output was judged against.
    pub fixture_digest: Option<String>,
}

impl ExecutionResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// How a body attempt ended, before grading.
enum Attempt {
    Completed,
    Raised(String),
    Abandoned,
}

type BodyReport = std::thread::Result<anyhow::Result<()>>;

/// Runs snippets one at a time on a single output channel.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    sink: CaptureSink,
    match_mode: MatchMode,
}

impl ExecutionEngine {
    pub fn new(sink: CaptureSink, match_mode: MatchMode) -> Self {
        Self { sink, match_mode }
    }

    /// Engine with a private output channel.
    pub fn isolated(match_mode: MatchMode) -> Self {
        Self::new(CaptureSink::new(), match_mode)
    }

    pub fn sink(&self) -> &CaptureSink {
        &self.sink
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Execute `snippet` and grade it.
    ///
    /// Never fails: body errors, panics and timeouts become outcomes.
    /// `timeout_ms == 0` disables the limit.
    ///
    /// The body runs on its own OS thread. On timeout the engine stops
    /// waiting, closes the capture scope and returns; the thread itself is
    /// detached and keeps running until the body returns on its own. Any
    /// output it produces after that point is discarded.
    pub async fn run(&self, snippet: &Snippet, timeout_ms: u64) -> ExecutionResult {
        self.run_attempt(snippet, timeout_ms)
            .instrument(snippet_span(snippet.id()))
            .await
    }

    async fn run_attempt(&self, snippet: &Snippet, timeout_ms: u64) -> ExecutionResult {
        let start = Instant::now();

        let scope = match self.sink.begin() {
            Ok(scope) => scope,
            Err(e) => {
                let attempt = Attempt::Raised(e.to_string());
                return self.finish(snippet, start, attempt, CapturedOutput::default(), timeout_ms);
            }
        };

        emit_snippet_started(snippet.id(), snippet.ordinal());

        let (tx, rx) = oneshot::channel::<BodyReport>();
        let body = snippet.body();
        let mut out = scope.writer();
        let spawned = std::thread::Builder::new()
            .name(format!("snippet-{}", snippet.id()))
            .spawn(move || {
                let report = panic::catch_unwind(AssertUnwindSafe(|| (*body)(&mut out)));
                // The receiver is gone if the engine already gave up.
                let _ = tx.send(report);
            });

        let attempt = match spawned {
            Err(e) => Attempt::Raised(format!("failed to start snippet thread: {e}")),
            Ok(_detached) => Self::await_body(rx, timeout_ms).await,
        };

        let captured = scope.finish();
        self.finish(snippet, start, attempt, captured, timeout_ms)
    }

    async fn await_body(rx: oneshot::Receiver<BodyReport>, timeout_ms: u64) -> Attempt {
        let received = if timeout_ms == 0 {
            rx.await
        } else {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
                Ok(received) => received,
                Err(_elapsed) => return Attempt::Abandoned,
            }
        };

        match received {
            Ok(Ok(Ok(()))) => Attempt::Completed,
            Ok(Ok(Err(e))) => {
                Attempt::Raised(HarnessError::Snippet(format!("{e:#}")).to_string())
            }
            Ok(Err(payload)) => {
                Attempt::Raised(format!("snippet panicked: {}", panic_message(&*payload)))
            }
            Err(_closed) => {
                Attempt::Raised("snippet thread exited without reporting".to_string())
            }
        }
    }

    fn finish(
        &self,
        snippet: &Snippet,
        start: Instant,
        attempt: Attempt,
        output: CapturedOutput,
        timeout_ms: u64,
    ) -> ExecutionResult {
        let duration_ms = start.elapsed().as_millis() as u64;
        let fixture_digest = snippet.expected().map(|f| f.digest());

        let (outcome, diff, error) = match attempt {
            Attempt::Abandoned => {
                warn!(snippet = %snippet.id(), limit_ms = timeout_ms, "Snippet timed out; abandoning");
                let err = HarnessError::TimedOut { limit_ms: timeout_ms };
                (Outcome::TimedOut, None, Some(err.to_string()))
            }
            Attempt::Raised(message) => (Outcome::Errored, None, Some(message)),
            Attempt::Completed => match snippet.expected() {
                None => (Outcome::Passed, None, None),
                Some(fixture) => match fixture.compare(output.lines(), self.match_mode) {
                    None => (Outcome::Passed, None, None),
                    Some(diff) => (Outcome::Failed, Some(diff), None),
                },
            },
        };

        emit_snippet_finished(snippet.id(), outcome.as_str(), duration_ms);

        ExecutionResult {
            snippet_id: snippet.id().to_string(),
            outcome,
            output,
            diff,
            duration_ms,
            error,
            fixture_digest,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use crate::registry::SnippetRegistry;
    use std::io::Write;
    use std::sync::Arc;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::isolated(MatchMode::Exact)
    }

    #[test]
    fn test_outcome_serde_names() {
        let json = serde_json::to_string(&Outcome::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
        assert_eq!(Outcome::Errored.to_string(), "errored");
    }

    #[tokio::test]
    async fn test_fixtureless_snippet_passes() {
        let mut registry = SnippetRegistry::new();
        let snippet = Arc::clone(
            registry
                .register(
                    "demo",
                    |out| {
                        out.line("Hello World!");
                        Ok(())
                    },
                    None,
                    &[],
                )
                .unwrap(),
        );

        let result = engine().run(&snippet, 1000).await;
        assert_eq!(result.outcome, Outcome::Passed);
        assert_eq!(result.output.lines(), &["Hello World!"]);
        assert!(result.fixture_digest.is_none());
    }

    #[tokio::test]
    async fn test_body_error_becomes_errored() {
        let mut registry = SnippetRegistry::new();
        let snippet = Arc::clone(
            registry
                .register(
                    "throws",
                    |out| {
                        writeln!(out, "checking")?;
                        anyhow::bail!("password too short")
                    },
                    Some(Fixture::from_lines(["checking"])),
                    &[],
                )
                .unwrap(),
        );

        let result = engine().run(&snippet, 1000).await;
        assert_eq!(result.outcome, Outcome::Errored);
        assert!(result.error.unwrap().contains("password too short"));
        assert_eq!(result.output.lines(), &["checking"]);
    }

    #[tokio::test]
    async fn test_panic_becomes_errored() {
        let mut registry = SnippetRegistry::new();
        let snippet = Arc::clone(
            registry
                .register("panics", |_out| panic!("force unwrap of None"), None, &[])
                .unwrap(),
        );

        let engine = engine();
        let result = engine.run(&snippet, 1000).await;
        assert_eq!(result.outcome, Outcome::Errored);
        assert!(result.error.unwrap().contains("force unwrap of None"));
        assert!(!engine.sink().is_active());
    }

    #[tokio::test]
    async fn test_timeout_releases_capture() {
        let mut registry = SnippetRegistry::new();
        let slow = Arc::clone(
            registry
                .register(
                    "slow",
                    |out| {
                        std::thread::sleep(Duration::from_millis(300));
                        out.line("too late");
                        Ok(())
                    },
                    None,
                    &[],
                )
                .unwrap(),
        );

        let engine = engine();
        let result = engine.run(&slow, 50).await;
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert!(result.output.is_empty());
        assert!(result.error.unwrap().contains("50ms"));
        assert!(!engine.sink().is_active());
    }

    #[tokio::test]
    async fn test_busy_sink_is_errored_not_panicked() {
        let mut registry = SnippetRegistry::new();
        let snippet = Arc::clone(registry.register("any", |_| Ok(()), None, &[]).unwrap());

        let engine = engine();
        let _held = engine.sink().begin().unwrap();
        let result = engine.run(&snippet, 1000).await;
        assert_eq!(result.outcome, Outcome::Errored);
        assert!(result.error.unwrap().contains("capture already active"));
    }

    #[tokio::test]
    async fn test_zero_timeout_waits_for_completion() {
        let mut registry = SnippetRegistry::new();
        let snippet = Arc::clone(
            registry
                .register(
                    "patient",
                    |out| {
                        std::thread::sleep(Duration::from_millis(20));
                        out.line("done");
                        Ok(())
                    },
                    Some(Fixture::from_lines(["done"])),
                    &[],
                )
                .unwrap(),
        );

        let result = engine().run(&snippet, 0).await;
        assert_eq!(result.outcome, Outcome::Passed);
        assert!(result.fixture_digest.is_some());
    }
}
