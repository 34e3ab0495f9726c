//! Run report aggregation and rendering.
//!
//! [`ReportAggregator`] is append-only; [`ReportAggregator::summary`] is a pure
//! projection that can be taken any number of times. Counts are derived from
//! the recorded results, so `passed + failed + errored + timed_out == total`
//! holds by construction.

use std::fmt::Write as _;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{ExecutionResult, Outcome};
use crate::error::Result;

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub timed_out: usize,
    pub total: usize,
}

impl OutcomeCounts {
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.outcome {
                Outcome::Passed => counts.passed += 1,
                Outcome::Failed => counts.failed += 1,
                Outcome::Errored => counts.errored += 1,
                Outcome::TimedOut => counts.timed_out += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

/// Snapshot of a run: ordered results plus summary counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ExecutionResult>,
    pub counts: OutcomeCounts,
    pub wall_time_ms: u64,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.counts.passed == self.counts.total
    }

    /// Process exit code for this report.
    ///
    /// 0 when everything passed, 2 when anything timed out, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        if self.counts.timed_out > 0 {
            2
        } else if self.counts.failed > 0 || self.counts.errored > 0 {
            1
        } else {
            0
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable table: one row per snippet, first diff line on failure.
    pub fn render_text(&self) -> String {
        let width = self
            .results
            .iter()
            .map(|r| r.snippet_id.len())
            .max()
            .unwrap_or(0)
            .max("SNIPPET".len());

        let mut out = String::new();
        let _ = writeln!(out, "Run ID: {}", self.run_id);
        let _ = writeln!(out);
        let _ = writeln!(out, "  {:<width$}  {:<9}  {:>8}", "SNIPPET", "OUTCOME", "TIME");
        for result in &self.results {
            let marker = if result.passed() { "✓" } else { "✗" };
            let _ = writeln!(
                out,
                "{} {:<width$}  {:<9}  {:>6}ms",
                marker, result.snippet_id, result.outcome, result.duration_ms
            );
            if let Some(diff) = &result.diff {
                let _ = writeln!(out, "    {diff}");
            }
            if let Some(error) = &result.error {
                let _ = writeln!(out, "    {error}");
            }
        }

        let c = &self.counts;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Summary: {}/{} passed, {} failed, {} errored, {} timed out ({}ms)",
            c.passed, c.total, c.failed, c.errored, c.timed_out, self.wall_time_ms
        );
        out
    }
}

/// Collects results for one run.
#[derive(Debug)]
pub struct ReportAggregator {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
    results: Vec<ExecutionResult>,
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            clock: Instant::now(),
            results: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Restamp the start time; the run begins now.
    pub(crate) fn mark_started(&mut self) {
        self.started_at = Utc::now();
        self.clock = Instant::now();
    }

    /// Append one result.
    pub fn record(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Report as of now. Does not mutate the aggregator.
    pub fn summary(&self) -> RunReport {
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            results: self.results.clone(),
            counts: OutcomeCounts::from_results(&self.results),
            wall_time_ms: self.clock.elapsed().as_millis() as u64,
        }
    }
}
