//! Structured observability hooks for the run lifecycle.
//!
//! This module provides:
//! - Run- and snippet-scoped tracing spans, attached with `Instrument`
//! - Emission functions for key lifecycle events: run start, snippet start,
//!   snippet finish, run finish
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use tracing::{info, Span};

/// Span tagged with the run id; instrument the whole run future with it.
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("snipcheck.run", run_id = %run_id)
}

/// Span tagged with the snippet id; one per execution.
pub fn snippet_span(snippet_id: &str) -> Span {
    tracing::info_span!("snipcheck.snippet", snippet = %snippet_id)
}

/// Emit event: run started with the number of selected snippets.
pub fn emit_run_started(run_id: &str, selected: usize, parallelism: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        selected = selected,
        parallelism = parallelism,
    );
}

/// Emit event: snippet entered `Running`.
pub fn emit_snippet_started(snippet_id: &str, ordinal: usize) {
    info!(event = "snippet.started", snippet = %snippet_id, ordinal = ordinal);
}

/// Emit event: snippet reached a terminal outcome.
pub fn emit_snippet_finished(snippet_id: &str, outcome: &str, duration_ms: u64) {
    info!(
        event = "snippet.finished",
        snippet = %snippet_id,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

/// Emit event: run finished with summary counts.
pub fn emit_run_finished(run_id: &str, total: usize, passed: usize, wall_time_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        total = total,
        passed = passed,
        wall_time_ms = wall_time_ms,
    );
}
