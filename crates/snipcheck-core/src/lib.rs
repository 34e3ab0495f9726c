//! snipcheck core - snippet execution and assertion harness
//!
//! Provides the pieces of a small snippet runner that:
//! - Registers named, output-producing snippets in a deterministic order
//! - Executes each one in isolation with scoped output capture and a timeout
//! - Grades captured output line-for-line against expected-output fixtures
//! - Aggregates per-snippet outcomes into a run report

pub mod capture;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod obs;
pub mod registry;
pub mod report;
pub mod snippet;
pub mod telemetry;

// Re-export key types
pub use capture::{CaptureScope, CaptureSink, CapturedOutput, Output};
pub use config::{HarnessConfig, ReportFormat};
pub use controller::{ChannelMode, RunConfig, RunController, MAX_PARALLELISM};
pub use engine::{ExecutionEngine, ExecutionResult, Outcome};
pub use error::{HarnessError, Result};
pub use fixture::{Fixture, LineDiff, MatchMode};
pub use registry::{Selection, SnippetRegistry};
pub use report::{OutcomeCounts, ReportAggregator, RunReport};
pub use snippet::{Snippet, SnippetBody, SnippetFilter};
pub use telemetry::init_tracing;

/// snipcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
