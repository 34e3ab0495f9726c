//! Run orchestration: selection, execution, aggregation.
//!
//! Sequential by default. Parallel mode is a bounded worker pool where every
//! worker owns its own [`ExecutionEngine`] and [`CaptureSink`]; it is rejected
//! at construction time when the channel is shared.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, Instrument};

use crate::capture::CaptureSink;
use crate::engine::{ExecutionEngine, ExecutionResult};
use crate::error::{HarnessError, Result};
use crate::fixture::MatchMode;
use crate::obs::{emit_run_finished, emit_run_started, run_span};
use crate::registry::SnippetRegistry;
use crate::report::{ReportAggregator, RunReport};
use crate::snippet::{Snippet, SnippetFilter};

/// Upper bound on parallel workers.
pub const MAX_PARALLELISM: usize = 64;

/// Which output channel the engines write through.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Each worker gets a fresh channel.
    #[default]
    PerWorker,

    /// One channel for the whole run. Sequential only.
    Shared,
}

/// Execution settings for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of concurrent workers (1 = sequential).
    pub parallelism: usize,

    pub channel: ChannelMode,

    pub match_mode: MatchMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            channel: ChannelMode::PerWorker,
            match_mode: MatchMode::Exact,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(HarnessError::config("parallelism must be at least 1"));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(HarnessError::config(format!(
                "parallelism {} exceeds the maximum of {MAX_PARALLELISM}",
                self.parallelism
            )));
        }
        if self.parallelism > 1 && self.channel == ChannelMode::Shared {
            return Err(HarnessError::config(
                "parallel mode requires isolated output channels; a shared channel only supports sequential runs",
            ));
        }
        Ok(())
    }
}

/// Drives a registry selection through the engine into an aggregator.
#[derive(Debug)]
pub struct RunController {
    config: RunConfig,
    shared_sink: CaptureSink,
}

impl RunController {
    /// Validate `config` and build a controller.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shared_sink: CaptureSink::new(),
        })
    }

    /// Controller that writes through a caller-provided channel (sequential only).
    pub fn with_shared_sink(sink: CaptureSink, match_mode: MatchMode) -> Self {
        Self {
            config: RunConfig {
                parallelism: 1,
                channel: ChannelMode::Shared,
                match_mode,
            },
            shared_sink: sink,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every snippet `filter` selects and return the final report.
    ///
    /// Results are recorded in registry order. A filter selecting nothing is a
    /// configuration error and nothing is executed. `reporter` must be fresh:
    /// one that already holds results is rejected.
    pub async fn execute(
        &self,
        registry: &SnippetRegistry,
        filter: Option<&SnippetFilter>,
        timeout_ms: u64,
        reporter: &mut ReportAggregator,
    ) -> Result<RunReport> {
        if !reporter.is_empty() {
            return Err(HarnessError::config(format!(
                "report aggregator for run {} already holds {} results",
                reporter.run_id(),
                reporter.len()
            )));
        }

        let selected: Vec<Arc<Snippet>> = registry.list(filter).cloned().collect();
        if let Some(filter) = filter {
            if selected.is_empty() {
                return Err(HarnessError::config(format!(
                    "filter '{filter}' matched no snippets"
                )));
            }
        }
        debug!(
            selected = selected.len(),
            skipped = registry.len() - selected.len(),
            "Selected snippets"
        );

        let run_id = reporter.run_id().to_string();
        let workers = self.config.parallelism.min(selected.len()).max(1);

        reporter.mark_started();
        async {
            emit_run_started(&run_id, selected.len(), workers);

            if workers == 1 {
                let engine = self.engine();
                for snippet in &selected {
                    let result = engine.run(snippet, timeout_ms).await;
                    reporter.record(result);
                }
            } else {
                for result in self.run_pool(selected, workers, timeout_ms).await? {
                    reporter.record(result);
                }
            }

            let report = reporter.summary();
            emit_run_finished(
                &run_id,
                report.counts.total,
                report.counts.passed,
                report.wall_time_ms,
            );
            Ok::<_, HarnessError>(report)
        }
        .instrument(run_span(&run_id))
        .await
    }

    fn engine(&self) -> ExecutionEngine {
        match self.config.channel {
            ChannelMode::Shared => {
                ExecutionEngine::new(self.shared_sink.clone(), self.config.match_mode)
            }
            ChannelMode::PerWorker => ExecutionEngine::isolated(self.config.match_mode),
        }
    }

    async fn run_pool(
        &self,
        selected: Vec<Arc<Snippet>>,
        workers: usize,
        timeout_ms: u64,
    ) -> Result<Vec<ExecutionResult>> {
        let total = selected.len();
        let queue: Arc<Mutex<VecDeque<(usize, Arc<Snippet>)>>> =
            Arc::new(Mutex::new(selected.into_iter().enumerate().collect()));

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let engine = ExecutionEngine::isolated(self.config.match_mode);
                tokio::spawn(async move {
                    let mut done = Vec::new();
                    loop {
                        let next = queue
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .pop_front();
                        let Some((slot, snippet)) = next else { break };
                        debug!(worker, snippet = %snippet.id(), "Worker picked snippet");
                        done.push((slot, engine.run(&snippet, timeout_ms).await));
                    }
                    done
                })
            })
            .collect();

        let mut slots: Vec<Option<ExecutionResult>> = vec![None; total];
        for joined in futures::future::join_all(handles).await {
            let done = joined.map_err(|e| HarnessError::WorkerFailed(e.to_string()))?;
            for (slot, result) in done {
                slots[slot] = Some(result);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(slot, result)| {
                result.ok_or_else(|| {
                    HarnessError::WorkerFailed(format!("no result recorded for slot {slot}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let config = RunConfig {
            parallelism: 0,
            ..RunConfig::default()
        };
        assert!(matches!(
            RunController::new(config),
            Err(HarnessError::Configuration(_))
        ));
    }

    #[test]
    fn test_parallel_shared_channel_rejected() {
        let config = RunConfig {
            parallelism: 4,
            channel: ChannelMode::Shared,
            match_mode: MatchMode::Exact,
        };
        let err = RunController::new(config).unwrap_err();
        assert!(err.to_string().contains("isolated output channels"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_parallelism_cap() {
        let config = RunConfig {
            parallelism: MAX_PARALLELISM + 1,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sequential_shared_channel_allowed() {
        let config = RunConfig {
            parallelism: 1,
            channel: ChannelMode::Shared,
            match_mode: MatchMode::Exact,
        };
        assert!(RunController::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_shared_sink_is_used_and_released() {
        let sink = CaptureSink::new();
        let controller = RunController::with_shared_sink(sink.clone(), MatchMode::Exact);
        let mut registry = SnippetRegistry::new();
        registry
            .register(
                "hello",
                |out| {
                    out.line("hi");
                    Ok(())
                },
                None,
                &[],
            )
            .unwrap();

        let mut reporter = ReportAggregator::new();
        let report = controller
            .execute(&registry, None, 1000, &mut reporter)
            .await
            .unwrap();
        assert_eq!(report.counts.passed, 1);
        assert!(!sink.is_active());
    }
}
