use crate::types::{ExecutionResult, SubTaskResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cumulative statistics for one worker across the runs of an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Worker these counters belong to.
    pub worker_id: String,
    /// Subtasks routed to this worker.
    pub assignments: u64,
    /// Subtasks this worker completed.
    pub successes: u64,
    /// Routed subtasks that failed on this worker.
    pub failures: u64,
    /// Sum of reported execution times, in milliseconds.
    pub total_execution_ms: f64,
    /// Most recently recorded subtask id.
    pub last_subtask: Option<String>,
}

impl WorkerStats {
    fn new(worker_id: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            ..Self::default()
        }
    }

    /// Observed success fraction, or `None` before the first assignment.
    pub fn success_rate(&self) -> Option<f64> {
        (self.assignments > 0).then(|| self.successes as f64 / self.assignments as f64)
    }
}

/// Totals across every worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Distinct workers seen.
    pub workers: usize,
    /// Routed subtasks across all workers.
    pub assignments: u64,
    /// Succeeded subtasks across all workers.
    pub successes: u64,
    /// Failed routed subtasks across all workers.
    pub failures: u64,
    /// Subtasks for which routing found no worker.
    pub unrouted: u64,
    /// Sum of reported execution times, in milliseconds.
    pub total_execution_ms: f64,
}

#[derive(Default)]
struct MonitorState {
    workers: HashMap<String, WorkerStats>,
    unrouted: u64,
}

/// Tracks how the workers chosen by routing actually performed.
///
/// Purely observational: routing reads worker snapshots from discovery and
/// never consults these counters.
pub struct WorkerMonitor {
    state: Arc<RwLock<MonitorState>>,
}

impl WorkerMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MonitorState::default())),
        }
    }

    /// Record a single subtask outcome.
    pub async fn record(&self, result: &SubTaskResult) {
        let mut state = self.state.write().await;
        Self::apply(&mut state, result);
    }

    /// Record every subtask outcome of one strategy run.
    pub async fn record_execution(&self, execution: &ExecutionResult) {
        let mut state = self.state.write().await;
        for result in &execution.results {
            Self::apply(&mut state, result);
        }
    }

    fn apply(state: &mut MonitorState, result: &SubTaskResult) {
        let Some(worker_id) = result.worker_id.as_deref() else {
            state.unrouted += 1;
            return;
        };
        let stats = state
            .workers
            .entry(worker_id.to_string())
            .or_insert_with(|| WorkerStats::new(worker_id));
        stats.assignments += 1;
        if result.success {
            stats.successes += 1;
        } else {
            stats.failures += 1;
        }
        stats.total_execution_ms += result.execution_time_ms;
        stats.last_subtask = Some(result.subtask_id.clone());
    }

    /// All worker stats, sorted by worker id.
    pub async fn snapshot(&self) -> Vec<WorkerStats> {
        let state = self.state.read().await;
        let mut stats: Vec<WorkerStats> = state.workers.values().cloned().collect();
        stats.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        stats
    }

    /// Stats for one worker, if it was ever assigned a subtask.
    pub async fn get(&self, worker_id: &str) -> Option<WorkerStats> {
        let state = self.state.read().await;
        state.workers.get(worker_id).cloned()
    }

    /// Sum the counters of every worker.
    pub async fn aggregate(&self) -> AggregateStats {
        let state = self.state.read().await;
        let mut total = AggregateStats {
            workers: state.workers.len(),
            unrouted: state.unrouted,
            ..AggregateStats::default()
        };
        for stats in state.workers.values() {
            total.assignments += stats.assignments;
            total.successes += stats.successes;
            total.failures += stats.failures;
            total.total_execution_ms += stats.total_execution_ms;
        }
        total
    }

    /// Serialize the current state as JSON (for dashboards).
    pub async fn to_json(&self) -> serde_json::Value {
        let workers = self.snapshot().await;
        let aggregate = self.aggregate().await;
        serde_json::json!({
            "workers": workers,
            "aggregate": aggregate,
        })
    }
}

impl Default for WorkerMonitor {
    fn default() -> Self {
        Self::new()
    }
}
