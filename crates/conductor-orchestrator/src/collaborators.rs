use crate::discovery::WorkerFilter;
use crate::types::{SubTask, TaskDecomposition};
use async_trait::async_trait;
use conductor_core::{ConductorResult, Worker};
use serde::{Deserialize, Serialize};

/// Turns a free-form goal into a task graph.
#[async_trait]
pub trait GoalDecomposer: Send + Sync {
    /// Split `goal` into subtasks; `context` is caller-defined.
    async fn decompose_goal(
        &self,
        goal: &str,
        context: &serde_json::Value,
    ) -> ConductorResult<TaskDecomposition>;
}

/// Lists currently known workers.
#[async_trait]
pub trait WorkerDiscovery: Send + Sync {
    /// Workers matching `filter`, as a point-in-time snapshot.
    async fn discover_workers(&self, filter: &WorkerFilter) -> ConductorResult<Vec<Worker>>;
}

/// Runs one subtask on one worker.
///
/// Transport failures should be returned as `Err`; a worker that ran but
/// reported a problem returns `Ok` with [`InvocationStatus::Error`]. Both
/// count as a failed subtask.
#[async_trait]
pub trait WorkerInvoker: Send + Sync {
    /// Run `subtask` on `worker` and report the outcome.
    async fn invoke(
        &self,
        subtask: &SubTask,
        worker: &Worker,
    ) -> ConductorResult<InvocationOutcome>;
}

/// Status a worker reports for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    /// The worker completed the subtask.
    Success,
    /// The worker ran but reported a failure.
    Error,
}

/// What a worker reported back for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    /// Reported status.
    pub status: InvocationStatus,
    /// Time the worker spent, in milliseconds.
    pub execution_time_ms: f64,
    /// Worker output, or error details.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InvocationOutcome {
    /// A successful outcome.
    pub fn success(execution_time_ms: f64, payload: serde_json::Value) -> Self {
        Self {
            status: InvocationStatus::Success,
            execution_time_ms,
            payload,
        }
    }

    /// An outcome where the worker reported an error.
    pub fn error(execution_time_ms: f64, payload: serde_json::Value) -> Self {
        Self {
            status: InvocationStatus::Error,
            execution_time_ms,
            payload,
        }
    }

    /// Whether the worker reported success.
    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }
}
