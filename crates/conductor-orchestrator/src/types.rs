use chrono::{DateTime, Utc};
use conductor_core::{CertificationTier, ConductorError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

/// Algorithm governing dependency respect and concurrency during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategyKind {
    /// Dependency-ordered, one invocation at a time.
    Sequential,
    /// All subtasks at once, no dependency ordering.
    Parallel,
    /// Same algorithm as sequential; output chaining is not implemented.
    Pipeline,
    /// Parallel first, sequential if the parallel attempt fails as a whole.
    Adaptive,
}

impl ExecutionStrategyKind {
    /// Every kind, in declaration order.
    pub const ALL: [ExecutionStrategyKind; 4] = [
        ExecutionStrategyKind::Sequential,
        ExecutionStrategyKind::Parallel,
        ExecutionStrategyKind::Pipeline,
        ExecutionStrategyKind::Adaptive,
    ];
}

impl std::fmt::Display for ExecutionStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategyKind::Sequential => write!(f, "sequential"),
            ExecutionStrategyKind::Parallel => write!(f, "parallel"),
            ExecutionStrategyKind::Pipeline => write!(f, "pipeline"),
            ExecutionStrategyKind::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for ExecutionStrategyKind {
    type Err = ConductorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionStrategyKind::Sequential),
            "parallel" => Ok(ExecutionStrategyKind::Parallel),
            "pipeline" => Ok(ExecutionStrategyKind::Pipeline),
            "adaptive" => Ok(ExecutionStrategyKind::Adaptive),
            other => Err(ConductorError::UnsupportedStrategy(other.to_string())),
        }
    }
}

/// Optional constraints a subtask places on the worker that runs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRequirements {
    /// Lowest acceptable tier; bronze when unset.
    #[serde(default)]
    pub minimum_tier: Option<CertificationTier>,
    /// Frameworks the worker must integrate with. `None` skips the check.
    #[serde(default)]
    pub required_frameworks: Option<Vec<String>>,
    /// Upper bound on the worker's average response time. `None` skips the check.
    #[serde(default)]
    pub max_response_time_ms: Option<f64>,
}

/// One unit of work within a decomposed goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    /// Unique within its decomposition.
    pub id: String,
    /// Capability a worker must declare to score the capability points.
    pub required_capability: String,
    /// Expected cost in the same unit as worker execution time (ms).
    pub estimated_effort: f64,
    /// Ids of subtasks that must run first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Higher runs earlier when several subtasks are ready.
    #[serde(default)]
    pub priority: i32,
    /// Optional worker constraints used by scoring.
    #[serde(default)]
    pub agent_requirements: Option<AgentRequirements>,
}

impl SubTask {
    /// Create a subtask with no dependencies and priority 0.
    pub fn new(
        id: impl Into<String>,
        required_capability: impl Into<String>,
        estimated_effort: f64,
    ) -> Self {
        Self {
            id: id.into(),
            required_capability: required_capability.into(),
            estimated_effort,
            dependencies: Vec::new(),
            priority: 0,
            agent_requirements: None,
        }
    }

    /// Replace the dependency list.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach worker requirements.
    pub fn with_requirements(mut self, requirements: AgentRequirements) -> Self {
        self.agent_requirements = Some(requirements);
        self
    }

    /// True when every dependency id is in `satisfied`.
    pub fn is_ready(&self, satisfied: &HashSet<&str>) -> bool {
        self.dependencies
            .iter()
            .all(|dep| satisfied.contains(dep.as_str()))
    }
}

/// Convergence settings carried with a decomposition. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceCriteria {
    /// Fraction of subtasks that should succeed.
    pub success_threshold: f64,
    /// Iteration budget for callers that retry.
    pub max_iterations: u32,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            success_threshold: 0.8,
            max_iterations: 3,
        }
    }
}

/// Root record for one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDecomposition {
    /// Caller-supplied or generated run id.
    pub task_id: String,
    /// Free text, opaque to the orchestrator.
    pub goal: String,
    /// Subtasks in input order.
    pub subtasks: Vec<SubTask>,
    /// Strategy the engine runs this decomposition with.
    pub execution_strategy: ExecutionStrategyKind,
    /// Informational convergence settings.
    #[serde(default)]
    pub convergence: ConvergenceCriteria,
}

impl TaskDecomposition {
    /// Create an empty decomposition with a generated task id.
    pub fn new(goal: impl Into<String>, execution_strategy: ExecutionStrategyKind) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            goal: goal.into(),
            subtasks: Vec::new(),
            execution_strategy,
            convergence: ConvergenceCriteria::default(),
        }
    }

    /// Override the generated task id.
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    /// Append one subtask.
    pub fn with_subtask(mut self, subtask: SubTask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    /// Append several subtasks.
    pub fn with_subtasks(mut self, subtasks: impl IntoIterator<Item = SubTask>) -> Self {
        self.subtasks.extend(subtasks);
        self
    }

    /// Look up a subtask by id.
    pub fn subtask(&self, id: &str) -> Option<&SubTask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    /// Sum of estimated effort across all subtasks.
    pub fn ideal_time(&self) -> f64 {
        self.subtasks.iter().map(|s| s.estimated_effort).sum()
    }
}

/// Outcome of one subtask within a strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskResult {
    /// Subtask this result belongs to.
    pub subtask_id: String,
    /// Worker the subtask was routed to; `None` when routing found nobody.
    pub worker_id: Option<String>,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Reported execution time; 0 when nothing ran.
    pub execution_time_ms: f64,
    /// Worker output.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Rendered routing or invocation error.
    pub error: Option<String>,
}

impl SubTaskResult {
    /// A successful result.
    pub fn succeeded(
        subtask_id: impl Into<String>,
        worker_id: impl Into<String>,
        execution_time_ms: f64,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            worker_id: Some(worker_id.into()),
            success: true,
            execution_time_ms,
            payload,
            error: None,
        }
    }

    /// A failed result; `worker_id` is `None` for routing misses.
    pub fn failed(
        subtask_id: impl Into<String>,
        worker_id: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            worker_id,
            success: false,
            execution_time_ms: 0.0,
            payload: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Raw output of an execution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// One result per subtask, in execution or input order.
    pub results: Vec<SubTaskResult>,
    /// Succeeded / total; 0.0 for an empty decomposition.
    pub completion_rate: f64,
    /// Workers that received at least one invocation, in first-use order.
    pub agents_used: Vec<String>,
    /// Pass-through token optimization percentage reported by the strategy.
    pub token_savings: f64,
}

impl ExecutionResult {
    /// Derive completion rate and agents used from per-subtask results.
    pub fn from_results(results: Vec<SubTaskResult>, token_savings: f64) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64
        };

        let mut agents_used: Vec<String> = Vec::new();
        for worker_id in results.iter().filter_map(|r| r.worker_id.as_ref()) {
            if !agents_used.contains(worker_id) {
                agents_used.push(worker_id.clone());
            }
        }

        Self {
            results,
            completion_rate,
            agents_used,
            token_savings,
        }
    }

    /// Number of succeeded subtasks.
    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Sum of recorded execution time over succeeded subtasks.
    pub fn actual_time(&self) -> f64 {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.execution_time_ms)
            .sum()
    }
}

/// Run-level metrics, one per orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationMetrics {
    /// Caller-supplied or generated run id.
    pub task_id: String,
    /// When the run registered.
    pub started_at: DateTime<Utc>,
    /// When the run finished; `None` while in flight.
    pub ended_at: Option<DateTime<Utc>>,
    /// Percentage in [0, 35].
    pub efficiency_gain: f64,
    /// Token savings reported by the strategy.
    pub token_optimization: f64,
    /// See [`crate::metrics::MetricsCalculator::coordination_improvement`].
    pub coordination_improvement: f64,
    /// Workers used, in first-use order.
    pub agents_utilized: Vec<String>,
    /// Fraction in [0, 1].
    pub subtask_completion_rate: f64,
    /// Wall-clock duration of the run.
    pub total_execution_time_ms: u64,
    /// See [`crate::metrics::MetricsCalculator::cost_savings`].
    pub cost_savings: f64,
}

impl OrchestrationMetrics {
    /// Zeroed metrics for a run that has just started.
    pub fn started(task_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            started_at,
            ended_at: None,
            efficiency_gain: 0.0,
            token_optimization: 0.0,
            coordination_improvement: 0.0,
            agents_utilized: Vec::new(),
            subtask_completion_rate: 0.0,
            total_execution_time_ms: 0,
            cost_savings: 0.0,
        }
    }

    /// Whether the run has ended.
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_creation() {
        let task = SubTask::new("fetch", "http", 10.0);
        assert_eq!(task.priority, 0);
        assert!(task.dependencies.is_empty());
        assert!(task.agent_requirements.is_none());
    }

    #[test]
    fn test_subtask_is_ready() {
        let task = SubTask::new("b", "x", 1.0).with_dependencies(["a"]);
        let mut satisfied = HashSet::new();
        assert!(!task.is_ready(&satisfied));
        satisfied.insert("a");
        assert!(task.is_ready(&satisfied));
    }

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!(
            "Parallel".parse::<ExecutionStrategyKind>().unwrap(),
            ExecutionStrategyKind::Parallel
        );
        let err = "round_robin".parse::<ExecutionStrategyKind>().unwrap_err();
        assert!(matches!(err, ConductorError::UnsupportedStrategy(ref s) if s == "round_robin"));
    }

    #[test]
    fn test_strategy_kind_display_roundtrip() {
        for kind in ExecutionStrategyKind::ALL {
            assert_eq!(kind.to_string().parse::<ExecutionStrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_strategy_rejected_on_deserialize() {
        let json = r#"{"task_id":"t","goal":"g","subtasks":[],"execution_strategy":"swarm"}"#;
        assert!(serde_json::from_str::<TaskDecomposition>(json).is_err());
    }

    #[test]
    fn test_decomposition_defaults() {
        let json = r#"{"task_id":"t","goal":"g","subtasks":[
            {"id":"a","required_capability":"x","estimated_effort":4.5}
        ],"execution_strategy":"pipeline"}"#;
        let decomposition: TaskDecomposition = serde_json::from_str(json).unwrap();
        assert_eq!(decomposition.convergence, ConvergenceCriteria::default());
        assert_eq!(decomposition.subtask("a").unwrap().priority, 0);
        assert_eq!(decomposition.ideal_time(), 4.5);
    }

    #[test]
    fn test_generated_task_ids_are_unique() {
        let a = TaskDecomposition::new("goal", ExecutionStrategyKind::Sequential);
        let b = TaskDecomposition::new("goal", ExecutionStrategyKind::Sequential);
        assert_ne!(a.task_id, b.task_id);
    }

    #[test]
    fn test_execution_result_accounting() {
        let results = vec![
            SubTaskResult::succeeded("a", "w1", 5.0, serde_json::Value::Null),
            SubTaskResult::failed("b", Some("w2".into()), "boom"),
            SubTaskResult::succeeded("c", "w1", 7.0, serde_json::Value::Null),
            SubTaskResult::failed("d", None, "no worker"),
        ];
        let execution = ExecutionResult::from_results(results, 15.0);
        assert_eq!(execution.completion_rate, 0.5);
        assert_eq!(execution.agents_used, vec!["w1".to_string(), "w2".to_string()]);
        assert_eq!(execution.actual_time(), 12.0);
        assert_eq!(execution.succeeded_count(), 2);
    }

    #[test]
    fn test_empty_execution_result() {
        let execution = ExecutionResult::from_results(Vec::new(), 0.0);
        assert_eq!(execution.completion_rate, 0.0);
        assert!(execution.agents_used.is_empty());
    }
}
