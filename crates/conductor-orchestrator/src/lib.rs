//! Multi-worker task orchestration: routing, execution strategies and run metrics.
//!
//! Takes a [`TaskDecomposition`] (a goal split into subtasks with capability
//! requirements and dependencies), routes every subtask to the best-scoring
//! healthy worker, executes the graph under one of four strategies and
//! derives efficiency metrics for the run.
//!
//! # Main types
//!
//! - [`OrchestrationEngine`]: Run lifecycle, registries, queries and notifications.
//! - [`DependencyResolver`]: Priority-aware dependency ordering with cycle breaking.
//! - [`TaskRouter`] / [`WorkerScorer`]: Deterministic worker selection.
//! - [`ExecutionStrategy`]: Sequential, parallel, pipeline and adaptive runners.
//! - [`MetricsCalculator`]: Efficiency, coordination and cost metrics.
//! - [`WorkerMonitor`]: Per-worker statistics across runs.

/// External collaborator traits (decomposition, discovery, invocation).
pub mod collaborators;
/// TOML-backed engine configuration.
pub mod config;
/// In-memory discovery backend and worker filter.
pub mod discovery;
/// Orchestration engine.
pub mod engine;
/// Run notifications.
pub mod events;
/// Run-level metrics.
pub mod metrics;
/// Per-worker statistics.
pub mod monitor;
/// Dependency ordering.
pub mod resolver;
/// Worker selection.
pub mod router;
/// Worker scoring.
pub mod scorer;
/// Execution strategies.
pub mod strategy;
/// Shared orchestration types (TaskDecomposition, SubTask, metrics, etc.).
pub mod types;

pub use collaborators::{
    GoalDecomposer, InvocationOutcome, InvocationStatus, WorkerDiscovery, WorkerInvoker,
};
pub use config::{DiscoveryConfig, NotificationConfig, OrchestratorConfig, TokenSavingsConfig};
pub use discovery::{StaticDiscovery, WorkerFilter};
pub use engine::{HealthStatus, OrchestrationEngine, PERFORMANCE_TARGET};
pub use events::{NotificationBus, OrchestrationEvent};
pub use metrics::MetricsCalculator;
pub use monitor::{AggregateStats, WorkerMonitor, WorkerStats};
pub use resolver::DependencyResolver;
pub use router::TaskRouter;
pub use scorer::WorkerScorer;
pub use strategy::{
    builtin_strategies, AdaptiveStrategy, ExecutionStrategy, ParallelStrategy, PipelineStrategy,
    SequentialStrategy,
};
pub use types::{
    AgentRequirements, ConvergenceCriteria, ExecutionResult, ExecutionStrategyKind,
    OrchestrationMetrics, SubTask, SubTaskResult, TaskDecomposition,
};
