use crate::collaborators::{GoalDecomposer, WorkerDiscovery, WorkerInvoker};
use crate::config::OrchestratorConfig;
use crate::events::{NotificationBus, OrchestrationEvent};
use crate::metrics::MetricsCalculator;
use crate::monitor::WorkerMonitor;
use crate::router::TaskRouter;
use crate::strategy::{builtin_strategies, ExecutionStrategy};
use crate::types::{ExecutionResult, ExecutionStrategyKind, OrchestrationMetrics, TaskDecomposition};
use chrono::{DateTime, Utc};
use conductor_core::{ConductorError, ConductorResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Efficiency gain (percent) at which a run also emits a performance achievement.
pub const PERFORMANCE_TARGET: f64 = 25.0;

type ActiveRuns = Arc<RwLock<HashMap<String, TaskDecomposition>>>;
type MetricsStore = Arc<RwLock<HashMap<String, OrchestrationMetrics>>>;

/// Snapshot returned by [`OrchestrationEngine::health_check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"healthy"` while the engine is reachable.
    pub status: String,
    /// Runs currently in flight.
    pub active_count: usize,
    /// Runs with stored metrics.
    pub metrics_count: usize,
    /// Time since the engine was created.
    pub uptime_ms: u64,
}

/// Deregisters a run when dropped, including when the run future is
/// cancelled. A metrics entry still open at that point is end-stamped.
struct ActiveRunGuard {
    active: ActiveRuns,
    metrics: MetricsStore,
    task_id: String,
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        self.active.write().remove(&self.task_id);
        if let Some(metrics) = self.metrics.write().get_mut(&self.task_id) {
            if !metrics.is_finished() {
                let ended_at = Utc::now();
                metrics.total_execution_time_ms =
                    u64::try_from((ended_at - metrics.started_at).num_milliseconds()).unwrap_or(0);
                metrics.ended_at = Some(ended_at);
            }
        }
    }
}

/// Owns the run lifecycle: register, discover, execute, measure, notify,
/// deregister.
///
/// One engine may drive many runs concurrently. Registries, the monitor and
/// the notification bus are scoped to the engine instance.
pub struct OrchestrationEngine {
    config: OrchestratorConfig,
    discovery: Arc<dyn WorkerDiscovery>,
    decomposer: Option<Arc<dyn GoalDecomposer>>,
    strategies: HashMap<ExecutionStrategyKind, Arc<dyn ExecutionStrategy>>,
    active: ActiveRuns,
    metrics: MetricsStore,
    monitor: Arc<WorkerMonitor>,
    notifications: NotificationBus,
    started_at: Instant,
}

impl OrchestrationEngine {
    /// Create an engine with the default configuration and the four built-in strategies.
    pub fn new(discovery: Arc<dyn WorkerDiscovery>, invoker: Arc<dyn WorkerInvoker>) -> Self {
        Self::with_config(OrchestratorConfig::default(), discovery, invoker)
    }

    /// Create an engine from an explicit configuration.
    pub fn with_config(
        config: OrchestratorConfig,
        discovery: Arc<dyn WorkerDiscovery>,
        invoker: Arc<dyn WorkerInvoker>,
    ) -> Self {
        let strategies = builtin_strategies(TaskRouter::default(), invoker, &config.token_savings);
        let notifications = NotificationBus::new(config.notifications.capacity);
        Self {
            config,
            discovery,
            decomposer: None,
            strategies,
            active: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(RwLock::new(HashMap::new())),
            monitor: Arc::new(WorkerMonitor::new()),
            notifications,
            started_at: Instant::now(),
        }
    }

    /// Inject the collaborator used by [`orchestrate_goal`](Self::orchestrate_goal).
    pub fn with_decomposer(mut self, decomposer: Arc<dyn GoalDecomposer>) -> Self {
        self.decomposer = Some(decomposer);
        self
    }

    /// Register (or replace) the strategy used for `kind`.
    pub fn with_strategy(
        mut self,
        kind: ExecutionStrategyKind,
        strategy: Arc<dyn ExecutionStrategy>,
    ) -> Self {
        self.strategies.insert(kind, strategy);
        self
    }

    /// Unregister a strategy; runs requesting it fail as unsupported.
    pub fn without_strategy(mut self, kind: ExecutionStrategyKind) -> Self {
        self.strategies.remove(&kind);
        self
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Get a reference to the worker monitor.
    pub fn monitor(&self) -> &Arc<WorkerMonitor> {
        &self.monitor
    }

    /// Subscribe to run notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.notifications.subscribe()
    }

    /// Decompose a free-form goal with the injected decomposer, then run it.
    pub async fn orchestrate_goal(
        &self,
        goal: &str,
        context: &serde_json::Value,
    ) -> ConductorResult<OrchestrationMetrics> {
        let decomposer = self.decomposer.as_ref().ok_or_else(|| {
            ConductorError::Decomposition("No goal decomposer configured".to_string())
        })?;
        let decomposition = decomposer.decompose_goal(goal, context).await?;
        self.run(&decomposition).await
    }

    /// Execute one decomposition and return its metrics.
    ///
    /// Per-subtask failures only lower the completion rate. An `Err` is
    /// returned for an unsupported strategy (no metrics are recorded), a
    /// task id that is already running, a discovery failure or a
    /// strategy-level failure.
    pub async fn run(
        &self,
        decomposition: &TaskDecomposition,
    ) -> ConductorResult<OrchestrationMetrics> {
        let task_id = decomposition.task_id.as_str();
        let kind = decomposition.execution_strategy;

        let Some(strategy) = self.strategies.get(&kind).cloned() else {
            error!(task_id = %task_id, strategy = %kind, "No strategy registered for run");
            return Err(ConductorError::UnsupportedStrategy(kind.to_string()));
        };

        let started_at = Utc::now();
        let guard = self.register(decomposition, started_at)?;

        info!(
            task_id = %task_id,
            strategy = %kind,
            subtasks = decomposition.subtasks.len(),
            "Orchestration run started"
        );

        match self.execute(strategy.as_ref(), decomposition).await {
            Ok(execution) => {
                let metrics =
                    MetricsCalculator::calculate(decomposition, &execution, started_at, Utc::now());
                self.metrics
                    .write()
                    .insert(task_id.to_string(), metrics.clone());

                info!(
                    task_id = %task_id,
                    completion_rate = metrics.subtask_completion_rate,
                    efficiency_gain = metrics.efficiency_gain,
                    agents = metrics.agents_utilized.len(),
                    duration_ms = metrics.total_execution_time_ms,
                    "Orchestration run completed"
                );

                self.notifications
                    .publish(OrchestrationEvent::OrchestrationCompleted {
                        metrics: metrics.clone(),
                    });
                if metrics.efficiency_gain >= PERFORMANCE_TARGET {
                    self.notifications
                        .publish(OrchestrationEvent::PerformanceAchievement {
                            task_id: task_id.to_string(),
                            efficiency_gain: metrics.efficiency_gain,
                        });
                }
                Ok(metrics)
            }
            Err(e) => {
                drop(guard);
                error!(
                    task_id = %task_id,
                    strategy = %kind,
                    error = %e,
                    "Orchestration run failed"
                );
                self.notifications
                    .publish(OrchestrationEvent::OrchestrationFailed {
                        task_id: task_id.to_string(),
                        error: e.to_string(),
                    });
                Err(e)
            }
        }
    }

    fn register(
        &self,
        decomposition: &TaskDecomposition,
        started_at: DateTime<Utc>,
    ) -> ConductorResult<ActiveRunGuard> {
        let task_id = decomposition.task_id.clone();
        {
            let mut active = self.active.write();
            if active.contains_key(&task_id) {
                return Err(ConductorError::Orchestrator(format!(
                    "Task '{task_id}' is already running"
                )));
            }
            active.insert(task_id.clone(), decomposition.clone());
        }
        self.metrics.write().insert(
            task_id.clone(),
            OrchestrationMetrics::started(task_id.clone(), started_at),
        );
        Ok(ActiveRunGuard {
            active: Arc::clone(&self.active),
            metrics: Arc::clone(&self.metrics),
            task_id,
        })
    }

    async fn execute(
        &self,
        strategy: &dyn ExecutionStrategy,
        decomposition: &TaskDecomposition,
    ) -> ConductorResult<ExecutionResult> {
        let workers = self
            .discovery
            .discover_workers(&self.config.discovery.filter())
            .await?;
        info!(
            task_id = %decomposition.task_id,
            workers = workers.len(),
            "Discovered workers"
        );

        let execution = strategy.execute(decomposition, &workers).await?;
        self.monitor.record_execution(&execution).await;
        Ok(execution)
    }

    /// Metrics for one run, or for every run ordered by start time.
    pub fn get_metrics(&self, task_id: Option<&str>) -> Vec<OrchestrationMetrics> {
        let metrics = self.metrics.read();
        match task_id {
            Some(id) => metrics.get(id).cloned().into_iter().collect(),
            None => {
                let mut all: Vec<OrchestrationMetrics> = metrics.values().cloned().collect();
                all.sort_by(|a, b| {
                    a.started_at
                        .cmp(&b.started_at)
                        .then_with(|| a.task_id.cmp(&b.task_id))
                });
                all
            }
        }
    }

    /// Decompositions currently in flight, ordered by task id.
    pub fn active_orchestrations(&self) -> Vec<TaskDecomposition> {
        let mut active: Vec<TaskDecomposition> = self.active.read().values().cloned().collect();
        active.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        active
    }

    /// Counts of active runs and stored metrics, plus uptime.
    pub fn health_check(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            active_count: self.active.read().len(),
            metrics_count: self.metrics.read().len(),
            uptime_ms: u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
