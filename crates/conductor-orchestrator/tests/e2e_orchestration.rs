//! End-to-end orchestration tests.
//!
//! Drives the engine through discovery, routing, every strategy, metrics and
//! notifications using in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use conductor_core::{ConductorError, ConductorResult, Worker, WorkerStatus};
use conductor_orchestrator::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Invoker that succeeds unless the subtask id is listed as failing.
struct MockInvoker {
    calls: AtomicUsize,
    fail: HashSet<String>,
    delay: Duration,
}

impl MockInvoker {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: HashSet::new(),
            delay: Duration::ZERO,
        }
    }

    fn failing(mut self, ids: &[&str]) -> Self {
        self.fail = ids.iter().map(|s| (*s).to_string()).collect();
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerInvoker for MockInvoker {
    async fn invoke(
        &self,
        subtask: &SubTask,
        worker: &Worker,
    ) -> ConductorResult<InvocationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.contains(&subtask.id) {
            return Err(ConductorError::Invocation(format!(
                "{} rejected {}",
                worker.id, subtask.id
            )));
        }
        Ok(InvocationOutcome::success(
            subtask.estimated_effort,
            serde_json::json!({ "worker": worker.id, "subtask": subtask.id }),
        ))
    }
}

/// Strategy that fails as a whole, standing in for a crashed parallel batch.
struct BrokenStrategy;

#[async_trait]
impl ExecutionStrategy for BrokenStrategy {
    fn kind(&self) -> ExecutionStrategyKind {
        ExecutionStrategyKind::Parallel
    }

    async fn execute(
        &self,
        _decomposition: &TaskDecomposition,
        _workers: &[Worker],
    ) -> ConductorResult<ExecutionResult> {
        Err(ConductorError::Strategy("dispatch crashed".into()))
    }
}

/// Decomposer producing a fixed two-step chain.
struct ChainDecomposer;

#[async_trait]
impl GoalDecomposer for ChainDecomposer {
    async fn decompose_goal(
        &self,
        goal: &str,
        context: &serde_json::Value,
    ) -> ConductorResult<TaskDecomposition> {
        let kind = context["strategy"]
            .as_str()
            .unwrap_or("sequential")
            .parse::<ExecutionStrategyKind>()?;
        Ok(TaskDecomposition::new(goal, kind).with_subtasks([
            SubTask::new("draft", "x", 5.0),
            SubTask::new("review", "x", 5.0).with_dependencies(["draft"]),
        ]))
    }
}

fn x_worker() -> Worker {
    Worker::new("worker-x", "X Worker")
        .with_capabilities(["x"])
        .with_performance(20.0, 1.0)
}

fn engine_with(invoker: Arc<MockInvoker>, workers: Vec<Worker>) -> OrchestrationEngine {
    OrchestrationEngine::new(Arc::new(StaticDiscovery::new(workers)), invoker)
}

fn independent(kind: ExecutionStrategyKind, n: usize) -> TaskDecomposition {
    TaskDecomposition::new("independent work", kind)
        .with_subtasks((0..n).map(|i| SubTask::new(format!("s{i}"), "x", 10.0)))
}

// ---------------------------------------------------------------------------
// Core scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_two_independent_subtasks_parallel() {
    let invoker = Arc::new(MockInvoker::new());
    let engine = engine_with(invoker.clone(), vec![x_worker()]);

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Parallel, 2))
        .await
        .unwrap();

    assert_eq!(metrics.subtask_completion_rate, 1.0);
    assert_eq!(metrics.agents_utilized, vec!["worker-x".to_string()]);
    assert!((0.0..=35.0).contains(&metrics.efficiency_gain));
    assert_eq!(metrics.token_optimization, 15.0);
    assert_eq!(invoker.calls(), 2);
}

#[tokio::test]
async fn test_partial_success_still_returns_metrics() {
    let invoker = Arc::new(MockInvoker::new().failing(&["s1", "s3"]));
    let engine = engine_with(invoker.clone(), vec![x_worker()]);

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Sequential, 5))
        .await
        .unwrap();

    assert!((metrics.subtask_completion_rate - 0.6).abs() < 1e-9);
    assert_eq!(invoker.calls(), 5);
    assert_eq!(engine.monitor().get("worker-x").await.unwrap().failures, 2);
}

#[tokio::test]
async fn test_adaptive_falls_back_to_sequential() {
    let invoker = Arc::new(MockInvoker::new());
    let sequential = Arc::new(SequentialStrategy::new(
        TaskRouter::default(),
        invoker.clone(),
        5.0,
    ));
    let adaptive = Arc::new(AdaptiveStrategy::new(Arc::new(BrokenStrategy), sequential));
    let engine = engine_with(invoker.clone(), vec![x_worker()])
        .with_strategy(ExecutionStrategyKind::Adaptive, adaptive);

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Adaptive, 3))
        .await
        .unwrap();

    assert_eq!(metrics.subtask_completion_rate, 1.0);
    assert_eq!(metrics.token_optimization, 5.0);
    assert_eq!(invoker.calls(), 3);
}

#[tokio::test]
async fn test_strategy_failure_surfaces_and_cleans_up() {
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()])
        .with_strategy(ExecutionStrategyKind::Parallel, Arc::new(BrokenStrategy));
    let mut rx = engine.subscribe();
    let d = independent(ExecutionStrategyKind::Parallel, 2);

    let err = engine.run(&d).await.unwrap_err();
    assert!(matches!(err, ConductorError::Strategy(_)));
    assert!(engine.active_orchestrations().is_empty());
    assert_eq!(engine.health_check().active_count, 0);

    let stored = engine.get_metrics(Some(&d.task_id));
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_finished());

    let event = rx.recv().await.unwrap();
    assert!(matches!(
        event,
        OrchestrationEvent::OrchestrationFailed { ref task_id, .. } if *task_id == d.task_id
    ));
}

#[tokio::test]
async fn test_no_healthy_worker_counts_as_failure() {
    let down = x_worker().with_status(WorkerStatus::Unhealthy);
    let invoker = Arc::new(MockInvoker::new());
    let engine = engine_with(invoker.clone(), vec![down]);

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Pipeline, 2))
        .await
        .unwrap();

    assert_eq!(metrics.subtask_completion_rate, 0.0);
    assert!(metrics.agents_utilized.is_empty());
    assert_eq!(invoker.calls(), 0);
    assert_eq!(engine.monitor().aggregate().await.unrouted, 2);
}

#[tokio::test]
async fn test_unknown_dependency_rejected() {
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()]);
    let d = TaskDecomposition::new("broken graph", ExecutionStrategyKind::Sequential)
        .with_subtask(SubTask::new("a", "x", 1.0).with_dependencies(["ghost"]));

    let err = engine.run(&d).await.unwrap_err();
    assert!(matches!(err, ConductorError::Config(_)));
    assert!(engine.active_orchestrations().is_empty());
}

#[tokio::test]
async fn test_unsupported_strategy() {
    let invoker = Arc::new(MockInvoker::new());
    let engine = engine_with(invoker.clone(), vec![x_worker()])
        .without_strategy(ExecutionStrategyKind::Adaptive);

    let err = engine
        .run(&independent(ExecutionStrategyKind::Adaptive, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::UnsupportedStrategy(_)));
    assert_eq!(invoker.calls(), 0);
    assert!(engine.get_metrics(None).is_empty());

    let parsed = "round-robin".parse::<ExecutionStrategyKind>();
    assert!(matches!(parsed, Err(ConductorError::UnsupportedStrategy(_))));
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_completion_notification_carries_metrics() {
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()]);
    let mut rx = engine.subscribe();

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Sequential, 2))
        .await
        .unwrap();

    match rx.recv().await.unwrap() {
        OrchestrationEvent::OrchestrationCompleted { metrics: sent } => assert_eq!(sent, metrics),
        other => panic!("unexpected event: {}", other.name()),
    }
}

#[tokio::test]
async fn test_performance_achievement_when_target_met() {
    // Parallel plus full completion earns 25 in bonuses alone.
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()]);
    let mut rx = engine.subscribe();

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Parallel, 2))
        .await
        .unwrap();
    assert!(metrics.efficiency_gain >= PERFORMANCE_TARGET);

    assert_eq!(rx.recv().await.unwrap().name(), "orchestration-completed");
    match rx.recv().await.unwrap() {
        OrchestrationEvent::PerformanceAchievement {
            task_id,
            efficiency_gain,
        } => {
            assert_eq!(task_id, metrics.task_id);
            assert_eq!(efficiency_gain, metrics.efficiency_gain);
        }
        other => panic!("unexpected event: {}", other.name()),
    }
}

#[tokio::test]
async fn test_no_achievement_below_target() {
    // Sequential gets no parallel bonus and the mock reports exactly the
    // estimated effort, so only the routing bonus applies.
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()]);
    let mut rx = engine.subscribe();

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Sequential, 2))
        .await
        .unwrap();
    assert!(metrics.efficiency_gain < PERFORMANCE_TARGET);

    assert_eq!(rx.recv().await.unwrap().name(), "orchestration-completed");
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Registries and concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_concurrent_runs_on_one_engine() {
    let invoker = Arc::new(MockInvoker::new().with_delay(Duration::from_millis(30)));
    let engine = Arc::new(engine_with(invoker.clone(), vec![x_worker()]));

    let mut handles = Vec::new();
    for kind in [
        ExecutionStrategyKind::Sequential,
        ExecutionStrategyKind::Parallel,
        ExecutionStrategyKind::Pipeline,
        ExecutionStrategyKind::Adaptive,
    ] {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.run(&independent(kind, 3)).await
        }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!engine.active_orchestrations().is_empty());

    for handle in handles {
        let metrics = handle.await.unwrap().unwrap();
        assert_eq!(metrics.subtask_completion_rate, 1.0);
    }

    assert!(engine.active_orchestrations().is_empty());
    let all = engine.get_metrics(None);
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].started_at <= w[1].started_at));
    assert_eq!(invoker.calls(), 12);
}

#[tokio::test]
async fn test_orchestrate_goal_with_decomposer() {
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()])
        .with_decomposer(Arc::new(ChainDecomposer));

    let metrics = engine
        .orchestrate_goal("write a report", &serde_json::json!({ "strategy": "pipeline" }))
        .await
        .unwrap();
    assert_eq!(metrics.subtask_completion_rate, 1.0);
    assert_eq!(metrics.token_optimization, 10.0);

    let err = engine
        .orchestrate_goal("write a report", &serde_json::json!({ "strategy": "swarm" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::UnsupportedStrategy(_)));
}

#[tokio::test]
async fn test_health_check_counts() {
    let engine = engine_with(Arc::new(MockInvoker::new()), vec![x_worker()]);
    for _ in 0..3 {
        engine
            .run(&independent(ExecutionStrategyKind::Parallel, 1))
            .await
            .unwrap();
    }
    let health = engine.health_check();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_count, 0);
    assert_eq!(health.metrics_count, 3);
}

#[tokio::test]
async fn test_engine_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conductor.toml");
    std::fs::write(&path, "[token_savings]\nsequential = 7.5\n").unwrap();

    let config = OrchestratorConfig::load(&path).await.unwrap();
    let engine = OrchestrationEngine::with_config(
        config,
        Arc::new(StaticDiscovery::new(vec![x_worker()])),
        Arc::new(MockInvoker::new()),
    );

    let metrics = engine
        .run(&independent(ExecutionStrategyKind::Sequential, 1))
        .await
        .unwrap();
    assert_eq!(metrics.token_optimization, 7.5);
}
