use crate::collaborators::WorkerInvoker;
use crate::config::TokenSavingsConfig;
use crate::resolver::DependencyResolver;
use crate::router::TaskRouter;
use crate::types::{
    ExecutionResult, ExecutionStrategyKind, SubTask, SubTaskResult, TaskDecomposition,
};
use async_trait::async_trait;
use conductor_core::{ConductorError, ConductorResult, Worker};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// An algorithm that runs a decomposition to completion.
///
/// Routing and invocation failures are folded into the per-subtask results.
/// An `Err` means the strategy as a whole could not finish.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// The strategy kind this implementation runs.
    fn kind(&self) -> ExecutionStrategyKind;

    /// Run every subtask of `decomposition` against the `workers` snapshot.
    async fn execute(
        &self,
        decomposition: &TaskDecomposition,
        workers: &[Worker],
    ) -> ConductorResult<ExecutionResult>;
}

/// Route one subtask and invoke the chosen worker.
async fn dispatch(
    router: &TaskRouter,
    invoker: &dyn WorkerInvoker,
    subtask: &SubTask,
    workers: &[Worker],
) -> SubTaskResult {
    let Some(worker) = router.route(subtask, workers) else {
        let err = ConductorError::Routing(format!(
            "no healthy worker for subtask '{}' (capability '{}')",
            subtask.id, subtask.required_capability
        ));
        warn!(subtask = %subtask.id, error = %err, "Routing failed");
        return SubTaskResult::failed(&subtask.id, None, err.to_string());
    };

    debug!(subtask = %subtask.id, worker = %worker.id, "Invoking worker");

    match invoker.invoke(subtask, worker).await {
        Ok(outcome) if outcome.is_success() => SubTaskResult::succeeded(
            &subtask.id,
            &worker.id,
            outcome.execution_time_ms,
            outcome.payload,
        ),
        Ok(outcome) => {
            let err = ConductorError::Invocation(format!(
                "worker '{}' reported an error for subtask '{}'",
                worker.id, subtask.id
            ));
            warn!(subtask = %subtask.id, worker = %worker.id, error = %err, "Subtask failed");
            let mut result =
                SubTaskResult::failed(&subtask.id, Some(worker.id.clone()), err.to_string());
            result.execution_time_ms = outcome.execution_time_ms;
            result.payload = outcome.payload;
            result
        }
        Err(e) => {
            let err = if e.is_subtask_failure() {
                e
            } else {
                ConductorError::Invocation(e.to_string())
            };
            warn!(subtask = %subtask.id, worker = %worker.id, error = %err, "Subtask failed");
            SubTaskResult::failed(&subtask.id, Some(worker.id.clone()), err.to_string())
        }
    }
}

/// Dependency-ordered execution, one invocation outstanding at a time.
async fn execute_ordered(
    router: &TaskRouter,
    invoker: &dyn WorkerInvoker,
    decomposition: &TaskDecomposition,
    workers: &[Worker],
) -> ConductorResult<Vec<SubTaskResult>> {
    let ordered = DependencyResolver::order(&decomposition.subtasks)?;
    let mut results = Vec::with_capacity(ordered.len());
    for subtask in ordered {
        results.push(dispatch(router, invoker, subtask, workers).await);
    }
    Ok(results)
}

/// Runs subtasks one at a time in dependency order. A failed subtask is
/// recorded and the run moves on to the next one.
pub struct SequentialStrategy {
    router: TaskRouter,
    invoker: Arc<dyn WorkerInvoker>,
    token_savings: f64,
}

impl SequentialStrategy {
    /// Create the strategy; `token_savings` is reported with every result.
    pub fn new(router: TaskRouter, invoker: Arc<dyn WorkerInvoker>, token_savings: f64) -> Self {
        Self {
            router,
            invoker,
            token_savings,
        }
    }
}

#[async_trait]
impl ExecutionStrategy for SequentialStrategy {
    fn kind(&self) -> ExecutionStrategyKind {
        ExecutionStrategyKind::Sequential
    }

    async fn execute(
        &self,
        decomposition: &TaskDecomposition,
        workers: &[Worker],
    ) -> ConductorResult<ExecutionResult> {
        let results =
            execute_ordered(&self.router, self.invoker.as_ref(), decomposition, workers).await?;
        Ok(ExecutionResult::from_results(results, self.token_savings))
    }
}

/// Conceptually sequential with output chaining. Chaining is not
/// implemented: this runs exactly the sequential algorithm.
pub struct PipelineStrategy {
    router: TaskRouter,
    invoker: Arc<dyn WorkerInvoker>,
    token_savings: f64,
}

impl PipelineStrategy {
    /// Create the strategy; `token_savings` is reported with every result.
    pub fn new(router: TaskRouter, invoker: Arc<dyn WorkerInvoker>, token_savings: f64) -> Self {
        Self {
            router,
            invoker,
            token_savings,
        }
    }
}

#[async_trait]
impl ExecutionStrategy for PipelineStrategy {
    fn kind(&self) -> ExecutionStrategyKind {
        ExecutionStrategyKind::Pipeline
    }

    async fn execute(
        &self,
        decomposition: &TaskDecomposition,
        workers: &[Worker],
    ) -> ConductorResult<ExecutionResult> {
        let results =
            execute_ordered(&self.router, self.invoker.as_ref(), decomposition, workers).await?;
        Ok(ExecutionResult::from_results(results, self.token_savings))
    }
}

/// Dispatches every subtask at once, ignoring dependencies, and waits for
/// all of them to settle.
///
/// Each subtask runs as its own tokio task. If one of those tasks panics or
/// is cancelled, the remaining ones are aborted and the whole attempt fails
/// with [`ConductorError::Strategy`].
pub struct ParallelStrategy {
    router: TaskRouter,
    invoker: Arc<dyn WorkerInvoker>,
    token_savings: f64,
}

impl ParallelStrategy {
    /// Create the strategy; `token_savings` is reported with every result.
    pub fn new(router: TaskRouter, invoker: Arc<dyn WorkerInvoker>, token_savings: f64) -> Self {
        Self {
            router,
            invoker,
            token_savings,
        }
    }
}

#[async_trait]
impl ExecutionStrategy for ParallelStrategy {
    fn kind(&self) -> ExecutionStrategyKind {
        ExecutionStrategyKind::Parallel
    }

    async fn execute(
        &self,
        decomposition: &TaskDecomposition,
        workers: &[Worker],
    ) -> ConductorResult<ExecutionResult> {
        let workers: Arc<[Worker]> = Arc::from(workers);
        let mut join_set: JoinSet<(usize, SubTaskResult)> = JoinSet::new();

        for (idx, subtask) in decomposition.subtasks.iter().cloned().enumerate() {
            let router = self.router;
            let invoker = Arc::clone(&self.invoker);
            let workers = Arc::clone(&workers);
            join_set.spawn(async move {
                let result = dispatch(&router, invoker.as_ref(), &subtask, &workers).await;
                (idx, result)
            });
        }

        let mut slots: Vec<Option<SubTaskResult>> = vec![None; decomposition.subtasks.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => {
                    join_set.abort_all();
                    return Err(ConductorError::Strategy(format!(
                        "parallel dispatch aborted: {e}"
                    )));
                }
            }
        }

        let results: Vec<SubTaskResult> = slots.into_iter().flatten().collect();
        Ok(ExecutionResult::from_results(results, self.token_savings))
    }
}

/// Tries a primary strategy and, if it fails as a whole, returns the result
/// of a fallback strategy instead. Built-in wiring is parallel then sequential.
pub struct AdaptiveStrategy {
    primary: Arc<dyn ExecutionStrategy>,
    fallback: Arc<dyn ExecutionStrategy>,
}

impl AdaptiveStrategy {
    /// Compose from a primary and a fallback strategy.
    pub fn new(primary: Arc<dyn ExecutionStrategy>, fallback: Arc<dyn ExecutionStrategy>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ExecutionStrategy for AdaptiveStrategy {
    fn kind(&self) -> ExecutionStrategyKind {
        ExecutionStrategyKind::Adaptive
    }

    async fn execute(
        &self,
        decomposition: &TaskDecomposition,
        workers: &[Worker],
    ) -> ConductorResult<ExecutionResult> {
        match self.primary.execute(decomposition, workers).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(
                    task_id = %decomposition.task_id,
                    primary = %self.primary.kind(),
                    fallback = %self.fallback.kind(),
                    error = %e,
                    "Adaptive: primary strategy failed, falling back"
                );
                self.fallback.execute(decomposition, workers).await
            }
        }
    }
}

/// The four built-in strategies keyed by kind.
pub fn builtin_strategies(
    router: TaskRouter,
    invoker: Arc<dyn WorkerInvoker>,
    savings: &TokenSavingsConfig,
) -> HashMap<ExecutionStrategyKind, Arc<dyn ExecutionStrategy>> {
    let sequential: Arc<dyn ExecutionStrategy> = Arc::new(SequentialStrategy::new(
        router,
        Arc::clone(&invoker),
        savings.sequential,
    ));
    let parallel: Arc<dyn ExecutionStrategy> = Arc::new(ParallelStrategy::new(
        router,
        Arc::clone(&invoker),
        savings.parallel,
    ));
    let pipeline: Arc<dyn ExecutionStrategy> =
        Arc::new(PipelineStrategy::new(router, invoker, savings.pipeline));
    let adaptive: Arc<dyn ExecutionStrategy> = Arc::new(AdaptiveStrategy::new(
        Arc::clone(&parallel),
        Arc::clone(&sequential),
    ));

    info!("Registered built-in execution strategies");

    HashMap::from([
        (ExecutionStrategyKind::Sequential, sequential),
        (ExecutionStrategyKind::Parallel, parallel),
        (ExecutionStrategyKind::Pipeline, pipeline),
        (ExecutionStrategyKind::Adaptive, adaptive),
    ])
}
