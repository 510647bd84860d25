use crate::collaborators::WorkerDiscovery;
use async_trait::async_trait;
use conductor_core::{ConductorResult, Worker, WorkerStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Criteria passed to a discovery backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerFilter {
    /// Only workers in this state. `None` returns every state.
    pub status: Option<WorkerStatus>,
    /// Truncate the result to this many workers.
    pub max_results: Option<usize>,
}

impl WorkerFilter {
    /// Healthy workers only, at most `max_results`.
    pub fn healthy(max_results: usize) -> Self {
        Self {
            status: Some(WorkerStatus::Healthy),
            max_results: Some(max_results),
        }
    }

    /// Whether `worker` passes the status check.
    pub fn matches(&self, worker: &Worker) -> bool {
        match self.status {
            Some(status) => status == worker.status,
            None => true,
        }
    }

    /// Apply the filter to a worker list, keeping input order.
    pub fn apply<'a, I>(&self, workers: I) -> Vec<Worker>
    where
        I: IntoIterator<Item = &'a Worker>,
    {
        let limit = self.max_results.unwrap_or(usize::MAX);
        workers
            .into_iter()
            .filter(|w| self.matches(w))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// In-memory discovery backend over a fixed, mutable worker list.
pub struct StaticDiscovery {
    workers: RwLock<Vec<Worker>>,
}

impl StaticDiscovery {
    /// Start with a fixed worker list.
    pub fn new(workers: Vec<Worker>) -> Self {
        Self {
            workers: RwLock::new(workers),
        }
    }

    /// Add a worker, replacing any existing worker with the same id.
    pub async fn register(&self, worker: Worker) {
        let mut workers = self.workers.write().await;
        if let Some(existing) = workers.iter_mut().find(|w| w.id == worker.id) {
            *existing = worker;
        } else {
            workers.push(worker);
        }
    }

    /// Remove a worker by id. Returns whether it was present.
    pub async fn deregister(&self, worker_id: &str) -> bool {
        let mut workers = self.workers.write().await;
        let before = workers.len();
        workers.retain(|w| w.id != worker_id);
        workers.len() != before
    }

    /// Number of registered workers, regardless of status.
    pub async fn worker_count(&self) -> usize {
        self.workers.read().await.len()
    }
}

impl Default for StaticDiscovery {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl WorkerDiscovery for StaticDiscovery {
    async fn discover_workers(&self, filter: &WorkerFilter) -> ConductorResult<Vec<Worker>> {
        let workers = self.workers.read().await;
        Ok(filter.apply(workers.iter()))
    }
}
