use crate::scorer::WorkerScorer;
use crate::types::SubTask;
use conductor_core::Worker;
use std::cmp::Ordering;

/// Picks one worker per subtask.
///
/// Routing is stateless: every call re-evaluates the candidates from scratch
/// and nothing is reserved, so the same worker may be chosen for several
/// concurrent subtasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskRouter {
    scorer: WorkerScorer,
}

impl TaskRouter {
    /// Create a router ranking with `scorer`.
    pub fn new(scorer: WorkerScorer) -> Self {
        Self { scorer }
    }

    /// Healthy candidates with their scores, best first. Equal scores keep
    /// candidate order.
    pub fn rank<'a>(&self, subtask: &SubTask, candidates: &'a [Worker]) -> Vec<(&'a Worker, f64)> {
        let mut ranked: Vec<(&Worker, f64)> = candidates
            .iter()
            .filter(|w| w.is_healthy())
            .map(|w| (w, self.scorer.score(subtask, w)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
    }

    /// The best healthy candidate, or `None` if no candidate is healthy.
    pub fn route<'a>(&self, subtask: &SubTask, candidates: &'a [Worker]) -> Option<&'a Worker> {
        self.rank(subtask, candidates).first().map(|(w, _)| *w)
    }
}
