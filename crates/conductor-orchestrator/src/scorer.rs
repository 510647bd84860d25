use crate::types::SubTask;
use conductor_core::{CertificationTier, Worker};

/// Points for a worker that declares the subtask's capability.
pub const CAPABILITY_WEIGHT: f64 = 40.0;
/// Base points for a worker at or above the required tier.
pub const TIER_BASE: f64 = 30.0;
/// Extra points per tier above the requirement.
pub const TIER_STEP: f64 = 5.0;
/// Points for a worker within the latency bound, when one is set.
pub const LATENCY_WEIGHT: f64 = 20.0;
/// Points for a worker with every required framework, when some are set.
pub const FRAMEWORK_WEIGHT: f64 = 10.0;
/// Multiplier applied to the worker's success rate.
pub const SUCCESS_RATE_WEIGHT: f64 = 0.1;

/// Suitability score for a (subtask, worker) pair.
///
/// A weighted sum, higher is better, not normalized:
///
/// | factor      | points                                            |
/// |-------------|---------------------------------------------------|
/// | capability  | 40 if the worker declares the capability          |
/// | tier        | 30 + 5 per tier above the minimum (bronze default) |
/// | latency     | 20 if within `max_response_time_ms` (skipped if unset) |
/// | frameworks  | 10 if all required present (skipped if unset)     |
/// | reliability | `success_rate × 0.1`                              |
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerScorer;

impl WorkerScorer {
    /// Create a scorer with the fixed weights.
    pub fn new() -> Self {
        Self
    }

    /// Score `worker` for `subtask`; higher is better.
    pub fn score(&self, subtask: &SubTask, worker: &Worker) -> f64 {
        self.capability_score(subtask, worker)
            + self.tier_score(subtask, worker)
            + self.latency_score(subtask, worker)
            + self.framework_score(subtask, worker)
            + self.reliability_bonus(worker)
    }

    fn capability_score(&self, subtask: &SubTask, worker: &Worker) -> f64 {
        if worker.has_capability(&subtask.required_capability) {
            CAPABILITY_WEIGHT
        } else {
            0.0
        }
    }

    fn tier_score(&self, subtask: &SubTask, worker: &Worker) -> f64 {
        let required = subtask
            .agent_requirements
            .as_ref()
            .and_then(|r| r.minimum_tier)
            .unwrap_or(CertificationTier::Bronze);
        let actual = worker.certification_tier;
        if actual < required {
            return 0.0;
        }
        TIER_BASE + TIER_STEP * f64::from(actual.ordinal() - required.ordinal())
    }

    fn latency_score(&self, subtask: &SubTask, worker: &Worker) -> f64 {
        match subtask
            .agent_requirements
            .as_ref()
            .and_then(|r| r.max_response_time_ms)
        {
            Some(bound) if worker.performance_metrics.avg_response_time_ms <= bound => {
                LATENCY_WEIGHT
            }
            _ => 0.0,
        }
    }

    fn framework_score(&self, subtask: &SubTask, worker: &Worker) -> f64 {
        match subtask
            .agent_requirements
            .as_ref()
            .and_then(|r| r.required_frameworks.as_ref())
        {
            Some(required) if required.iter().all(|f| worker.supports_framework(f)) => {
                FRAMEWORK_WEIGHT
            }
            _ => 0.0,
        }
    }

    fn reliability_bonus(&self, worker: &Worker) -> f64 {
        worker.performance_metrics.success_rate.max(0.0) * SUCCESS_RATE_WEIGHT
    }
}
