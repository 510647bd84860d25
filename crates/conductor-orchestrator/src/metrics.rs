use crate::types::{ExecutionResult, ExecutionStrategyKind, OrchestrationMetrics, TaskDecomposition};
use chrono::{DateTime, Utc};

/// Upper bound on the reported efficiency gain.
pub const EFFICIENCY_CAP: f64 = 35.0;
/// Bonus for runs declared as parallel.
pub const PARALLEL_BONUS: f64 = 15.0;
/// Bonus for runs that reach [`ROUTING_BONUS_THRESHOLD`].
pub const ROUTING_BONUS: f64 = 10.0;
/// Completion rate at which the routing bonus applies.
pub const ROUTING_BONUS_THRESHOLD: f64 = 0.9;
/// Coordination points per utilized worker, up to [`AGENT_COORDINATION_CAP`].
pub const AGENT_COORDINATION_WEIGHT: f64 = 2.0;
/// Ceiling on the per-worker coordination points.
pub const AGENT_COORDINATION_CAP: f64 = 10.0;
/// Coordination points for a fully completed run.
pub const COMPLETION_COORDINATION_WEIGHT: f64 = 20.0;
/// Cost savings per point of token optimization.
pub const TOKEN_COST_FACTOR: f64 = 0.01;
/// Cost savings per point of efficiency gain.
pub const EFFICIENCY_COST_FACTOR: f64 = 0.02;

/// Derives run-level metrics from a strategy's raw execution result.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Build the full metrics record for a finished run.
    pub fn calculate(
        decomposition: &TaskDecomposition,
        execution: &ExecutionResult,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> OrchestrationMetrics {
        let efficiency_gain = Self::efficiency_gain(decomposition, execution);
        let total_execution_time_ms =
            u64::try_from((ended_at - started_at).num_milliseconds()).unwrap_or(0);

        OrchestrationMetrics {
            task_id: decomposition.task_id.clone(),
            started_at,
            ended_at: Some(ended_at),
            efficiency_gain,
            token_optimization: execution.token_savings,
            coordination_improvement: Self::coordination_improvement(
                execution.completion_rate,
                execution.agents_used.len(),
            ),
            agents_utilized: execution.agents_used.clone(),
            subtask_completion_rate: execution.completion_rate,
            total_execution_time_ms,
            cost_savings: Self::cost_savings(execution.token_savings, efficiency_gain),
        }
    }

    /// `timeEfficiency + parallelBonus + routingBonus`, clamped to `[0, 35]`.
    pub fn efficiency_gain(decomposition: &TaskDecomposition, execution: &ExecutionResult) -> f64 {
        let parallel_bonus =
            if decomposition.execution_strategy == ExecutionStrategyKind::Parallel {
                PARALLEL_BONUS
            } else {
                0.0
            };
        let routing_bonus = if execution.completion_rate >= ROUTING_BONUS_THRESHOLD {
            ROUTING_BONUS
        } else {
            0.0
        };

        let gain = Self::time_efficiency(decomposition.ideal_time(), execution.actual_time())
            + parallel_bonus
            + routing_bonus;
        if gain.is_nan() {
            return 0.0;
        }
        gain.clamp(0.0, EFFICIENCY_CAP)
    }

    /// Percentage of the estimated effort saved; never negative. Zero when
    /// there is no estimate to compare against.
    pub fn time_efficiency(ideal_time: f64, actual_time: f64) -> f64 {
        if ideal_time <= 0.0 {
            return 0.0;
        }
        ((ideal_time - actual_time) / ideal_time * 100.0).max(0.0)
    }

    /// `completion_rate × 20 + min(agents × 2, 10)`.
    pub fn coordination_improvement(completion_rate: f64, agents_used: usize) -> f64 {
        let agent_points =
            (agents_used as f64 * AGENT_COORDINATION_WEIGHT).min(AGENT_COORDINATION_CAP);
        completion_rate * COMPLETION_COORDINATION_WEIGHT + agent_points
    }

    /// `token_optimization × 0.01 + efficiency_gain × 0.02`.
    pub fn cost_savings(token_optimization: f64, efficiency_gain: f64) -> f64 {
        token_optimization * TOKEN_COST_FACTOR + efficiency_gain * EFFICIENCY_COST_FACTOR
    }
}
