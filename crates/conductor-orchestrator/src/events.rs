//! Run notifications fanned out to every subscriber of an engine.

use crate::types::OrchestrationMetrics;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Something observable that happened at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OrchestrationEvent {
    /// A run finished and its metrics were stored.
    OrchestrationCompleted {
        /// Final metrics of the run.
        metrics: OrchestrationMetrics,
    },
    /// A completed run reached the efficiency target.
    PerformanceAchievement {
        /// The run that reached the target.
        task_id: String,
        /// Its efficiency gain, in percent.
        efficiency_gain: f64,
    },
    /// A run aborted with an error.
    OrchestrationFailed {
        /// The run that failed.
        task_id: String,
        /// Rendered error.
        error: String,
    },
}

impl OrchestrationEvent {
    /// Stable event name, as used in the serialized `kind` tag.
    pub fn name(&self) -> &'static str {
        match self {
            OrchestrationEvent::OrchestrationCompleted { .. } => "orchestration-completed",
            OrchestrationEvent::PerformanceAchievement { .. } => "performance-achievement",
            OrchestrationEvent::OrchestrationFailed { .. } => "orchestration-failed",
        }
    }

    /// Task id the event refers to.
    pub fn task_id(&self) -> &str {
        match self {
            OrchestrationEvent::OrchestrationCompleted { metrics } => &metrics.task_id,
            OrchestrationEvent::PerformanceAchievement { task_id, .. }
            | OrchestrationEvent::OrchestrationFailed { task_id, .. } => task_id,
        }
    }
}

/// Broadcast channel for [`OrchestrationEvent`]s.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and a subscriber that falls more than `capacity` events behind
/// sees `RecvError::Lagged` on its next receive.
pub struct NotificationBus {
    tx: broadcast::Sender<OrchestrationEvent>,
}

impl NotificationBus {
    /// Create a bus buffering up to `capacity` events per subscriber (at least one).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, returning how many subscribers received it.
    pub fn publish(&self, event: OrchestrationEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(event = name, "No subscribers, event dropped");
                0
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(crate::config::NotificationConfig::default().capacity)
    }
}
