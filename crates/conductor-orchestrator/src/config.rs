use crate::discovery::WorkerFilter;
use conductor_core::{ConductorError, ConductorResult, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Engine configuration, usually loaded from a TOML file.
///
/// ```toml
/// [discovery]
/// max_results = 50
///
/// [notifications]
/// capacity = 64
///
/// [token_savings]
/// parallel = 20.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Worker discovery filter.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Notification bus sizing.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Per-strategy token savings figures.
    #[serde(default)]
    pub token_savings: TokenSavingsConfig,
}

impl OrchestratorConfig {
    /// Parse a TOML document; missing sections take their defaults.
    pub fn from_toml_str(raw: &str) -> ConductorResult<Self> {
        toml::from_str(raw)
            .map_err(|e| ConductorError::Config(format!("Invalid orchestrator config: {e}")))
    }

    /// Read and parse a TOML config file.
    pub async fn load(path: impl AsRef<Path>) -> ConductorResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading orchestrator config");
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ConductorError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }
}

/// How the engine queries the discovery collaborator at run start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Upper bound on workers considered per run.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Required worker status; `None` accepts any.
    #[serde(default = "default_status")]
    pub status: Option<WorkerStatus>,
}

impl DiscoveryConfig {
    /// The filter passed to the discovery collaborator.
    pub fn filter(&self) -> WorkerFilter {
        WorkerFilter {
            status: self.status,
            max_results: Some(self.max_results),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            status: default_status(),
        }
    }
}

/// Notification bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Events buffered per subscriber before the slowest one starts lagging.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Token optimization percentage each strategy reports with its result.
/// Adaptive has no figure of its own: it reports the branch that ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSavingsConfig {
    /// Reported by the sequential strategy.
    #[serde(default = "default_sequential_savings")]
    pub sequential: f64,
    /// Reported by the parallel strategy.
    #[serde(default = "default_parallel_savings")]
    pub parallel: f64,
    /// Reported by the pipeline strategy.
    #[serde(default = "default_pipeline_savings")]
    pub pipeline: f64,
}

impl Default for TokenSavingsConfig {
    fn default() -> Self {
        Self {
            sequential: default_sequential_savings(),
            parallel: default_parallel_savings(),
            pipeline: default_pipeline_savings(),
        }
    }
}

fn default_max_results() -> usize {
    100
}
fn default_status() -> Option<WorkerStatus> {
    Some(WorkerStatus::Healthy)
}
fn default_capacity() -> usize {
    256
}
fn default_sequential_savings() -> f64 {
    5.0
}
fn default_parallel_savings() -> f64 {
    15.0
}
fn default_pipeline_savings() -> f64 {
    10.0
}
