use serde::{Deserialize, Serialize};

/// Health of a worker as reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Eligible for routing.
    Healthy,
    /// Skipped by routing.
    Unhealthy,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Healthy => write!(f, "healthy"),
            WorkerStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Certification tier of a worker. Variants are declared in ascending order,
/// so the derived ordering is bronze < silver < gold.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CertificationTier {
    /// Entry tier, the default.
    #[default]
    Bronze,
    /// Middle tier.
    Silver,
    /// Highest tier.
    Gold,
}

impl CertificationTier {
    /// Numeric rank used by scoring (bronze = 0).
    pub fn ordinal(self) -> u8 {
        match self {
            CertificationTier::Bronze => 0,
            CertificationTier::Silver => 1,
            CertificationTier::Gold => 2,
        }
    }
}

impl std::fmt::Display for CertificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertificationTier::Bronze => write!(f, "bronze"),
            CertificationTier::Silver => write!(f, "silver"),
            CertificationTier::Gold => write!(f, "gold"),
        }
    }
}

/// Observed performance of a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Mean response time in milliseconds.
    pub avg_response_time_ms: f64,
    /// Fraction of successful calls, 0.0 to 1.0.
    pub success_rate: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            avg_response_time_ms: 0.0,
            success_rate: 1.0,
        }
    }
}

/// Point-in-time snapshot of an external worker.
///
/// Workers are owned by the discovery collaborator. The orchestrator reads a
/// snapshot once per run and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Stable identifier, unique within one discovery backend.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Current health.
    pub status: WorkerStatus,
    /// Capabilities matched against `SubTask::required_capability`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Observed latency and reliability.
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
    /// Frameworks the worker integrates with.
    #[serde(default)]
    pub framework_integrations: Vec<String>,
    /// Certification tier.
    #[serde(default)]
    pub certification_tier: CertificationTier,
}

impl Worker {
    /// Create a healthy bronze worker with no capabilities.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: WorkerStatus::Healthy,
            capabilities: Vec::new(),
            performance_metrics: PerformanceMetrics::default(),
            framework_integrations: Vec::new(),
            certification_tier: CertificationTier::Bronze,
        }
    }

    /// Replace the capability list.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the framework integrations.
    pub fn with_frameworks<I, S>(mut self, frameworks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.framework_integrations = frameworks.into_iter().map(Into::into).collect();
        self
    }

    /// Set the certification tier.
    pub fn with_tier(mut self, tier: CertificationTier) -> Self {
        self.certification_tier = tier;
        self
    }

    /// Set the health status.
    pub fn with_status(mut self, status: WorkerStatus) -> Self {
        self.status = status;
        self
    }

    /// Set average response time (ms) and success rate (0 to 1).
    pub fn with_performance(mut self, avg_response_time_ms: f64, success_rate: f64) -> Self {
        self.performance_metrics = PerformanceMetrics {
            avg_response_time_ms,
            success_rate,
        };
        self
    }

    /// Whether routing may pick this worker.
    pub fn is_healthy(&self) -> bool {
        self.status == WorkerStatus::Healthy
    }

    /// Exact-match capability lookup.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Exact-match framework lookup.
    pub fn supports_framework(&self, framework: &str) -> bool {
        self.framework_integrations.iter().any(|f| f == framework)
    }
}
