use thiserror::Error;

/// Top-level error type for the Conductor engine.
///
/// Each variant corresponds to a subsystem or failure class that can
/// produce errors. Per-subtask routing and invocation failures are usually
/// folded into results rather than returned, but they share these variants
/// so their messages read the same everywhere.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Invalid configuration, including dependencies on unknown subtasks.
    #[error("Config error: {0}")]
    Config(String),

    /// No healthy worker could be selected for a subtask.
    #[error("Routing error: {0}")]
    Routing(String),

    /// A worker call failed or reported an error status.
    #[error("Invocation error: {0}")]
    Invocation(String),

    /// A failure escaping a whole execution strategy.
    #[error("Strategy error: {0}")]
    Strategy(String),

    /// The requested execution strategy is not known or not registered.
    #[error("Unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    /// The discovery collaborator failed to list workers.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// The decomposition collaborator failed to produce a task graph.
    #[error("Decomposition error: {0}")]
    Decomposition(String),

    /// Engine-level misuse, such as a duplicate active task id.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`ConductorError`].
pub type ConductorResult<T> = Result<T, ConductorError>;

impl ConductorError {
    /// Whether this error describes a single subtask rather than a whole run.
    pub fn is_subtask_failure(&self) -> bool {
        matches!(self, ConductorError::Routing(_) | ConductorError::Invocation(_))
    }
}
