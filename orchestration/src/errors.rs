//! Error taxonomy for orchestration runs.
//!
//! One hard failure inside a round invalidates the whole run; the scheduler
//! holds the single top-level catch. Connectivity problems detected before a
//! call is attempted never become errors; they route the step runner onto
//! its simulated branch instead.

use thiserror::Error;

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The generation backend is unreachable (no credential configured).
    /// Raised only when a caller bypasses the pre-run probe.
    #[error("generation backend unreachable: {0}")]
    Connectivity(String),

    /// A reachable backend rejected a specific call. Fatal to the run.
    #[error("generation request failed: {0}")]
    Generation(String),

    /// Configuration rejected at the boundary.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Single-flight guard: a run is already active for this session.
    #[error("an orchestration run is already in progress")]
    RunInProgress,
}

/// Result alias used throughout the crate.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
