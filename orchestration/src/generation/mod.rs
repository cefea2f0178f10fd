//! External text-generation boundary.
//!
//! The core consumes one opaque, fallible operation: map a prompt (plus an
//! optional system instruction) to a completion. Everything behind that
//! (transport, model, credentials) stays on the other side of
//! [`GenerationClient`].

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::OrchestrationResult;

/// Environment variable holding the backend credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Result of the pre-run connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// Probe not yet performed; the UI's initial state.
    Probing,
    /// A credential is configured; steps will call the backend.
    Ready,
    /// No credential; steps run on the simulated branch.
    NoKey,
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Probing => write!(f, "probing"),
            Self::Ready => write!(f, "ready"),
            Self::NoKey => write!(f, "no_key"),
        }
    }
}

/// Probe connectivity once, before a run starts.
pub fn probe_key() -> KeyStatus {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => KeyStatus::Ready,
        _ => KeyStatus::NoKey,
    }
}

/// The text-generation collaborator consumed by agent steps.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Whether the backend can be called at all. Checked once per run;
    /// `false` routes every step onto the simulated branch.
    fn is_available(&self) -> bool;

    /// Map a prompt to a completion. Any error here is fatal to the run.
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> OrchestrationResult<String>;
}
