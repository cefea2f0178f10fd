//! Run configuration and the editor-facing language set.
//!
//! Range validation lives here, at the boundary: the scheduler and assembler
//! assume a [`OrchestrationConfig`] that has already been normalized.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{OrchestrationError, OrchestrationResult};

/// Languages the editor surface can hand to a run.
///
/// The tag doubles as the code-fence label in outbound prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorLanguage {
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Go,
    Html,
    Css,
    Json,
}

impl EditorLanguage {
    /// Fence tag used when embedding editor context in a prompt.
    pub fn fence_tag(&self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Html => "html",
            Self::Css => "css",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for EditorLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fence_tag())
    }
}

impl FromStr for EditorLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Self::JavaScript),
            "typescript" | "ts" => Ok(Self::TypeScript),
            "python" | "py" => Ok(Self::Python),
            "rust" | "rs" => Ok(Self::Rust),
            "go" => Ok(Self::Go),
            "html" => Ok(Self::Html),
            "css" => Ok(Self::Css),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown editor language: {other}")),
        }
    }
}

/// Bounds for the tunable knobs. A config outside these ranges is clamped
/// at load time, never rejected mid-run.
pub const AGENT_COUNT_RANGE: (u32, u32) = (2, 8);
pub const MAX_ROUNDS_RANGE: (u32, u32) = (1, 10);
pub const REASONING_DEPTH_RANGE: (u32, u32) = (1, 5);

/// Configuration for one editor session's orchestration runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Number of agents seeded per run.
    pub agent_count: u32,
    /// Rounds executed per run.
    pub max_rounds: u32,
    /// Nesting depth for origin seeding and strategy selection.
    pub reasoning_depth: u32,
    /// Whether the surrounding UI may start runs at all. Enforced by the
    /// caller, not by the scheduler.
    pub multi_agent_mode: bool,
    /// Editor context beyond this many characters is truncated to its
    /// first and last halves.
    pub max_context_chars: usize,
    /// Generation model identifier passed to the backend.
    pub model: String,
    /// Cosmetic pause after each round barrier.
    pub round_pause_ms: u64,
    /// Artificial latency of a simulated (offline) agent step.
    pub simulated_delay_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            agent_count: 4,
            max_rounds: 3,
            reasoning_depth: 2,
            multi_agent_mode: true,
            max_context_chars: 8000,
            model: "gemini-2.0-flash".to_string(),
            round_pause_ms: 400,
            simulated_delay_ms: 90,
        }
    }
}

impl OrchestrationConfig {
    /// Parse a config from TOML text, clamping out-of-range knobs.
    pub fn from_toml_str(text: &str) -> OrchestrationResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| OrchestrationError::Configuration(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Load a config file from disk, clamping out-of-range knobs.
    pub fn from_toml_path(path: &Path) -> OrchestrationResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| OrchestrationError::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Clamp every knob into its documented range.
    pub fn normalized(mut self) -> Self {
        self.agent_count = self.agent_count.clamp(AGENT_COUNT_RANGE.0, AGENT_COUNT_RANGE.1);
        self.max_rounds = self.max_rounds.clamp(MAX_ROUNDS_RANGE.0, MAX_ROUNDS_RANGE.1);
        self.reasoning_depth = self
            .reasoning_depth
            .clamp(REASONING_DEPTH_RANGE.0, REASONING_DEPTH_RANGE.1);
        self
    }

    /// Check the knobs without clamping. Used by tests and by callers that
    /// prefer rejection over silent adjustment.
    pub fn validate(&self) -> OrchestrationResult<()> {
        let checks = [
            ("agent_count", self.agent_count, AGENT_COUNT_RANGE),
            ("max_rounds", self.max_rounds, MAX_ROUNDS_RANGE),
            ("reasoning_depth", self.reasoning_depth, REASONING_DEPTH_RANGE),
        ];
        for (name, value, (lo, hi)) in checks {
            if value < lo || value > hi {
                return Err(OrchestrationError::Configuration(format!(
                    "{name} must be in {lo}..={hi}, got {value}"
                )));
            }
        }
        if self.model.is_empty() {
            return Err(OrchestrationError::Configuration(
                "model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(OrchestrationConfig::default().validate().is_ok());
    }

    #[test]
    fn normalized_clamps_out_of_range() {
        let config = OrchestrationConfig {
            agent_count: 99,
            max_rounds: 0,
            reasoning_depth: 7,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.agent_count, 8);
        assert_eq!(config.max_rounds, 1);
        assert_eq!(config.reasoning_depth, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let config = OrchestrationConfig {
            agent_count: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OrchestrationError::Configuration(_))
        ));
    }

    #[test]
    fn toml_round_trip_with_partial_keys() {
        let config = OrchestrationConfig::from_toml_str(
            "agent_count = 6\nmax_rounds = 2\nmulti_agent_mode = false\n",
        )
        .unwrap();
        assert_eq!(config.agent_count, 6);
        assert_eq!(config.max_rounds, 2);
        assert!(!config.multi_agent_mode);
        // Untouched keys keep their defaults.
        assert_eq!(config.max_context_chars, 8000);
    }

    #[test]
    fn language_parsing_accepts_aliases() {
        assert_eq!("ts".parse::<EditorLanguage>(), Ok(EditorLanguage::TypeScript));
        assert_eq!("Rust".parse::<EditorLanguage>(), Ok(EditorLanguage::Rust));
        assert!("fortran".parse::<EditorLanguage>().is_err());
    }

    #[test]
    fn language_fence_tags() {
        assert_eq!(EditorLanguage::JavaScript.fence_tag(), "javascript");
        assert_eq!(EditorLanguage::Python.to_string(), "python");
    }
}
