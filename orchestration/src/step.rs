//! One agent step: strategy framing, prompt assembly, response cleanup.
//!
//! A step either calls the generation backend or, when the pre-run probe
//! found no credential, fabricates a clearly marked simulated fragment so
//! the rest of the pipeline stays exercised offline.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::agent::{strategy_for, AgentId, AgentRole};
use crate::config::{EditorLanguage, OrchestrationConfig};
use crate::errors::OrchestrationResult;
use crate::generation::GenerationClient;

/// Marker shown where truncated context was removed.
const TRUNCATION_MARKER: &str = "/* ... context truncated ... */";

/// Marker prefix on fragments produced without the backend.
pub const SIMULATED_MARKER: &str = "// [simulated:";

/// Per-agent inputs to one step, captured after origin rotation.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub agent_id: AgentId,
    pub role: AgentRole,
    pub origin: String,
    /// Entropy of the rotated origin, carried into the fragment.
    pub entropy: f64,
    pub round: u32,
}

/// Executes agent steps for one run.
pub struct StepRunner {
    client: Arc<dyn GenerationClient>,
    config: OrchestrationConfig,
    /// Fixed for the whole run by the pre-run probe.
    degraded: bool,
}

impl StepRunner {
    pub fn new(client: Arc<dyn GenerationClient>, config: OrchestrationConfig, degraded: bool) -> Self {
        Self {
            client,
            config,
            degraded,
        }
    }

    /// Produce one candidate fragment's text.
    ///
    /// Degraded mode never fails; a backend error on the live branch
    /// propagates and aborts the run.
    pub async fn run_step(
        &self,
        input: &StepInput,
        prompt_text: &str,
        editor_context: &str,
        language: EditorLanguage,
    ) -> OrchestrationResult<String> {
        let strategy = strategy_for(input.round, self.config.reasoning_depth);

        if self.degraded {
            tokio::time::sleep(Duration::from_millis(self.config.simulated_delay_ms)).await;
            return Ok(simulated_fragment(input, strategy));
        }

        let context = truncate_context(editor_context, self.config.max_context_chars);
        let prompt = build_prompt(input, strategy, prompt_text, &context, language);
        let system = system_instruction(input.role);

        debug!(
            agent = %input.agent_id,
            round = input.round,
            backend = self.client.name(),
            "running agent step"
        );

        let raw = self.client.generate(&prompt, Some(&system)).await?;
        let body = strip_code_fence(&raw);
        Ok(format!(
            "{}\n{}",
            provenance_line(input, strategy),
            body
        ))
    }
}

/// Keep the first and last `max_chars / 2` characters of oversized context,
/// joined by a visible marker.
pub fn truncate_context(context: &str, max_chars: usize) -> String {
    let total = context.chars().count();
    if total <= max_chars {
        return context.to_string();
    }

    let half = max_chars / 2;
    let head: String = context.chars().take(half).collect();
    let tail: String = context
        .chars()
        .skip(total - half)
        .collect();
    format!("{head}\n\n{TRUNCATION_MARKER}\n\n{tail}")
}

/// Strip one surrounding code fence; otherwise return the trimmed response.
pub fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.len() > 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let inner = &trimmed[3..trimmed.len() - 3];
        // The first line is the fence's language tag; the body follows.
        if let Some((_, body)) = inner.split_once('\n') {
            return body.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Machine-readable provenance comment prefixed onto live fragments.
fn provenance_line(input: &StepInput, strategy: &str) -> String {
    let origin_prefix: String = input.origin.chars().take(8).collect();
    format!(
        "// consensus agent={} round={} strategy=\"{}\" origin={} entropy={:.3}",
        input.agent_id, input.round, strategy, origin_prefix, input.entropy
    )
}

/// Placeholder fragment for offline runs. Begins with [`SIMULATED_MARKER`]
/// plus the agent id so downstream grouping and tests can recognize it.
fn simulated_fragment(input: &StepInput, strategy: &str) -> String {
    let origin_prefix: String = input.origin.chars().take(8).collect();
    format!(
        "{SIMULATED_MARKER}{}] {} placeholder for round {}\n// strategy: {}\n// origin: {} entropy={:.3}",
        input.agent_id,
        input.role.label(),
        input.round + 1,
        strategy,
        origin_prefix,
        input.entropy
    )
}

/// Role-flavored system preamble for the backend.
fn system_instruction(role: AgentRole) -> String {
    format!(
        "You are the {} in a panel of reasoning agents collaborating on one \
         code-editing request. Produce a single, self-contained candidate \
         completion. Respond with code only — no commentary.",
        role.label()
    )
}

/// Structured outbound instruction for one step.
fn build_prompt(
    input: &StepInput,
    strategy: &str,
    prompt_text: &str,
    context: &str,
    language: EditorLanguage,
) -> String {
    format!(
        "## Agent\n\n{} ({}) — round {}\n\n## Strategy\n\n{}\n\n## Request\n\n{}\n\n## Editor context\n\n```{}\n{}\n```",
        input.agent_id,
        input.role.label(),
        input.round + 1,
        strategy,
        prompt_text,
        language.fence_tag(),
        context
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> StepInput {
        StepInput {
            agent_id: "agent-2".to_string(),
            role: AgentRole::Reviewer,
            origin: "abcdef0123456789abcdef0123456789".to_string(),
            entropy: 3.125,
            round: 1,
        }
    }

    #[test]
    fn short_context_passes_through() {
        assert_eq!(truncate_context("short", 100), "short");
    }

    #[test]
    fn long_context_keeps_both_halves() {
        let context: String = ('a'..='z').cycle().take(200).collect();
        let truncated = truncate_context(&context, 100);

        assert!(truncated.contains(TRUNCATION_MARKER));
        assert!(truncated.starts_with(&context[..50]));
        assert!(truncated.ends_with(&context[150..]));
    }

    #[test]
    fn truncation_is_character_based() {
        let context = "é".repeat(50);
        let truncated = truncate_context(&context, 10);
        assert!(truncated.starts_with(&"é".repeat(5)));
        assert!(truncated.ends_with(&"é".repeat(5)));
    }

    #[test]
    fn fenced_response_is_unwrapped() {
        let raw = "```javascript\nconst x = 1;\n```";
        assert_eq!(strip_code_fence(raw), "const x = 1;");
    }

    #[test]
    fn bare_fence_without_tag_is_unwrapped() {
        let raw = "```\nfn main() {}\n```";
        assert_eq!(strip_code_fence(raw), "fn main() {}");
    }

    #[test]
    fn unfenced_response_is_trimmed_unchanged() {
        assert_eq!(strip_code_fence("  let y = 2;  \n"), "let y = 2;");
    }

    #[test]
    fn provenance_carries_identity_and_entropy() {
        let line = provenance_line(&input(), "some strategy");
        assert!(line.starts_with("// consensus agent=agent-2 round=1"));
        assert!(line.contains("origin=abcdef01"));
        assert!(line.contains("entropy=3.125"));
    }

    #[test]
    fn simulated_fragment_is_marked_with_agent_id() {
        let text = simulated_fragment(&input(), "some strategy");
        assert!(text.starts_with("// [simulated:agent-2]"));
        assert!(text.contains("round 2"));
    }

    #[test]
    fn prompt_embeds_fenced_context() {
        let prompt = build_prompt(&input(), "s", "add a parser", "let a = 1;", EditorLanguage::Rust);
        assert!(prompt.contains("agent-2 (Reviewer) — round 2"));
        assert!(prompt.contains("```rust\nlet a = 1;\n```"));
        assert!(prompt.contains("add a parser"));
    }
}
