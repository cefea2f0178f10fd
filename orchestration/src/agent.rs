//! Agent identity, display roles, and the reasoning strategy table.
//!
//! An agent is a logical reasoning participant with a rotating identity
//! hash, not a process or thread. Agents are seeded at run start and
//! discarded when the run's finalizer completes.

use serde::{Deserialize, Serialize};

use crate::hashing::{digest, fractal_hash};

/// Stable per-run agent identifier, `agent-0` .. `agent-(N-1)`.
pub type AgentId = String;

/// The five display roles cycled across seeded agents.
///
/// Roles carry presentation semantics only; they never change how a step
/// executes. The closed set gets exhaustiveness checking wherever role
/// display is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Manager,
    Coder,
    Reviewer,
    Adversary,
    Specialist,
}

impl AgentRole {
    /// All roles, in assignment order.
    pub fn all() -> &'static [AgentRole] {
        &[
            AgentRole::Manager,
            AgentRole::Coder,
            AgentRole::Reviewer,
            AgentRole::Adversary,
            AgentRole::Specialist,
        ]
    }

    /// Role assigned to the agent at `index` (cycled past five).
    pub fn for_index(index: usize) -> AgentRole {
        Self::all()[index % Self::all().len()]
    }

    /// Panel heading for this role.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::Coder => "Coder",
            Self::Reviewer => "Reviewer",
            Self::Adversary => "Adversary",
            Self::Specialist => "Specialist",
        }
    }

    /// Status line shown while the agent is idle.
    pub fn idle_status(&self) -> &'static str {
        match self {
            Self::Manager => "Waiting for a task",
            Self::Coder => "Ready to draft",
            Self::Reviewer => "Nothing to review",
            Self::Adversary => "No claims to challenge",
            Self::Specialist => "On standby",
        }
    }

    /// Status line shown while the agent's step is in flight.
    pub fn working_status(&self) -> &'static str {
        match self {
            Self::Manager => "Framing the request",
            Self::Coder => "Drafting a candidate",
            Self::Reviewer => "Weighing alternatives",
            Self::Adversary => "Stress-testing assumptions",
            Self::Specialist => "Applying domain detail",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One reasoning participant in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub role: AgentRole,
    /// Rotating identity hash; re-derived every round.
    pub origin: String,
}

impl Agent {
    /// Seed the agent at `index` from the run's genesis hash.
    pub fn seeded(index: usize, genesis: &str, reasoning_depth: u32) -> Self {
        let id = format!("agent-{index}");
        let origin = fractal_hash(&format!("{genesis}{id}"), reasoning_depth);
        Self {
            id,
            role: AgentRole::for_index(index),
            origin,
        }
    }

    /// Rotate the origin for `round`, decorrelating successive fragments
    /// from the same agent. The new origin is a deterministic function of
    /// the previous origin, the genesis hash, and the round number.
    pub fn rotate_origin(&mut self, genesis: &str, round: u32) {
        self.origin = digest(&format!("{}{}{}", self.origin, genesis, round));
    }
}

/// Content-writing heuristics framed to the generation backend as part of
/// an agent step's instructions. Descriptive text only, never executed.
pub const STRATEGIES: &[&str] = &[
    "Lead with the simplest implementation that satisfies the request, then tighten the names.",
    "Work from the data structures outward: define the shapes before the behavior.",
    "Write the edge cases first and let the happy path fall out of them.",
    "Prefer small pure helpers over inline branching.",
    "Mirror the conventions already visible in the surrounding context.",
    "Sketch the control flow as comments, then replace each comment with code.",
];

/// Strategy for a given round at a given reasoning depth.
pub fn strategy_for(round: u32, reasoning_depth: u32) -> &'static str {
    let index = (round as usize * reasoning_depth as usize) % STRATEGIES.len();
    STRATEGIES[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_cycle_past_five() {
        assert_eq!(AgentRole::for_index(0), AgentRole::Manager);
        assert_eq!(AgentRole::for_index(4), AgentRole::Specialist);
        assert_eq!(AgentRole::for_index(5), AgentRole::Manager);
        assert_eq!(AgentRole::for_index(7), AgentRole::Reviewer);
    }

    #[test]
    fn role_statuses_are_distinct() {
        let mut idle: Vec<_> = AgentRole::all().iter().map(|r| r.idle_status()).collect();
        idle.sort_unstable();
        idle.dedup();
        assert_eq!(idle.len(), AgentRole::all().len());
    }

    #[test]
    fn seeding_is_deterministic() {
        let a = Agent::seeded(3, "genesis", 2);
        let b = Agent::seeded(3, "genesis", 2);
        assert_eq!(a.id, "agent-3");
        assert_eq!(a.origin, b.origin);
        assert_eq!(a.origin.len(), 32);

        let c = Agent::seeded(3, "other-genesis", 2);
        assert_ne!(a.origin, c.origin);
    }

    #[test]
    fn origin_rotation_replays_identically() {
        let mut a = Agent::seeded(0, "genesis", 3);
        let mut b = a.clone();

        let mut trail_a = Vec::new();
        let mut trail_b = Vec::new();
        for round in 0..4 {
            a.rotate_origin("genesis", round);
            trail_a.push(a.origin.clone());
            b.rotate_origin("genesis", round);
            trail_b.push(b.origin.clone());
        }
        assert_eq!(trail_a, trail_b);

        // Successive rotations never repeat an origin.
        let mut unique = trail_a.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), trail_a.len());
    }

    #[test]
    fn strategy_selection_wraps() {
        assert_eq!(strategy_for(0, 3), STRATEGIES[0]);
        assert_eq!(strategy_for(2, 3), STRATEGIES[0]);
        assert_eq!(strategy_for(1, 2), STRATEGIES[2]);
    }
}
