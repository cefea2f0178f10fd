//! Consensus assembly: group collected fragments, score the groups, pick
//! the winner.
//!
//! Grouping is a cheap near-duplicate bucket on the first 100 characters of
//! candidate text: fragments that agree verbatim on their opening content
//! land together. It will merge semantically different completions that
//! share a long common prefix; that coarseness is part of the contract, not
//! something to repair here.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

/// Characters of candidate text used as the partition key.
const GROUP_KEY_CHARS: usize = 100;

/// Score weight per distinct contributing agent.
const AGENT_WEIGHT: f64 = 2.0;
/// Score weight per distinct round represented.
const ROUND_WEIGHT: f64 = 1.5;
/// Score weight on mean fragment entropy.
const ENTROPY_WEIGHT: f64 = 3.0;

/// Sentinel candidate when a run collected no fragments.
pub const NO_CANDIDATES_TEXT: &str = "// No valid candidates were generated by the agents.";

/// One unit of generated text from one agent in one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFragment {
    pub agent_id: AgentId,
    /// The agent's origin hash when this fragment was produced.
    pub origin: String,
    /// 0-indexed round.
    pub round: u32,
    pub candidate: String,
    pub entropy: f64,
    pub timestamp: DateTime<Utc>,
}

/// A cluster of fragments sharing a grouping key, with derived statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateGroup {
    pub key: String,
    /// Members in accumulator insertion order.
    pub candidates: Vec<CandidateFragment>,
    pub score: f64,
    /// Distinct contributing agent ids.
    pub agent_count: usize,
    /// Distinct rounds represented.
    pub round_count: usize,
    pub avg_entropy: f64,
}

/// Final immutable output of one run.
///
/// Boundary-facing score and entropy values are fixed to three decimals;
/// the per-group numbers in `all_groups` stay numeric for client-side
/// formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub genesis: String,
    pub selected_candidate: String,
    pub score: String,
    pub agent_count: usize,
    pub round_count: usize,
    pub avg_entropy: String,
    /// Agent that produced the highest-entropy fragment of the winning
    /// group, which is not necessarily the selected fragment's author.
    pub root_agent: AgentId,
    pub root_entropy: String,
    /// All groups, sorted by score descending.
    pub all_groups: Vec<CandidateGroup>,
}

/// Group, score, and select over the full fragment list for a run.
pub fn assemble(fragments: &[CandidateFragment], genesis: &str) -> ConsensusResult {
    if fragments.is_empty() {
        return empty_result(genesis);
    }

    // Buckets keep first-seen order so later score ties resolve by
    // insertion, and members keep accumulator order within a bucket.
    let mut groups: Vec<CandidateGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        let key: String = fragment.candidate.chars().take(GROUP_KEY_CHARS).collect();
        match index.get(&key) {
            Some(&i) => groups[i].candidates.push(fragment.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(CandidateGroup {
                    key,
                    candidates: vec![fragment.clone()],
                    score: 0.0,
                    agent_count: 0,
                    round_count: 0,
                    avg_entropy: 0.0,
                });
            }
        }
    }

    for group in &mut groups {
        let agents: HashSet<&str> = group.candidates.iter().map(|f| f.agent_id.as_str()).collect();
        let rounds: HashSet<u32> = group.candidates.iter().map(|f| f.round).collect();
        let entropy_sum: f64 = group.candidates.iter().map(|f| f.entropy).sum();

        group.agent_count = agents.len();
        group.round_count = rounds.len();
        group.avg_entropy = entropy_sum / group.candidates.len() as f64;
        group.score = group.agent_count as f64 * AGENT_WEIGHT
            + group.round_count as f64 * ROUND_WEIGHT
            + group.avg_entropy * ENTROPY_WEIGHT;
    }

    // Stable sort: equal scores keep first-seen group order.
    groups.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let winner = &groups[0];
    let selected = &winner.candidates[0];
    let root = highest_entropy(&winner.candidates);

    ConsensusResult {
        genesis: genesis.to_string(),
        selected_candidate: selected.candidate.clone(),
        score: format!("{:.3}", winner.score),
        agent_count: winner.agent_count,
        round_count: winner.round_count,
        avg_entropy: format!("{:.3}", winner.avg_entropy),
        root_agent: root.agent_id.clone(),
        root_entropy: format!("{:.3}", root.entropy),
        all_groups: groups,
    }
}

/// Defensive sentinel for a run that collected nothing.
fn empty_result(genesis: &str) -> ConsensusResult {
    ConsensusResult {
        genesis: genesis.to_string(),
        selected_candidate: NO_CANDIDATES_TEXT.to_string(),
        score: "0".to_string(),
        agent_count: 0,
        round_count: 0,
        avg_entropy: "0".to_string(),
        root_agent: "N/A".to_string(),
        root_entropy: "0".to_string(),
        all_groups: Vec::new(),
    }
}

/// First fragment holding the strictly greatest entropy; earlier members
/// win entropy ties so selection stays deterministic.
fn highest_entropy(candidates: &[CandidateFragment]) -> &CandidateFragment {
    let mut best = &candidates[0];
    for candidate in &candidates[1..] {
        if candidate.entropy > best.entropy {
            best = candidate;
        }
    }
    best
}
