//! Multi-agent consensus orchestration for an editor's generation workflow.
//!
//! One run fans a user request out to N reasoning agents across R strictly
//! sequential rounds, collects the resulting candidate fragments, groups
//! them by opening-text similarity, scores the groups, and deterministically
//! selects a winning fragment:
//!
//! ```text
//! genesis → seed agents → Round(0..R): rotate origins, fan out steps
//!         → accumulate fragments → group / score / select → result
//! ```
//!
//! The editing surface and the generative backend live outside this crate:
//! the former hands in `editor_content` and a language tag, the latter is
//! consumed through [`generation::GenerationClient`]. With no credential
//! configured, runs complete on a simulated branch so the grouping and
//! scoring stay exercised offline.

pub mod agent;
pub mod assembler;
pub mod config;
pub mod errors;
pub mod generation;
pub mod hashing;
pub mod journal;
pub mod scheduler;
pub mod step;
pub mod workspace;

// Re-export the types a UI layer wires together.
pub use agent::{Agent, AgentId, AgentRole};
pub use assembler::{assemble, CandidateFragment, CandidateGroup, ConsensusResult};
pub use config::{EditorLanguage, OrchestrationConfig};
pub use errors::{OrchestrationError, OrchestrationResult};
pub use generation::{probe_key, GeminiClient, GenerationClient, KeyStatus};
pub use journal::{AgentView, Journal, JournalEvent, LogEntry, LogKind, SharedJournal};
pub use scheduler::{RunPhase, RunRequest, Scheduler};
pub use workspace::{CacheError, RecentFile, WorkspaceCache};
