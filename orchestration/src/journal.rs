//! Per-agent event journal and activity state.
//!
//! Owned by the core, observed by the UI layer. Entries are append-only for
//! the duration of a run and cleared at the next run's start. Appends go
//! through an interior lock so a true-parallelism port stays sound, and
//! every mutation is mirrored onto a broadcast channel for live observers.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::agent::{Agent, AgentId};

/// Broadcast capacity; slow observers miss old events rather than block.
const CHANNEL_CAPACITY: usize = 256;

/// Classification of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Genesis,
    Origin,
    Event,
    Fragment,
    Consensus,
    Error,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Genesis => write!(f, "genesis"),
            Self::Origin => write!(f, "origin"),
            Self::Event => write!(f, "event"),
            Self::Fragment => write!(f, "fragment"),
            Self::Consensus => write!(f, "consensus"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One appended journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub kind: LogKind,
}

/// Everything the UI renders for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentView {
    /// Latest fragment or error text for the agent's panel body.
    pub content: String,
    /// Append-only log for the current run.
    pub entries: Vec<LogEntry>,
    /// Whether a step is currently in flight.
    pub is_active: bool,
    /// One-line status shown under the panel heading.
    pub status: String,
    /// Status text to restore when the run finalizes.
    idle_status: String,
}

impl AgentView {
    fn idle(idle_status: &str) -> Self {
        Self {
            content: String::new(),
            entries: Vec::new(),
            is_active: false,
            status: idle_status.to_string(),
            idle_status: idle_status.to_string(),
        }
    }
}

/// Live notification of a journal mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEvent {
    RunReset {
        agent_ids: Vec<AgentId>,
    },
    EntryAppended {
        agent_id: AgentId,
        kind: LogKind,
        message: String,
    },
    StatusChanged {
        agent_id: AgentId,
        status: String,
        is_active: bool,
    },
    ContentChanged {
        agent_id: AgentId,
    },
}

/// Shared handle to a [`Journal`].
pub type SharedJournal = Arc<Journal>;

/// Append-only per-agent journal with live broadcast.
pub struct Journal {
    agents: RwLock<BTreeMap<AgentId, AgentView>>,
    sender: broadcast::Sender<JournalEvent>,
}

impl Journal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            agents: RwLock::new(BTreeMap::new()),
            sender,
        }
    }

    pub fn shared(self) -> SharedJournal {
        Arc::new(self)
    }

    /// Drop the previous run's state and register this run's agents.
    pub fn reset(&self, agents: &[Agent]) {
        let mut map = self.agents.write().expect("journal lock poisoned");
        map.clear();
        for agent in agents {
            map.insert(agent.id.clone(), AgentView::idle(agent.role.idle_status()));
        }
        drop(map);
        self.publish(JournalEvent::RunReset {
            agent_ids: agents.iter().map(|a| a.id.clone()).collect(),
        });
    }

    /// Append a log entry to one agent's journal.
    pub fn append(&self, agent_id: &str, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        let mut map = self.agents.write().expect("journal lock poisoned");
        if let Some(view) = map.get_mut(agent_id) {
            view.entries.push(LogEntry {
                timestamp: Utc::now(),
                message: message.clone(),
                kind,
            });
        }
        drop(map);
        self.publish(JournalEvent::EntryAppended {
            agent_id: agent_id.to_string(),
            kind,
            message,
        });
    }

    /// Update an agent's status line and activity flag.
    pub fn set_status(&self, agent_id: &str, status: impl Into<String>, is_active: bool) {
        let status = status.into();
        let mut map = self.agents.write().expect("journal lock poisoned");
        if let Some(view) = map.get_mut(agent_id) {
            view.status = status.clone();
            view.is_active = is_active;
        }
        drop(map);
        self.publish(JournalEvent::StatusChanged {
            agent_id: agent_id.to_string(),
            status,
            is_active,
        });
    }

    /// Replace an agent's panel content.
    pub fn set_content(&self, agent_id: &str, content: impl Into<String>) {
        let mut map = self.agents.write().expect("journal lock poisoned");
        if let Some(view) = map.get_mut(agent_id) {
            view.content = content.into();
        }
        drop(map);
        self.publish(JournalEvent::ContentChanged {
            agent_id: agent_id.to_string(),
        });
    }

    /// The run's unconditional finalizer: every agent inactive, status back
    /// to its idle text. Logs and content are left intact.
    pub fn finalize_run(&self) {
        let mut changed = Vec::new();
        let mut map = self.agents.write().expect("journal lock poisoned");
        for (id, view) in map.iter_mut() {
            view.is_active = false;
            view.status = view.idle_status.clone();
            changed.push((id.clone(), view.status.clone()));
        }
        drop(map);
        for (agent_id, status) in changed {
            self.publish(JournalEvent::StatusChanged {
                agent_id,
                status,
                is_active: false,
            });
        }
    }

    /// Whether any agent currently has a step in flight.
    pub fn any_active(&self) -> bool {
        self.agents
            .read()
            .expect("journal lock poisoned")
            .values()
            .any(|v| v.is_active)
    }

    /// Full copy of the per-agent view map, for polling consumers.
    pub fn snapshot(&self) -> BTreeMap<AgentId, AgentView> {
        self.agents.read().expect("journal lock poisoned").clone()
    }

    /// Subscribe to live journal events.
    pub fn subscribe(&self) -> broadcast::Receiver<JournalEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: JournalEvent) {
        // No receivers is fine; snapshots still observe everything.
        let _ = self.sender.send(event);
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}
