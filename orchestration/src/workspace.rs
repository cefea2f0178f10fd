//! Workspace cache — settings and recent-file state for one session.
//!
//! Explicitly constructed and explicitly owned: callers create an instance,
//! `init()` it, pass it to whatever composes the core, and `teardown()` it
//! on shutdown. Tests construct independent instances; nothing here is
//! process-global.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::OrchestrationConfig;

/// Recent-file entries kept before eviction.
const DEFAULT_MAX_RECENT: usize = 16;

/// File name used under the cache directory.
const CACHE_FILE: &str = "workspace.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One remembered file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFile {
    pub path: String,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CacheState {
    settings: Option<OrchestrationConfig>,
    recent: Vec<RecentFile>,
}

/// Session-scoped cache with size-bounded recent-file eviction and JSON
/// persistence.
pub struct WorkspaceCache {
    dir: Option<PathBuf>,
    max_recent: usize,
    state: RwLock<CacheState>,
}

impl WorkspaceCache {
    /// Cache that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            max_recent: DEFAULT_MAX_RECENT,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Cache persisted as JSON under `dir`.
    pub fn at_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            max_recent: DEFAULT_MAX_RECENT,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Override the recent-file bound.
    pub fn with_max_recent(mut self, max_recent: usize) -> Self {
        self.max_recent = max_recent.max(1);
        self
    }

    /// Load persisted state if a cache file exists. A missing file is a
    /// fresh session, not an error.
    pub fn init(&self) -> Result<(), CacheError> {
        let Some(path) = self.file_path() else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let text = std::fs::read_to_string(&path)?;
        let loaded: CacheState = serde_json::from_str(&text)?;
        *self.state.write().expect("cache lock poisoned") = loaded;
        Ok(())
    }

    /// Flush state to disk (no-op for in-memory caches).
    pub fn teardown(&self) -> Result<(), CacheError> {
        let Some(path) = self.file_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = self.state.read().expect("cache lock poisoned");
        let text = serde_json::to_string_pretty(&*state)?;
        std::fs::write(&path, text)?;
        Ok(())
    }

    /// Last persisted settings, if any.
    pub fn settings(&self) -> Option<OrchestrationConfig> {
        self.state
            .read()
            .expect("cache lock poisoned")
            .settings
            .clone()
    }

    /// Remember the session's settings for the next launch.
    pub fn store_settings(&self, config: &OrchestrationConfig) {
        self.state.write().expect("cache lock poisoned").settings = Some(config.clone());
    }

    /// Record a file access: move-to-front, dedupe, evict past the bound.
    pub fn touch_recent(&self, path: &Path) {
        let path = path.display().to_string();
        let mut state = self.state.write().expect("cache lock poisoned");
        state.recent.retain(|entry| entry.path != path);
        state.recent.insert(
            0,
            RecentFile {
                path,
                opened_at: Utc::now(),
            },
        );
        state.recent.truncate(self.max_recent);
    }

    /// Recent files, most recent first.
    pub fn recent(&self) -> Vec<RecentFile> {
        self.state
            .read()
            .expect("cache lock poisoned")
            .recent
            .clone()
    }

    fn file_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(CACHE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_files_dedupe_and_move_to_front() {
        let cache = WorkspaceCache::in_memory();
        cache.touch_recent(Path::new("a.js"));
        cache.touch_recent(Path::new("b.js"));
        cache.touch_recent(Path::new("a.js"));

        let recent = cache.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].path, "a.js");
        assert_eq!(recent[1].path, "b.js");
    }

    #[test]
    fn recent_files_evict_past_the_bound() {
        let cache = WorkspaceCache::in_memory().with_max_recent(2);
        cache.touch_recent(Path::new("a.js"));
        cache.touch_recent(Path::new("b.js"));
        cache.touch_recent(Path::new("c.js"));

        let recent = cache.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].path, "c.js");
        assert_eq!(recent[1].path, "b.js");
    }

    #[test]
    fn settings_and_recents_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();

        let cache = WorkspaceCache::at_dir(dir.path());
        cache.init().unwrap();
        let mut config = OrchestrationConfig::default();
        config.agent_count = 6;
        cache.store_settings(&config);
        cache.touch_recent(Path::new("kept.js"));
        cache.teardown().unwrap();

        let reopened = WorkspaceCache::at_dir(dir.path());
        reopened.init().unwrap();
        assert_eq!(reopened.settings().unwrap().agent_count, 6);
        assert_eq!(reopened.recent()[0].path, "kept.js");
    }

    #[test]
    fn init_on_fresh_dir_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::at_dir(dir.path().join("nested"));
        cache.init().unwrap();
        assert!(cache.settings().is_none());
        assert!(cache.recent().is_empty());
    }

    #[test]
    fn in_memory_teardown_touches_nothing() {
        let cache = WorkspaceCache::in_memory();
        cache.touch_recent(Path::new("x.js"));
        cache.teardown().unwrap();
    }
}
