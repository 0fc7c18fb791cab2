//! Integration orchestrator — the single entry point binding history
//! access, splitting/analysis/formatting, sessions, and the cache.
//!
//! All state lives behind one reader/writer lock: mutations (edit lifecycle,
//! config, cache maintenance) serialize on the write lock, inspections take
//! the read lock. There are no internal threads; timeout and TTL are
//! discovered only when polled. Callbacks run synchronously while the lock
//! is held and must not re-enter the editor.

use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::RwLock;

use crate::analyze::{Analyzer, AnalyzerConfig};
use crate::buffer::EditBuffer;
use crate::cache::{CacheConfig, CacheStats, EditCache};
use crate::error::{EditError, Result};
use crate::format::{Formatter, FormatterConfig};
use crate::history::{HistoryEntry, HistoryProvider};
use crate::session::{
    EditOperation, SessionConfig, SessionId, SessionManager, SessionState,
};
use crate::split::{MultilineParseResult, Splitter, SplitterConfig};

const MAX_CACHE_ENTRIES: usize = 10_000;
const MAX_RECONSTRUCTION_DEPTH: usize = 100;
const MAX_RECONSTRUCTION_TIMEOUT_MS: u64 = 60_000;

/// Identity of the history entry a callback refers to.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub index: usize,
    pub id: u64,
    pub command: String,
}

/// Capability set a host registers to observe the edit lifecycle.
///
/// Every hook is single-shot per triggering operation and runs synchronously
/// while the orchestrator's lock may be held; implementations must not call
/// back into the editor.
pub trait EditCallbacks: Send + Sync {
    fn on_edit_start(&self, _entry: &EntryInfo) {}
    fn on_edit_complete(&self, _entry: &EntryInfo) {}
    fn on_edit_cancel(&self, _entry: &EntryInfo) {}
    fn on_buffer_loaded(&self, _buffer: &EditBuffer, _entry: &EntryInfo) {}
    fn on_structure_reconstructed(&self, _info: &MultilineParseResult) {}
    fn on_edit_modified(&self, _buffer: &EditBuffer, _change: &EditOperation) {}
    fn on_save_requested(&self, _buffer: &EditBuffer, _entry: &EntryInfo) {}
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Cache capacity; must lie in (0, 10000].
    pub max_cache_entries: usize,
    pub cache_ttl_ms: u64,
    pub track_cache_access: bool,
    /// Keyword nesting bound; must lie in (0, 100].
    pub max_reconstruction_depth: usize,
    /// Latency budget for one reconstruction; must lie in (0, 60000].
    pub reconstruction_timeout_ms: u64,
    pub max_sessions: usize,
    pub max_operations: usize,
    pub track_operations: bool,
    pub session_timeout_ms: u64,
    pub max_lines: usize,
    pub format: FormatterConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 64,
            cache_ttl_ms: 0,
            track_cache_access: true,
            max_reconstruction_depth: 32,
            reconstruction_timeout_ms: 5000,
            max_sessions: 4,
            max_operations: 1024,
            track_operations: true,
            session_timeout_ms: 300_000,
            max_lines: 256,
            format: FormatterConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Bounds check. Rejection leaves the caller's state untouched: the
    /// orchestrator validates before applying anything.
    fn validate(&self) -> Result<()> {
        if self.max_cache_entries == 0 || self.max_cache_entries > MAX_CACHE_ENTRIES {
            return Err(EditError::InvalidParameter("max_cache_entries out of range"));
        }
        if self.max_reconstruction_depth == 0
            || self.max_reconstruction_depth > MAX_RECONSTRUCTION_DEPTH
        {
            return Err(EditError::InvalidParameter(
                "max_reconstruction_depth out of range",
            ));
        }
        if self.reconstruction_timeout_ms == 0
            || self.reconstruction_timeout_ms > MAX_RECONSTRUCTION_TIMEOUT_MS
        {
            return Err(EditError::InvalidParameter(
                "reconstruction_timeout_ms out of range",
            ));
        }
        if self.max_sessions == 0 {
            return Err(EditError::InvalidParameter("max_sessions must be positive"));
        }
        if self.max_lines == 0 {
            return Err(EditError::InvalidParameter("max_lines must be positive"));
        }
        Ok(())
    }

    fn cache(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.max_cache_entries,
            entry_ttl_ms: self.cache_ttl_ms,
            track_access: self.track_cache_access,
        }
    }

    fn session(&self) -> SessionConfig {
        SessionConfig {
            max_sessions: self.max_sessions,
            max_operations: self.max_operations,
            track_operations: self.track_operations,
            session_timeout_ms: self.session_timeout_ms,
        }
    }

    fn splitter(&self) -> SplitterConfig {
        SplitterConfig {
            max_lines: self.max_lines,
        }
    }

    fn analyzer(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            max_depth: self.max_reconstruction_depth,
        }
    }
}

/// Aggregate counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorStats {
    pub active_sessions: usize,
    pub total_edits: u64,
    pub reconstructions_ok: u64,
    pub reconstructions_failed: u64,
    pub last_latency: Option<Duration>,
}

struct EditorInner {
    config: EditorConfig,
    history: Box<dyn HistoryProvider + Send + Sync>,
    sessions: SessionManager,
    cache: EditCache,
    splitter: Splitter,
    analyzer: Analyzer,
    formatter: Formatter,
    callbacks: Option<Box<dyn EditCallbacks>>,
    total_edits: u64,
    reconstructions_ok: u64,
    reconstructions_failed: u64,
    last_latency: Option<Duration>,
}

/// The multiline-history editing engine.
pub struct MultilineEditor {
    inner: RwLock<EditorInner>,
}

impl MultilineEditor {
    pub fn new(history: Box<dyn HistoryProvider + Send + Sync>) -> Self {
        Self::with_config(history, EditorConfig::default()).expect("default config is valid")
    }

    pub fn with_config(
        history: Box<dyn HistoryProvider + Send + Sync>,
        config: EditorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: RwLock::new(EditorInner {
                sessions: SessionManager::new(config.session()),
                cache: EditCache::new(config.cache()),
                splitter: Splitter::new(config.splitter()),
                analyzer: Analyzer::new(config.analyzer()),
                formatter: Formatter::new(config.format.clone()),
                history,
                callbacks: None,
                total_edits: 0,
                reconstructions_ok: 0,
                reconstructions_failed: 0,
                last_latency: None,
                config,
            }),
        })
    }

    pub fn set_callbacks(&self, callbacks: Box<dyn EditCallbacks>) {
        self.inner.write().callbacks = Some(callbacks);
    }

    /// Swap the configuration. Out-of-range values are rejected before
    /// anything is applied.
    pub fn set_config(&self, config: EditorConfig) -> Result<()> {
        config.validate()?;
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        inner.cache.set_config(config.cache());
        inner.sessions.set_config(config.session());
        inner.splitter = Splitter::new(config.splitter());
        inner.analyzer = Analyzer::new(config.analyzer());
        inner.formatter = Formatter::new(config.format.clone());
        inner.config = config;
        Ok(())
    }

    /// Begin editing the history entry at `index`: start a session,
    /// reconstruct presentable text, and load it into `buffer`.
    pub fn edit_entry(&self, index: usize, buffer: &mut EditBuffer) -> Result<SessionId> {
        let started = Instant::now();
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let id = inner.sessions.start_session(inner.history.as_ref(), index)?;
        let entry = match inner.history.entry(index) {
            Some(entry) => entry,
            None => {
                let _ = inner.sessions.cancel_session(id);
                return Err(EditError::NotFound);
            }
        };

        // A hit still falls through to full reconstruction: the cached text
        // is not wired into buffer population yet, so the lookup only
        // exercises the counters and recency.
        let hit = inner.cache.lookup(index).is_some();

        match reconstruct(inner, &entry) {
            Ok((parsed, rendered)) => {
                buffer.set_text(&rendered);
                if !hit {
                    inner.cache.insert(index, entry.id, &entry.command, &rendered);
                }
                if let Some(structure) = parsed.structure.clone() {
                    inner.sessions.attach_structure(id, structure)?;
                }
                inner.reconstructions_ok += 1;
                let info = EntryInfo {
                    index,
                    id: entry.id,
                    command: entry.command,
                };
                if let Some(cb) = &inner.callbacks {
                    cb.on_edit_start(&info);
                    cb.on_buffer_loaded(buffer, &info);
                    cb.on_structure_reconstructed(&parsed);
                }
                let latency = started.elapsed();
                if latency >= Duration::from_millis(inner.config.reconstruction_timeout_ms) {
                    warn!(
                        "reconstruction of entry {index} took {}ms (budget {}ms)",
                        latency.as_millis(),
                        inner.config.reconstruction_timeout_ms
                    );
                }
                inner.last_latency = Some(latency);
                debug!("editing history entry {index} in session {id}");
                Ok(id)
            }
            Err(err) => {
                inner.reconstructions_failed += 1;
                inner.last_latency = Some(started.elapsed());
                warn!("reconstruction failed for history entry {index}: {err}");
                let _ = inner.sessions.cancel_session(id);
                Err(err)
            }
        }
    }

    /// Record an edit against the current session: the working text is
    /// replaced with the buffer's contents and `change` is logged.
    pub fn session_update(&self, buffer: &EditBuffer, change: EditOperation) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let id = current_session(inner)?;
        inner.sessions.update_text(id, buffer.text())?;
        inner.sessions.record_operation(id, change.clone())?;
        if let Some(cb) = &inner.callbacks {
            cb.on_edit_modified(buffer, &change);
        }
        Ok(())
    }

    /// Accept the current edit: write the buffer back through history,
    /// complete the session, and drop the stale cache entry.
    pub fn session_complete(&self, buffer: &EditBuffer) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let id = current_session(inner)?;
        let (entry_index, info) = {
            let session = inner
                .sessions
                .session(id)
                .ok_or_else(|| EditError::InvalidState(format!("session {id} is not active")))?;
            if !matches!(session.state, SessionState::Active | SessionState::Modified) {
                return Err(EditError::InvalidState(format!(
                    "session {id} cannot complete from state {:?}",
                    session.state
                )));
            }
            (
                session.entry_index,
                EntryInfo {
                    index: session.entry_index,
                    id: session.entry_id,
                    command: session.original_text.clone(),
                },
            )
        };
        if let Some(cb) = &inner.callbacks {
            cb.on_save_requested(buffer, &info);
        }
        inner.history.save(entry_index, buffer.text())?;
        inner.sessions.complete_session(id)?;
        inner.cache.invalidate(entry_index);
        inner.total_edits += 1;
        if let Some(cb) = &inner.callbacks {
            cb.on_edit_complete(&info);
        }
        debug!("edit of history entry {entry_index} completed");
        Ok(())
    }

    /// Discard the current edit. The cache is left alone; the entry's
    /// content did not change.
    pub fn session_cancel(&self) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let id = current_session(inner)?;
        let session = inner.sessions.cancel_session(id)?;
        let info = EntryInfo {
            index: session.entry_index,
            id: session.entry_id,
            command: session.original_text,
        };
        if let Some(cb) = &inner.callbacks {
            cb.on_edit_cancel(&info);
        }
        Ok(())
    }

    /// Poll the current session's idle timeout. Returns true when it has
    /// expired (the session is parked in the error state, not freed).
    pub fn check_session_timeout(&self) -> Result<bool> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        match inner.sessions.current_id() {
            Some(id) => inner.sessions.check_timeout(id, Instant::now()),
            None => Ok(false),
        }
    }

    /// Eager sweep of expired cache entries; returns how many were removed.
    pub fn evict_expired_cache(&self) -> usize {
        self.inner.write().cache.evict_expired()
    }

    pub fn invalidate_cache(&self, index: usize) -> bool {
        self.inner.write().cache.invalidate(index)
    }

    pub fn clear_cache(&self) {
        self.inner.write().cache.clear();
    }

    pub fn stats(&self) -> EditorStats {
        let inner = self.inner.read();
        EditorStats {
            active_sessions: inner.sessions.active_count(),
            total_edits: inner.total_edits,
            reconstructions_ok: inner.reconstructions_ok,
            reconstructions_failed: inner.reconstructions_failed,
            last_latency: inner.last_latency,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.read().cache.stats()
    }

    pub fn config(&self) -> EditorConfig {
        self.inner.read().config.clone()
    }

    pub fn is_editing(&self) -> bool {
        self.inner.read().sessions.current_id().is_some()
    }

    /// Checked teardown. Refused while any session is active: the editor is
    /// handed back untouched so the caller can complete or cancel first.
    pub fn close(self) -> std::result::Result<(), Self> {
        if self.inner.read().sessions.active_count() > 0 {
            return Err(self);
        }
        Ok(())
    }
}

fn current_session(inner: &EditorInner) -> Result<SessionId> {
    inner
        .sessions
        .current_id()
        .ok_or_else(|| EditError::InvalidState("no active edit session".to_string()))
}

/// Full splitting/analysis/formatting pass over one entry.
fn reconstruct(
    inner: &EditorInner,
    entry: &HistoryEntry,
) -> Result<(MultilineParseResult, String)> {
    let parsed = inner.splitter.parse(&entry.command, &inner.analyzer)?;
    let rendered = inner.formatter.format(&entry.command).text;
    Ok((parsed, rendered))
}
