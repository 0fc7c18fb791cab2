//! Edit session manager — lifecycle state machine for edits against
//! history entries, with an append-only operation log per session.
//!
//! A session moves `Active → Modified` as text changes, and leaves the
//! manager on completion or cancellation. Timeout is detected only when
//! polled; an expired session is parked in `Error` and stays owned by the
//! manager until the caller cancels it.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{EditError, Result};
use crate::history::HistoryProvider;
use crate::model::CommandStructure;

/// Monotonically increasing session identity; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never started.
    Inactive,
    Active,
    Modified,
    /// Terminal: edit accepted.
    Completed,
    /// Terminal: edit discarded.
    Canceling,
    /// Terminal: timed out.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOpKind {
    Insert,
    Delete,
    Replace,
    Indent,
    Format,
}

/// Append-only log record of one edit.
#[derive(Debug, Clone)]
pub struct EditOperation {
    pub kind: EditOpKind,
    pub offset: usize,
    pub len: usize,
    pub text: String,
    pub at: Instant,
}

impl EditOperation {
    pub fn new(kind: EditOpKind, offset: usize, len: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            len,
            text: text.into(),
            at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Concurrent session bound.
    pub max_sessions: usize,
    /// Operation log cap per session.
    pub max_operations: usize,
    /// When false, `record_operation` is a no-op rather than an error.
    pub track_operations: bool,
    /// Idle bound checked by `check_timeout`. Zero disables.
    pub session_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 4,
            max_operations: 1024,
            track_operations: true,
            session_timeout_ms: 300_000,
        }
    }
}

/// One in-flight edit against a history entry.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub id: SessionId,
    pub state: SessionState,
    pub entry_index: usize,
    /// Id of the history entry being edited.
    pub entry_id: u64,
    pub original_text: String,
    pub current_text: String,
    pub structure: Option<CommandStructure>,
    pub operations: Vec<EditOperation>,
    pub started_at: Instant,
    pub last_modified: Instant,
    pub has_modifications: bool,
    pub multiline_mode: bool,
}

#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    sessions: Vec<EditSession>,
    current: Option<SessionId>,
    next_id: u64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            current: None,
            next_id: 1,
        }
    }

    /// Begin editing `entry_index`, seeding the working text from history.
    /// The new session becomes the manager's current session.
    pub fn start_session(
        &mut self,
        history: &dyn HistoryProvider,
        entry_index: usize,
    ) -> Result<SessionId> {
        if self.sessions.len() >= self.config.max_sessions {
            return Err(EditError::InvalidState(format!(
                "session limit reached ({} active)",
                self.sessions.len()
            )));
        }
        let entry = history
            .entry(entry_index)
            .ok_or(EditError::InvalidParameter("entry index out of range"))?;
        let id = SessionId(self.next_id);
        self.next_id += 1;
        let now = Instant::now();
        let multiline_mode = entry.command.contains('\n');
        self.sessions.push(EditSession {
            id,
            state: SessionState::Active,
            entry_index,
            entry_id: entry.id,
            current_text: entry.command.clone(),
            original_text: entry.command,
            structure: None,
            operations: Vec::new(),
            started_at: now,
            last_modified: now,
            has_modifications: false,
            multiline_mode,
        });
        self.current = Some(id);
        debug!("session {id} started for history entry {entry_index}");
        Ok(id)
    }

    /// Append to the session's operation log. A no-op when tracking is
    /// disabled; an error once the log is full.
    pub fn record_operation(&mut self, id: SessionId, op: EditOperation) -> Result<()> {
        if !self.config.track_operations {
            return Ok(());
        }
        let max_operations = self.config.max_operations;
        let session = self.session_mut(id)?;
        if session.operations.len() >= max_operations {
            return Err(EditError::InvalidState(format!(
                "operation log full ({max_operations} entries)"
            )));
        }
        session.operations.push(op);
        Ok(())
    }

    /// Replace the working text and mark the session modified.
    pub fn update_text(&mut self, id: SessionId, text: &str) -> Result<()> {
        let session = self.session_mut(id)?;
        match session.state {
            SessionState::Active | SessionState::Modified => {}
            state => {
                return Err(EditError::InvalidState(format!(
                    "session {id} is not editable in state {state:?}"
                )))
            }
        }
        session.current_text = text.to_string();
        session.has_modifications = true;
        session.state = SessionState::Modified;
        session.last_modified = Instant::now();
        Ok(())
    }

    /// Attach the reconstructed structure to a session.
    pub fn attach_structure(&mut self, id: SessionId, structure: CommandStructure) -> Result<()> {
        self.session_mut(id)?.structure = Some(structure);
        Ok(())
    }

    /// Accept the edit. Only legal from `Active` or `Modified`; the session
    /// is detached from the manager and returned to the caller.
    pub fn complete_session(&mut self, id: SessionId) -> Result<EditSession> {
        let pos = self.position(id)?;
        match self.sessions[pos].state {
            SessionState::Active | SessionState::Modified => {}
            state => {
                return Err(EditError::InvalidState(format!(
                    "session {id} cannot complete from state {state:?}"
                )))
            }
        }
        let mut session = self.sessions.remove(pos);
        session.state = SessionState::Completed;
        if self.current == Some(id) {
            self.current = None;
        }
        debug!("session {id} completed");
        Ok(session)
    }

    /// Discard the edit. Legal from any active state, including `Error`.
    pub fn cancel_session(&mut self, id: SessionId) -> Result<EditSession> {
        let pos = self.position(id)?;
        let mut session = self.sessions.remove(pos);
        session.state = SessionState::Canceling;
        if self.current == Some(id) {
            self.current = None;
        }
        debug!("session {id} canceled");
        Ok(session)
    }

    /// Poll the idle timeout. An expired session moves to `Error` and stays
    /// owned by the manager; it is not detached here.
    pub fn check_timeout(&mut self, id: SessionId, now: Instant) -> Result<bool> {
        let timeout_ms = self.config.session_timeout_ms;
        let session = self.session_mut(id)?;
        if timeout_ms == 0 {
            return Ok(false);
        }
        let idle = now.saturating_duration_since(session.last_modified);
        if idle >= Duration::from_millis(timeout_ms) {
            warn!("session {id} timed out after {}ms idle", idle.as_millis());
            session.state = SessionState::Error;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn current(&self) -> Option<&EditSession> {
        self.current.and_then(|id| self.session(id))
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current
    }

    pub fn session(&self, id: SessionId) -> Option<&EditSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    fn position(&self, id: SessionId) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| EditError::InvalidState(format!("session {id} is not active")))
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut EditSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| EditError::InvalidState(format!("session {id} is not active")))
    }
}
