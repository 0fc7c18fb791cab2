//! Multiline-history editing engine for interactive line editors.
//!
//! Given a previously entered, possibly multi-line shell command retrieved
//! from history, the engine:
//!
//! 1. **Analyze** — find shell keywords outside quotes and comments,
//!    classify the primary construct, check completeness ([`analyze`])
//! 2. **Split** — break the text into a line sequence with continuation
//!    flags and keyword hints ([`split`])
//! 3. **Format** — re-render under a compact, readable, or expanded style
//!    ([`format`])
//! 4. **Edit** — run interactive edit sessions against history entries,
//!    with an LRU+TTL reconstruction cache, behind one reader/writer lock
//!    ([`editor`], [`session`], [`cache`])
//!
//! Scanning is lexical only: the engine classifies constructs and checks
//! keyword/bracket balance, it never executes, expands, or tokenizes for
//! execution semantics.

pub mod analyze;
pub mod buffer;
pub mod cache;
pub mod editor;
pub mod error;
pub mod format;
pub mod history;
pub mod keywords;
pub mod model;
pub mod session;
pub mod split;

pub use analyze::{
    calculate_indentation, detect_keywords, detect_type, find_matching_keyword, Analyzer,
    AnalyzerConfig, Completeness,
};
pub use buffer::EditBuffer;
pub use cache::{CacheConfig, CacheStats, CachedReconstruction, EditCache};
pub use editor::{EditCallbacks, EditorConfig, EditorStats, EntryInfo, MultilineEditor};
pub use error::{EditError, Result};
pub use format::{FormatStyle, FormattedCommand, Formatter, FormatterConfig};
pub use history::{HistoryEntry, HistoryProvider, MemoryHistory};
pub use keywords::KeywordKind;
pub use model::{
    CommandStructure, ConstructTree, ConstructType, IndentationInfo, KeywordPosition, LineSpan,
};
pub use session::{
    EditOpKind, EditOperation, EditSession, SessionConfig, SessionId, SessionManager, SessionState,
};
pub use split::{MultilineParseResult, ParsedLine, Splitter, SplitterConfig};
