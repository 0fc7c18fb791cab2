//! Data model for analyzed commands — format-agnostic.

use crate::keywords::KeywordKind;

/// The primary syntactic form of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructType {
    #[default]
    Simple,
    Pipeline,
    ForLoop,
    WhileLoop,
    UntilLoop,
    If,
    Case,
    Function,
    Subshell,
    CommandGroup,
    Select,
    Unknown,
}

/// A keyword found by the analyzer, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPosition {
    pub kind: KeywordKind,
    /// Byte offset of the keyword's first character.
    pub offset: usize,
    /// 0-based line the keyword starts on.
    pub line: usize,
    /// Indent width of that line (spaces + 4 per tab).
    pub indent: usize,
}

/// Per-line indentation summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentationInfo {
    /// Indent width per line: leading spaces plus 4 per leading tab.
    pub levels: Vec<usize>,
    pub indent_char: char,
    pub spaces_per_level: usize,
    pub tabs_used: bool,
}

/// Byte offset and length of one line, excluding its terminating newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub offset: usize,
    pub len: usize,
}

/// One node of the nested-construct outline, addressed by index into
/// [`ConstructTree::nodes`]. Teardown is just `Drop`, no link chasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructNode {
    pub kind: KeywordKind,
    /// Index into the owning structure's keyword sequence.
    pub keyword_index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Nested-construct outline.
///
/// Currently records the keyword population only; see the builder in
/// `analyze` for what is and is not assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructTree {
    pub nodes: Vec<ConstructNode>,
    pub keyword_count: usize,
    pub max_depth: usize,
}

/// Structural summary of one command, produced by [`crate::analyze::Analyzer`].
///
/// Owns its keyword sequence, construct outline, indentation arrays, and line
/// map exclusively.
#[derive(Debug, Clone)]
pub struct CommandStructure {
    pub construct: ConstructType,
    /// Ordered keyword sequence, scan order.
    pub keywords: Vec<KeywordPosition>,
    pub tree: ConstructTree,
    pub indentation: IndentationInfo,
    /// Per-line byte offset and length.
    pub lines: Vec<LineSpan>,
    pub is_complete: bool,
    pub has_syntax_error: bool,
}

impl CommandStructure {
    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
