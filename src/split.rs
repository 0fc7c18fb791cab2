//! Multiline splitter — line sequencing, continuation detection, and
//! parse-with-analysis.
//!
//! Splitting is purely structural: each line carries its indent width, a
//! backslash-continuation flag, and a best-effort leading-keyword hint. The
//! whole-text structural analysis is delegated to the analyzer.

use regex::Regex;
use std::sync::LazyLock;

use crate::analyze::{calculate_indentation, Analyzer};
use crate::error::{EditError, Result};
use crate::keywords::{KeywordKind, KEYWORD_TABLE};
use crate::model::CommandStructure;

static RE_BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*$").unwrap());
/// First word of a line, or one of the bracket forms.
static RE_LEADING_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*([A-Za-z]+|\{|\}|\(|\))").unwrap());

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Hard cap on the number of lines; exceeding it is an error, never
    /// silent truncation.
    pub max_lines: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { max_lines: 256 }
    }
}

/// One line of a multiline command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub content: String,
    /// 0-based physical line number.
    pub line_number: usize,
    /// Indent width (spaces + 4 per tab).
    pub indent: usize,
    /// True when the line ends in an unescaped backslash.
    pub is_continuation: bool,
    /// Keyword the line starts with, if its first word is one.
    pub leading_keyword: Option<KeywordKind>,
}

/// Aggregated result of splitting plus whole-text analysis.
#[derive(Debug, Clone)]
pub struct MultilineParseResult {
    pub lines: Vec<ParsedLine>,
    /// Total character length of the original text.
    pub total_len: usize,
    /// Structural summary, or `None` when analysis failed.
    pub structure: Option<CommandStructure>,
    pub is_complete: bool,
    /// The closer expected to terminate the command, when incomplete.
    pub missing_keyword: Option<KeywordKind>,
}

impl MultilineParseResult {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Splitter {
    config: SplitterConfig,
}

impl Splitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    /// Split `text` into its line sequence.
    pub fn split_lines(&self, text: &str) -> Result<Vec<ParsedLine>> {
        let indents = calculate_indentation(text).levels;
        let mut lines = Vec::new();
        for (line_number, raw) in text.split('\n').enumerate() {
            if line_number >= self.config.max_lines {
                return Err(EditError::InvalidParameter(
                    "line count exceeds configured maximum",
                ));
            }
            lines.push(ParsedLine {
                content: raw.to_string(),
                line_number,
                indent: indents.get(line_number).copied().unwrap_or(0),
                is_continuation: check_continuation(raw),
                leading_keyword: leading_keyword(raw),
            });
        }
        Ok(lines)
    }

    /// Split and analyze in one pass.
    ///
    /// Analysis failure is not fatal: the line sequence is still returned
    /// with `structure` unset.
    pub fn parse(&self, text: &str, analyzer: &Analyzer) -> Result<MultilineParseResult> {
        let lines = self.split_lines(text)?;
        let total_len = text.chars().count();
        match analyzer.analyze(text) {
            Ok(structure) => {
                let is_complete = structure.is_complete;
                let missing_keyword = if is_complete {
                    None
                } else {
                    analyzer.check_complete(text)?.missing
                };
                Ok(MultilineParseResult {
                    lines,
                    total_len,
                    structure: Some(structure),
                    is_complete,
                    missing_keyword,
                })
            }
            Err(err) => {
                log::warn!("structure analysis failed: {err}");
                Ok(MultilineParseResult {
                    lines,
                    total_len,
                    structure: None,
                    is_complete: false,
                    missing_keyword: None,
                })
            }
        }
    }
}

/// True when `line` ends in an unescaped backslash.
///
/// Trailing whitespace is skipped first; an odd run of trailing backslashes
/// means the last one is live, an even run means they escape each other.
pub fn check_continuation(line: &str) -> bool {
    let trimmed = line.trim_end_matches([' ', '\t']);
    let backslashes = trimmed.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 1
}

/// Best-effort keyword hint for the first word of a line.
fn leading_keyword(line: &str) -> Option<KeywordKind> {
    if RE_BLANK.is_match(line) {
        return None;
    }
    let caps = RE_LEADING_WORD.captures(line)?;
    let word = caps.get(1)?.as_str();
    KEYWORD_TABLE
        .iter()
        .find(|def| def.text == word)
        .map(|def| def.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConstructType;

    #[test]
    fn splits_and_numbers_lines() {
        let splitter = Splitter::default();
        let lines = splitter.split_lines("if true; then\n  echo hi\nfi").unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].content, "if true; then");
        assert_eq!(lines[1].line_number, 1);
        assert_eq!(lines[1].indent, 2);
        assert_eq!(lines[2].content, "fi");
    }

    #[test]
    fn single_backslash_is_continuation() {
        assert!(check_continuation("echo hello \\"));
        assert!(check_continuation("echo hello \\  "));
    }

    #[test]
    fn even_backslashes_are_not_continuation() {
        assert!(!check_continuation("echo hello \\\\"));
        assert!(!check_continuation("printf '%s' \\\\\\\\"));
    }

    #[test]
    fn odd_backslash_runs_are_continuation() {
        assert!(check_continuation("echo hello \\\\\\"));
    }

    #[test]
    fn plain_line_is_not_continuation() {
        assert!(!check_continuation("echo hello"));
        assert!(!check_continuation(""));
    }

    #[test]
    fn continuation_flags_per_line() {
        let splitter = Splitter::default();
        let lines = splitter.split_lines("echo a \\\n  b\necho c").unwrap();
        assert!(lines[0].is_continuation);
        assert!(!lines[1].is_continuation);
        assert!(!lines[2].is_continuation);
    }

    #[test]
    fn leading_keyword_hints() {
        let splitter = Splitter::default();
        let lines = splitter
            .split_lines("for x in 1 2; do\n  echo $x\ndone")
            .unwrap();
        assert_eq!(lines[0].leading_keyword, Some(KeywordKind::For));
        assert_eq!(lines[1].leading_keyword, None);
        assert_eq!(lines[2].leading_keyword, Some(KeywordKind::Done));
    }

    #[test]
    fn blank_line_has_no_hint() {
        let splitter = Splitter::default();
        let lines = splitter.split_lines("echo a\n   \nfi").unwrap();
        assert_eq!(lines[1].leading_keyword, None);
        assert_eq!(lines[2].leading_keyword, Some(KeywordKind::Fi));
    }

    #[test]
    fn line_limit_is_an_error() {
        let splitter = Splitter::new(SplitterConfig { max_lines: 2 });
        let err = splitter.split_lines("a\nb\nc").unwrap_err();
        assert_eq!(
            err,
            EditError::InvalidParameter("line count exceeds configured maximum")
        );
    }

    #[test]
    fn parse_attaches_structure() {
        let splitter = Splitter::default();
        let analyzer = Analyzer::default();
        let result = splitter
            .parse("for x in 1 2; do\n  echo $x\ndone", &analyzer)
            .unwrap();
        assert_eq!(result.line_count(), 3);
        assert!(result.is_complete);
        assert_eq!(result.missing_keyword, None);
        let structure = result.structure.unwrap();
        assert_eq!(structure.construct, ConstructType::ForLoop);
    }

    #[test]
    fn parse_reports_missing_keyword() {
        let splitter = Splitter::default();
        let analyzer = Analyzer::default();
        let result = splitter
            .parse("for x in 1 2; do\n  echo $x", &analyzer)
            .unwrap();
        assert!(!result.is_complete);
        assert_eq!(result.missing_keyword, Some(KeywordKind::Done));
    }

    #[test]
    fn parse_counts_characters() {
        let splitter = Splitter::default();
        let analyzer = Analyzer::default();
        let result = splitter.parse("echo hi", &analyzer).unwrap();
        assert_eq!(result.total_len, 7);
    }

    #[test]
    fn parse_line_limit_propagates() {
        let splitter = Splitter::new(SplitterConfig { max_lines: 1 });
        let analyzer = Analyzer::default();
        assert!(splitter.parse("a\nb", &analyzer).is_err());
    }
}
