//! Structure analyzer — keyword detection, construct classification,
//! completeness checking, and indentation measurement.
//!
//! Everything here is lexical: a single left-to-right scan tracks quote,
//! escape, and comment state the same way the formatter does, and matches
//! the fixed keyword table at every unsuppressed position. No tokenization
//! or expansion is performed.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{EditError, Result};
use crate::keywords::{
    closer_for, is_boundary_char, is_closer, matching_closer, KeywordDef, KeywordKind,
    KEYWORD_TABLE,
};
use crate::model::{
    CommandStructure, ConstructTree, ConstructType, IndentationInfo, KeywordPosition, LineSpan,
};

/// Tab width used when converting leading tabs to an indent width.
pub const TAB_WIDTH: usize = 4;

/// Function-definition head: `name()` with optional spacing. The `function`
/// keyword form is caught by the keyword table instead.
static RE_FUNC_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*[ \t]*\([ \t]*\)").unwrap());

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Maximum keyword nesting depth tolerated during completeness checking.
    pub max_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

/// Result of a completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    pub is_complete: bool,
    /// The closer still expected (or the unmatched closer encountered).
    pub missing: Option<KeywordKind>,
    /// True when a closer appeared without, or against, its opener.
    pub has_syntax_error: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Full structural analysis of one command.
    ///
    /// On error nothing is returned; a partially built structure is never
    /// observable.
    pub fn analyze(&self, text: &str) -> Result<CommandStructure> {
        let keywords = detect_keywords(text);
        let completeness = completeness_of(&keywords, self.config.max_depth)?;
        if completeness.has_syntax_error {
            log::debug!(
                "syntax error in command: unmatched {:?}",
                completeness.missing
            );
        }
        let construct = construct_of(text, &keywords);
        let indentation = calculate_indentation(text);
        let lines = line_spans(text);
        let tree = build_construct_tree(&keywords);
        Ok(CommandStructure {
            construct,
            keywords,
            tree,
            indentation,
            lines,
            is_complete: completeness.is_complete,
            has_syntax_error: completeness.has_syntax_error,
        })
    }

    /// Completeness check over the detected keyword sequence.
    pub fn check_complete(&self, text: &str) -> Result<Completeness> {
        completeness_of(&detect_keywords(text), self.config.max_depth)
    }
}

/// Scan `text` and return every keyword match, in scan order.
///
/// A character inside an active quote or `#` comment is never matched, and a
/// backslash suppresses interpretation of the following character once.
pub fn detect_keywords(text: &str) -> Vec<KeywordPosition> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let indents = calculate_indentation(text).levels;
    let mut out = Vec::new();

    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut in_comment = false;
    let mut line = 0usize;
    let mut line_has_content = false;

    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        let mut advance = 1;

        if escaped {
            escaped = false;
        } else if in_comment {
            if c == '\n' {
                in_comment = false;
            }
        } else if let Some(q) = quote {
            if q == '"' && c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
        } else if c == '\\' {
            escaped = true;
        } else if c == '\'' || c == '"' {
            quote = Some(c);
        } else if c == '#' && (i == 0 || is_boundary_char(chars[i - 1].1)) {
            in_comment = true;
        } else if let Some(def) = match_keyword_at(text, &chars, i, !line_has_content) {
            out.push(KeywordPosition {
                kind: def.kind,
                offset,
                line,
                indent: indents.get(line).copied().unwrap_or(0),
            });
            advance = def.text.len();
        }

        for k in 0..advance {
            let ch = chars[i + k].1;
            if ch == '\n' {
                line += 1;
                line_has_content = false;
            } else if !ch.is_whitespace() {
                line_has_content = true;
            }
        }
        i += advance;
    }
    out
}

/// Try every table entry at char position `i`. A match needs exact text, a
/// word boundary on both sides and, for construct openers, command-start
/// position.
fn match_keyword_at(
    text: &str,
    chars: &[(usize, char)],
    i: usize,
    at_command_start: bool,
) -> Option<&'static KeywordDef> {
    let (offset, _) = chars[i];
    let before_ok = i == 0 || is_boundary_char(chars[i - 1].1);
    if !before_ok {
        return None;
    }
    for def in KEYWORD_TABLE {
        if def.requires_command_start && !at_command_start && offset != 0 {
            continue;
        }
        if !text[offset..].starts_with(def.text) {
            continue;
        }
        let end = offset + def.text.len();
        let after_ok = match text[end..].chars().next() {
            None => true,
            Some(c) => is_boundary_char(c),
        };
        if after_ok {
            return Some(def);
        }
    }
    None
}

/// Classify the primary construct of `text`.
pub fn detect_type(text: &str) -> ConstructType {
    let keywords = detect_keywords(text);
    construct_of(text, &keywords)
}

pub(crate) fn construct_of(text: &str, keywords: &[KeywordPosition]) -> ConstructType {
    let head = text.trim_start();
    if RE_FUNC_HEAD.is_match(head) {
        return ConstructType::Function;
    }
    if head.starts_with('(') {
        return ConstructType::Subshell;
    }
    if head.starts_with('{') && head[1..].chars().next().is_none_or(char::is_whitespace) {
        return ConstructType::CommandGroup;
    }
    if let Some(first) = keywords.first() {
        return match first.kind {
            KeywordKind::For => ConstructType::ForLoop,
            KeywordKind::While => ConstructType::WhileLoop,
            KeywordKind::Until => ConstructType::UntilLoop,
            KeywordKind::Select => ConstructType::Select,
            KeywordKind::If | KeywordKind::Then | KeywordKind::Elif | KeywordKind::Else => {
                ConstructType::If
            }
            KeywordKind::Case => ConstructType::Case,
            KeywordKind::Function => ConstructType::Function,
            KeywordKind::OpenBrace => ConstructType::CommandGroup,
            KeywordKind::OpenParen => ConstructType::Subshell,
            _ => ConstructType::Unknown,
        };
    }
    if has_unquoted_pipe(text) {
        ConstructType::Pipeline
    } else {
        ConstructType::Simple
    }
}

/// True if an unquoted, unescaped `|` appears anywhere in `text`.
fn has_unquoted_pipe(text: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\\' => escaped = true,
                '\'' | '"' => quote = Some(c),
                '|' => return true,
                _ => {}
            },
        }
    }
    false
}

/// Stack machine over the keyword sequence: openers push their expected
/// closer, closers pop. An unmatched or mismatched closer is an immediate
/// syntax error; leftover stack means the command is unterminated.
pub(crate) fn completeness_of(
    keywords: &[KeywordPosition],
    max_depth: usize,
) -> Result<Completeness> {
    let mut stack: Vec<KeywordKind> = Vec::new();
    for kw in keywords {
        if let Some(closer) = closer_for(kw.kind) {
            stack.push(closer);
            if stack.len() > max_depth {
                return Err(EditError::DepthExceeded { max: max_depth });
            }
        } else if is_closer(kw.kind) {
            match stack.last().copied() {
                None => {
                    return Ok(Completeness {
                        is_complete: false,
                        missing: Some(kw.kind),
                        has_syntax_error: true,
                    })
                }
                Some(top) if top == kw.kind => {
                    stack.pop();
                }
                Some(top) => {
                    return Ok(Completeness {
                        is_complete: false,
                        missing: Some(top),
                        has_syntax_error: true,
                    })
                }
            }
        }
    }
    Ok(match stack.last().copied() {
        None => Completeness {
            is_complete: true,
            missing: None,
            has_syntax_error: false,
        },
        Some(top) => Completeness {
            is_complete: false,
            missing: Some(top),
            has_syntax_error: false,
        },
    })
}

/// Forward, depth-counted search from the opener at `start` to its balanced
/// closer. Re-encountering the same opener kind increments the depth; the
/// paired closer decrements it; the match is the index where depth reaches 0.
pub fn find_matching_keyword(keywords: &[KeywordPosition], start: usize) -> Option<usize> {
    let opener = keywords.get(start)?;
    let closer = matching_closer(opener.kind)?;
    let mut depth = 1usize;
    for (i, kw) in keywords.iter().enumerate().skip(start + 1) {
        if kw.kind == opener.kind {
            depth += 1;
        } else if kw.kind == closer {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Per-line indent widths: leading spaces count 1, leading tabs count
/// [`TAB_WIDTH`]. Measurement stops at the first non-indent character.
pub fn calculate_indentation(text: &str) -> IndentationInfo {
    let mut levels = Vec::new();
    let mut tabs_used = false;
    let mut spaces_seen = false;
    for line in text.split('\n') {
        let mut width = 0;
        for c in line.chars() {
            match c {
                ' ' => {
                    width += 1;
                    spaces_seen = true;
                }
                '\t' => {
                    width += TAB_WIDTH;
                    tabs_used = true;
                }
                _ => break,
            }
        }
        levels.push(width);
    }
    IndentationInfo {
        levels,
        indent_char: if tabs_used && !spaces_seen { '\t' } else { ' ' },
        spaces_per_level: TAB_WIDTH,
        tabs_used,
    }
}

/// Byte offset and length of every line (newline excluded).
pub(crate) fn line_spans(text: &str) -> Vec<LineSpan> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        spans.push(LineSpan {
            offset,
            len: line.len(),
        });
        offset += line.len() + 1;
    }
    spans
}

/// Record the construct population for `keywords`.
///
/// Parent/child links are not assembled: nothing downstream consumes
/// nesting yet, so the outline carries the keyword count and a zero depth.
/// TODO: assemble parent/child links once a renderer consumes nesting depth.
fn build_construct_tree(keywords: &[KeywordPosition]) -> ConstructTree {
    ConstructTree {
        nodes: Vec::new(),
        keyword_count: keywords.len(),
        max_depth: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<KeywordKind> {
        detect_keywords(text).iter().map(|k| k.kind).collect()
    }

    #[test]
    fn no_keywords_in_plain_command() {
        assert!(detect_keywords("ls -la /tmp").is_empty());
        assert!(detect_keywords("echo hello world").is_empty());
    }

    #[test]
    fn simple_command_is_complete() {
        let analyzer = Analyzer::default();
        let result = analyzer.check_complete("echo hello").unwrap();
        assert!(result.is_complete);
        assert_eq!(result.missing, None);
        assert_eq!(detect_type("echo hello"), ConstructType::Simple);
    }

    #[test]
    fn for_loop_keywords_in_scan_order() {
        let found = kinds("for x in 1 2 3; do echo $x; done");
        assert_eq!(
            found,
            vec![
                KeywordKind::For,
                KeywordKind::In,
                KeywordKind::Do,
                KeywordKind::Done
            ]
        );
    }

    #[test]
    fn for_loop_is_complete() {
        let analyzer = Analyzer::default();
        let result = analyzer
            .check_complete("for x in 1 2 3; do echo $x; done")
            .unwrap();
        assert!(result.is_complete, "Got: {result:?}");
    }

    #[test]
    fn for_loop_missing_done() {
        let analyzer = Analyzer::default();
        let result = analyzer.check_complete("for x in 1 2 3; do echo $x").unwrap();
        assert!(!result.is_complete);
        assert_eq!(result.missing, Some(KeywordKind::Done));
        assert!(!result.has_syntax_error, "unterminated is not a syntax error");
    }

    #[test]
    fn quoted_keywords_are_invisible() {
        assert!(detect_keywords(r#"echo "for loop""#).is_empty());
        assert!(detect_keywords("echo 'while do done'").is_empty());
    }

    #[test]
    fn commented_keywords_are_invisible() {
        assert!(detect_keywords("echo hi # for x in; do done").is_empty());
    }

    #[test]
    fn hash_inside_word_is_not_a_comment() {
        // `done` after the fragment is still live because a#b opens no comment
        let found = kinds("a#b done");
        assert_eq!(found, vec![KeywordKind::Done]);
    }

    #[test]
    fn escaped_quote_does_not_open_string() {
        // The \" is literal, so the following `done` sits outside any quote
        let found = kinds(r#"echo \" done"#);
        assert_eq!(found, vec![KeywordKind::Done]);
        // With a real quote the same `done` is swallowed
        assert!(detect_keywords(r#"echo " done"#).is_empty());
    }

    #[test]
    fn openers_require_command_start() {
        assert!(detect_keywords("echo for").is_empty());
        assert!(detect_keywords("echo while true").is_empty());
        // At line start after a newline the opener is live again
        let found = kinds("echo hi\nfor x in 1; do echo; done");
        assert_eq!(found[0], KeywordKind::For);
    }

    #[test]
    fn indented_opener_still_counts_as_command_start() {
        let found = kinds("echo hi\n  for x in 1; do echo; done");
        assert_eq!(found[0], KeywordKind::For);
    }

    #[test]
    fn closers_match_mid_line() {
        // `done` needs no command-start position; an unmatched one is a
        // syntax error with the offending keyword reported
        let analyzer = Analyzer::default();
        let result = analyzer.check_complete("echo done").unwrap();
        assert!(!result.is_complete);
        assert!(result.has_syntax_error);
        assert_eq!(result.missing, Some(KeywordKind::Done));
    }

    #[test]
    fn mismatched_closer_reports_expected() {
        let analyzer = Analyzer::default();
        let result = analyzer.check_complete("for x in 1; do echo; fi").unwrap();
        assert!(!result.is_complete);
        assert!(result.has_syntax_error);
        assert_eq!(result.missing, Some(KeywordKind::Done));
    }

    #[test]
    fn case_statement_is_complete() {
        let analyzer = Analyzer::default();
        let text = "case $x in\n  a) echo a ;;\n  b) echo b ;;\nesac";
        let result = analyzer.check_complete(text).unwrap();
        assert!(result.is_complete, "Got: {result:?}");
        assert_eq!(detect_type(text), ConstructType::Case);
    }

    #[test]
    fn then_pushes_fi_alongside_if() {
        // Both `if` and `then` register the fi expectation, so a detected
        // if/then pair still reports one fi outstanding after the closer.
        let analyzer = Analyzer::default();
        let result = analyzer.check_complete("if true; then echo; fi").unwrap();
        assert!(!result.is_complete);
        assert_eq!(result.missing, Some(KeywordKind::Fi));
    }

    #[test]
    fn then_alone_registers_missing_fi() {
        // An if head buried mid-line escapes detection; the then does not.
        let analyzer = Analyzer::default();
        let result = analyzer.check_complete("true && if [ -f x ]; then echo").unwrap();
        assert!(!result.is_complete);
        assert_eq!(result.missing, Some(KeywordKind::Fi));
    }

    #[test]
    fn nested_loops_complete() {
        let analyzer = Analyzer::default();
        let text = "for a in 1\ndo\nfor b in 2; do echo; done\ndone";
        let result = analyzer.check_complete(text).unwrap();
        assert!(result.is_complete, "Got: {result:?}");
    }

    #[test]
    fn depth_limit_aborts_analysis() {
        let analyzer = Analyzer::new(AnalyzerConfig { max_depth: 2 });
        let text = "for a in 1\nfor b in 2\nfor c in 3\n";
        let err = analyzer.check_complete(text).unwrap_err();
        assert_eq!(err, EditError::DepthExceeded { max: 2 });
        assert!(analyzer.analyze(text).is_err());
    }

    #[test]
    fn detect_type_variants() {
        assert_eq!(detect_type("ls -la"), ConstructType::Simple);
        assert_eq!(detect_type("ls | grep foo"), ConstructType::Pipeline);
        assert_eq!(detect_type("for x in 1; do :; done"), ConstructType::ForLoop);
        assert_eq!(detect_type("while true; do :; done"), ConstructType::WhileLoop);
        assert_eq!(detect_type("until false; do :; done"), ConstructType::UntilLoop);
        assert_eq!(detect_type("if true; then :; fi"), ConstructType::If);
        assert_eq!(detect_type("case $x in a) ;; esac"), ConstructType::Case);
        assert_eq!(detect_type("select x in a b; do :; done"), ConstructType::Select);
        assert_eq!(detect_type("function greet { echo hi; }"), ConstructType::Function);
        assert_eq!(detect_type("greet() { echo hi; }"), ConstructType::Function);
        assert_eq!(detect_type("( cd /tmp && make )"), ConstructType::Subshell);
        assert_eq!(detect_type("{ echo a; echo b; }"), ConstructType::CommandGroup);
        assert_eq!(detect_type("echo done"), ConstructType::Unknown);
    }

    #[test]
    fn quoted_pipe_is_not_a_pipeline() {
        assert_eq!(detect_type(r#"echo "a|b""#), ConstructType::Simple);
    }

    #[test]
    fn find_matching_simple() {
        let keywords = detect_keywords("for x in 1; do echo; done");
        let done = find_matching_keyword(&keywords, 0).unwrap();
        assert_eq!(keywords[done].kind, KeywordKind::Done);
    }

    #[test]
    fn find_matching_nested() {
        let keywords = detect_keywords("for a in 1\ndo\nfor b in 2; do echo; done\ndone");
        // Outer `for` must skip the inner loop's closer
        let idx = find_matching_keyword(&keywords, 0).unwrap();
        assert_eq!(idx, keywords.len() - 1);
    }

    #[test]
    fn find_matching_brackets() {
        let keywords = detect_keywords("( echo hi )");
        assert_eq!(keywords[0].kind, KeywordKind::OpenParen);
        let idx = find_matching_keyword(&keywords, 0).unwrap();
        assert_eq!(keywords[idx].kind, KeywordKind::CloseParen);
    }

    #[test]
    fn find_matching_unclosed() {
        let keywords = detect_keywords("for x in 1; do echo");
        assert_eq!(find_matching_keyword(&keywords, 0), None);
    }

    #[test]
    fn indentation_spaces_and_tabs() {
        let info = calculate_indentation("a\n  b\n\tc\n    d");
        assert_eq!(info.levels, vec![0, 2, 4, 4]);
        assert!(info.tabs_used);
        assert_eq!(info.spaces_per_level, TAB_WIDTH);
    }

    #[test]
    fn indentation_tab_only_text_prefers_tab_char() {
        let info = calculate_indentation("a\n\tb\n\t\tc");
        assert_eq!(info.indent_char, '\t');
        assert_eq!(info.levels, vec![0, 4, 8]);
    }

    #[test]
    fn line_spans_cover_text() {
        let text = "if true; then\n  echo hi\nfi";
        let spans = line_spans(text);
        assert_eq!(spans.len(), 3);
        assert_eq!(&text[spans[1].offset..spans[1].offset + spans[1].len], "  echo hi");
        assert_eq!(&text[spans[2].offset..spans[2].offset + spans[2].len], "fi");
    }

    #[test]
    fn analyze_populates_structure() {
        let analyzer = Analyzer::default();
        let s = analyzer.analyze("for x in 1 2; do\n  echo $x\ndone").unwrap();
        assert_eq!(s.construct, ConstructType::ForLoop);
        assert!(s.is_complete);
        assert!(!s.has_syntax_error);
        assert_eq!(s.keyword_count(), 4);
        assert_eq!(s.line_count(), 3);
        assert_eq!(s.tree.keyword_count, 4);
        assert_eq!(s.tree.max_depth, 0);
        assert!(s.tree.nodes.is_empty());
        assert_eq!(s.indentation.levels, vec![0, 2, 0]);
    }

    #[test]
    fn keyword_positions_carry_line_and_indent() {
        let keywords = detect_keywords("for x in 1\ndo\n  done");
        let done = keywords.last().unwrap();
        assert_eq!(done.kind, KeywordKind::Done);
        assert_eq!(done.line, 2);
        assert_eq!(done.indent, 2);
        assert_eq!(done.offset, 16);
    }

    #[test]
    fn analyze_empty_text() {
        let analyzer = Analyzer::default();
        let s = analyzer.analyze("").unwrap();
        assert_eq!(s.construct, ConstructType::Simple);
        assert!(s.is_complete);
        assert_eq!(s.line_count(), 1);
    }
}
