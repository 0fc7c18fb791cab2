//! Shell keyword table and pairing rules.
//!
//! The analyzer matches against a fixed table of reserved words and bracket
//! forms. A match requires a word boundary on both sides, and construct
//! openers additionally require command-start position (offset 0 or first
//! non-whitespace after a newline).

/// The closed set of keyword kinds the analyzer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    For,
    While,
    Until,
    Select,
    If,
    Then,
    Elif,
    Else,
    Fi,
    Case,
    Esac,
    In,
    Function,
    Do,
    Done,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
}

impl KeywordKind {
    /// The literal text this keyword matches.
    pub fn text(self) -> &'static str {
        match self {
            Self::For => "for",
            Self::While => "while",
            Self::Until => "until",
            Self::Select => "select",
            Self::If => "if",
            Self::Then => "then",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::Fi => "fi",
            Self::Case => "case",
            Self::Esac => "esac",
            Self::In => "in",
            Self::Function => "function",
            Self::Do => "do",
            Self::Done => "done",
            Self::OpenBrace => "{",
            Self::CloseBrace => "}",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
        }
    }
}

/// One entry of the fixed keyword table.
#[derive(Debug, Clone, Copy)]
pub struct KeywordDef {
    pub text: &'static str,
    pub kind: KeywordKind,
    /// Only matched at offset 0 or as the first word of a line.
    pub requires_command_start: bool,
}

const fn def(text: &'static str, kind: KeywordKind, requires_command_start: bool) -> KeywordDef {
    KeywordDef {
        text,
        kind,
        requires_command_start,
    }
}

/// The fixed keyword table. Construct openers require command-start position;
/// closers, connectives, and brackets match anywhere a boundary allows.
pub const KEYWORD_TABLE: &[KeywordDef] = &[
    def("function", KeywordKind::Function, true),
    def("select", KeywordKind::Select, true),
    def("while", KeywordKind::While, true),
    def("until", KeywordKind::Until, true),
    def("case", KeywordKind::Case, true),
    def("for", KeywordKind::For, true),
    def("if", KeywordKind::If, true),
    def("then", KeywordKind::Then, false),
    def("elif", KeywordKind::Elif, false),
    def("else", KeywordKind::Else, false),
    def("done", KeywordKind::Done, false),
    def("esac", KeywordKind::Esac, false),
    def("fi", KeywordKind::Fi, false),
    def("in", KeywordKind::In, false),
    def("do", KeywordKind::Do, false),
    def("{", KeywordKind::OpenBrace, false),
    def("}", KeywordKind::CloseBrace, false),
    def("(", KeywordKind::OpenParen, false),
    def(")", KeywordKind::CloseParen, false),
];

/// True for characters that terminate a word: whitespace and the shell
/// metacharacters `; | & ( ) { } < >`.
pub fn is_boundary_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | '|' | '&' | '(' | ')' | '{' | '}' | '<' | '>')
}

/// The closer an opening keyword pushes onto the completeness stack.
///
/// `then` maps to `fi` just like `if`: when an `if` head is buried mid-line
/// and escapes detection, the `then` still registers that a closer is owed.
pub fn closer_for(kind: KeywordKind) -> Option<KeywordKind> {
    match kind {
        KeywordKind::For | KeywordKind::While | KeywordKind::Until | KeywordKind::Select => {
            Some(KeywordKind::Done)
        }
        KeywordKind::If | KeywordKind::Then => Some(KeywordKind::Fi),
        KeywordKind::Case => Some(KeywordKind::Esac),
        _ => None,
    }
}

/// True for the keywords that pop the completeness stack.
pub fn is_closer(kind: KeywordKind) -> bool {
    matches!(kind, KeywordKind::Done | KeywordKind::Fi | KeywordKind::Esac)
}

/// Pairing used by forward keyword matching: the completeness pairs plus
/// the bracket forms.
pub fn matching_closer(kind: KeywordKind) -> Option<KeywordKind> {
    match kind {
        KeywordKind::OpenBrace => Some(KeywordKind::CloseBrace),
        KeywordKind::OpenParen => Some(KeywordKind::CloseParen),
        other => closer_for(other),
    }
}
