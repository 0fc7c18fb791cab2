//! Formatting engine — compact, readable, and expanded rendering plus
//! whitespace normalization.
//!
//! Every transformation shares one invariant: content inside single or
//! double quotes is copied verbatim and never reflowed. Quote state is
//! tracked character by character, exactly as the analyzer tracks it, so a
//! multi-line quoted string survives every style untouched.

/// Rendering style for reconstructed commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatStyle {
    /// Minimal horizontal whitespace, newlines kept.
    Compact,
    /// Existing line breaks kept, whitespace collapsed, operators spaced.
    #[default]
    Readable,
    /// Readable, plus each pipe opens an indented continuation line.
    Expanded,
}

#[derive(Debug, Clone)]
pub struct FormatterConfig {
    pub style: FormatStyle,
    /// Space out unquoted `|`, `&`, `;` when not already whitespace-adjacent.
    pub space_around_operators: bool,
    /// In Expanded style, render each unquoted single `|` as ` |\n` plus an
    /// indented continuation.
    pub break_pipes: bool,
    pub indent_char: char,
    pub spaces_per_level: usize,
    /// Drop trailing whitespace per line and at end of text (normalize only).
    pub trim_trailing: bool,
    /// Collapse repeated horizontal whitespace (normalize only).
    pub normalize_spaces: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            style: FormatStyle::Readable,
            space_around_operators: true,
            break_pipes: true,
            indent_char: ' ',
            spaces_per_level: 4,
            trim_trailing: true,
            normalize_spaces: true,
        }
    }
}

/// Output of a formatting pass.
#[derive(Debug, Clone)]
pub struct FormattedCommand {
    pub text: String,
    /// The style that was actually applied.
    pub style: FormatStyle,
    /// True iff the output differs from the input.
    pub was_reformatted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: FormatterConfig,
}

impl Formatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Render `text` under the configured style.
    pub fn format(&self, text: &str) -> FormattedCommand {
        let rendered = self.apply_style(text, self.config.style);
        FormattedCommand {
            was_reformatted: rendered != text,
            text: rendered,
            style: self.config.style,
        }
    }

    /// One-off rendering under an explicit style.
    pub fn apply_style(&self, text: &str, style: FormatStyle) -> String {
        match style {
            FormatStyle::Compact => self.compact(text),
            FormatStyle::Readable => self.reflow(text, false),
            FormatStyle::Expanded => self.reflow(text, self.config.break_pipes),
        }
    }

    /// Whitespace canonicalization only, no operator spacing.
    pub fn normalize(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some(q) = quote {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                    i += 1;
                }
                ' ' | '\t' => {
                    let mut j = i;
                    while j < chars.len() && matches!(chars[j], ' ' | '\t') {
                        j += 1;
                    }
                    let at_line_end = j >= chars.len() || chars[j] == '\n';
                    if at_line_end && self.config.trim_trailing {
                        // dropped
                    } else if self.config.normalize_spaces {
                        out.push(' ');
                    } else {
                        out.extend(&chars[i..j]);
                    }
                    i = j;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }

    /// Compact: one space per run, nothing before a newline.
    fn compact(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some(q) = quote {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                    i += 1;
                }
                ' ' | '\t' => {
                    let mut j = i;
                    while j < chars.len() && matches!(chars[j], ' ' | '\t') {
                        j += 1;
                    }
                    if !(j < chars.len() && chars[j] == '\n') {
                        out.push(' ');
                    }
                    i = j;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }

    /// Readable/Expanded shared pass: collapse horizontal whitespace, keep
    /// line breaks, space operators, optionally break single pipes.
    fn reflow(&self, text: &str, break_pipes: bool) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len() + 16);
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some(q) = quote {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                    i += 1;
                }
                ' ' | '\t' => {
                    let mut j = i;
                    while j < chars.len() && matches!(chars[j], ' ' | '\t') {
                        j += 1;
                    }
                    if !out.ends_with(' ') {
                        out.push(' ');
                    }
                    i = j;
                }
                '|' | '&' | ';' => {
                    let mut j = i;
                    while j < chars.len() && chars[j] == c {
                        j += 1;
                    }
                    let run = j - i;
                    if break_pipes && c == '|' && run == 1 {
                        while out.ends_with(' ') || out.ends_with('\t') {
                            out.pop();
                        }
                        out.push_str(" |\n");
                        for _ in 0..self.config.spaces_per_level {
                            out.push(self.config.indent_char);
                        }
                        // eat whitespace (line breaks included) so the
                        // continuation starts clean and re-rendering an
                        // already-expanded pipeline is stable
                        while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\n') {
                            j += 1;
                        }
                    } else if self.config.space_around_operators {
                        if !(out.is_empty() || out.ends_with(' ') || out.ends_with('\n')) {
                            out.push(' ');
                        }
                        for _ in 0..run {
                            out.push(c);
                        }
                        if j < chars.len() && !chars[j].is_whitespace() {
                            out.push(' ');
                        }
                    } else {
                        for _ in 0..run {
                            out.push(c);
                        }
                    }
                    i = j;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }
}
