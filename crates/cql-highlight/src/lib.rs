//! Syntax highlighting and terminal colors for cql.
//!
//! XCQL, JSON and TOML output go through syntect. CQL itself has no syntect grammar, so
//! queries are colored straight from the parser's own token stream.

#![warn(missing_docs)]

use cql_parser::{BooleanOp, TokenKind, tokenize};
use syntect::{
    easy::HighlightLines,
    highlighting::Style,
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};
use two_face::{
    syntax::extra_newlines as extra_syntaxes,
    theme::{EmbeddedLazyThemeSet, EmbeddedThemeName, extra as extra_themes},
};

/// A syntax highlighter for terminal output.
pub struct Highlighter {
    /// Language definitions, including the two-face extras for TOML.
    syntax_set: SyntaxSet,
    /// Color themes.
    theme_set: EmbeddedLazyThemeSet,
    /// The active theme.
    theme: EmbeddedThemeName,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    /// Creates a highlighter with the Dracula theme.
    pub fn new() -> Self {
        Self {
            syntax_set: extra_syntaxes(),
            theme_set: extra_themes(),
            theme: EmbeddedThemeName::Dracula,
        }
    }

    /// Highlights an XCQL document.
    pub fn highlight_xcql(&self, content: &str) -> String {
        self.highlight(content, "xml")
    }

    /// Highlights JSON output.
    pub fn highlight_json(&self, content: &str) -> String {
        self.highlight(content, "json")
    }

    /// Highlights TOML configuration.
    pub fn highlight_toml(&self, content: &str) -> String {
        self.highlight(content, "toml")
    }

    /// Highlights content with the named syntax.
    ///
    /// Unknown syntaxes fall back to plain text.
    pub fn highlight(&self, content: &str, syntax_name: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension(syntax_name)
            .or_else(|| self.syntax_set.find_syntax_by_name(syntax_name))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self.theme_set.get(self.theme);
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        for line in LinesWithEndings::from(content) {
            let ranges: Vec<(Style, &str)> = highlighter
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_else(|_| vec![(Style::default(), line)]);
            output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
        }
        output.push_str(colors::RESET);
        output
    }
}

/// Colors a CQL query by token class.
///
/// Whitespace between tokens is kept as written. A query the lexer rejects is returned
/// unchanged.
pub fn highlight_query(query: &str) -> String {
    let Ok(tokens) = tokenize(query) else {
        return query.to_string();
    };

    let mut output = String::new();
    let mut offset = 0;
    for token in tokens.iter().filter(|t| !t.is_end()) {
        output.push_str(&query[offset..token.position]);
        let color = match token.kind {
            TokenKind::Word if BooleanOp::from_keyword(&token.text).is_some() => colors::CYAN,
            TokenKind::Quoted => colors::GREEN,
            TokenKind::Comparison | TokenKind::Slash => colors::YELLOW,
            TokenKind::LParen | TokenKind::RParen => colors::DIM,
            TokenKind::Other => colors::RED,
            TokenKind::Word | TokenKind::End => "",
        };
        if color.is_empty() {
            output.push_str(&token.text);
        } else {
            output.push_str(&format!("{color}{}{}", token.text, colors::RESET));
        }
        offset = token.position + token.text.len();
    }
    output.push_str(&query[offset.min(query.len())..]);
    output
}

/// ANSI color codes for terminal output.
pub mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Cyan text (headers, boolean operators).
    pub const CYAN: &str = "\x1b[36m";
    /// Green text (success, quoted terms).
    pub const GREEN: &str = "\x1b[32m";
    /// Yellow text (warnings, operators).
    pub const YELLOW: &str = "\x1b[33m";
    /// Red text.
    pub const RED: &str = "\x1b[31m";
    /// Dim text.
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats a header in bold cyan.
pub fn header(text: &str) -> String {
    format!("{}{}{}{}", colors::BOLD, colors::CYAN, text, colors::RESET)
}

/// Formats a subheader in bold.
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Dims less important text.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats a success message in green.
pub fn success(text: &str) -> String {
    format!("{}{}{}", colors::GREEN, text, colors::RESET)
}

/// Formats a warning in yellow.
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Formats an error in red.
pub fn error(text: &str) -> String {
    format!("{}{}{}", colors::RED, text, colors::RESET)
}

/// Returns a dimmed horizontal rule.
pub fn rule(width: usize) -> String {
    dim(&"─".repeat(width))
}
