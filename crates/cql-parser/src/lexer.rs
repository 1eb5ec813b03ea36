//! CQL lexer (tokenizer).
//!
//! Converts query text into raw tokens, one at a time, for the parser. The lexer is a small
//! state machine with four states: ground, in-word, in-quote and angle-operator. The angle
//! state exists only to merge `<=`, `>=` and `<>` into single tokens.

use std::{
    iter::Peekable,
    str::{CharIndices, FromStr},
};

use tracing::trace;

use crate::error::{Diagnostic, DiagnosticKind};

/// Punctuation that may appear inside a word.
const WORD_PUNCTUATION: &str = "!@#$%^&*-+{}[];,.?|~`:\\_";

/// Returns true if `ch` continues or starts a bare word.
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || WORD_PUNCTUATION.contains(ch)
}

/// The lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A bare word: index, relation keyword, boolean, or unquoted term.
    Word,
    /// A double-quoted string (the quotes are kept in the token text).
    Quoted,
    /// One of `=`, `>`, `>=`, `<`, `<=`, `<>`.
    Comparison,
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// Modifier separator `/`.
    Slash,
    /// Any other single punctuation character.
    Other,
    /// End of input.
    End,
}

/// A lexical unit with its raw text and byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Raw token text; empty for [`TokenKind::End`].
    pub text: String,
    /// Byte offset of the first character in the input.
    pub position: usize,
}

impl Token {
    /// Creates a token.
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Returns true for the end-of-input token.
    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }

    /// Returns true if this is the comparison operator `op`.
    pub fn is_comparison(&self, op: &str) -> bool {
        self.kind == TokenKind::Comparison && self.text == op
    }
}

/// The closed set of relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `<>`
    Ne,
}

impl Comparison {
    /// Returns the operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Ne => "<>",
        }
    }
}

impl FromStr for Comparison {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Eq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "<>" => Ok(Self::Ne),
            _ => Err(()),
        }
    }
}

/// Lexer state between characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between tokens, skipping whitespace.
    Ground,
    /// Accumulating a bare word.
    InWord,
    /// Inside a double-quoted string.
    InQuote,
    /// Saw `<` or `>`; may extend to a two-character operator.
    Angle,
}

/// Pulls tokens from CQL text on demand.
pub struct Lexer<'a> {
    /// The original input string.
    input: &'a str,
    /// Characters with their byte offsets.
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Returns the next token. After the input is exhausted every call yields an `End` token.
    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        let mut state = State::Ground;
        let mut text = String::new();
        let mut start = self.input.len();

        loop {
            let peeked = self.chars.peek().copied();
            match state {
                State::Ground => match peeked {
                    None => return Ok(emit(TokenKind::End, text, start)),
                    Some((_, ch)) if ch.is_whitespace() => {
                        self.chars.next();
                    }
                    Some((pos, ch)) => {
                        self.chars.next();
                        start = pos;
                        text.push(ch);
                        state = match ch {
                            '"' => State::InQuote,
                            '<' | '>' => State::Angle,
                            c if is_word_char(c) => State::InWord,
                            c => return Ok(emit(single_char_kind(c), text, start)),
                        };
                    }
                },
                State::InWord => match peeked {
                    Some((_, ch)) if is_word_char(ch) || ch == '"' => {
                        self.chars.next();
                        text.push(ch);
                    }
                    _ => return Ok(emit(TokenKind::Word, text, start)),
                },
                State::InQuote => match self.chars.next() {
                    None => return Err(Diagnostic::new(DiagnosticKind::Quote, text)),
                    Some((_, '\\')) => {
                        text.push('\\');
                        if let Some((_, escaped)) = self.chars.next() {
                            text.push(escaped);
                        }
                    }
                    Some((_, '"')) => {
                        text.push('"');
                        return Ok(emit(TokenKind::Quoted, text, start));
                    }
                    Some((_, ch)) => text.push(ch),
                },
                State::Angle => {
                    if let Some((_, ch)) = peeked
                        && matches!((text.as_str(), ch), ("<", '=' | '>') | (">", '='))
                    {
                        self.chars.next();
                        text.push(ch);
                    }
                    return Ok(emit(TokenKind::Comparison, text, start));
                }
            }
        }
    }
}

/// Builds a token and traces it.
fn emit(kind: TokenKind, text: String, position: usize) -> Token {
    trace!(?kind, %text, position, "token");
    Token::new(kind, text, position)
}

/// Classifies a character that forms a token on its own.
fn single_char_kind(ch: char) -> TokenKind {
    match ch {
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        '/' => TokenKind::Slash,
        '=' => TokenKind::Comparison,
        _ => TokenKind::Other,
    }
}

/// Tokenizes a whole query. The result always ends with exactly one `End` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Diagnostic> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.is_end();
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
