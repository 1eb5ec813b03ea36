//! Diagnostics for CQL and XCQL parsing.
//!
//! Every failure is a [`Diagnostic`]: a kind from a closed taxonomy (numbered after the
//! SRU diagnostic list) plus a free-text `details` string naming the offending fragment.

use thiserror::Error;

/// The kind of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Unexpected token, unconsumed trailing input, or a missing boolean/relation.
    QuerySyntax,
    /// Mismatched parenthesis.
    Parenthesis,
    /// Unterminated quoted string or an illegally quoted identifier.
    Quote,
    /// Malformed index name (multiple dots or an empty context set).
    MalformedIndex,
    /// Null or empty modifier.
    NullModifier,
    /// A bare relational operator used as a term.
    BareRelation,
    /// A backslash escaping a character that has no special meaning.
    BadEscape,
    /// Empty term where a non-empty one is required.
    EmptyTerm,
    /// Term consisting only of anchor characters.
    AnchorOnly,
    /// Expected a boolean keyword, found something else.
    ExpectedBoolean,
    /// Prefix declared more than once.
    DuplicatePrefix,
}

impl DiagnosticKind {
    /// Returns the stable numeric diagnostic code.
    pub fn code(self) -> u16 {
        match self {
            Self::QuerySyntax => 10,
            Self::Parenthesis => 13,
            Self::Quote => 14,
            Self::MalformedIndex => 15,
            Self::NullModifier => 20,
            Self::BareRelation => 25,
            Self::BadEscape => 26,
            Self::EmptyTerm => 27,
            Self::AnchorOnly => 32,
            Self::ExpectedBoolean => 37,
            Self::DuplicatePrefix => 45,
        }
    }

    /// Returns the human readable message for this kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::QuerySyntax => "Query syntax error",
            Self::Parenthesis => "Invalid or unsupported use of parentheses",
            Self::Quote => "Invalid or unsupported use of quotes",
            Self::MalformedIndex => "Unsupported context set",
            Self::NullModifier => "Unsupported relation modifier",
            Self::BareRelation => "Special characters not quoted in term",
            Self::BadEscape => "Non special character escaped in term",
            Self::EmptyTerm => "Empty term unsupported",
            Self::AnchorOnly => "Anchoring character in unsupported position",
            Self::ExpectedBoolean => "Unsupported boolean operator",
            Self::DuplicatePrefix => "Prefix assigned to multiple identifiers",
        }
    }

    /// Looks up a kind by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        [
            Self::QuerySyntax,
            Self::Parenthesis,
            Self::Quote,
            Self::MalformedIndex,
            Self::NullModifier,
            Self::BareRelation,
            Self::BadEscape,
            Self::EmptyTerm,
            Self::AnchorOnly,
            Self::ExpectedBoolean,
            Self::DuplicatePrefix,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }
}

/// A coded parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("diagnostic {}: {}{}", .kind.code(), .kind.message(), details_suffix(.details))]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// The offending token or fragment.
    pub details: String,
}

/// Formats the details part of the display string.
fn details_suffix(details: &str) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(": {details}")
    }
}

impl Diagnostic {
    /// Creates a diagnostic of the given kind.
    pub fn new(kind: DiagnosticKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            details: details.into(),
        }
    }

    /// Creates a generic syntax error (code 10).
    pub fn syntax(details: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::QuerySyntax, details)
    }

    /// Creates the code 10 error raised when a query nests past `limit` levels.
    pub fn too_deep(limit: usize) -> Self {
        Self::syntax(format!("Query nested deeper than {limit} levels"))
    }

    /// Returns the numeric diagnostic code.
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Returns the human readable message.
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }

    /// Returns a suggestion for common errors.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind {
            DiagnosticKind::Parenthesis => Some("Check that every '(' has a matching ')'"),
            DiagnosticKind::Quote if self.details.starts_with('"') => {
                Some("Add a closing quote (\") to complete the string")
            }
            DiagnosticKind::BareRelation => {
                Some("Quote the term if the operator is meant literally, e.g. '\">=\"'")
            }
            DiagnosticKind::BadEscape => Some("Only \\\" \\\\ \\* \\? and \\^ may be escaped"),
            DiagnosticKind::ExpectedBoolean => Some("Clauses are joined with and, or, not or prox"),
            DiagnosticKind::DuplicatePrefix => {
                Some("Declare each prefix once per scope; 'cql' and 'srw' are reserved")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in [10, 13, 14, 15, 20, 25, 26, 27, 32, 37, 45] {
            let kind = DiagnosticKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(DiagnosticKind::from_code(11).is_none());
    }

    #[test]
    fn display_includes_code_message_and_details() {
        let diag = Diagnostic::new(DiagnosticKind::Parenthesis, "(a and b");
        assert_eq!(
            diag.to_string(),
            "diagnostic 13: Invalid or unsupported use of parentheses: (a and b"
        );
    }

    #[test]
    fn display_without_details() {
        let diag = Diagnostic::new(DiagnosticKind::EmptyTerm, "");
        assert_eq!(diag.to_string(), "diagnostic 27: Empty term unsupported");
    }

    #[test]
    fn hint_for_unterminated_quote() {
        let diag = Diagnostic::new(DiagnosticKind::Quote, "\"unterminated");
        assert!(diag.hint().unwrap().contains("closing quote"));

        let quoted_identifier = Diagnostic::new(DiagnosticKind::Quote, "dc.title");
        assert!(quoted_identifier.hint().is_none());
    }
}
