use std::ops::Range;
use tandem_syntax::{Diagnostic, TextRange};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        end: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Unclosed block opened at {pos}")]
    UnclosedBlock { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax {
        pos: usize,
        end: usize,
        message: String,
    },

    #[error("Unrecognized input at {pos}")]
    LexerError { pos: usize, end: usize },
}

impl ParseError {
    pub fn unexpected_token(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos: span.start,
            end: span.end,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos: span.start,
            end: span.end,
            message: message.into(),
        }
    }

    pub fn lexer_error(span: Range<usize>) -> Self {
        Self::LexerError {
            pos: span.start,
            end: span.end,
        }
    }

    pub fn range(&self) -> TextRange {
        match self {
            ParseError::UnexpectedToken { pos, end, .. }
            | ParseError::InvalidSyntax { pos, end, .. }
            | ParseError::LexerError { pos, end } => TextRange::new(*pos, *end),
            ParseError::UnexpectedEof { pos, .. } | ParseError::UnclosedBlock { pos } => {
                TextRange::new(*pos, *pos + 1)
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "unexpected-token",
            ParseError::UnexpectedEof { .. } => "unexpected-eof",
            ParseError::UnclosedBlock { .. } => "unclosed-block",
            ParseError::InvalidSyntax { .. } => "invalid-syntax",
            ParseError::LexerError { .. } => "lexer-error",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.to_string(), self.range());
        match self {
            ParseError::UnclosedBlock { .. } => diagnostic.with_suggestion("add a closing '}'"),
            _ => diagnostic,
        }
    }
}
