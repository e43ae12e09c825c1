use crate::range::TextRange;
use crate::tree::NodeIndex;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A message attached to a source range, produced by parsers and validators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Stable code of the check that produced this diagnostic
    pub code: String,

    pub message: String,

    pub range: TextRange,

    /// Node the diagnostic is about, when known
    #[serde(skip)]
    pub node: Option<NodeIndex>,

    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>, range: TextRange) -> Self {
        Self::new(Severity::Error, code, message, range)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, range: TextRange) -> Self {
        Self::new(Severity::Warning, code, message, range)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>, range: TextRange) -> Self {
        Self::new(Severity::Info, code, message, range)
    }

    fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        range: TextRange,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            range,
            node: None,
            suggestion: None,
        }
    }

    pub fn with_node(mut self, node: NodeIndex) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
