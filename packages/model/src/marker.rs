use serde::{Deserialize, Serialize};
use tandem_identity::ElementId;
use tandem_syntax::{Diagnostic, Severity, TextRange};

/// Validation result attached to a diagram element or a source range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub severity: Severity,
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<ElementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

impl Marker {
    pub fn from_diagnostic(diagnostic: &Diagnostic, element_id: Option<ElementId>) -> Self {
        Self {
            severity: diagnostic.severity,
            kind: diagnostic.code.clone(),
            description: diagnostic.message.clone(),
            element_id,
            range: Some(diagnostic.range),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub markers: Vec<Marker>,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
}

impl ValidationReport {
    pub fn new(markers: Vec<Marker>) -> Self {
        let error_count = markers
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count();
        let warning_count = markers
            .iter()
            .filter(|m| m.severity == Severity::Warning)
            .count();
        Self {
            is_valid: error_count == 0,
            markers,
            error_count,
            warning_count,
        }
    }
}
