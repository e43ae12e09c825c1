use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Name of an overridable conversion or behavior hook
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureName {
    ConvertModel,
    CreateNode,
    CreateEdge,
    GetLabel,
    GetPosition,
    GetSize,
    ApplyPosition,
    ApplySize,
    CreateAstNode,
    CreateAstEdge,
    ToolPalette,
    Validation,
    Layout,
    ContextMenu,
    /// Hook contributed by a language extension
    Extension(String),
}

impl FeatureName {
    pub const BUILT_IN: [FeatureName; 14] = [
        FeatureName::ConvertModel,
        FeatureName::CreateNode,
        FeatureName::CreateEdge,
        FeatureName::GetLabel,
        FeatureName::GetPosition,
        FeatureName::GetSize,
        FeatureName::ApplyPosition,
        FeatureName::ApplySize,
        FeatureName::CreateAstNode,
        FeatureName::CreateAstEdge,
        FeatureName::ToolPalette,
        FeatureName::Validation,
        FeatureName::Layout,
        FeatureName::ContextMenu,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            FeatureName::ConvertModel => "convertModel",
            FeatureName::CreateNode => "createNode",
            FeatureName::CreateEdge => "createEdge",
            FeatureName::GetLabel => "getLabel",
            FeatureName::GetPosition => "getPosition",
            FeatureName::GetSize => "getSize",
            FeatureName::ApplyPosition => "applyPosition",
            FeatureName::ApplySize => "applySize",
            FeatureName::CreateAstNode => "createAstNode",
            FeatureName::CreateAstEdge => "createAstEdge",
            FeatureName::ToolPalette => "toolPalette",
            FeatureName::Validation => "validation",
            FeatureName::Layout => "layout",
            FeatureName::ContextMenu => "contextMenu",
            FeatureName::Extension(name) => name,
        }
    }

    pub fn is_built_in(&self) -> bool {
        !matches!(self, FeatureName::Extension(_))
    }

    /// Parse a feature name, accepting namespaced aliases such as
    /// `diagram.toolPalette` or `tandem:layout`.
    pub fn parse(text: &str) -> FeatureName {
        let text = text.trim();
        let bare = text
            .rsplit(|c: char| c == '.' || c == ':' || c == '/')
            .next()
            .unwrap_or(text);
        FeatureName::BUILT_IN
            .iter()
            .find(|known| known.as_str() == bare)
            .cloned()
            .unwrap_or_else(|| FeatureName::Extension(bare.to_string()))
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FeatureName::parse(s))
    }
}

impl From<&str> for FeatureName {
    fn from(s: &str) -> Self {
        FeatureName::parse(s)
    }
}

impl Serialize for FeatureName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FeatureName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(FeatureName::parse(&text))
    }
}
