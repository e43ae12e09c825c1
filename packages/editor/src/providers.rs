//! Conversion and behavior hooks
//!
//! Every overridable hook is a small trait. A language wires its hooks into a
//! [`Providers`] set, merges it over [`default_providers`] with
//! [`tandem_features::merge`], and hands the effective set to the converter
//! and the applier. A hook missing from the effective set (disabled) is never
//! replaced by a default at call time.

use crate::config::{DiagramTypeConfig, EdgeTypeConfig, NodeTypeConfig};
use crate::context::ConversionScope;
use crate::layout::{GridLayout, LayoutEngine};
use std::fmt;
use std::sync::Arc;
use tandem_features::{
    ContextMenu, FeatureName, FeatureProviderSet, LayoutOptions, Mergeable, MenuItem,
    PaletteGroup, PaletteItem, Spacing, ToolPalette,
};
use tandem_identity::ElementId;
use tandem_linter::{lint_tree, LintOptions};
use tandem_model::{
    format_coordinate, DiagramElement, Dimension, EdgeElement, NodeElement, Point,
};
use tandem_syntax::{Diagnostic, NodeRef, SyntaxTree, TextEdit};

pub const POSITION_ANNOTATION: &str = "at";
pub const SIZE_ANNOTATION: &str = "size";

pub struct NodeRequest<'a> {
    pub node: NodeRef<'a>,
    pub id: &'a ElementId,
    pub node_type: &'a NodeTypeConfig,
    pub position: Option<Point>,
    pub size: Option<Dimension>,
    pub collapsed: bool,
}

pub struct EdgeRequest<'a> {
    pub node: NodeRef<'a>,
    pub id: &'a ElementId,
    pub edge_type: &'a EdgeTypeConfig,
    pub source_id: &'a ElementId,
    pub target_id: &'a ElementId,
    pub routing_points: Vec<Point>,
}

pub struct AstNodeRequest<'a> {
    pub node_type: &'a NodeTypeConfig,
    /// Name as it should be written, already quoted when needed
    pub name: &'a str,
    /// Position annotation text (with its leading space), when positions
    /// live in the source
    pub position: Option<&'a str>,
}

pub struct AstEdgeRequest<'a> {
    pub edge_type: &'a EdgeTypeConfig,
    pub source: &'a str,
    pub target: &'a str,
}

/// Replaces the whole tree traversal. `None` means the conversion was
/// cancelled.
pub trait ConvertModel: Send + Sync {
    fn convert_model(&self, scope: &ConversionScope<'_>) -> Option<Vec<DiagramElement>>;
}

pub trait CreateNode: Send + Sync {
    /// `None` hides the node and its subtree from the diagram.
    fn create_node(&self, request: &NodeRequest<'_>) -> Option<NodeElement>;
}

pub trait CreateEdge: Send + Sync {
    fn create_edge(&self, request: &EdgeRequest<'_>) -> Option<EdgeElement>;
}

pub trait GetLabel: Send + Sync {
    fn get_label(&self, node: NodeRef<'_>) -> Option<String>;
}

pub trait GetPosition: Send + Sync {
    fn get_position(&self, node: NodeRef<'_>) -> Option<Point>;
}

pub trait GetSize: Send + Sync {
    fn get_size(&self, node: NodeRef<'_>) -> Option<Dimension>;
}

pub trait ApplyPosition: Send + Sync {
    fn apply_position(&self, node: NodeRef<'_>, position: Point, source: &str) -> Vec<TextEdit>;

    /// Text appended to a freshly created statement to carry its position.
    fn position_fragment(&self, _position: Point) -> Option<String> {
        None
    }
}

pub trait ApplySize: Send + Sync {
    fn apply_size(&self, node: NodeRef<'_>, size: Dimension, source: &str) -> Vec<TextEdit>;
}

pub trait CreateAstNode: Send + Sync {
    /// Source text of a new node statement, without trailing newline.
    fn create_ast_node(&self, request: &AstNodeRequest<'_>) -> Option<String>;
}

pub trait CreateAstEdge: Send + Sync {
    fn create_ast_edge(&self, request: &AstEdgeRequest<'_>) -> Option<String>;
}

pub trait Validate: Send + Sync {
    fn validate(&self, tree: &SyntaxTree, config: &DiagramTypeConfig) -> Vec<Diagnostic>;
}

/// One provider value stored in a feature slot
#[derive(Clone)]
pub enum Provider {
    ConvertModel(Arc<dyn ConvertModel>),
    CreateNode(Arc<dyn CreateNode>),
    CreateEdge(Arc<dyn CreateEdge>),
    GetLabel(Arc<dyn GetLabel>),
    GetPosition(Arc<dyn GetPosition>),
    GetSize(Arc<dyn GetSize>),
    ApplyPosition(Arc<dyn ApplyPosition>),
    ApplySize(Arc<dyn ApplySize>),
    CreateAstNode(Arc<dyn CreateAstNode>),
    CreateAstEdge(Arc<dyn CreateAstEdge>),
    ToolPalette(ToolPalette),
    ContextMenu(ContextMenu),
    Layout {
        engine: Arc<dyn LayoutEngine>,
        options: LayoutOptions,
    },
    Validation(Arc<dyn Validate>),
    /// Opaque value for hooks contributed by a language extension
    Extension(serde_json::Value),
}

impl Provider {
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::ConvertModel(_) => "convertModel",
            Provider::CreateNode(_) => "createNode",
            Provider::CreateEdge(_) => "createEdge",
            Provider::GetLabel(_) => "getLabel",
            Provider::GetPosition(_) => "getPosition",
            Provider::GetSize(_) => "getSize",
            Provider::ApplyPosition(_) => "applyPosition",
            Provider::ApplySize(_) => "applySize",
            Provider::CreateAstNode(_) => "createAstNode",
            Provider::CreateAstEdge(_) => "createAstEdge",
            Provider::ToolPalette(_) => "toolPalette",
            Provider::ContextMenu(_) => "contextMenu",
            Provider::Layout { .. } => "layout",
            Provider::Validation(_) => "validation",
            Provider::Extension(_) => "extension",
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::ToolPalette(palette) => f.debug_tuple("ToolPalette").field(palette).finish(),
            Provider::ContextMenu(menu) => f.debug_tuple("ContextMenu").field(menu).finish(),
            Provider::Layout { options, .. } => {
                f.debug_struct("Layout").field("options", options).finish_non_exhaustive()
            }
            Provider::Extension(value) => f.debug_tuple("Extension").field(value).finish(),
            other => write!(f, "Provider({})", other.kind()),
        }
    }
}

impl Mergeable for Provider {
    fn deep_merge(&self, custom: &Self) -> Option<Self> {
        match (self, custom) {
            (Provider::ToolPalette(default), Provider::ToolPalette(custom)) => {
                Some(Provider::ToolPalette(default.merged_with(custom)))
            }
            (Provider::ContextMenu(default), Provider::ContextMenu(custom)) => {
                Some(Provider::ContextMenu(default.merged_with(custom)))
            }
            (
                Provider::Layout { options, .. },
                Provider::Layout {
                    engine,
                    options: custom_options,
                },
            ) => Some(Provider::Layout {
                engine: engine.clone(),
                options: options.merged_with(custom_options),
            }),
            _ => None,
        }
    }
}

pub type Providers = FeatureProviderSet<Provider>;

macro_rules! hook {
    ($fn_name:ident, $variant:ident, $trait_name:ident) => {
        pub fn $fn_name(providers: &Providers) -> Option<&dyn $trait_name> {
            match providers.get(&FeatureName::$variant) {
                Some(Provider::$variant(hook)) => Some(hook.as_ref()),
                _ => None,
            }
        }
    };
}

hook!(convert_model, ConvertModel, ConvertModel);
hook!(create_node, CreateNode, CreateNode);
hook!(create_edge, CreateEdge, CreateEdge);
hook!(get_label, GetLabel, GetLabel);
hook!(get_position, GetPosition, GetPosition);
hook!(get_size, GetSize, GetSize);
hook!(apply_position, ApplyPosition, ApplyPosition);
hook!(apply_size, ApplySize, ApplySize);
hook!(create_ast_node, CreateAstNode, CreateAstNode);
hook!(create_ast_edge, CreateAstEdge, CreateAstEdge);
hook!(validation, Validation, Validate);

pub fn tool_palette(providers: &Providers) -> Option<&ToolPalette> {
    match providers.get(&FeatureName::ToolPalette) {
        Some(Provider::ToolPalette(palette)) => Some(palette),
        _ => None,
    }
}

pub fn context_menu(providers: &Providers) -> Option<&ContextMenu> {
    match providers.get(&FeatureName::ContextMenu) {
        Some(Provider::ContextMenu(menu)) => Some(menu),
        _ => None,
    }
}

pub fn layout(providers: &Providers) -> Option<(&dyn LayoutEngine, &LayoutOptions)> {
    match providers.get(&FeatureName::Layout) {
        Some(Provider::Layout { engine, options }) => Some((engine.as_ref(), options)),
        _ => None,
    }
}

/// Fully populated provider set for `config`.
///
/// `applyPosition` and `applySize` are only present when the diagram type
/// keeps layout in the source text.
pub fn default_providers(config: &DiagramTypeConfig) -> Providers {
    let sizes = config
        .node_types
        .iter()
        .filter_map(|t| t.default_size.map(|size| (t.element_type.clone(), size)))
        .collect();

    let mut providers = Providers::new()
        .with(FeatureName::ConvertModel, Provider::ConvertModel(Arc::new(crate::converter::StandardTraversal)))
        .with(FeatureName::CreateNode, Provider::CreateNode(Arc::new(DefaultNodeFactory)))
        .with(FeatureName::CreateEdge, Provider::CreateEdge(Arc::new(DefaultEdgeFactory)))
        .with(FeatureName::GetLabel, Provider::GetLabel(Arc::new(NameLabel)))
        .with(FeatureName::GetPosition, Provider::GetPosition(Arc::new(AtAnnotation)))
        .with(FeatureName::GetSize, Provider::GetSize(Arc::new(SizeAnnotation)))
        .with(FeatureName::CreateAstNode, Provider::CreateAstNode(Arc::new(TemplateNodeWriter)))
        .with(FeatureName::CreateAstEdge, Provider::CreateAstEdge(Arc::new(EdgeStatementWriter)))
        .with(FeatureName::ToolPalette, Provider::ToolPalette(default_palette(config)))
        .with(FeatureName::ContextMenu, Provider::ContextMenu(default_context_menu()))
        .with(
            FeatureName::Layout,
            Provider::Layout {
                engine: Arc::new(GridLayout::new(sizes)),
                options: LayoutOptions {
                    algorithm: Some("grid".to_string()),
                    columns: None,
                    spacing: Some(Spacing {
                        horizontal: Some(40.0),
                        vertical: Some(40.0),
                    }),
                    padding: Some(20.0),
                },
            },
        )
        .with(FeatureName::Validation, Provider::Validation(Arc::new(LinterValidation)));

    if config.layout_in_text {
        providers.insert(FeatureName::ApplyPosition, Provider::ApplyPosition(Arc::new(AtAnnotation)));
        providers.insert(FeatureName::ApplySize, Provider::ApplySize(Arc::new(SizeAnnotation)));
    }
    providers
}

pub fn default_palette(config: &DiagramTypeConfig) -> ToolPalette {
    let nodes = PaletteGroup {
        id: "nodes".to_string(),
        label: "Nodes".to_string(),
        items: config
            .node_types
            .iter()
            .map(|t| PaletteItem {
                id: format!("create-{}", t.element_type),
                label: t.display_label().to_string(),
                element_type: t.element_type.clone(),
                icon: t.shape.clone(),
            })
            .collect(),
    };
    let edges = PaletteGroup {
        id: "edges".to_string(),
        label: "Edges".to_string(),
        items: config
            .edge_types
            .iter()
            .map(|t| PaletteItem {
                id: format!("create-{}", t.element_type),
                label: t.display_label().to_string(),
                element_type: t.element_type.clone(),
                icon: None,
            })
            .collect(),
    };
    ToolPalette {
        title: Some(config.id.clone()),
        groups: Some(vec![nodes, edges]),
        show_search: Some(false),
    }
}

pub fn default_context_menu() -> ContextMenu {
    let item = |id: &str, label: &str, action: &str, group: &str| MenuItem {
        id: id.to_string(),
        label: label.to_string(),
        action: action.to_string(),
        group: Some(group.to_string()),
        enabled: true,
    };
    ContextMenu {
        items: Some(vec![
            item("edit-label", "Rename", "editLabel", "edit"),
            item("delete", "Delete", "deleteElement", "edit"),
            item("collapse", "Collapse", "setCollapsed", "view"),
            item("expand", "Expand", "setCollapsed", "view"),
        ]),
        show_delete: Some(true),
        show_collapse: Some(true),
    }
}

pub struct DefaultNodeFactory;

impl CreateNode for DefaultNodeFactory {
    fn create_node(&self, request: &NodeRequest<'_>) -> Option<NodeElement> {
        Some(NodeElement {
            id: request.id.clone(),
            element_type: request.node_type.element_type.clone(),
            position: request.position,
            size: request.size,
            shape: request.node_type.shape.clone(),
            collapsed: request.collapsed,
            children: Vec::new(),
        })
    }
}

pub struct DefaultEdgeFactory;

impl CreateEdge for DefaultEdgeFactory {
    fn create_edge(&self, request: &EdgeRequest<'_>) -> Option<EdgeElement> {
        Some(EdgeElement {
            id: request.id.clone(),
            element_type: request.edge_type.element_type.clone(),
            source_id: request.source_id.clone(),
            target_id: request.target_id.clone(),
            routing_points: request.routing_points.clone(),
            children: Vec::new(),
        })
    }
}

/// Name when present, else the type tag. Edges use their `label` property.
pub struct NameLabel;

impl GetLabel for NameLabel {
    fn get_label(&self, node: NodeRef<'_>) -> Option<String> {
        node.name()
            .or_else(|| node.property("label").map(|p| &p.value))
            .map(|atom| atom.value.clone())
            .or_else(|| Some(node.type_tag().to_string()))
    }
}

/// `@at(x, y)`
pub struct AtAnnotation;

impl GetPosition for AtAnnotation {
    fn get_position(&self, node: NodeRef<'_>) -> Option<Point> {
        match node.annotation(POSITION_ANNOTATION)?.number_args()[..] {
            [x, y] => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

impl ApplyPosition for AtAnnotation {
    fn apply_position(&self, node: NodeRef<'_>, position: Point, source: &str) -> Vec<TextEdit> {
        vec![annotation_edit(
            node,
            POSITION_ANNOTATION,
            &[position.x, position.y],
            source,
        )]
    }

    fn position_fragment(&self, position: Point) -> Option<String> {
        Some(format!(" {}", annotation_text(POSITION_ANNOTATION, &[position.x, position.y])))
    }
}

/// `@size(width, height)`
pub struct SizeAnnotation;

impl GetSize for SizeAnnotation {
    fn get_size(&self, node: NodeRef<'_>) -> Option<Dimension> {
        match node.annotation(SIZE_ANNOTATION)?.number_args()[..] {
            [width, height] => Some(Dimension::new(width, height)),
            _ => None,
        }
    }
}

impl ApplySize for SizeAnnotation {
    fn apply_size(&self, node: NodeRef<'_>, size: Dimension, source: &str) -> Vec<TextEdit> {
        vec![annotation_edit(
            node,
            SIZE_ANNOTATION,
            &[size.width, size.height],
            source,
        )]
    }
}

fn annotation_text(name: &str, args: &[f64]) -> String {
    let args: Vec<String> = args.iter().map(|v| format_coordinate(*v)).collect();
    format!("@{}({})", name, args.join(", "))
}

/// Replace `@name(...)` on `node`, or insert it at the end of the header.
pub fn annotation_edit(node: NodeRef<'_>, name: &str, args: &[f64], source: &str) -> TextEdit {
    let text = annotation_text(name, args);
    if let Some(existing) = node.annotation(name) {
        return TextEdit::replace(existing.range, text);
    }
    TextEdit::insert(header_end(node, source), format!(" {}", text))
}

/// Offset just past the last header token of `node` (before any body).
pub fn header_end(node: NodeRef<'_>, source: &str) -> usize {
    let range = node.range();
    let end = node
        .body()
        .map(|body| body.range.start)
        .unwrap_or(range.end)
        .min(source.len());
    let trimmed = source
        .get(range.start..end)
        .map(|header| range.start + header.trim_end().len())
        .unwrap_or(end);
    trimmed.max(node.data().keyword_range.end)
}

/// Fills the node type's statement template.
pub struct TemplateNodeWriter;

impl CreateAstNode for TemplateNodeWriter {
    fn create_ast_node(&self, request: &AstNodeRequest<'_>) -> Option<String> {
        let text = request
            .node_type
            .template
            .replace("{keyword}", &request.node_type.keyword())
            .replace("{name}", request.name)
            .replace("{position}", request.position.unwrap_or(""));
        Some(text)
    }
}

/// `flow A -> B`, or a property block when the edge type names its
/// endpoints differently.
pub struct EdgeStatementWriter;

impl CreateAstEdge for EdgeStatementWriter {
    fn create_ast_edge(&self, request: &AstEdgeRequest<'_>) -> Option<String> {
        let edge = request.edge_type;
        if edge.source_property == "source" && edge.target_property == "target" {
            Some(format!("{} {} -> {}", edge.keyword(), request.source, request.target))
        } else {
            Some(format!(
                "{} {{ {}: {}; {}: {} }}",
                edge.keyword(),
                edge.source_property,
                request.source,
                edge.target_property,
                request.target
            ))
        }
    }
}

/// Runs the linter with the diagram type's reference and type knowledge.
pub struct LinterValidation;

impl Validate for LinterValidation {
    fn validate(&self, tree: &SyntaxTree, config: &DiagramTypeConfig) -> Vec<Diagnostic> {
        lint_tree(
            tree,
            LintOptions {
                registry: None,
                references: config.reference_specs(),
                known_types: Some(config.known_types()),
            },
        )
    }
}
