//! Trivial grid layout engine
//!
//! Places the children of every container in rows of `columns` cells, growing
//! containers to fit what they hold. Positions of nested nodes are relative to
//! their container. Edges are routed as straight lines (no routing points).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tandem_features::LayoutOptions;
use tandem_identity::ElementId;
use tandem_model::{Bounds, DiagramElement, DiagramModelRoot, Dimension, Point};

const DEFAULT_SPACING: f64 = 40.0;
const DEFAULT_PADDING: f64 = 20.0;
const FALLBACK_SIZE: Dimension = Dimension {
    width: 100.0,
    height: 50.0,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub positions: BTreeMap<ElementId, Point>,
    pub sizes: BTreeMap<ElementId, Dimension>,
    pub routing_points: BTreeMap<ElementId, Vec<Point>>,
    pub bounds: Bounds,
}

pub trait LayoutEngine: Send + Sync {
    fn layout(&self, model: &DiagramModelRoot, options: &LayoutOptions) -> LayoutResult;
}

/// Grid placement with per element type fallback sizes
#[derive(Debug, Clone, Default)]
pub struct GridLayout {
    pub sizes: BTreeMap<String, Dimension>,
}

struct GridParams {
    columns: Option<usize>,
    horizontal: f64,
    vertical: f64,
    padding: f64,
}

impl GridLayout {
    pub fn new(sizes: BTreeMap<String, Dimension>) -> Self {
        Self { sizes }
    }

    fn size_of(&self, element: &DiagramElement) -> Dimension {
        element
            .as_node()
            .and_then(|node| node.size)
            .or_else(|| self.sizes.get(element.element_type()).copied())
            .unwrap_or(FALLBACK_SIZE)
    }

    /// Lay out `children` starting at `origin`; returns the extent used.
    fn place(
        &self,
        children: &[DiagramElement],
        origin: Point,
        params: &GridParams,
        result: &mut LayoutResult,
    ) -> Dimension {
        let nodes: Vec<&DiagramElement> = children.iter().filter(|c| c.as_node().is_some()).collect();
        for edge in children.iter().filter(|c| c.as_edge().is_some()) {
            result.routing_points.insert(edge.id().clone(), Vec::new());
        }
        if nodes.is_empty() {
            return Dimension::new(0.0, 0.0);
        }

        let columns = params
            .columns
            .unwrap_or_else(|| (nodes.len() as f64).sqrt().ceil() as usize)
            .max(1);

        let mut sizes = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let mut size = self.size_of(node);
            let collapsed = node.as_node().is_some_and(|n| n.collapsed);
            if !collapsed && node.children().iter().any(|c| c.as_node().is_some()) {
                let inner = self.place(
                    node.children(),
                    Point::new(params.padding, params.padding),
                    params,
                    result,
                );
                size.width = size.width.max(inner.width + 2.0 * params.padding);
                size.height = size.height.max(inner.height + 2.0 * params.padding);
            }
            sizes.push(size);
        }

        let column_widths: Vec<f64> = (0..columns)
            .map(|col| {
                sizes
                    .iter()
                    .skip(col)
                    .step_by(columns)
                    .map(|s| s.width)
                    .fold(0.0, f64::max)
            })
            .collect();

        let mut y = origin.y;
        let mut extent = Dimension::new(0.0, 0.0);
        for (row, row_sizes) in sizes.chunks(columns).enumerate() {
            let mut x = origin.x;
            let row_height = row_sizes.iter().map(|s| s.height).fold(0.0, f64::max);
            for (col, size) in row_sizes.iter().enumerate() {
                let node = nodes[row * columns + col];
                result.positions.insert(node.id().clone(), Point::new(x, y));
                result.sizes.insert(node.id().clone(), *size);
                extent.width = extent.width.max(x + size.width - origin.x);
                x += column_widths[col] + params.horizontal;
            }
            extent.height = extent.height.max(y + row_height - origin.y);
            y += row_height + params.vertical;
        }
        extent
    }
}

impl LayoutEngine for GridLayout {
    fn layout(&self, model: &DiagramModelRoot, options: &LayoutOptions) -> LayoutResult {
        let spacing = options.spacing.unwrap_or_default();
        let params = GridParams {
            columns: options.columns,
            horizontal: spacing.horizontal.unwrap_or(DEFAULT_SPACING),
            vertical: spacing.vertical.unwrap_or(DEFAULT_SPACING),
            padding: options.padding.unwrap_or(DEFAULT_PADDING),
        };

        let mut result = LayoutResult::default();
        let extent = self.place(&model.children, Point::new(0.0, 0.0), &params, &mut result);
        result.bounds = Bounds::new(Point::new(0.0, 0.0), extent);

        tracing::debug!(
            nodes = result.positions.len(),
            width = extent.width,
            height = extent.height,
            "grid layout computed"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_features::Spacing;
    use tandem_model::NodeElement;

    fn node(id: &str, children: Vec<DiagramElement>) -> DiagramElement {
        DiagramElement::Node(NodeElement {
            id: ElementId::from(id),
            element_type: "node:task".to_string(),
            position: None,
            size: Some(Dimension::new(100.0, 50.0)),
            shape: None,
            collapsed: false,
            children,
        })
    }

    fn model(children: Vec<DiagramElement>) -> DiagramModelRoot {
        let mut root = DiagramModelRoot::new("doc", "graph", 1);
        root.children = children;
        root
    }

    #[test]
    fn test_grid_rows_and_columns() {
        let options = LayoutOptions {
            columns: Some(2),
            spacing: Some(Spacing {
                horizontal: Some(10.0),
                vertical: Some(20.0),
            }),
            ..Default::default()
        };
        let result = GridLayout::default().layout(
            &model(vec![node("a", vec![]), node("b", vec![]), node("c", vec![])]),
            &options,
        );

        assert_eq!(result.positions[&ElementId::from("a")], Point::new(0.0, 0.0));
        assert_eq!(result.positions[&ElementId::from("b")], Point::new(110.0, 0.0));
        assert_eq!(result.positions[&ElementId::from("c")], Point::new(0.0, 70.0));
        assert_eq!(result.bounds.width, 210.0);
        assert_eq!(result.bounds.height, 120.0);
    }

    #[test]
    fn test_container_grows_around_children() {
        let options = LayoutOptions {
            columns: Some(3),
            padding: Some(10.0),
            ..Default::default()
        };
        let container = node("x", vec![node("a", vec![]), node("b", vec![])]);
        let result = GridLayout::default().layout(&model(vec![container]), &options);

        assert_eq!(result.positions[&ElementId::from("a")], Point::new(10.0, 10.0));
        let size = result.sizes[&ElementId::from("x")];
        assert_eq!(size.width, 100.0 + 40.0 + 100.0 + 20.0);
        assert_eq!(size.height, 70.0);
    }

    #[test]
    fn test_empty_model() {
        let result = GridLayout::default().layout(&model(vec![]), &LayoutOptions::default());
        assert!(result.positions.is_empty());
        assert_eq!(result.bounds.width, 0.0);
    }
}
