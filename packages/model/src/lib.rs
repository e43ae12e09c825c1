//! Diagram model shared by the converter, the operation applier and the
//! workspace façade.

pub mod element;
pub mod geometry;
pub mod marker;
pub mod metadata;
pub mod operation;
pub mod record;

pub use element::{
    DiagramElement, DiagramModelRoot, EdgeElement, LabelElement, NodeElement, PortElement,
};
pub use geometry::{format_coordinate, Bounds, Dimension, Point};
pub use marker::{Marker, ValidationReport};
pub use metadata::{ModelMetadata, PendingLayout, Viewport};
pub use operation::{BoundsChange, DiagramOperation};
pub use record::{LayoutRecord, LAYOUT_RECORD_VERSION};
