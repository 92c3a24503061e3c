#![warn(clippy::pedantic)]
// Pixel math is full of these, and they're all checked by hand or by `az`.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]

pub mod blend;
pub mod canvas;
pub mod combine;
pub mod commands;
pub mod composite;
pub mod document;
pub mod geom;
pub mod guides;
pub mod id;
pub mod io;
pub mod layer;
pub mod paths;
pub mod raster;
pub mod selection;
pub mod view;

pub use canvas::Canvas;
pub use combine::Combination;
pub use document::Document;
pub use geom::{Affine, Rect, Region, Shape};
pub use layer::{Layer, LayerID};
pub use selection::Selection;
pub use view::{View, ViewEvent, ZoomLevel};

/// Violations of the document's structural invariants.
///
/// These are programming errors on the caller's side (deleting the last layer,
/// promoting a selection that doesn't exist...) and leave the document untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("document has no layers")]
    NoLayers,
    #[error("can't delete the only layer")]
    LastLayer,
    #[error("active layer is not part of the layer stack")]
    ActiveNotInStack,
    #[error("duplicate layer id {0}")]
    DuplicateLayer(LayerID),
    #[error("layer {0} not found")]
    UnknownLayer(LayerID),
    #[error("index {index} out of bounds for {len} layers")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("active layer can't be drawn on")]
    NotDrawable,
    #[error("active layer is not a text layer")]
    NotTextLayer,
    #[error("layer has no mask")]
    NoMask,
    #[error("can't merge down layer {0}")]
    CannotMergeDown(LayerID),
    #[error("a selection already exists")]
    SelectionExists,
    #[error("no selection is being built")]
    NoBuiltSelection,
    #[error("canvas must be at least 1x1, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("already moving content")]
    AlreadyMoving,
}
