//! # Commands
//!
//! Every undoable change to a document is described by a [`Command`]. A document hands out the
//! commands for the changes it made as named [`Edit`]s, and whoever keeps the history hands them
//! back through [`CommandConsumer::apply`] to undo or redo them.
//!
//! Commands own copies of whatever state they need to restore. Pixel buffers are shared
//! copy-on-write, so a command never observes later changes to the live document.

use std::borrow::Cow;
use std::sync::Arc;

use image::RgbaImage;

use crate::document::Snapshot;
use crate::geom::{Affine, Region};
use crate::guides::Guides;
use crate::layer::{Layer, LayerID, MaskViewMode};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
}

pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
impl<'c, T> Clone for DoUndo<'c, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'c, T> Copy for DoUndo<'c, T> {}
impl<'c, T> DoUndo<'c, T> {
    /// Same command, other direction.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
}

/// Sink for commands as they're produced.
pub trait CommandWrite<C> {
    fn write(&mut self, command: C);
}
impl<C, W: CommandWrite<C>> CommandWrite<C> for &mut W {
    fn write(&mut self, command: C) {
        (**self).write(command);
    }
}
impl<C> CommandWrite<C> for Vec<C> {
    fn write(&mut self, command: C) {
        self.push(command);
    }
}
impl<A: smallvec::Array> CommandWrite<A::Item> for smallvec::SmallVec<A> {
    fn write(&mut self, command: A::Item) {
        self.push(command);
    }
}

#[derive(Clone, Debug)]
pub enum Command {
    LayerAdded {
        /// The layer as it was inserted, for redo.
        layer: Box<Layer>,
        index: usize,
        /// Active layer before the add.
        active_before: Option<LayerID>,
        mask_view_before: MaskViewMode,
    },
    LayerDeleted {
        layer: Box<Layer>,
        index: usize,
        was_active: bool,
    },
    LayerOrderChanged {
        target: LayerID,
        from: usize,
        to: usize,
    },
    ActiveLayerChanged {
        from: LayerID,
        to: LayerID,
        /// Mask view modes before and after.
        mask_view: [MaskViewMode; 2],
    },
    LayerVisibilityChanged {
        target: LayerID,
        from: bool,
        to: bool,
    },
    LayerMoved {
        target: LayerID,
        from: [i32; 2],
        to: [i32; 2],
    },
    /// Only the mask of `target` moved, the layer stayed put.
    MaskMoved {
        target: LayerID,
        from: [i32; 2],
        to: [i32; 2],
    },
    /// One layer swapped for another at the same index.
    LayerReplaced {
        index: usize,
        before: Box<Layer>,
        after: Box<Layer>,
        /// Mask view modes before and after.
        mask_view: [MaskViewMode; 2],
    },
    MergedDown {
        upper: Box<Layer>,
        upper_index: usize,
        upper_was_active: bool,
        lower: LayerID,
        lower_before: Arc<RgbaImage>,
        lower_after: Arc<RgbaImage>,
    },
    SelectionCreated {
        shape: Region,
    },
    SelectionChanged {
        from: Region,
        to: Region,
    },
    SelectionRemoved {
        shape: Region,
    },
    GuidesChanged {
        from: Option<Guides>,
        to: Option<Guides>,
    },
    /// Whole-document change, like cropping or flattening.
    DocumentReplaced {
        from: Box<Snapshot>,
        to: Box<Snapshot>,
        /// Old to new image coordinates, if they changed.
        coords: Option<Affine>,
    },
    /// Several commands that happened as one, applied in order and undone in reverse.
    Scope(Box<[Command]>),
}

/// A command with a name for the history list.
#[derive(Clone, Debug)]
pub struct Edit {
    name: Cow<'static, str>,
    command: Command,
}
impl Edit {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, command: Command) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command
    }
}
