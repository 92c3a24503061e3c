//! The one way layers get into a document.

use std::borrow::Cow;

use super::Document;
use crate::commands::Command;
use crate::composite::ChangeActions;
use crate::layer::{Layer, LayerID};
use crate::view::ViewEvent;
use crate::StateError;

/// Where a new layer goes, relative to the active layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Position {
    Top,
    #[default]
    AboveActive,
    BelowActive,
}

/// Builder for inserting a layer. Made with [`Document::add_layer`].
///
/// The added layer becomes active and the document becomes dirty. Unless told otherwise, the
/// composite is invalidated and nothing is recorded for the history.
#[must_use = "the layer is only inserted by `add`"]
pub struct LayerAdder<'d> {
    document: &'d mut Document,
    history: Option<Cow<'static, str>>,
    position: Position,
    index: Option<usize>,
    init_mode: bool,
    refresh: bool,
}

impl Document {
    pub fn add_layer(&mut self) -> LayerAdder<'_> {
        LayerAdder {
            document: self,
            history: None,
            position: Position::default(),
            index: None,
            init_mode: false,
            refresh: true,
        }
    }
}

impl<'d> LayerAdder<'d> {
    /// Record the insertion under this name.
    pub fn with_history(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.history = Some(name.into());
        self
    }
    pub fn at_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
    /// Exact index, overriding the position.
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
    /// The document is still being built. Don't dirty it or tell anyone.
    pub fn init_mode(mut self) -> Self {
        self.init_mode = true;
        self
    }
    /// Leave the composite alone. The caller refreshes once it's done with several changes.
    pub fn no_refresh(mut self) -> Self {
        self.refresh = false;
        self
    }
    fn resolve_index(&self) -> Result<usize, StateError> {
        let len = self.document.layers.len();
        if let Some(index) = self.index {
            return if index > len {
                Err(StateError::IndexOutOfBounds { index, len })
            } else {
                Ok(index)
            };
        }
        if len == 0 {
            return Ok(0);
        }
        Ok(match (self.position, self.document.active_index()) {
            (Position::Top, _) | (_, None) => len,
            (Position::AboveActive, Some(active)) => active + 1,
            (Position::BelowActive, Some(active)) => active,
        })
    }
    /// Insert `layer` and make it active.
    ///
    /// # Errors
    /// If the layer is already in the document, or an explicit index is out of bounds. Nothing is
    /// changed in that case.
    pub fn add(self, layer: Layer) -> Result<LayerID, StateError> {
        let id = layer.id();
        if self.document.layer(id).is_some() {
            return Err(StateError::DuplicateLayer(id));
        }
        let index = self.resolve_index()?;
        let Self {
            document,
            history,
            init_mode,
            refresh,
            ..
        } = self;

        let active_before = document.active;
        let mask_view_before = document.mask_view_mode;
        let recorded = history.as_ref().map(|_| Box::new(layer.clone()));

        log::debug!("adding {:?} at {index}", layer.name);
        document.layers.insert(index, layer);
        document.activate(id);

        if !init_mode {
            document.dirty = true;
            if refresh {
                document.image_changed(ChangeActions::FULL, false);
            }
            document.notify(ViewEvent::LayerCountChanged(document.layers.len()));
        }
        if let (Some(name), Some(layer)) = (history, recorded) {
            document.record(
                name,
                Command::LayerAdded {
                    layer,
                    index,
                    active_before,
                    mask_view_before,
                },
            );
        }
        document.debug_check_invariant();
        Ok(id)
    }
}
