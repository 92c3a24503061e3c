use std::sync::Arc;

use super::{Document, DocumentError, Position};
use crate::commands::Command;
use crate::composite::ChangeActions;
use crate::geom::Rect;
use crate::layer::{Layer, LayerID, LayerKind, MaskViewMode, RasterLayer};
use crate::raster::{self, Placed};
use crate::view::ViewEvent;
use crate::StateError;

impl Document {
    /// Make `id` active without recording anything. Falls back to the normal mask view if the
    /// new active layer can't show the current one.
    pub(super) fn activate(&mut self, id: LayerID) {
        self.active = Some(id);
        let keeps_mode = self
            .layer(id)
            .is_some_and(|layer| self.mask_view_mode.can_be_assigned_to(layer));
        if !keeps_mode {
            self.mask_view_mode = MaskViewMode::Normal;
            self.notify(ViewEvent::MaskViewModeChanged(MaskViewMode::Normal));
        }
        self.notify(ViewEvent::ActiveLayerChanged(id));
    }
    /// Structure changed, refresh everything that depends on it.
    fn layers_changed(&mut self) {
        self.dirty = true;
        self.image_changed(ChangeActions::FULL, false);
        self.debug_check_invariant();
    }

    /// Remove a layer. If it was active, the layer below it becomes active, or the new bottom
    /// layer if it was the bottom one.
    ///
    /// # Errors
    /// If it's the only layer or isn't in the document.
    pub fn delete_layer(&mut self, id: LayerID, add_to_history: bool) -> Result<(), StateError> {
        if self.layers.len() < 2 {
            return Err(StateError::LastLayer);
        }
        let index = self.index_of(id)?;
        let was_active = self.active == Some(id);
        let layer = self.layers.remove(index);
        log::debug!("deleted {:?} from {index}", layer.name);
        if was_active {
            let neighbor = self.layers[index.saturating_sub(1)].id();
            self.activate(neighbor);
        }
        self.notify(ViewEvent::LayerCountChanged(self.layers.len()));
        self.layers_changed();
        if add_to_history {
            self.record(
                "Delete Layer",
                Command::LayerDeleted {
                    layer: Box::new(layer),
                    index,
                    was_active,
                },
            );
        }
        Ok(())
    }
    /// # Errors
    /// See [`Document::delete_layer`].
    pub fn delete_active_layer(&mut self) -> Result<(), StateError> {
        let active = self.active.ok_or(StateError::NoLayers)?;
        self.delete_layer(active, true)
    }

    /// Move the layer at `old` to `new`. Returns false, changing nothing, if either index is out
    /// of range or they're the same.
    pub fn change_layer_order(
        &mut self,
        old: usize,
        new: usize,
        history: Option<&'static str>,
    ) -> bool {
        let len = self.layers.len();
        if old == new || old >= len || new >= len {
            return false;
        }
        let layer = self.layers.remove(old);
        let target = layer.id();
        self.layers.insert(new, layer);
        log::debug!("layer {target} moved {old} -> {new}");
        self.notify(ViewEvent::LayersReordered);
        self.layers_changed();
        if let Some(name) = history {
            self.record(
                name,
                Command::LayerOrderChanged {
                    target,
                    from: old,
                    to: new,
                },
            );
        }
        true
    }
    pub fn move_active_layer_up(&mut self) -> bool {
        let Some(index) = self.active_index() else {
            return false;
        };
        self.change_layer_order(index, index + 1, Some("Raise Layer"))
    }
    pub fn move_active_layer_down(&mut self) -> bool {
        let Some(index) = self.active_index().filter(|&i| i > 0) else {
            return false;
        };
        self.change_layer_order(index, index - 1, Some("Lower Layer"))
    }
    pub fn move_active_layer_to_top(&mut self) -> bool {
        let Some(index) = self.active_index() else {
            return false;
        };
        let top = self.layers.len() - 1;
        self.change_layer_order(index, top, Some("Layer to Top"))
    }
    pub fn move_active_layer_to_bottom(&mut self) -> bool {
        let Some(index) = self.active_index() else {
            return false;
        };
        self.change_layer_order(index, 0, Some("Layer to Bottom"))
    }
    /// A drag in the layer list dropped `id` at `new_index`. The intermediate positions during the
    /// drag aren't recorded, only the net move.
    ///
    /// # Errors
    /// If the layer isn't in the document.
    pub fn layer_reordering_finished(
        &mut self,
        id: LayerID,
        new_index: usize,
    ) -> Result<bool, StateError> {
        let old = self.index_of(id)?;
        Ok(self.change_layer_order(old, new_index, Some("Layer Order Change")))
    }

    /// Make `id` the active layer.
    ///
    /// # Errors
    /// If the layer isn't in the document.
    pub fn set_active_layer(&mut self, id: LayerID, add_to_history: bool) -> Result<(), StateError> {
        self.index_of(id)?;
        let from = self.active;
        if from == Some(id) {
            return Ok(());
        }
        let mask_view_before = self.mask_view_mode;
        self.activate(id);
        if let (true, Some(from)) = (add_to_history, from) {
            self.record(
                "Layer Selection Change",
                Command::ActiveLayerChanged {
                    from,
                    to: id,
                    mask_view: [mask_view_before, self.mask_view_mode],
                },
            );
        }
        Ok(())
    }
    /// Activate the layer above the active one. False if there is none.
    pub fn move_layer_selection_up(&mut self) -> bool {
        let above = self
            .active_index()
            .and_then(|index| self.layers.get(index + 1))
            .map(Layer::id);
        above.is_some_and(|id| self.set_active_layer(id, true).is_ok())
    }
    /// Activate the layer below the active one. False if there is none.
    pub fn move_layer_selection_down(&mut self) -> bool {
        let below = self
            .active_index()
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.layers.get(index))
            .map(Layer::id);
        below.is_some_and(|id| self.set_active_layer(id, true).is_ok())
    }

    /// # Errors
    /// If the layer isn't in the document.
    pub fn set_layer_visibility(
        &mut self,
        id: LayerID,
        visible: bool,
        add_to_history: bool,
    ) -> Result<(), StateError> {
        let index = self.index_of(id)?;
        let layer = &mut self.layers[index];
        if layer.visible == visible {
            return Ok(());
        }
        layer.visible = visible;
        self.layers_changed();
        if add_to_history {
            let name = if visible { "Show Layer" } else { "Hide Layer" };
            self.record(
                name,
                Command::LayerVisibilityChanged {
                    target: id,
                    from: !visible,
                    to: visible,
                },
            );
        }
        Ok(())
    }

    /// Whether `id` has a visible raster layer under it to merge into.
    #[must_use]
    pub fn can_merge_down(&self, id: LayerID) -> bool {
        let Ok(index) = self.index_of(id) else {
            return false;
        };
        index
            .checked_sub(1)
            .and_then(|below| self.layers.get(below))
            .is_some_and(|below| below.visible && below.as_raster().is_some())
    }
    /// Render `id` into the layer below it, then remove it.
    ///
    /// # Errors
    /// If [`Document::can_merge_down`] is false, or there isn't memory for the merged pixels. The
    /// document is unchanged in either case.
    pub fn merge_down(&mut self, id: LayerID) -> Result<(), DocumentError> {
        if !self.can_merge_down(id) {
            return Err(StateError::CannotMergeDown(id).into());
        }
        let upper_index = self.index_of(id)?;
        let (below, above) = self.layers.split_at_mut(upper_index);
        let upper = &above[0];
        let lower = &mut below[upper_index - 1];
        let lower_id = lower.id();
        let pixels = lower
            .as_raster_mut()
            .ok_or(StateError::CannotMergeDown(id))?;

        let lower_before = Arc::clone(pixels.image());
        let mut surface = raster::try_clone(&lower_before)?;
        // Hidden layers merge as nothing.
        let merged = if upper.visible {
            upper
                .apply(&mut surface, pixels.offset, false)
                .unwrap_or(surface)
        } else {
            surface
        };
        let lower_after = Arc::new(merged);
        pixels.set_image(Arc::clone(&lower_after));

        let upper_was_active = self.active == Some(id);
        let upper = self.layers.remove(upper_index);
        log::debug!("merged {:?} down into {lower_id}", upper.name);
        if upper_was_active {
            self.activate(lower_id);
        }
        self.notify(ViewEvent::LayerCountChanged(self.layers.len()));
        self.layers_changed();
        self.record(
            "Merge Down",
            Command::MergedDown {
                upper: Box::new(upper),
                upper_index,
                upper_was_active,
                lower: lower_id,
                lower_before,
                lower_after,
            },
        );
        Ok(())
    }
    /// # Errors
    /// See [`Document::merge_down`].
    pub fn merge_active_layer_down(&mut self) -> Result<(), DocumentError> {
        let active = self.active.ok_or(StateError::NoLayers)?;
        self.merge_down(active)
    }

    /// Put `after` in the place of `before`. The mask of `before`, if any, carries over, and if
    /// `before` was active `after` is now.
    ///
    /// # Errors
    /// If `before` isn't in the document or `after` already is.
    pub fn replace_layer(
        &mut self,
        before: LayerID,
        mut after: Layer,
        history: Option<&'static str>,
    ) -> Result<(), StateError> {
        let index = self.index_of(before)?;
        if after.id() != before && self.layer(after.id()).is_some() {
            return Err(StateError::DuplicateLayer(after.id()));
        }
        if after.mask.is_none() {
            after.mask.clone_from(&self.layers[index].mask);
        }
        let after_id = after.id();
        let recorded = history.map(|_| Box::new(after.clone()));
        let mask_view_before = self.mask_view_mode;
        let old = std::mem::replace(&mut self.layers[index], after);
        if self.active == Some(before) {
            self.activate(after_id);
        }
        self.layers_changed();
        if let (Some(name), Some(after)) = (history, recorded) {
            self.record(
                name,
                Command::LayerReplaced {
                    index,
                    before: Box::new(old),
                    after,
                    mask_view: [mask_view_before, self.mask_view_mode],
                },
            );
        }
        Ok(())
    }

    /// Deep copy of the active layer, added above it.
    ///
    /// # Errors
    /// If there isn't memory for the copy.
    pub fn duplicate_active_layer(&mut self) -> Result<LayerID, DocumentError> {
        let copy = self
            .active_layer()
            .ok_or(StateError::NoLayers)?
            .duplicate()?;
        Ok(self
            .add_layer()
            .with_history("Duplicate Layer")
            .add(copy)?)
    }
    /// Transparent canvas sized layer, with a generated name unless given one.
    ///
    /// # Errors
    /// If there isn't memory for the pixels.
    pub fn add_new_empty_layer(
        &mut self,
        name: Option<String>,
        below_active: bool,
    ) -> Result<LayerID, DocumentError> {
        let image = raster::try_new_image(self.canvas.width(), self.canvas.height())?;
        let name = name.unwrap_or_else(|| self.generate_new_layer_name());
        let position = if below_active {
            Position::BelowActive
        } else {
            Position::AboveActive
        };
        Ok(self
            .add_layer()
            .at_position(position)
            .with_history("New Empty Layer")
            .add(Layer::raster(name, image))?)
    }
    /// Add an image from outside, like a pasted or opened file, centered on the canvas.
    ///
    /// # Errors
    /// If the layer can't be inserted.
    pub fn add_external_image_as_new_layer(
        &mut self,
        image: Arc<image::RgbaImage>,
        name: impl Into<String>,
        position: Position,
        history: &'static str,
    ) -> Result<LayerID, StateError> {
        let center = |canvas: u32, image: u32| {
            let offset = (i64::from(canvas) - i64::from(image)) / 2;
            az::saturating_cast::<i64, i32>(offset)
        };
        let offset = [
            center(self.canvas.width(), image.width()),
            center(self.canvas.height(), image.height()),
        ];
        let layer = Layer::new(
            name,
            LayerKind::Raster(RasterLayer::with_offset(image, offset)),
        );
        self.add_layer()
            .at_position(position)
            .with_history(history)
            .add(layer)
    }
    /// New top layer holding the current composite. The pixels are shared with the cache until
    /// someone paints on them.
    ///
    /// # Errors
    /// If the layer can't be inserted.
    pub fn add_new_layer_from_composite(&mut self) -> Result<LayerID, StateError> {
        let composite = self.composite();
        let layer = Layer::new(
            "composite",
            LayerKind::Raster(RasterLayer::with_offset(composite, [0, 0])),
        );
        self.add_layer()
            .at_position(Position::Top)
            .with_history("New Layer from Composite")
            .add(layer)
    }
    /// Replace every layer with a single one holding the composite.
    pub fn flatten_image(&mut self) -> LayerID {
        let before = self.snapshot();
        let composite = self.composite();
        let layer = Layer::new(
            "flattened",
            LayerKind::Raster(RasterLayer::with_offset(composite, [0, 0])),
        );
        let id = layer.id();
        self.layers = vec![layer];
        self.activate(id);
        self.notify(ViewEvent::LayerCountChanged(1));
        self.layers_changed();
        self.record(
            "Flatten Image",
            Command::DocumentReplaced {
                from: Box::new(before),
                to: Box::new(self.snapshot()),
                coords: None,
            },
        );
        id
    }

    /// Smallest rectangle holding the canvas and the contents of every layer.
    #[must_use]
    pub fn max_image_bounds(&self) -> Rect {
        self.layers
            .iter()
            .filter_map(Layer::content_bounds)
            .fold(self.canvas.bounds(), |acc, bounds| {
                let left = acc.x.min(bounds.x);
                let top = acc.y.min(bounds.y);
                Rect::new(
                    left,
                    top,
                    acc.right().max(bounds.right()) - left,
                    acc.bottom().max(bounds.bottom()) - top,
                )
            })
    }
    /// Cut the active layer's pixels down to the canvas. Returns false if there was nothing to
    /// cut.
    ///
    /// # Errors
    /// If the active layer isn't a raster layer, or there isn't memory for the new pixels.
    pub fn active_layer_to_canvas_size(&mut self) -> Result<bool, DocumentError> {
        let id = self.active_layer().ok_or(StateError::NoLayers)?.id();
        self.layer_to_canvas_size(id)
    }
    /// [`Self::active_layer_to_canvas_size`] for every raster layer, each as its own edit.
    /// Returns how many layers were cut.
    ///
    /// # Errors
    /// If there isn't memory for the new pixels. Layers cut before that stay cut.
    pub fn all_image_layers_to_canvas_size(&mut self) -> Result<usize, DocumentError> {
        let ids: Vec<LayerID> = self
            .layers
            .iter()
            .filter(|layer| layer.as_raster().is_some())
            .map(Layer::id)
            .collect();
        let mut changed = 0;
        for id in ids {
            if self.layer_to_canvas_size(id)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
    fn layer_to_canvas_size(&mut self, id: LayerID) -> Result<bool, DocumentError> {
        let canvas = self.canvas;
        let layer = self.layer(id).ok_or(StateError::UnknownLayer(id))?;
        let pixels = layer.as_raster().ok_or(StateError::NotDrawable)?;
        if pixels.bounds() == canvas.bounds() {
            return Ok(false);
        }
        let cropped = raster::crop(
            Placed {
                image: pixels.image(),
                offset: pixels.offset,
            },
            [0, 0],
            canvas.width(),
            canvas.height(),
        )?;
        let mut after = layer.clone();
        if let Some(pixels) = after.as_raster_mut() {
            *pixels = RasterLayer::new(cropped);
        }
        self.replace_layer(id, after, Some("Layer to Canvas Size"))?;
        Ok(true)
    }
}
