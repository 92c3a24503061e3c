//! Replaying recorded edits.
//!
//! Each command checks that the document is in the state it was recorded against before touching
//! it, so a history that got out of step fails with [`CommandError::MismatchedState`] instead of
//! corrupting the document.

use smallvec::SmallVec;

use super::Document;
use crate::commands::{Command, CommandConsumer, CommandError, DoUndo};
use crate::composite::ChangeActions;
use crate::layer::{Layer, LayerID, MaskViewMode};
use crate::view::ViewEvent;

impl CommandConsumer<Command> for Document {
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        self.apply_command(command)?;
        self.dirty = true;
        self.image_changed(ChangeActions::FULL, false);
        self.debug_check_invariant();
        Ok(())
    }
}

impl Document {
    fn insert_layer_at(&mut self, layer: &Layer, index: usize) -> Result<(), CommandError> {
        if index > self.layers.len() || self.layer(layer.id()).is_some() {
            return Err(CommandError::MismatchedState);
        }
        self.layers.insert(index, layer.clone());
        self.notify(ViewEvent::LayerCountChanged(self.layers.len()));
        Ok(())
    }
    /// Remove `id` from `index`, handing activity to a neighbor if needed.
    fn remove_layer_at(&mut self, id: LayerID, index: usize) -> Result<Layer, CommandError> {
        if self.layers.get(index).map(Layer::id) != Some(id) || self.layers.len() < 2 {
            return Err(CommandError::MismatchedState);
        }
        let removed = self.layers.remove(index);
        if self.active == Some(id) {
            let neighbor = self.layers[index.saturating_sub(1)].id();
            self.activate(neighbor);
        }
        self.notify(ViewEvent::LayerCountChanged(self.layers.len()));
        Ok(removed)
    }
    fn restore_mask_view_mode(&mut self, mode: MaskViewMode) {
        let fits = self
            .active_layer()
            .is_some_and(|layer| mode.can_be_assigned_to(layer));
        if fits && mode != self.mask_view_mode {
            self.mask_view_mode = mode;
            self.notify(ViewEvent::MaskViewModeChanged(mode));
        }
    }
    /// Apply in order, undoing what was already applied if one fails.
    fn apply_scope<'c>(
        &mut self,
        commands: impl Iterator<Item = DoUndo<'c, Command>>,
    ) -> Result<(), CommandError> {
        let mut applied = SmallVec::<[DoUndo<'c, Command>; 4]>::new();
        for command in commands {
            if let Err(err) = self.apply_command(command) {
                for done in applied.into_iter().rev() {
                    if let Err(rollback) = self.apply_command(done.inverse()) {
                        log::error!("failed to roll back partial scope: {rollback}");
                    }
                }
                return Err(err);
            }
            applied.push(command);
        }
        Ok(())
    }

    fn apply_command(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        match command {
            DoUndo::Do(Command::LayerAdded { layer, index, .. }) => {
                self.insert_layer_at(layer, *index)?;
                self.activate(layer.id());
                Ok(())
            }
            DoUndo::Undo(Command::LayerAdded {
                layer,
                index,
                active_before,
                mask_view_before,
            }) => {
                self.remove_layer_at(layer.id(), *index)?;
                if let Some(before) = active_before.filter(|&id| self.layer(id).is_some()) {
                    self.activate(before);
                }
                self.restore_mask_view_mode(*mask_view_before);
                Ok(())
            }
            DoUndo::Do(Command::LayerDeleted { layer, index, .. }) => {
                self.remove_layer_at(layer.id(), *index).map(drop)
            }
            DoUndo::Undo(Command::LayerDeleted {
                layer,
                index,
                was_active,
            }) => {
                self.insert_layer_at(layer, *index)?;
                if *was_active {
                    self.activate(layer.id());
                }
                Ok(())
            }
            DoUndo::Do(Command::LayerOrderChanged { target, from, to })
            | DoUndo::Undo(Command::LayerOrderChanged {
                target,
                from: to,
                to: from,
            }) => {
                if from == to {
                    return Err(CommandError::NoOp);
                }
                if self.layers.get(*from).map(Layer::id) != Some(*target) || *to >= self.layers.len()
                {
                    return Err(CommandError::MismatchedState);
                }
                let layer = self.layers.remove(*from);
                self.layers.insert(*to, layer);
                self.notify(ViewEvent::LayersReordered);
                Ok(())
            }
            DoUndo::Do(Command::ActiveLayerChanged {
                from,
                to,
                mask_view: [_, mode],
            })
            | DoUndo::Undo(Command::ActiveLayerChanged {
                from: to,
                to: from,
                mask_view: [mode, _],
            }) => {
                if self.active != Some(*from) {
                    return Err(CommandError::MismatchedState);
                }
                if self.layer(*to).is_none() {
                    return Err(CommandError::UnknownResource);
                }
                self.activate(*to);
                self.restore_mask_view_mode(*mode);
                Ok(())
            }
            DoUndo::Do(Command::LayerVisibilityChanged { target, from, to })
            | DoUndo::Undo(Command::LayerVisibilityChanged {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self
                    .layer_mut(*target)
                    .ok_or(CommandError::UnknownResource)?;
                if layer.visible != *from {
                    return Err(CommandError::MismatchedState);
                }
                layer.visible = *to;
                Ok(())
            }
            DoUndo::Do(Command::LayerMoved { target, from, to })
            | DoUndo::Undo(Command::LayerMoved {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self
                    .layer_mut(*target)
                    .ok_or(CommandError::UnknownResource)?;
                if layer.offset() != Some(*from) {
                    return Err(CommandError::MismatchedState);
                }
                layer.set_offset(*to);
                Ok(())
            }
            DoUndo::Do(Command::MaskMoved { target, from, to })
            | DoUndo::Undo(Command::MaskMoved {
                target,
                from: to,
                to: from,
            }) => {
                let mask = self
                    .layer_mut(*target)
                    .ok_or(CommandError::UnknownResource)?
                    .mask
                    .as_mut()
                    .ok_or(CommandError::MismatchedState)?;
                if mask.offset != *from {
                    return Err(CommandError::MismatchedState);
                }
                mask.offset = *to;
                Ok(())
            }
            DoUndo::Do(Command::LayerReplaced {
                index,
                before,
                after,
                mask_view: [_, mode],
            })
            | DoUndo::Undo(Command::LayerReplaced {
                index,
                before: after,
                after: before,
                mask_view: [mode, _],
            }) => {
                let slot = self
                    .layers
                    .get_mut(*index)
                    .ok_or(CommandError::MismatchedState)?;
                if slot.id() != before.id() {
                    return Err(CommandError::MismatchedState);
                }
                *slot = Layer::clone(after);
                if self.active == Some(before.id()) {
                    self.activate(after.id());
                }
                self.restore_mask_view_mode(*mode);
                Ok(())
            }
            DoUndo::Do(Command::MergedDown {
                upper,
                upper_index,
                upper_was_active,
                lower,
                lower_after,
                ..
            }) => {
                let below = upper_index.checked_sub(1).ok_or(CommandError::MismatchedState)?;
                let pixels = self
                    .layers
                    .get_mut(below)
                    .filter(|layer| layer.id() == *lower)
                    .and_then(Layer::as_raster_mut)
                    .ok_or(CommandError::MismatchedState)?;
                let before = pixels.image().clone();
                pixels.set_image(lower_after.clone());
                if let Err(err) = self.remove_layer_at(upper.id(), *upper_index) {
                    if let Some(pixels) = self.layers[below].as_raster_mut() {
                        pixels.set_image(before);
                    }
                    return Err(err);
                }
                if *upper_was_active {
                    self.activate(*lower);
                }
                Ok(())
            }
            DoUndo::Undo(Command::MergedDown {
                upper,
                upper_index,
                upper_was_active,
                lower,
                lower_before,
                ..
            }) => {
                let below = upper_index.checked_sub(1).ok_or(CommandError::MismatchedState)?;
                if self.layers.get(below).map(Layer::id) != Some(*lower) {
                    return Err(CommandError::MismatchedState);
                }
                self.insert_layer_at(upper, *upper_index)?;
                if let Some(pixels) = self.layers[below].as_raster_mut() {
                    pixels.set_image(lower_before.clone());
                }
                if *upper_was_active {
                    self.activate(upper.id());
                }
                Ok(())
            }
            DoUndo::Do(Command::SelectionCreated { shape })
            | DoUndo::Undo(Command::SelectionRemoved { shape }) => {
                if self.selection.is_some() {
                    return Err(CommandError::MismatchedState);
                }
                self.set_selection_shape(Some(shape.clone()));
                Ok(())
            }
            DoUndo::Undo(Command::SelectionCreated { shape })
            | DoUndo::Do(Command::SelectionRemoved { shape }) => {
                if self.selection_shape() != Some(shape) {
                    return Err(CommandError::MismatchedState);
                }
                self.set_selection_shape(None);
                Ok(())
            }
            DoUndo::Do(Command::SelectionChanged { from, to })
            | DoUndo::Undo(Command::SelectionChanged { from: to, to: from }) => {
                if self.selection_shape() != Some(from) {
                    return Err(CommandError::MismatchedState);
                }
                self.set_selection_shape(Some(to.clone()));
                Ok(())
            }
            DoUndo::Do(Command::GuidesChanged { from, to })
            | DoUndo::Undo(Command::GuidesChanged { from: to, to: from }) => {
                if self.guides != *from {
                    return Err(CommandError::MismatchedState);
                }
                self.guides.clone_from(to);
                self.notify(ViewEvent::Repaint);
                Ok(())
            }
            DoUndo::Do(Command::DocumentReplaced { from, to, coords }) => {
                if !from.matches(self) {
                    return Err(CommandError::MismatchedState);
                }
                self.restore(to);
                if let Some(coords) = coords {
                    self.image_coords_changed(coords, true);
                }
                Ok(())
            }
            DoUndo::Undo(Command::DocumentReplaced { from, to, coords }) => {
                if !to.matches(self) {
                    return Err(CommandError::MismatchedState);
                }
                self.restore(from);
                if let Some(inverse) = coords.as_ref().and_then(cgmath::SquareMatrix::invert) {
                    self.image_coords_changed(&inverse, true);
                }
                Ok(())
            }
            DoUndo::Do(Command::Scope(commands)) => {
                self.apply_scope(commands.iter().map(DoUndo::Do))
            }
            DoUndo::Undo(Command::Scope(commands)) => {
                self.apply_scope(commands.iter().rev().map(DoUndo::Undo))
            }
        }
    }
}
