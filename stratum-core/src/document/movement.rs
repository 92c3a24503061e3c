//! Dragging the active layer and the selection around with the move tool.

use smallvec::SmallVec;

use super::{Document, DocumentError};
use crate::commands::{Command, CommandWrite};
use crate::composite::ChangeActions;
use crate::geom::{offset_by, Vector};
use crate::layer::LayerID;
use crate::view::ViewEvent;
use crate::StateError;

#[derive(strum::AsRefStr, Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum MoveMode {
    #[default]
    Layer,
    Selection,
    Both,
}
impl MoveMode {
    fn moves_layer(self) -> bool {
        matches!(self, Self::Layer | Self::Both)
    }
    fn moves_selection(self) -> bool {
        matches!(self, Self::Selection | Self::Both)
    }
    fn edit_name(self) -> &'static str {
        match self {
            Self::Layer => "Move Layer",
            Self::Selection => "Move Selection",
            Self::Both => "Move",
        }
    }
}

/// The part of the active layer the move tool drags.
#[derive(Copy, Clone, Debug)]
enum Content {
    Layer(LayerID),
    /// Only the mask, while the mask is being edited.
    Mask(LayerID),
}
impl Content {
    fn offset(self, document: &Document) -> Option<[i32; 2]> {
        match self {
            Self::Layer(id) => document.layer(id)?.offset(),
            Self::Mask(id) => Some(document.layer(id)?.mask.as_ref()?.offset),
        }
    }
    fn set_offset(self, document: &mut Document, to: [i32; 2]) {
        match self {
            Self::Layer(id) => {
                if let Some(layer) = document.layer_mut(id) {
                    layer.set_offset(to);
                }
            }
            Self::Mask(id) => {
                if let Some(mask) = document.layer_mut(id).and_then(|layer| layer.mask.as_mut()) {
                    mask.offset = to;
                }
            }
        }
    }
    fn moved(self, from: [i32; 2], to: [i32; 2]) -> Command {
        match self {
            Self::Layer(target) => Command::LayerMoved { target, from, to },
            Self::Mask(target) => Command::MaskMoved { target, from, to },
        }
    }
}

pub(super) struct Movement {
    mode: MoveMode,
    /// Content being moved and its offset when the move started.
    content: Option<(Content, [i32; 2])>,
}

impl Document {
    /// What moving the active layer moves right now: its mask while editing masks, otherwise the
    /// layer itself. `None` if that has no position.
    fn movable_content(&self) -> Option<(Content, [i32; 2])> {
        let layer = self.active_layer()?;
        let content = if self.mask_view_mode.edits_mask() {
            Content::Mask(layer.id())
        } else {
            Content::Layer(layer.id())
        };
        Some((content, content.offset(self)?))
    }
    /// Start dragging content around. With `duplicate_layer`, the active layer is first duplicated
    /// (as its own edit) and the copy is what gets moved.
    ///
    /// # Errors
    /// If a move is already in progress, or there isn't memory for the duplicate.
    pub fn start_movement(
        &mut self,
        mode: MoveMode,
        duplicate_layer: bool,
    ) -> Result<(), DocumentError> {
        if self.movement.is_some() {
            return Err(StateError::AlreadyMoving.into());
        }
        let content = if mode.moves_layer() {
            if duplicate_layer {
                self.duplicate_active_layer()?;
            }
            self.movable_content()
        } else {
            None
        };
        if mode.moves_selection() {
            if let Some(selection) = &mut self.selection {
                selection.start_movement();
            }
        }
        log::debug!("{} started, moving {content:?}", mode.as_ref());
        self.movement = Some(Movement { mode, content });
        Ok(())
    }
    /// Drag by `(dx, dy)` document pixels from where the move started. Content moves in whole
    /// pixels. Returns false if no move is in progress.
    pub fn move_active_content_relative(&mut self, dx: f64, dy: f64) -> bool {
        let Some(movement) = &self.movement else {
            return false;
        };
        let (mode, content) = (movement.mode, movement.content);
        let delta: [i32; 2] = [
            az::saturating_cast(dx.round()),
            az::saturating_cast(dy.round()),
        ];
        if let Some((content, start)) = content {
            content.set_offset(self, offset_by(start, delta));
            self.image_changed(ChangeActions::REPAINT, false);
        }
        if mode.moves_selection() {
            if let Some(selection) = &mut self.selection {
                selection.move_while_dragging(Vector::new(f64::from(delta[0]), f64::from(delta[1])));
                self.notify(ViewEvent::Repaint);
            }
        }
        true
    }
    /// Finish the move, recording whatever actually moved as one edit. Returns false if nothing
    /// did.
    pub fn end_movement(&mut self) -> bool {
        let Some(Movement { mode, content }) = self.movement.take() else {
            return false;
        };
        let mut commands = SmallVec::<[Command; 2]>::new();
        if let Some((content, from)) = content {
            if let Some(to) = content.offset(self).filter(|&to| to != from) {
                commands.write(content.moved(from, to));
                self.dirty = true;
                self.image_changed(ChangeActions::FULL, false);
            }
        }
        let bounds = self.canvas.bounds();
        if let Some(selection) = &mut self.selection {
            if let Some(from) = selection.end_movement() {
                if !selection.clip(bounds) {
                    self.set_selection_shape(None);
                    commands.write(Command::SelectionRemoved { shape: from });
                } else if *selection.shape() != from {
                    let to = selection.shape().clone();
                    commands.write(Command::SelectionChanged { from, to });
                }
            }
        }
        let command = match commands.len() {
            0 => return false,
            1 => commands.remove(0),
            _ => Command::Scope(commands.into_vec().into_boxed_slice()),
        };
        self.record(mode.edit_name(), command);
        true
    }
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.movement.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::red_document;
    use crate::geom::{Rect, Region};
    use crate::layer::{LayerMask, MaskViewMode};

    #[test]
    fn moves_both_as_one_edit() {
        let mut document = red_document(100, 100);
        document
            .create_selection_from(Region::rect(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        document.start_movement(MoveMode::Both, false).unwrap();
        assert_eq!(
            document.start_movement(MoveMode::Layer, false),
            Err(DocumentError::State(StateError::AlreadyMoving))
        );
        document.move_active_content_relative(3.0, 3.0);
        document.move_active_content_relative(4.6, -1.2);
        assert_eq!(document.active_layer().unwrap().offset(), Some([5, -1]));
        assert!(document.end_movement());

        // Moved up out of the canvas a bit, so clipped.
        assert_eq!(
            document.selection_shape(),
            Some(&Region::rect(Rect::new(5.0, 0.0, 10.0, 9.0)))
        );
        let edits = document.take_edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].name(), "Move");
        let Command::Scope(parts) = edits[0].command() else {
            panic!("expected a scope");
        };
        assert_eq!(parts.len(), 2);
        assert!(!document.is_moving());
    }
    #[test]
    fn no_op_move_records_nothing() {
        let mut document = red_document(10, 10);
        document.start_movement(MoveMode::Layer, false).unwrap();
        document.move_active_content_relative(0.2, 0.0);
        assert!(!document.end_movement());
        assert!(document.take_edits().is_empty());
        assert!(!document.end_movement());
    }
    #[test]
    fn selection_only() {
        let mut document = red_document(100, 100);
        document
            .create_selection_from(Region::rect(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        document.start_movement(MoveMode::Selection, false).unwrap();
        document.move_active_content_relative(10.0, 10.0);
        assert!(document.end_movement());
        assert_eq!(document.active_layer().unwrap().offset(), Some([0, 0]));
        let edits = document.take_edits();
        assert!(matches!(
            edits[0].command(),
            Command::SelectionChanged { .. }
        ));
    }
    #[test]
    fn editing_mask_moves_only_the_mask() {
        let mut document = red_document(10, 10);
        document.active_layer_mut().unwrap().mask = Some(LayerMask::reveal_all(10, 10).unwrap());
        document.set_mask_view_mode(MaskViewMode::EditMask).unwrap();
        document.start_movement(MoveMode::Layer, false).unwrap();
        document.move_active_content_relative(2.0, 0.0);
        assert!(document.end_movement());

        let layer = document.active_layer().unwrap();
        assert_eq!(layer.offset(), Some([0, 0]));
        assert_eq!(layer.mask.as_ref().unwrap().offset, [2, 0]);
        let edits = document.take_edits();
        assert!(matches!(
            edits[0].command(),
            Command::MaskMoved {
                from: [0, 0],
                to: [2, 0],
                ..
            }
        ));
    }
    #[test]
    fn duplicate_then_move() {
        let mut document = red_document(10, 10);
        let original = document.active_layer_id().unwrap();
        document.start_movement(MoveMode::Layer, true).unwrap();
        let copy = document.active_layer_id().unwrap();
        assert_ne!(copy, original);
        assert_eq!(document.num_layers(), 2);
        document.move_active_content_relative(3.0, 4.0);
        assert!(document.end_movement());

        assert_eq!(document.layer(original).unwrap().offset(), Some([0, 0]));
        assert_eq!(document.layer(copy).unwrap().offset(), Some([3, 4]));
        let names: Vec<_> = document
            .take_edits()
            .iter()
            .map(|edit| edit.name().to_owned())
            .collect();
        assert_eq!(names, ["Duplicate Layer", "Move Layer"]);
    }
    #[test]
    fn huge_drags_saturate() {
        let mut document = red_document(10, 10);
        document.active_layer_mut().unwrap().set_offset([-5, 5]);
        document.start_movement(MoveMode::Layer, false).unwrap();
        document.move_active_content_relative(-1e300, 1e300);
        assert_eq!(
            document.active_layer().unwrap().offset(),
            Some([i32::MIN, i32::MAX])
        );
        assert!(document.end_movement());
    }
}
