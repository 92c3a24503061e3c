use super::Document;
use crate::combine::Combination;
use crate::commands::{Command, Edit};
use crate::geom::{Affine, Rect, Region};
use crate::layer::LayerKind;
use crate::selection::Selection;
use crate::view::ViewEvent;
use crate::StateError;

impl Document {
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }
    #[must_use]
    pub fn selection_shape(&self) -> Option<&Region> {
        self.selection.as_ref().map(Selection::shape)
    }
    #[must_use]
    pub fn built_selection_shape(&self) -> Option<&Region> {
        self.built_selection.as_ref().map(Selection::shape)
    }
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }
    fn selection_changed(&self) {
        self.notify(ViewEvent::SelectionChanged);
        self.notify(ViewEvent::Repaint);
    }
    /// Set the committed shape exactly, or remove the selection with `None`.
    pub(super) fn set_selection_shape(&mut self, shape: Option<Region>) {
        if let Some(shape) = shape {
            if let Some(selection) = &mut self.selection {
                selection.set_shape(shape);
                selection.set_hidden(false);
            } else {
                self.selection = Some(Selection::new(shape));
            }
        } else if let Some(mut old) = self.selection.take() {
            old.die();
        }
        self.selection_changed();
    }

    /// Commit `shape` as the selection, clipped to the canvas. A shape entirely off the canvas
    /// selects nothing.
    ///
    /// # Errors
    /// If there's a selection already.
    pub fn create_selection_from(&mut self, shape: Region) -> Result<(), StateError> {
        if self.selection.is_some() {
            return Err(StateError::SelectionExists);
        }
        let shape = shape.intersection(&Region::rect(self.canvas.bounds()));
        if shape.is_empty() {
            log::debug!("selection is outside of the canvas, ignored");
            return Ok(());
        }
        self.set_selection_shape(Some(shape));
        Ok(())
    }
    /// Select what the active text layer's glyphs cover, replacing any selection. Returns false,
    /// changing nothing, if none of the text is on the canvas.
    ///
    /// # Errors
    /// If the active layer isn't a text layer.
    pub fn create_selection_from_text_layer(&mut self) -> Result<bool, StateError> {
        let layer = self.active_layer().ok_or(StateError::NoLayers)?;
        let LayerKind::Text(text) = layer.kind() else {
            return Err(StateError::NotTextLayer);
        };
        let shape = text
            .covered_region()
            .intersection(&Region::rect(self.canvas.bounds()));
        if shape.is_empty() {
            return Ok(false);
        }
        let command = match self.selection_shape().cloned() {
            Some(from) if from == shape => return Ok(true),
            Some(from) => Command::SelectionChanged {
                from,
                to: shape.clone(),
            },
            None => Command::SelectionCreated {
                shape: shape.clone(),
            },
        };
        self.set_selection_shape(Some(shape));
        self.record("Selection from Text", command);
        Ok(true)
    }
    /// Apply a newly drawn `shape`. With no selection yet it simply becomes the selection.
    /// Otherwise `resolve` is asked how to combine the two, and `None` from it cancels.
    ///
    /// Returns the edit to record, or `None` if nothing changed: cancelled, or the result would be
    /// an empty selection.
    pub fn change_selection(
        &mut self,
        shape: Region,
        resolve: impl FnOnce() -> Option<Combination>,
    ) -> Option<Edit> {
        let shape = shape.intersection(&Region::rect(self.canvas.bounds()));
        if shape.is_empty() {
            log::debug!("new selection is empty, ignored");
            return None;
        }
        let Some(existing) = self.selection_shape().cloned() else {
            self.set_selection_shape(Some(shape.clone()));
            return Some(Edit::new(
                "Create Selection",
                Command::SelectionCreated { shape },
            ));
        };
        let combination = resolve()?;
        let combined = combination.combine(&existing, &shape);
        if combined.is_empty() {
            log::debug!("{} would leave an empty selection", combination.as_ref());
            return None;
        }
        self.set_selection_shape(Some(combined.clone()));
        Some(Edit::new(
            "Selection Change",
            Command::SelectionChanged {
                from: existing,
                to: combined,
            },
        ))
    }
    /// Drop the selection and any selection being built.
    pub fn deselect(&mut self, add_to_history: bool) {
        if let Some(mut built) = self.built_selection.take() {
            built.die();
        }
        let Some(shape) = self.selection_shape().cloned() else {
            return;
        };
        self.set_selection_shape(None);
        if add_to_history {
            self.record("Deselect", Command::SelectionRemoved { shape });
        }
    }
    /// Select everything that isn't selected. Selecting nothing deselects instead. Does nothing
    /// without a selection.
    pub fn invert_selection(&mut self) {
        let Some(from) = self.selection_shape().cloned() else {
            return;
        };
        let inverted = from.complement(self.canvas.bounds());
        if inverted.is_empty() {
            self.deselect(true);
            return;
        }
        self.set_selection_shape(Some(inverted.clone()));
        self.record(
            "Invert Selection",
            Command::SelectionChanged { from, to: inverted },
        );
    }
    /// Keep only the part of the selection inside `rect`. Returns false if that's nothing, in
    /// which case the selection is gone.
    pub fn crop_selection(&mut self, rect: Rect) -> bool {
        let Some(shape) = self.selection_shape() else {
            return false;
        };
        let cropped = shape.intersection(&Region::rect(rect));
        let keep = !cropped.is_empty();
        self.set_selection_shape(keep.then_some(cropped));
        keep
    }
    pub fn set_selection_hidden(&mut self, hidden: bool) {
        if let Some(selection) = &mut self.selection {
            selection.set_hidden(hidden);
            self.notify(ViewEvent::Repaint);
        }
    }

    /// Replace the selection a tool is dragging out.
    pub fn set_built_selection(&mut self, shape: Option<Region>) {
        if let Some(mut old) = self.built_selection.take() {
            old.die();
        }
        self.built_selection = shape.map(Selection::new);
        self.notify(ViewEvent::Repaint);
    }
    /// Commit the built selection, clipped to the canvas. Returns false if nothing of it was on
    /// the canvas.
    ///
    /// # Errors
    /// If there's a live selection already, or none being built.
    pub fn promote_selection(&mut self) -> Result<bool, StateError> {
        if self.selection.as_ref().is_some_and(Selection::is_alive) {
            return Err(StateError::SelectionExists);
        }
        let mut built = self
            .built_selection
            .take()
            .ok_or(StateError::NoBuiltSelection)?;
        let keep = built.clip(self.canvas.bounds());
        if keep {
            self.selection = Some(built);
        } else {
            built.die();
            self.selection = None;
        }
        self.selection_changed();
        Ok(keep)
    }

    /// Follow a change of image coordinates, like a resize or crop.
    ///
    /// Undo and redo restore the selection exactly from their records, so it's only transformed
    /// for the original change. Paths aren't part of the selection records and always follow.
    pub fn image_coords_changed(&mut self, affine: &Affine, is_undo_redo: bool) {
        if !is_undo_redo {
            let bounds = self.canvas.bounds();
            if let Some(selection) = &mut self.selection {
                selection.transform(affine);
                if !selection.clip(bounds) {
                    self.set_selection_shape(None);
                }
            }
            if let Some(guides) = &mut self.guides {
                guides.transform(affine);
            }
        }
        if let Some(paths) = &mut self.paths {
            paths.transform(affine);
        }
        self.notify(ViewEvent::Repaint);
    }
    /// Advance the marching ants. Returns true if anything needs a repaint.
    pub fn tick_selection(&mut self, dt: f32) -> bool {
        let mut repaint = false;
        for selection in [&mut self.selection, &mut self.built_selection]
            .into_iter()
            .flatten()
        {
            repaint |= selection.tick(dt);
        }
        if repaint {
            self.notify(ViewEvent::Repaint);
        }
        repaint
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::red_document;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Region {
        Region::rect(Rect::new(x, y, w, h))
    }

    #[test]
    fn create_once() {
        let mut document = red_document(100, 100);
        document.create_selection_from(rect(-10.0, -10.0, 20.0, 20.0)).unwrap();
        assert_eq!(document.selection_shape(), Some(&rect(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(
            document.create_selection_from(rect(0.0, 0.0, 5.0, 5.0)),
            Err(StateError::SelectionExists)
        );
    }
    #[test]
    fn off_canvas_selects_nothing() {
        let mut document = red_document(10, 10);
        document.create_selection_from(rect(50.0, 50.0, 5.0, 5.0)).unwrap();
        assert!(!document.has_selection());
        assert!(document.selection_shape().is_none());
        assert!(document.take_edits().is_empty());
        // Nothing was committed, so a real selection can still be made.
        document.create_selection_from(rect(0.0, 0.0, 5.0, 5.0)).unwrap();
        assert_eq!(document.selection_shape(), Some(&rect(0.0, 0.0, 5.0, 5.0)));
    }
    #[test]
    fn change_creates_then_combines() {
        let mut document = red_document(100, 100);
        let edit = document
            .change_selection(rect(0.0, 0.0, 50.0, 50.0), || {
                panic!("nothing to combine with")
            })
            .unwrap();
        assert_eq!(edit.name(), "Create Selection");

        let edit = document
            .change_selection(rect(0.0, 0.0, 25.0, 50.0), || Some(Combination::Subtract))
            .unwrap();
        assert_eq!(edit.name(), "Selection Change");
        assert_eq!(document.selection_shape(), Some(&rect(25.0, 0.0, 25.0, 50.0)));
        let Command::SelectionChanged { from, .. } = edit.command() else {
            panic!("expected a change");
        };
        assert_eq!(*from, rect(0.0, 0.0, 50.0, 50.0));
    }
    #[test]
    fn cancel_and_empty_change_nothing() {
        let mut document = red_document(100, 100);
        document.create_selection_from(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let before = document.selection_shape().cloned();

        assert!(document
            .change_selection(rect(50.0, 50.0, 10.0, 10.0), || None)
            .is_none());
        assert!(document
            .change_selection(rect(50.0, 50.0, 10.0, 10.0), || Some(Combination::Intersect))
            .is_none());
        // Entirely off the canvas.
        assert!(document
            .change_selection(rect(200.0, 0.0, 10.0, 10.0), || Some(Combination::Replace))
            .is_none());
        assert_eq!(document.selection_shape().cloned(), before);
        assert!(document.take_edits().is_empty());
    }
    #[test]
    fn invert_twice() {
        let mut document = red_document(100, 100);
        let shape = rect(10.0, 20.0, 30.0, 40.0);
        document.create_selection_from(shape.clone()).unwrap();
        document.invert_selection();
        assert!(!document.selection_shape().unwrap().contains((15.0, 25.0).into()));
        document.invert_selection();
        assert_eq!(document.selection_shape(), Some(&shape));
        assert_eq!(document.take_edits().len(), 2);
    }
    #[test]
    fn invert_without_selection_does_nothing() {
        let mut document = red_document(10, 10);
        document.invert_selection();
        assert!(!document.has_selection());
        assert!(document.take_edits().is_empty());
    }
    #[test]
    fn invert_everything_deselects() {
        let mut document = red_document(10, 10);
        document.create_selection_from(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        document.invert_selection();
        assert!(!document.has_selection());
        let edits = document.take_edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].name(), "Deselect");
    }
    #[test]
    fn crop() {
        let mut document = red_document(100, 100);
        document.create_selection_from(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert!(document.crop_selection(Rect::new(5.0, 5.0, 50.0, 50.0)));
        assert_eq!(document.selection_shape(), Some(&rect(5.0, 5.0, 5.0, 5.0)));
        assert!(!document.crop_selection(Rect::new(50.0, 50.0, 10.0, 10.0)));
        assert!(!document.has_selection());
    }
    #[test]
    fn promote() {
        let mut document = red_document(100, 100);
        assert_eq!(
            document.promote_selection(),
            Err(StateError::NoBuiltSelection)
        );
        document.set_built_selection(Some(rect(90.0, 90.0, 20.0, 20.0)));
        assert_eq!(document.built_selection_shape(), Some(&rect(90.0, 90.0, 20.0, 20.0)));
        assert_eq!(document.promote_selection(), Ok(true));
        assert_eq!(document.selection_shape(), Some(&rect(90.0, 90.0, 10.0, 10.0)));
        assert!(document.built_selection_shape().is_none());

        document.set_built_selection(Some(rect(0.0, 0.0, 5.0, 5.0)));
        assert_eq!(document.promote_selection(), Err(StateError::SelectionExists));
    }
    #[test]
    fn deselect_kills_both() {
        let mut document = red_document(100, 100);
        document.create_selection_from(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        document.set_built_selection(Some(rect(0.0, 0.0, 5.0, 5.0)));
        document.deselect(true);
        assert!(!document.has_selection());
        assert!(document.built_selection_shape().is_none());
        assert!(!document.tick_selection(1.0));
        let edits = document.take_edits();
        assert!(matches!(
            edits[0].command(),
            Command::SelectionRemoved { .. }
        ));
        // Nothing left to deselect.
        document.deselect(true);
        assert!(document.take_edits().is_empty());
    }
    #[test]
    fn coords_change_skips_selection_on_undo() {
        let mut document = red_document(100, 100);
        document.create_selection_from(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let shift = crate::geom::translation(5.0, 5.0);
        document.image_coords_changed(&shift, true);
        assert_eq!(document.selection_shape(), Some(&rect(0.0, 0.0, 10.0, 10.0)));
        document.image_coords_changed(&shift, false);
        assert_eq!(document.selection_shape(), Some(&rect(5.0, 5.0, 10.0, 10.0)));
    }
    #[test]
    fn selection_from_text() {
        use crate::layer::{Layer, TextLayer};
        use image::{GrayImage, Luma, Rgba};

        let mut document = red_document(10, 10);
        assert_eq!(
            document.create_selection_from_text_layer(),
            Err(StateError::NotTextLayer)
        );
        // Hangs off the right edge of the canvas.
        let text = TextLayer {
            text: "hi".to_owned(),
            coverage: std::sync::Arc::new(GrayImage::from_pixel(4, 2, Luma([255]))),
            color: Rgba([0, 0, 0, 255]),
            offset: [8, 3],
            knockout: false,
        };
        document
            .add_layer()
            .add(Layer::new("hi", LayerKind::Text(text)))
            .unwrap();
        document.create_selection_from(rect(0.0, 0.0, 1.0, 1.0)).unwrap();

        assert_eq!(document.create_selection_from_text_layer(), Ok(true));
        assert_eq!(document.selection_shape(), Some(&rect(8.0, 3.0, 2.0, 2.0)));
        let edits = document.take_edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].name(), "Selection from Text");
        assert!(matches!(
            edits[0].command(),
            Command::SelectionChanged { .. }
        ));
    }
}
