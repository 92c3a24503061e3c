//! # Selection
//!
//! The region that editing operations are confined to. A document has at most one committed
//! selection, plus at most one being dragged out by a tool (the "built" selection).

use crate::geom::{Affine, Point, Rect, Region, Vector};

/// Length of one dash of the marching ants, in screen pixels.
pub const DASH_LENGTH: f32 = 4.0;

#[derive(Clone, Debug)]
pub struct Selection {
    shape: Region,
    hidden: bool,
    alive: bool,
    /// Marching ants animation offset, in `[0, 2 * DASH_LENGTH)`.
    dash_phase: f32,
    /// Shape when a move started.
    moving_from: Option<Region>,
}

impl Selection {
    #[must_use]
    pub fn new(shape: Region) -> Self {
        Self {
            shape,
            hidden: false,
            alive: true,
            dash_phase: 0.0,
            moving_from: None,
        }
    }
    #[must_use]
    pub fn shape(&self) -> &Region {
        &self.shape
    }
    pub fn set_shape(&mut self, shape: Region) {
        self.shape = shape;
    }
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.shape.bounds()
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.shape.contains(point)
    }
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }
    /// Stop the marching ants for good. A dead selection is never drawn again.
    pub fn die(&mut self) {
        self.alive = false;
    }
    #[must_use]
    pub fn dash_phase(&self) -> f32 {
        self.dash_phase
    }
    /// Advance the marching ants by `dt` dashes. Returns true if the selection needs a repaint.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.alive || self.hidden {
            return false;
        }
        self.dash_phase = (self.dash_phase + dt * DASH_LENGTH).rem_euclid(2.0 * DASH_LENGTH);
        true
    }
    /// Outline segments to draw, empty when hidden or dead.
    #[must_use]
    pub fn outline(&self) -> Vec<[Point; 2]> {
        if !self.alive || self.hidden {
            return Vec::new();
        }
        self.shape.outline()
    }

    /// Clip to `bounds`. Returns false if nothing is left.
    pub fn clip(&mut self, bounds: Rect) -> bool {
        self.shape = self.shape.intersection(&Region::rect(bounds));
        !self.shape.is_empty()
    }
    pub fn transform(&mut self, affine: &Affine) {
        self.shape = self.shape.transformed(affine);
    }

    pub fn start_movement(&mut self) {
        self.moving_from = Some(self.shape.clone());
    }
    /// Offset relative to where the move started.
    pub fn move_while_dragging(&mut self, by: Vector) {
        if let Some(from) = &self.moving_from {
            self.shape = from.translated(by);
        }
    }
    /// Finish a move, returning the shape from before it started.
    pub fn end_movement(&mut self) -> Option<Region> {
        self.moving_from.take()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ants_only_march_while_visible() {
        let mut selection = Selection::new(Region::rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
        assert!(selection.tick(0.5));
        assert!((selection.dash_phase() - 2.0).abs() < f32::EPSILON);
        // Wraps
        assert!(selection.tick(1.75));
        assert!((selection.dash_phase() - 1.0).abs() < 1e-5);

        selection.set_hidden(true);
        assert!(!selection.tick(1.0));
        assert!(selection.outline().is_empty());
        selection.set_hidden(false);
        assert_eq!(selection.outline().len(), 4);

        selection.die();
        assert!(!selection.tick(1.0));
        assert!(selection.outline().is_empty());
    }
    #[test]
    fn clip_to_canvas() {
        let mut selection = Selection::new(Region::rect(Rect::new(-5.0, -5.0, 10.0, 10.0)));
        assert!(selection.clip(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert_eq!(selection.bounds(), Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        assert!(!selection.clip(Rect::new(50.0, 50.0, 10.0, 10.0)));
    }
    #[test]
    fn movement() {
        let start = Region::rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        let mut selection = Selection::new(start.clone());
        selection.start_movement();
        selection.move_while_dragging(Vector::new(1.0, 1.0));
        selection.move_while_dragging(Vector::new(3.0, 0.0));
        assert_eq!(selection.bounds(), Some(Rect::new(3.0, 0.0, 5.0, 5.0)));
        assert_eq!(selection.end_movement(), Some(start));
        assert_eq!(selection.end_movement(), None);
    }
}
