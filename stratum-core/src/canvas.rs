use crate::geom::{Point, Rect};

/// Dimensions of a document, in document pixels, plus the size it takes up on screen at the
/// current zoom.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    /// Size once zoomed, kept in sync by the view.
    co_width: u32,
    co_height: u32,
}

impl Canvas {
    /// # Errors
    /// If either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, crate::StateError> {
        if width == 0 || height == 0 {
            return Err(crate::StateError::EmptyCanvas { width, height });
        }
        Ok(Self {
            width,
            height,
            co_width: width,
            co_height: height,
        })
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    /// Size on screen at the last zoom given to [`Canvas::recalc_co_size`].
    #[must_use]
    pub fn co_size(&self) -> [u32; 2] {
        [self.co_width, self.co_height]
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }
    pub fn recalc_co_size(&mut self, scale: f64) {
        self.co_width = az::saturating_cast((f64::from(self.width) * scale).ceil());
        self.co_height = az::saturating_cast((f64::from(self.height) * scale).ceil());
    }
}
