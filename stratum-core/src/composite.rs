//! # Composite
//!
//! The flattened image of every visible layer, recomputed lazily and shared by reference until
//! something invalidates it.

use std::sync::Arc;

use image::RgbaImage;

use crate::layer::Layer;

bitflags::bitflags! {
    /// What else needs to happen once the pixels of a document changed. The cache is always
    /// invalidated.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ChangeActions: u8 {
        /// Redraw the viewport and navigator.
        const REPAINT = 0b01;
        /// Recompute histograms.
        const HISTOGRAM = 0b10;
        const FULL = Self::REPAINT.bits() | Self::HISTOGRAM.bits();
    }
}
impl ChangeActions {
    /// Only drop the cached composite.
    pub const INVALIDATE_CACHE: Self = Self::empty();
}

/// Render `layers` (bottom to top) onto a transparent `width`x`height` surface.
#[must_use]
pub fn render(layers: &[Layer], width: u32, height: u32) -> RgbaImage {
    let mut surface = RgbaImage::new(width, height);
    let mut first_visible = true;
    for layer in layers.iter().filter(|layer| layer.visible) {
        if let Some(replacement) = layer.apply(&mut surface, [0, 0], first_visible) {
            surface = replacement;
        }
        first_visible = false;
    }
    surface
}

/// `None` means dirty.
#[derive(Clone, Default, Debug)]
pub struct CompositeCache {
    image: Option<Arc<RgbaImage>>,
}

impl CompositeCache {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.image.is_some()
    }
    pub fn invalidate(&mut self) {
        self.image = None;
    }
    /// The cached composite, rendering it first if needed.
    pub fn get_or_render(&mut self, layers: &[Layer], width: u32, height: u32) -> Arc<RgbaImage> {
        if let Some(image) = &self.image {
            return image.clone();
        }
        log::trace!("recomputing {width}x{height} composite of {} layers", layers.len());
        let image = Arc::new(render(layers, width, height));
        self.image = Some(image.clone());
        image
    }
}
