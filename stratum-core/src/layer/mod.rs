//! # Layers
//!
//! One entry of the layer stack. Every layer can be rendered onto the composite and may carry a
//! mask, what it renders depends on its [`LayerKind`].

mod adjustment;
mod text;

use std::sync::Arc;

use image::RgbaImage;

pub use adjustment::Adjustment;
pub use text::TextLayer;

use crate::blend::Blend;
use crate::geom::Rect;
pub use crate::raster::LayerMask;
use crate::raster::{self, AllocError, Placed};

pub type LayerID = crate::id::Id<Layer>;

/// A layer of plain pixels.
#[derive(Clone, Debug)]
pub struct RasterLayer {
    /// Shared copy-on-write, use [`RasterLayer::image_mut`] to write.
    image: Arc<RgbaImage>,
    /// Document position of the image's top left corner. The image may be larger than the canvas,
    /// in which case this is usually negative.
    pub offset: [i32; 2],
}
impl RasterLayer {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            offset: [0, 0],
        }
    }
    #[must_use]
    pub fn with_offset(image: Arc<RgbaImage>, offset: [i32; 2]) -> Self {
        Self { image, offset }
    }
    #[must_use]
    pub fn image(&self) -> &Arc<RgbaImage> {
        &self.image
    }
    /// Unique access to the pixels, copying them first if anyone else holds them.
    pub fn image_mut(&mut self) -> &mut RgbaImage {
        Arc::make_mut(&mut self.image)
    }
    pub fn set_image(&mut self, image: Arc<RgbaImage>) {
        self.image = image;
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            f64::from(self.offset[0]),
            f64::from(self.offset[1]),
            f64::from(self.image.width()),
            f64::from(self.image.height()),
        )
    }
    fn placed(&self) -> Placed<'_> {
        Placed {
            image: &self.image,
            offset: self.offset,
        }
    }
}

#[derive(Clone, Debug)]
pub enum LayerKind {
    Raster(RasterLayer),
    /// Filters everything below it.
    Adjustment(Adjustment),
    Text(TextLayer),
}

/// What part of the active layer the user is looking at and editing.
#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum MaskViewMode {
    #[default]
    Normal,
    /// Show the mask instead of the layer.
    ShowMask,
    /// Show the layer, but paint on the mask.
    EditMask,
    /// Show the mask as a red tint over the layer.
    Rubylith,
}
impl MaskViewMode {
    /// Whether this mode makes sense for `layer`. Every mode but `Normal` needs a mask.
    #[must_use]
    pub fn can_be_assigned_to(self, layer: &Layer) -> bool {
        self == Self::Normal || layer.mask.is_some()
    }
    #[must_use]
    pub fn edits_mask(self) -> bool {
        matches!(self, Self::EditMask | Self::ShowMask | Self::Rubylith)
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerID,
    pub name: String,
    pub visible: bool,
    pub blend: Blend,
    pub mask: Option<LayerMask>,
    kind: LayerKind,
}

impl Layer {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: LayerID::new(),
            name: name.into(),
            visible: true,
            blend: Blend::default(),
            mask: None,
            kind,
        }
    }
    #[must_use]
    pub fn raster(name: impl Into<String>, image: RgbaImage) -> Self {
        Self::new(name, LayerKind::Raster(RasterLayer::new(image)))
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }
    pub fn kind_mut(&mut self) -> &mut LayerKind {
        &mut self.kind
    }
    #[must_use]
    pub fn as_raster(&self) -> Option<&RasterLayer> {
        match &self.kind {
            LayerKind::Raster(raster) => Some(raster),
            _ => None,
        }
    }
    pub fn as_raster_mut(&mut self) -> Option<&mut RasterLayer> {
        match &mut self.kind {
            LayerKind::Raster(raster) => Some(raster),
            _ => None,
        }
    }
    #[must_use]
    pub fn is_adjustment(&self) -> bool {
        matches!(self.kind, LayerKind::Adjustment(_))
    }
    /// Document position of movable content, `None` for layers that have no position.
    #[must_use]
    pub fn offset(&self) -> Option<[i32; 2]> {
        match &self.kind {
            LayerKind::Raster(RasterLayer { offset, .. })
            | LayerKind::Text(TextLayer { offset, .. }) => Some(*offset),
            LayerKind::Adjustment(_) => None,
        }
    }
    /// Move the content (and mask, which is linked) to an absolute offset.
    /// Does nothing for layers without a position.
    pub fn set_offset(&mut self, to: [i32; 2]) {
        let Some(from) = self.offset() else {
            return;
        };
        match &mut self.kind {
            LayerKind::Raster(RasterLayer { offset, .. })
            | LayerKind::Text(TextLayer { offset, .. }) => *offset = to,
            LayerKind::Adjustment(_) => (),
        }
        if let Some(mask) = &mut self.mask {
            let by = [to[0].saturating_sub(from[0]), to[1].saturating_sub(from[1])];
            mask.offset = crate::geom::offset_by(mask.offset, by);
        }
    }
    /// Area of the document this layer has pixels in, `None` for layers without bounds.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Rect> {
        match &self.kind {
            LayerKind::Raster(pixels) => Some(pixels.bounds()),
            LayerKind::Text(text) => Some(text.bounds()),
            LayerKind::Adjustment(_) => None,
        }
    }

    /// Render this layer onto `surface`, whose top left pixel sits at document position `origin`.
    ///
    /// Returns `None` if the layer painted onto `surface` in place. Layers that transform
    /// everything below them instead return the replacement for `surface`.
    ///
    /// `first_visible` is set for the bottom-most visible layer of a composite, when there is
    /// nothing underneath yet.
    #[must_use]
    pub fn apply(
        &self,
        surface: &mut RgbaImage,
        origin: [i32; 2],
        first_visible: bool,
    ) -> Option<RgbaImage> {
        let mask = self.mask.as_ref();
        match &self.kind {
            LayerKind::Raster(pixels) => {
                raster::paint(surface, origin, pixels.placed(), self.blend, mask);
                None
            }
            LayerKind::Adjustment(adjustment) => {
                // Nothing to adjust.
                if first_visible {
                    return None;
                }
                let adjusted = adjustment.filter(surface);
                if self.blend.is_opaque_normal() && mask.is_none() {
                    return Some(adjusted);
                }
                // Fade between the original and the filtered result.
                let mut result = surface.clone();
                raster::paint(
                    &mut result,
                    origin,
                    Placed {
                        image: &adjusted,
                        offset: origin,
                    },
                    self.blend,
                    mask,
                );
                Some(result)
            }
            LayerKind::Text(text) => text.apply(surface, origin, self.blend, mask),
        }
    }

    /// Deep copy under a fresh ID, for the "Duplicate Layer" action.
    ///
    /// # Errors
    /// If there isn't enough memory to copy the pixels.
    pub fn duplicate(&self) -> Result<Self, AllocError> {
        let kind = match &self.kind {
            LayerKind::Raster(pixels) => LayerKind::Raster(RasterLayer {
                image: Arc::new(raster::try_clone(&pixels.image)?),
                offset: pixels.offset,
            }),
            other => other.clone(),
        };
        Ok(Self {
            id: LayerID::new(),
            name: copy_name(&self.name),
            visible: self.visible,
            blend: self.blend,
            mask: self.mask.clone(),
            kind,
        })
    }
    /// Shallow copy under a fresh ID. Pixels stay shared until either side writes to them.
    #[must_use]
    pub fn clone_with_new_id(&self) -> Self {
        Self {
            id: LayerID::new(),
            ..self.clone()
        }
    }
}

/// "name" -> "name copy" -> "name copy 2" -> "name copy 3"...
#[must_use]
pub fn copy_name(name: &str) -> String {
    if name.ends_with(" copy") {
        return format!("{name} 2");
    }
    if let Some((base, n)) = name.rsplit_once(" copy ") {
        if let Ok(n) = n.parse::<u32>() {
            return format!("{base} copy {}", n.saturating_add(1));
        }
    }
    format!("{name} copy")
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgba;

    #[test]
    fn copy_names() {
        assert_eq!(copy_name("layer 1"), "layer 1 copy");
        assert_eq!(copy_name("layer 1 copy"), "layer 1 copy 2");
        assert_eq!(copy_name("layer 1 copy 2"), "layer 1 copy 3");
        assert_eq!(copy_name("a copy b"), "a copy b copy");
    }
    #[test]
    fn duplicate_is_independent() {
        let original = Layer::raster("layer 1", RgbaImage::new(2, 2));
        let mut dup = original.duplicate().unwrap();
        assert_ne!(original.id(), dup.id());
        assert_eq!(dup.name, "layer 1 copy");
        dup.as_raster_mut()
            .unwrap()
            .image_mut()
            .put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        assert_eq!(original.as_raster().unwrap().image().get_pixel(0, 0).0, [0; 4]);
    }
    #[test]
    fn clones_share_until_written() {
        let original = Layer::raster("layer", RgbaImage::new(2, 2));
        let mut snapshot = original.clone();
        assert_eq!(snapshot.id(), original.id());
        assert!(Arc::ptr_eq(
            snapshot.as_raster().unwrap().image(),
            original.as_raster().unwrap().image()
        ));
        snapshot.as_raster_mut().unwrap().image_mut().put_pixel(1, 1, Rgba([9; 4]));
        assert!(!Arc::ptr_eq(
            snapshot.as_raster().unwrap().image(),
            original.as_raster().unwrap().image()
        ));
    }
    #[test]
    fn moving_drags_mask_along() {
        let mut layer = Layer::raster("layer", RgbaImage::new(2, 2));
        layer.mask = Some(LayerMask::reveal_all(2, 2).unwrap());
        layer.set_offset([5, -3]);
        assert_eq!(layer.offset(), Some([5, -3]));
        assert_eq!(layer.mask.as_ref().unwrap().offset, [5, -3]);
    }
    #[test]
    fn adjustment_replaces_surface() {
        let layer = Layer::new("invert", LayerKind::Adjustment(Adjustment::Invert));
        let mut surface = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        assert!(layer.apply(&mut surface, [0, 0], true).is_none());
        let replacement = layer.apply(&mut surface, [0, 0], false).unwrap();
        assert_eq!(replacement.get_pixel(0, 0).0, [0, 255, 255, 255]);
        // Original left alone.
        assert_eq!(surface.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }
}
