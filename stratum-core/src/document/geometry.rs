//! Edits that change the canvas itself. Each is recorded as a whole-document replacement, since
//! every layer changes.

use std::sync::Arc;

use image::imageops::{self, FilterType};

use super::{Document, DocumentError, Snapshot};
use crate::canvas::Canvas;
use crate::commands::Command;
use crate::composite::ChangeActions;
use crate::geom::{self, Affine, Rect};
use crate::layer::{Layer, LayerKind, RasterLayer};
use crate::raster::{self, Placed};
use crate::StateError;

fn translate_layer(layer: &mut Layer, by: [i32; 2]) {
    if let Some(offset) = layer.offset() {
        layer.set_offset(crate::geom::offset_by(offset, by));
    } else if let Some(mask) = &mut layer.mask {
        mask.offset = crate::geom::offset_by(mask.offset, by);
    }
}

fn scale_size(size: u32, factor: f64) -> u32 {
    az::saturating_cast::<f64, u32>((f64::from(size) * factor).round()).max(1)
}
fn scale_offset(offset: [i32; 2], factor: [f64; 2]) -> [i32; 2] {
    [
        az::saturating_cast((f64::from(offset[0]) * factor[0]).round()),
        az::saturating_cast((f64::from(offset[1]) * factor[1]).round()),
    ]
}

impl Document {
    /// Swap in the new canvas and tell everything that depends on coordinates.
    fn finish_geometry_edit(&mut self, name: &'static str, before: Snapshot, coords: Affine) {
        if let Some(view) = &mut self.view {
            view.set_canvas_size(self.canvas.size());
            self.canvas.recalc_co_size(view.scale());
        }
        self.image_coords_changed(&coords, false);
        self.dirty = true;
        self.image_changed(ChangeActions::FULL, true);
        self.debug_check_invariant();
        let after = self.snapshot();
        log::debug!("{name}: {:?} -> {:?}", before.canvas.size(), after.canvas.size());
        self.record(
            name,
            Command::DocumentReplaced {
                from: Box::new(before),
                to: Box::new(after),
                coords: Some(coords),
            },
        );
    }

    /// Change the canvas size without scaling anything. The old canvas' top left corner ends up at
    /// `offset` in the new one. Layer pixels outside of the new canvas are kept.
    ///
    /// # Errors
    /// If either dimension is zero.
    pub fn resize_canvas(
        &mut self,
        width: u32,
        height: u32,
        offset: [i32; 2],
    ) -> Result<(), StateError> {
        self.resize_canvas_named("Resize Canvas", width, height, offset)
    }
    fn resize_canvas_named(
        &mut self,
        name: &'static str,
        width: u32,
        height: u32,
        offset: [i32; 2],
    ) -> Result<(), StateError> {
        let canvas = Canvas::new(width, height)?;
        let before = self.snapshot();
        self.canvas = canvas;
        for layer in &mut self.layers {
            translate_layer(layer, offset);
        }
        let coords = geom::translation(f64::from(offset[0]), f64::from(offset[1]));
        self.finish_geometry_edit(name, before, coords);
        Ok(())
    }
    /// Grow the canvas until every layer's contents fit on it. Returns false if they already do.
    ///
    /// # Errors
    /// If the grown canvas would be too large to describe.
    pub fn fit_canvas_to_layers(&mut self) -> Result<bool, StateError> {
        let bounds = self.max_image_bounds().round_out();
        if bounds == self.canvas.bounds() {
            return Ok(false);
        }
        let width = az::saturating_cast::<f64, u32>(bounds.width);
        let height = az::saturating_cast::<f64, u32>(bounds.height);
        let offset = [
            az::saturating_cast::<f64, i32>(-bounds.x),
            az::saturating_cast::<f64, i32>(-bounds.y),
        ];
        self.resize_canvas_named("Fit Canvas to Layers", width, height, offset)?;
        Ok(true)
    }
    /// Cut the canvas down to `rect`. Pixels outside of it are discarded.
    ///
    /// # Errors
    /// If `rect` doesn't overlap the canvas, or there isn't memory for the cropped layers. The
    /// document is unchanged in either case.
    pub fn crop(&mut self, rect: Rect) -> Result<(), DocumentError> {
        let area = rect
            .round_out()
            .intersection(&self.canvas.bounds())
            .filter(|area| !area.is_empty())
            .ok_or(DocumentError::EmptyCrop)?;
        let at = [area.x as i32, area.y as i32];
        let canvas = Canvas::new(area.width as u32, area.height as u32)?;

        // Build every layer first, so running out of memory halfway leaves nothing changed.
        let mut cropped = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let mut layer = layer.clone();
            if let Some(pixels) = layer.as_raster_mut() {
                let image = raster::crop(
                    Placed {
                        image: pixels.image(),
                        offset: pixels.offset,
                    },
                    at,
                    canvas.width(),
                    canvas.height(),
                )?;
                *pixels = RasterLayer::with_offset(Arc::new(image), at);
            }
            translate_layer(&mut layer, [-at[0], -at[1]]);
            cropped.push(layer);
        }

        let before = self.snapshot();
        self.canvas = canvas;
        self.layers = cropped;
        let coords = geom::translation(-area.x, -area.y);
        self.finish_geometry_edit("Crop", before, coords);
        Ok(())
    }
    /// Scale the whole image to `width`x`height`.
    ///
    /// # Errors
    /// If either dimension is zero.
    pub fn resize_image(&mut self, width: u32, height: u32) -> Result<(), StateError> {
        let canvas = Canvas::new(width, height)?;
        let factor = [
            f64::from(width) / f64::from(self.canvas.width()),
            f64::from(height) / f64::from(self.canvas.height()),
        ];
        let before = self.snapshot();
        for layer in &mut self.layers {
            match layer.kind_mut() {
                LayerKind::Raster(pixels) => {
                    let image = pixels.image();
                    let resized = imageops::resize(
                        &**image,
                        scale_size(image.width(), factor[0]),
                        scale_size(image.height(), factor[1]),
                        FilterType::Triangle,
                    );
                    *pixels = RasterLayer::with_offset(
                        Arc::new(resized),
                        scale_offset(pixels.offset, factor),
                    );
                }
                LayerKind::Text(text) => {
                    text.coverage = Arc::new(imageops::resize(
                        &*text.coverage,
                        scale_size(text.coverage.width(), factor[0]),
                        scale_size(text.coverage.height(), factor[1]),
                        FilterType::Triangle,
                    ));
                    text.offset = scale_offset(text.offset, factor);
                }
                LayerKind::Adjustment(_) => (),
            }
            if let Some(mask) = &mut layer.mask {
                mask.image = Arc::new(imageops::resize(
                    &*mask.image,
                    scale_size(mask.image.width(), factor[0]),
                    scale_size(mask.image.height(), factor[1]),
                    FilterType::Triangle,
                ));
                mask.offset = scale_offset(mask.offset, factor);
            }
        }
        self.canvas = canvas;
        self.finish_geometry_edit("Resize", before, geom::scaling(factor[0], factor[1]));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::{red_document, RED};
    use crate::geom::Region;

    #[test]
    fn enlarge_canvas() {
        let mut document = red_document(10, 10);
        document
            .create_selection_from(Region::rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        document.resize_canvas(20, 20, [5, 5]).unwrap();
        assert_eq!(document.canvas().size(), [20, 20]);
        assert_eq!(document.layers()[0].offset(), Some([5, 5]));
        assert_eq!(
            document.selection_shape(),
            Some(&Region::rect(Rect::new(5.0, 5.0, 5.0, 5.0)))
        );
        let composite = document.composite();
        assert_eq!(composite.get_pixel(0, 0).0[3], 0);
        assert_eq!(*composite.get_pixel(5, 5), RED);
        assert_eq!(document.take_edits()[0].name(), "Resize Canvas");
    }
    #[test]
    fn crop_discards_outside() {
        let mut document = red_document(10, 10);
        document
            .create_selection_from(Region::rect(Rect::new(0.0, 0.0, 3.0, 3.0)))
            .unwrap();
        document.crop(Rect::new(2.0, 2.0, 4.0, 4.0)).unwrap();
        assert_eq!(document.canvas().size(), [4, 4]);
        let layer = document.layers()[0].as_raster().unwrap();
        assert_eq!(layer.offset, [0, 0]);
        assert_eq!(layer.image().dimensions(), (4, 4));
        assert_eq!(
            document.selection_shape(),
            Some(&Region::rect(Rect::new(0.0, 0.0, 1.0, 1.0)))
        );
        assert_eq!(
            document.crop(Rect::new(50.0, 50.0, 4.0, 4.0)),
            Err(DocumentError::EmptyCrop)
        );
        assert_eq!(document.canvas().size(), [4, 4]);
    }
    #[test]
    fn resize_scales_everything() {
        let mut document = red_document(10, 10);
        document
            .create_selection_from(Region::rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        document.resize_image(20, 5).unwrap();
        assert_eq!(document.canvas().size(), [20, 5]);
        let layer = document.layers()[0].as_raster().unwrap();
        assert_eq!(layer.image().dimensions(), (20, 5));
        assert_eq!(
            document.selection_shape(),
            Some(&Region::rect(Rect::new(0.0, 0.0, 10.0, 2.5)))
        );
        assert!(document.resize_image(0, 5).is_err());
    }
    #[test]
    fn fit_canvas_to_layers() {
        use crate::commands::{CommandConsumer, DoUndo};
        use crate::layer::Layer;
        use image::{Rgba, RgbaImage};

        let mut document = red_document(10, 10);
        let tall = RgbaImage::from_pixel(4, 20, Rgba([0, 0, 255, 255]));
        let mut layer = Layer::raster("tall", tall);
        layer.set_offset([3, -5]);
        document.add_layer().add(layer).unwrap();

        assert_eq!(document.fit_canvas_to_layers(), Ok(true));
        assert_eq!(document.canvas().size(), [10, 20]);
        assert_eq!(document.layers()[0].offset(), Some([0, 5]));
        assert_eq!(document.layers()[1].offset(), Some([3, 0]));
        assert_eq!(document.fit_canvas_to_layers(), Ok(false));

        let edits = document.take_edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].name(), "Fit Canvas to Layers");
        document.apply(DoUndo::Undo(edits[0].command())).unwrap();
        assert_eq!(document.canvas().size(), [10, 10]);
        assert_eq!(document.layers()[1].offset(), Some([3, -5]));
    }
}
