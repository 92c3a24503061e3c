use std::sync::Arc;

use image::{GrayImage, Rgba, RgbaImage};

use crate::blend::Blend;
use crate::geom::{Rect, Region};
use crate::raster::{self, LayerMask, Placed};

/// Text, already shaped and rasterized to coverage by whoever owns the fonts.
#[derive(Clone, Debug)]
pub struct TextLayer {
    pub text: String,
    /// Glyph coverage, 255 = fully inside a glyph.
    pub coverage: Arc<GrayImage>,
    pub color: Rgba<u8>,
    /// Document position of the coverage raster.
    pub offset: [i32; 2],
    /// Instead of painting the text, keep only the parts of the image below that the text covers.
    pub knockout: bool,
}

impl TextLayer {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            f64::from(self.offset[0]),
            f64::from(self.offset[1]),
            f64::from(self.coverage.width()),
            f64::from(self.coverage.height()),
        )
    }
    /// Pixels at least half covered by glyphs, in document coordinates.
    #[must_use]
    pub fn covered_region(&self) -> Region {
        let (width, height) = self.coverage.dimensions();
        let left = f64::from(self.offset[0]);
        let top = f64::from(self.offset[1]);
        Region::from_rows((0..height).map(|y| {
            let mut spans = Vec::new();
            let mut run = None;
            for x in 0..=width {
                let inside = x < width && self.coverage.get_pixel(x, y).0[0] >= 128;
                match (inside, run) {
                    (true, None) => run = Some(x),
                    (false, Some(start)) => {
                        spans.push((left + f64::from(start), left + f64::from(x)));
                        run = None;
                    }
                    _ => (),
                }
            }
            (top + f64::from(y), spans)
        }))
    }
    /// Coverage tinted with the text color.
    fn colored(&self) -> RgbaImage {
        let Rgba([r, g, b, a]) = self.color;
        RgbaImage::from_fn(self.coverage.width(), self.coverage.height(), |x, y| {
            let coverage = u16::from(self.coverage.get_pixel(x, y).0[0]);
            let alpha = (coverage * u16::from(a) + 127) / 255;
            Rgba([r, g, b, alpha as u8])
        })
    }
    pub(super) fn apply(
        &self,
        surface: &mut RgbaImage,
        origin: [i32; 2],
        blend: Blend,
        mask: Option<&LayerMask>,
    ) -> Option<RgbaImage> {
        if !self.knockout {
            let colored = self.colored();
            raster::paint(
                surface,
                origin,
                Placed {
                    image: &colored,
                    offset: self.offset,
                },
                blend,
                mask,
            );
            return None;
        }
        let mut cut = surface.clone();
        for (x, y, px) in cut.enumerate_pixels_mut() {
            let (doc_x, doc_y) = (x as i32 + origin[0], y as i32 + origin[1]);
            let (tx, ty) = (doc_x - self.offset[0], doc_y - self.offset[1]);
            let coverage = match (u32::try_from(tx), u32::try_from(ty)) {
                (Ok(tx), Ok(ty)) if tx < self.coverage.width() && ty < self.coverage.height() => {
                    f32::from(self.coverage.get_pixel(tx, ty).0[0]) / 255.0
                }
                _ => 0.0,
            };
            let keep = coverage * blend.opacity + (1.0 - blend.opacity);
            let masked = mask.map_or(1.0, |m| m.coverage(doc_x, doc_y));
            let keep = keep * masked + (1.0 - masked);
            px.0[3] = az::saturating_cast(f32::from(px.0[3]) * keep + 0.5);
        }
        Some(cut)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layer::{Layer, LayerKind};
    use image::Luma;

    fn text(knockout: bool) -> Layer {
        let mut coverage = GrayImage::new(2, 1);
        coverage.put_pixel(0, 0, Luma([255]));
        Layer::new(
            "hello",
            LayerKind::Text(TextLayer {
                text: "hello".to_owned(),
                coverage: Arc::new(coverage),
                color: Rgba([0, 0, 255, 255]),
                offset: [1, 0],
                knockout,
            }),
        )
    }

    #[test]
    fn paints_in_place() {
        let mut surface = RgbaImage::from_pixel(3, 1, Rgba([255, 255, 255, 255]));
        assert!(text(false).apply(&mut surface, [0, 0], false).is_none());
        assert_eq!(surface.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(surface.get_pixel(1, 0).0, [0, 0, 255, 255]);
        assert_eq!(surface.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }
    #[test]
    fn knockout_replaces() {
        let mut surface = RgbaImage::from_pixel(3, 1, Rgba([255, 255, 255, 255]));
        let cut = text(true).apply(&mut surface, [0, 0], false).unwrap();
        assert_eq!(cut.get_pixel(0, 0).0[3], 0);
        assert_eq!(cut.get_pixel(1, 0).0[3], 255);
        assert_eq!(cut.get_pixel(2, 0).0[3], 0);
    }
    #[test]
    fn covered_region() {
        let mut coverage = GrayImage::new(4, 2);
        for x in [0, 1, 3] {
            coverage.put_pixel(x, 0, Luma([200]));
        }
        // Under half, left out.
        coverage.put_pixel(2, 1, Luma([100]));
        let text = TextLayer {
            text: "i".to_owned(),
            coverage: Arc::new(coverage),
            color: Rgba([0, 0, 0, 255]),
            offset: [10, 5],
            knockout: false,
        };
        let expected = Region::from_rects([
            Rect::new(10.0, 5.0, 2.0, 1.0),
            Rect::new(13.0, 5.0, 1.0, 1.0),
        ]);
        assert_eq!(text.covered_region(), expected);
    }
}
