//! # Rasters
//!
//! Pixel storage and the one painting primitive everything else is built from.
//!
//! Layer pixels live in `Arc<RgbaImage>`s. Undo records, duplicated documents and the composite
//! cache share them freely, and anyone about to write pixels goes through [`Arc::make_mut`], so a
//! record never aliases live state that is being changed underneath it.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

use crate::blend::Blend;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("out of memory allocating a {width}x{height} image ({})", human_size(.bytes))]
pub struct AllocError {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

fn human_size(bytes: &usize) -> String {
    human_bytes::human_bytes(*bytes as f64)
}

fn alloc_bytes(width: u32, height: u32, channels: usize) -> Result<Vec<u8>, AllocError> {
    let error = |bytes| AllocError {
        width,
        height,
        bytes,
    };
    let bytes = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(channels))
        .ok_or_else(|| error(usize::MAX))?;
    let mut data = Vec::new();
    data.try_reserve_exact(bytes).map_err(|_| error(bytes))?;
    data.resize(bytes, 0);
    Ok(data)
}

/// Allocate a transparent image, reporting failure instead of aborting.
///
/// # Errors
/// If the allocation fails.
pub fn try_new_image(width: u32, height: u32) -> Result<RgbaImage, AllocError> {
    let data = alloc_bytes(width, height, 4)?;
    // Length matches by construction.
    RgbaImage::from_raw(width, height, data).ok_or(AllocError {
        width,
        height,
        bytes: 0,
    })
}

/// Deep copy of an image, reporting failure instead of aborting.
///
/// # Errors
/// If the allocation fails.
pub fn try_clone(image: &RgbaImage) -> Result<RgbaImage, AllocError> {
    let mut copy = try_new_image(image.width(), image.height())?;
    copy.copy_from_slice(image);
    Ok(copy)
}

/// Single channel coverage, owned by a layer.
///
/// Outside of its raster a mask reveals everything, so a mask smaller than the layer only
/// hides parts of it.
#[derive(Clone, Debug)]
pub struct LayerMask {
    pub image: std::sync::Arc<GrayImage>,
    /// Position of the mask's top left pixel, in document pixels.
    pub offset: [i32; 2],
    pub enabled: bool,
}
impl LayerMask {
    /// A mask that reveals the whole `width`x`height` area.
    ///
    /// # Errors
    /// If the allocation fails.
    pub fn reveal_all(width: u32, height: u32) -> Result<Self, AllocError> {
        let mut data = alloc_bytes(width, height, 1)?;
        data.fill(255);
        let image = GrayImage::from_raw(width, height, data).ok_or(AllocError {
            width,
            height,
            bytes: 0,
        })?;
        Ok(Self {
            image: std::sync::Arc::new(image),
            offset: [0, 0],
            enabled: true,
        })
    }
    /// Coverage in `[0, 1]` at a document pixel.
    #[must_use]
    pub fn coverage(&self, x: i32, y: i32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        let (mx, my) = (x - self.offset[0], y - self.offset[1]);
        match (u32::try_from(mx), u32::try_from(my)) {
            (Ok(mx), Ok(my)) if mx < self.image.width() && my < self.image.height() => {
                f32::from(self.image.get_pixel(mx, my).0[0]) / 255.0
            }
            _ => 1.0,
        }
    }
}

/// Where an image sits in document space.
#[derive(Copy, Clone)]
pub struct Placed<'a> {
    pub image: &'a RgbaImage,
    pub offset: [i32; 2],
}

/// Composite `source` onto `target`. `target_origin` is the document position of `target`'s top
/// left pixel, so painting onto a layer that's been moved works just like painting onto the canvas.
///
/// Rows are painted in parallel.
pub fn paint(
    target: &mut RgbaImage,
    target_origin: [i32; 2],
    source: Placed<'_>,
    blend: Blend,
    mask: Option<&LayerMask>,
) {
    // Overlap, in document space.
    let left = target_origin[0].max(source.offset[0]);
    let top = target_origin[1].max(source.offset[1]);
    let right = (i64::from(target_origin[0]) + i64::from(target.width()))
        .min(i64::from(source.offset[0]) + i64::from(source.image.width()));
    let bottom = (i64::from(target_origin[1]) + i64::from(target.height()))
        .min(i64::from(source.offset[1]) + i64::from(source.image.height()));
    if i64::from(left) >= right || i64::from(top) >= bottom {
        return;
    }
    let (right, bottom) = (right as i32, bottom as i32);

    let row_len = target.width() as usize * 4;
    let plain_copy = blend.is_opaque_normal() && mask.map_or(true, |m| !m.enabled);
    target
        .par_chunks_exact_mut(row_len)
        .enumerate()
        .skip((top - target_origin[1]) as usize)
        .take((bottom - top) as usize)
        .for_each(|(row, pixels)| {
            let y = row as i32 + target_origin[1];
            let target_px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(pixels);
            let src_y = (y - source.offset[1]) as u32;
            for x in left..right {
                let src = source
                    .image
                    .get_pixel((x - source.offset[0]) as u32, src_y)
                    .0;
                let dst = &mut target_px[(x - target_origin[0]) as usize];
                if plain_copy && src[3] == 255 {
                    *dst = src;
                    continue;
                }
                let coverage = mask.map_or(1.0, |m| m.coverage(x, y));
                *dst = blend.over(*dst, src, coverage);
            }
        });
}

/// Copy of the `width`x`height` area of `source` starting at document position `at`.
/// Parts outside of `source` are transparent.
///
/// # Errors
/// If the allocation fails.
pub fn crop(
    source: Placed<'_>,
    at: [i32; 2],
    width: u32,
    height: u32,
) -> Result<RgbaImage, AllocError> {
    let mut out = try_new_image(width, height)?;
    paint(&mut out, at, source, Blend::default(), None);
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgba;

    #[test]
    fn paint_clips_to_overlap() {
        let mut target = RgbaImage::new(4, 4);
        let source = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        paint(
            &mut target,
            [0, 0],
            Placed {
                image: &source,
                offset: [2, 3],
            },
            Blend::default(),
            None,
        );
        for (x, y, px) in target.enumerate_pixels() {
            let inside = x >= 2 && y >= 3;
            assert_eq!(px.0[3] == 255, inside, "{x},{y}");
        }
    }
    #[test]
    fn paint_onto_offset_target() {
        // Target sits at (-2, -2) in the document, source at the origin.
        let mut target = RgbaImage::new(4, 4);
        let source = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255]));
        paint(
            &mut target,
            [-2, -2],
            Placed {
                image: &source,
                offset: [0, 0],
            },
            Blend::default(),
            None,
        );
        assert_eq!(target.get_pixel(2, 2).0, [0, 255, 0, 255]);
        assert_eq!(target.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
    #[test]
    fn mask_hides() {
        let mut target = RgbaImage::new(2, 1);
        let source = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        let mut mask = LayerMask::reveal_all(1, 1).unwrap();
        std::sync::Arc::make_mut(&mut mask.image).put_pixel(0, 0, image::Luma([0]));
        paint(
            &mut target,
            [0, 0],
            Placed {
                image: &source,
                offset: [0, 0],
            },
            Blend::default(),
            Some(&mask),
        );
        // Masked off, then outside of the mask raster.
        assert_eq!(target.get_pixel(0, 0).0[3], 0);
        assert_eq!(target.get_pixel(1, 0).0[3], 255);
    }
    #[test]
    fn crop_pads_transparent() {
        let source = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let cropped = crop(
            Placed {
                image: &source,
                offset: [0, 0],
            },
            [1, 1],
            2,
            2,
        )
        .unwrap();
        assert_eq!(cropped.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(cropped.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }
    #[test]
    fn oversized_allocation_fails_cleanly() {
        let err = try_new_image(u32::MAX, u32::MAX).unwrap_err();
        assert_eq!(err.width, u32::MAX);
    }
}
