use image::RgbaImage;
use rayon::prelude::*;

/// Non-destructive filters, applied to everything below the adjustment layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Adjustment {
    Invert,
    /// Added to every color channel, saturating.
    Brightness(i16),
    /// Luma-weighted grayscale.
    Desaturate,
}

impl Adjustment {
    /// Filtered copy of `source`. Alpha is left alone.
    #[must_use]
    pub fn filter(self, source: &RgbaImage) -> RgbaImage {
        let mut out = source.clone();
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut *out);
        pixels.par_iter_mut().for_each(|px| self.filter_pixel(px));
        out
    }
    fn filter_pixel(self, px: &mut [u8; 4]) {
        match self {
            Self::Invert => {
                for c in &mut px[..3] {
                    *c = 255 - *c;
                }
            }
            Self::Brightness(by) => {
                for c in &mut px[..3] {
                    *c = az::saturating_cast(i32::from(*c) + i32::from(by));
                }
            }
            Self::Desaturate => {
                let [r, g, b, _] = px.map(f32::from);
                let luma: u8 = az::saturating_cast(0.299 * r + 0.587 * g + 0.114 * b + 0.5);
                px[..3].fill(luma);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::Adjustment;
    use image::{Rgba, RgbaImage};

    #[test]
    fn filters() {
        let source = RgbaImage::from_pixel(2, 1, Rgba([200, 100, 0, 128]));
        assert_eq!(
            Adjustment::Invert.filter(&source).get_pixel(1, 0).0,
            [55, 155, 255, 128]
        );
        assert_eq!(
            Adjustment::Brightness(100).filter(&source).get_pixel(0, 0).0,
            [255, 200, 100, 128]
        );
        assert_eq!(
            Adjustment::Brightness(-150).filter(&source).get_pixel(0, 0).0,
            [50, 0, 0, 128]
        );
        let gray = Adjustment::Desaturate.filter(&source).get_pixel(0, 0).0;
        assert_eq!(gray[0], gray[1]);
        assert_eq!(gray[1], gray[2]);
        assert_eq!(gray[3], 128);
    }
}
