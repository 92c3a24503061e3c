//! Every layer as one frame of a looping GIF.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::document::save::{DocumentWriter, SaveError, SavePayload};
use crate::document::Document;
use crate::layer::Layer;
use crate::raster::{self, AllocError};

pub struct LayerAnimation {
    frames: Vec<RgbaImage>,
    delay_ms: u32,
}

impl LayerAnimation {
    /// # Errors
    /// If there isn't memory for the frames.
    pub fn new(document: &Document, delay_ms: u32, ping_pong: bool) -> Result<Self, AllocError> {
        Self::from_layers(document.layers(), document.canvas().size(), delay_ms, ping_pong)
    }
    /// One frame per layer, bottom first, each rendered alone onto a transparent canvas.
    /// Adjustment layers have nothing to show on their own and are skipped. With `ping_pong` and
    /// more than two layers, the layers between the top and the bottom play again top down. Both
    /// ends count adjustment layers, so a stack topped by one repeats its highest picture.
    ///
    /// # Errors
    /// If there isn't memory for the frames.
    pub fn from_layers(
        layers: &[Layer],
        canvas: [u32; 2],
        delay_ms: u32,
        ping_pong: bool,
    ) -> Result<Self, AllocError> {
        let mut rendered = Vec::with_capacity(layers.len());
        for layer in layers {
            if layer.is_adjustment() {
                rendered.push(None);
                continue;
            }
            let mut surface = raster::try_new_image(canvas[0], canvas[1])?;
            let frame = layer
                .apply(&mut surface, [0, 0], true)
                .unwrap_or(surface);
            rendered.push(Some(frame));
        }
        let n = layers.len();
        let back = if ping_pong && n > 2 { 1..n - 1 } else { 0..0 };
        let frames = (0..n)
            .chain(back.rev())
            .filter_map(|index| rendered[index].clone())
            .collect();
        Ok(Self { frames, delay_ms })
    }
    #[must_use]
    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }
    /// # Errors
    /// If the file can't be created or encoding fails.
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let file = BufWriter::new(File::create(path)?);
        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite)?;
        let delay = Delay::from_numer_denom_ms(self.delay_ms, 1);
        encoder.encode_frames(
            self.frames
                .iter()
                .map(|frame| Frame::from_parts(frame.clone(), 0, 0, delay)),
        )?;
        log::debug!("wrote {} frames to {}", self.frames.len(), path.display());
        Ok(())
    }
}

/// Saves documents as a layer animation.
#[derive(Copy, Clone, Debug)]
pub struct AnimationWriter {
    pub delay_ms: u32,
    pub ping_pong: bool,
}
impl DocumentWriter for AnimationWriter {
    fn wants_layers(&self) -> bool {
        true
    }
    fn write(&self, payload: &SavePayload, path: &Path) -> Result<(), SaveError> {
        let SavePayload::Layers { canvas, layers } = payload else {
            return Err(SaveError::Unsupported("layer animation".to_owned()));
        };
        LayerAnimation::from_layers(layers, *canvas, self.delay_ms, self.ping_pong)?.save(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layer::{Adjustment, LayerKind};
    use image::Rgba;

    fn layers() -> Vec<Layer> {
        (0..4u8)
            .map(|i| Layer::raster(format!("{i}"), RgbaImage::from_pixel(2, 2, Rgba([i, 0, 0, 255]))))
            .chain([Layer::new("invert", LayerKind::Adjustment(Adjustment::Invert))])
            .collect()
    }

    #[test]
    fn frames() {
        let animation = LayerAnimation::from_layers(&layers(), [2, 2], 100, false).unwrap();
        assert_eq!(animation.frames().len(), 4);
        let reds: Vec<u8> = animation
            .frames()
            .iter()
            .map(|frame| frame.get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(reds, [0, 1, 2, 3]);
    }
    #[test]
    fn ping_pong() {
        let animation = LayerAnimation::from_layers(&layers(), [2, 2], 100, true).unwrap();
        let reds: Vec<u8> = animation
            .frames()
            .iter()
            .map(|frame| frame.get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(reds, [0, 1, 2, 3, 3, 2, 1]);
    }
    #[test]
    fn ping_pong_skips_adjustments() {
        let mut stack: Vec<Layer> = layers().into_iter().take(3).collect();
        stack.insert(1, Layer::new("invert", LayerKind::Adjustment(Adjustment::Invert)));
        let animation = LayerAnimation::from_layers(&stack, [2, 2], 100, true).unwrap();
        let reds: Vec<u8> = animation
            .frames()
            .iter()
            .map(|frame| frame.get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(reds, [0, 1, 2, 1]);

        let two = LayerAnimation::from_layers(&stack[..2], [2, 2], 100, true).unwrap();
        assert_eq!(two.frames().len(), 1);
    }
    #[test]
    fn writes_gif() {
        let path = std::env::temp_dir().join(format!("stratum-{}-anim.gif", std::process::id()));
        let payload = SavePayload::Layers {
            canvas: [2, 2],
            layers: layers(),
        };
        AnimationWriter {
            delay_ms: 50,
            ping_pong: false,
        }
        .write(&payload, &path)
        .unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
        std::fs::remove_file(&path).unwrap();

        let composite = SavePayload::Composite(std::sync::Arc::new(RgbaImage::new(1, 1)));
        assert!(AnimationWriter {
            delay_ms: 50,
            ping_pong: false
        }
        .write(&composite, &path)
        .is_err());
    }
}
