//! Per-layer blending. Pixels are straight (non-premultiplied) RGBA8, composited source-over
//! after the mode's color function has been applied.

#[derive(strum::AsRefStr, strum::EnumIter, PartialEq, Eq, Copy, Clone, Hash, Debug, Default)]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Add,
    Overlay,
}
impl BlendMode {
    /// Separable color function `B(backdrop, source)`, channels in `[0, 1]`.
    #[must_use]
    pub fn mix(self, backdrop: f32, source: f32) -> f32 {
        match self {
            Self::Normal => source,
            Self::Multiply => backdrop * source,
            Self::Screen => backdrop + source - backdrop * source,
            Self::Add => (backdrop + source).min(1.0),
            Self::Overlay => {
                if backdrop <= 0.5 {
                    2.0 * backdrop * source
                } else {
                    let screen = |a: f32, b: f32| a + b - a * b;
                    screen(2.0 * backdrop - 1.0, source)
                }
            }
        }
    }
}

/// Blend mode for a layer, including a mode and opacity modulate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Blend {
    pub mode: BlendMode,
    /// In `[0, 1]`.
    pub opacity: f32,
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            mode: BlendMode::default(),
            opacity: 1.0,
        }
    }
}
impl Blend {
    /// Whether painting with this blend is a plain copy of fully-covered pixels.
    #[must_use]
    pub fn is_opaque_normal(&self) -> bool {
        self.mode == BlendMode::Normal && self.opacity >= 1.0
    }
    /// Composite `source` over `backdrop`. `coverage` further scales the source alpha,
    /// and is where masks come in.
    #[must_use]
    pub fn over(&self, backdrop: [u8; 4], source: [u8; 4], coverage: f32) -> [u8; 4] {
        let alpha_s = f32::from(source[3]) / 255.0 * self.opacity.clamp(0.0, 1.0) * coverage;
        if alpha_s <= 0.0 {
            return backdrop;
        }
        let alpha_b = f32::from(backdrop[3]) / 255.0;
        let alpha_o = alpha_s + alpha_b * (1.0 - alpha_s);
        if alpha_o <= 0.0 {
            return [0; 4];
        }

        let mut out = [0u8; 4];
        for channel in 0..3 {
            let c_s = f32::from(source[channel]) / 255.0;
            let c_b = f32::from(backdrop[channel]) / 255.0;
            // Where there's no backdrop, the mode doesn't apply.
            let mixed = (1.0 - alpha_b) * c_s + alpha_b * self.mode.mix(c_b, c_s);
            let c_o = (alpha_s * mixed + alpha_b * c_b * (1.0 - alpha_s)) / alpha_o;
            out[channel] = to_u8(c_o);
        }
        out[3] = to_u8(alpha_o);
        out
    }
}

fn to_u8(value: f32) -> u8 {
    az::saturating_cast(value.clamp(0.0, 1.0) * 255.0 + 0.5)
}

#[cfg(test)]
mod test {
    use super::{Blend, BlendMode};

    #[test]
    fn opaque_normal_replaces() {
        let blend = Blend::default();
        assert_eq!(
            blend.over([0, 0, 255, 255], [255, 0, 0, 255], 1.0),
            [255, 0, 0, 255]
        );
        assert_eq!(blend.over([0, 0, 0, 0], [12, 34, 56, 255], 1.0), [12, 34, 56, 255]);
    }
    #[test]
    fn transparent_source_is_noop() {
        let blend = Blend::default();
        let backdrop = [10, 20, 30, 200];
        assert_eq!(blend.over(backdrop, [255, 255, 255, 0], 1.0), backdrop);
        // Fully masked off
        assert_eq!(blend.over(backdrop, [255, 255, 255, 255], 0.0), backdrop);
        let hidden = Blend {
            opacity: 0.0,
            ..Blend::default()
        };
        assert_eq!(hidden.over(backdrop, [255, 255, 255, 255], 1.0), backdrop);
    }
    #[test]
    fn half_opacity_mixes() {
        let blend = Blend {
            mode: BlendMode::Normal,
            opacity: 0.5,
        };
        let [r, g, b, a] = blend.over([0, 0, 0, 255], [255, 255, 255, 255], 1.0);
        assert_eq!(a, 255);
        for c in [r, g, b] {
            assert!((127..=128).contains(&c), "{c}");
        }
    }
    #[test]
    fn multiply_darkens() {
        let blend = Blend {
            mode: BlendMode::Multiply,
            opacity: 1.0,
        };
        assert_eq!(
            blend.over([255, 128, 0, 255], [128, 128, 128, 255], 1.0),
            [128, 64, 0, 255]
        );
        // Nothing underneath to multiply with.
        assert_eq!(
            blend.over([0, 0, 0, 0], [128, 128, 128, 255], 1.0),
            [128, 128, 128, 255]
        );
    }
}
