use std::f64::consts::SQRT_2;

/// Discrete zoom steps, each a factor of √2 from the last.
#[derive(
    strum::EnumIter, strum::EnumCount, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
)]
pub enum ZoomLevel {
    Z12,
    Z18,
    Z25,
    Z35,
    Z50,
    Z71,
    Z100,
    Z141,
    Z200,
    Z283,
    Z400,
    Z566,
    Z800,
    Z1131,
    Z1600,
    Z2263,
    Z3200,
    Z4525,
    Z6400,
}

const SCALES: [f64; <ZoomLevel as strum::EnumCount>::COUNT] = [
    0.125,
    0.125 * SQRT_2,
    0.25,
    0.25 * SQRT_2,
    0.5,
    0.5 * SQRT_2,
    1.0,
    SQRT_2,
    2.0,
    2.0 * SQRT_2,
    4.0,
    4.0 * SQRT_2,
    8.0,
    8.0 * SQRT_2,
    16.0,
    16.0 * SQRT_2,
    32.0,
    32.0 * SQRT_2,
    64.0,
];

/// How to pick a zoom level for a freshly opened document.
#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum AutoZoom {
    /// Largest zoom that shows the whole canvas.
    #[default]
    FitSpace,
    FitWidth,
    FitHeight,
    /// 100%, one document pixel to one screen pixel.
    ActualPixels,
}

impl ZoomLevel {
    pub const MIN: Self = Self::Z12;
    pub const MAX: Self = Self::Z6400;

    /// Scale factor, document pixels to screen pixels.
    #[must_use]
    pub fn scale(self) -> f64 {
        SCALES[self as usize]
    }
    #[must_use]
    pub fn percent(self) -> f64 {
        self.scale() * 100.0
    }
    fn from_index(idx: usize) -> Option<Self> {
        <Self as strum::IntoEnumIterator>::iter().nth(idx)
    }
    /// Next level up, saturating at [`ZoomLevel::MAX`].
    #[must_use]
    pub fn zoom_in(self) -> Self {
        Self::from_index(self as usize + 1).unwrap_or(Self::MAX)
    }
    /// Next level down, saturating at [`ZoomLevel::MIN`].
    #[must_use]
    pub fn zoom_out(self) -> Self {
        (self as usize)
            .checked_sub(1)
            .and_then(Self::from_index)
            .unwrap_or(Self::MIN)
    }
    /// Largest level with a scale of at most `scale`, or [`ZoomLevel::MIN`] if they're all too big.
    #[must_use]
    pub fn at_most(scale: f64) -> Self {
        <Self as strum::IntoEnumIterator>::iter()
            .take_while(|level| level.scale() <= scale)
            .last()
            .unwrap_or(Self::MIN)
    }
    /// Zoom level for showing a `canvas` sized document in a `viewport` sized area.
    #[must_use]
    pub fn fitting(canvas: [u32; 2], viewport: [f64; 2], mode: AutoZoom) -> Self {
        let fit_width = viewport[0] / f64::from(canvas[0].max(1));
        let fit_height = viewport[1] / f64::from(canvas[1].max(1));
        let ideal = match mode {
            AutoZoom::FitSpace => fit_width.min(fit_height),
            AutoZoom::FitWidth => fit_width,
            AutoZoom::FitHeight => fit_height,
            AutoZoom::ActualPixels => return Self::Z100,
        };
        // Opening a tiny image shouldn't blow it up to fill the screen.
        Self::at_most(ideal.min(1.0))
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let percent = self.percent();
        if (percent - percent.round()).abs() < 1e-9 {
            write!(f, "{percent:.0}%")
        } else {
            write!(f, "{percent:.1}%")
        }
    }
}
