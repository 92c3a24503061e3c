use super::{Point, Rect, Region};

/// Geometric shapes that selection tools produce, before they're turned into [`Region`]s.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Rect(Rect),
    /// Ellipse inscribed in the rect.
    Ellipse(Rect),
    /// Closed polygon, even-odd fill.
    Polygon(Vec<Point>),
}

impl Shape {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(rect) | Self::Ellipse(rect) => *rect,
            Self::Polygon(points) => {
                let (min, max) = points.iter().fold(
                    (Point::new(f64::MAX, f64::MAX), Point::new(f64::MIN, f64::MIN)),
                    |(min, max), p| {
                        (
                            Point::new(min.x.min(p.x), min.y.min(p.y)),
                            Point::new(max.x.max(p.x), max.y.max(p.y)),
                        )
                    },
                );
                if points.is_empty() {
                    Rect::default()
                } else {
                    Rect::from_corners(min, max)
                }
            }
        }
    }
    /// Convert to a region.
    ///
    /// Rects are converted exactly. Curved and slanted edges are sampled once per pixel row at the
    /// row's centre, with span ends rounded to the pixel grid, so the result is made of whole
    /// pixels like any other pixel selection.
    #[must_use]
    pub fn to_region(&self) -> Region {
        match self {
            Self::Rect(rect) => Region::rect(*rect),
            Self::Ellipse(rect) => {
                if rect.is_empty() {
                    return Region::empty();
                }
                let center = rect.center();
                let (rx, ry) = (rect.width / 2.0, rect.height / 2.0);
                scanlines(*rect, |y| {
                    let dy = (y - center.y) / ry;
                    let inside = 1.0 - dy * dy;
                    if inside <= 0.0 {
                        return Vec::new();
                    }
                    let half = rx * inside.sqrt();
                    vec![(center.x - half, center.x + half)]
                })
            }
            Self::Polygon(points) => {
                if points.len() < 3 {
                    return Region::empty();
                }
                scanlines(self.bounds(), |y| {
                    let mut crossings: Vec<f64> = points
                        .iter()
                        .zip(points.iter().cycle().skip(1))
                        .filter_map(|(a, b)| {
                            // Half-open so shared vertices aren't counted twice.
                            if (a.y <= y) == (b.y <= y) {
                                return None;
                            }
                            let t = (y - a.y) / (b.y - a.y);
                            Some(a.x + t * (b.x - a.x))
                        })
                        .collect();
                    crossings.sort_by(f64::total_cmp);
                    crossings
                        .chunks_exact(2)
                        .map(|pair| (pair[0], pair[1]))
                        .collect()
                })
            }
        }
    }
}

/// Sample `spans_at` at each pixel row centre within `bounds`, snapping span ends to whole pixels.
fn scanlines(bounds: Rect, spans_at: impl Fn(f64) -> Vec<(f64, f64)>) -> Region {
    let bounds = bounds.round_out();
    let (top, bottom) = (bounds.y as i64, bounds.bottom() as i64);
    Region::from_rows((top..bottom).map(|row| {
        let y = row as f64;
        let spans = spans_at(y + 0.5)
            .into_iter()
            .map(|(start, end)| (start.round(), end.round()))
            .collect();
        (y, spans)
    }))
}

impl From<Shape> for Region {
    fn from(shape: Shape) -> Self {
        shape.to_region()
    }
}
