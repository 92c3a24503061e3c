//! # Regions
//!
//! An area of the plane, stored as horizontal bands of disjoint spans. The representation is kept
//! canonical after every operation:
//! * bands are sorted top to bottom and don't overlap,
//! * each band has at least one span, spans are sorted and neither overlap nor touch,
//! * vertically touching bands never have identical spans (they'd have been merged).
//!
//! Thanks to this, two regions covering the same area compare equal with `==`, and boolean
//! operations never lose precision, since they only ever reuse coordinates they were given.

use smallvec::SmallVec;

use super::{Affine, Point, Rect, Shape, Vector};

#[derive(Copy, Clone, Debug, PartialEq)]
struct Span {
    start: f64,
    end: f64,
}

type Spans = SmallVec<[Span; 2]>;

#[derive(Clone, Debug, PartialEq)]
struct Band {
    top: f64,
    bottom: f64,
    spans: Spans,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Region {
    bands: Vec<Band>,
}

impl Region {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn rect(rect: Rect) -> Self {
        if rect.is_empty() {
            return Self::empty();
        }
        Self {
            bands: vec![Band {
                top: rect.y,
                bottom: rect.bottom(),
                spans: smallvec::smallvec![Span {
                    start: rect.x,
                    end: rect.right(),
                }],
            }],
        }
    }
    /// Union of many rects.
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        rects
            .into_iter()
            .fold(Self::empty(), |acc, rect| acc.union(&Self::rect(rect)))
    }
    #[must_use]
    pub fn from_shape(shape: &Shape) -> Self {
        shape.to_region()
    }
    /// Build from bands that are sorted and disjoint but maybe not merged.
    fn from_bands(bands: impl IntoIterator<Item = Band>) -> Self {
        let mut out: Vec<Band> = Vec::new();
        for band in bands {
            if band.spans.is_empty() || band.bottom <= band.top {
                continue;
            }
            match out.last_mut() {
                Some(last) if last.bottom == band.top && last.spans == band.spans => {
                    last.bottom = band.bottom;
                }
                _ => out.push(band),
            }
        }
        Self { bands: out }
    }

    /// Build from one-pixel-tall rows given top to bottom. Spans within a row may be in any order
    /// and may overlap.
    pub(crate) fn from_rows(rows: impl IntoIterator<Item = (f64, Vec<(f64, f64)>)>) -> Self {
        Self::from_bands(rows.into_iter().map(|(top, mut spans)| {
            spans.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut merged = Spans::new();
            for (start, end) in spans {
                if end <= start {
                    continue;
                }
                match merged.last_mut() {
                    Some(last) if start <= last.end => last.end = last.end.max(end),
                    _ => merged.push(Span { start, end }),
                }
            }
            Band {
                top,
                bottom: top + 1.0,
                spans: merged,
            }
        }))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
    /// Bounding rect, or `None` if empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.bands.first()?;
        let last = self.bands.last()?;
        let (left, right) = self.bands.iter().fold((f64::MAX, f64::MIN), |(l, r), band| {
            // Non-empty by invariant.
            let start = band.spans.first().map_or(l, |s| s.start);
            let end = band.spans.last().map_or(r, |s| s.end);
            (l.min(start), r.max(end))
        });
        Some(Rect::new(left, first.top, right - left, last.bottom - first.top))
    }
    #[must_use]
    pub fn area(&self) -> f64 {
        self.bands
            .iter()
            .map(|band| {
                let width: f64 = band.spans.iter().map(|s| s.end - s.start).sum();
                width * (band.bottom - band.top)
            })
            .sum()
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.band_at(point.y).is_some_and(|band| {
            band.spans
                .iter()
                .any(|span| point.x >= span.start && point.x < span.end)
        })
    }
    /// The disjoint rectangles making up this region, top to bottom, left to right.
    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.bands.iter().flat_map(|band| {
            band.spans.iter().map(move |span| {
                Rect::new(
                    span.start,
                    band.top,
                    span.end - span.start,
                    band.bottom - band.top,
                )
            })
        })
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.boolean(other, |a, b| a || b)
    }
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        self.boolean(other, |a, b| a && b)
    }
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.boolean(other, |a, b| a && !b)
    }
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        self.boolean(other, |a, b| a != b)
    }
    /// Everything within `within` that is not in `self`.
    #[must_use]
    pub fn complement(&self, within: Rect) -> Self {
        Self::rect(within).difference(self)
    }
    #[must_use]
    pub fn translated(&self, by: Vector) -> Self {
        Self {
            bands: self
                .bands
                .iter()
                .map(|band| Band {
                    top: band.top + by.y,
                    bottom: band.bottom + by.y,
                    spans: band
                        .spans
                        .iter()
                        .map(|span| Span {
                            start: span.start + by.x,
                            end: span.end + by.x,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
    /// Map through an affine transform.
    ///
    /// Exact for translations and axis-aligned scales (incl. flips). Anything with rotation or
    /// shear is resampled at pixel centres, see [`Shape::to_region`].
    #[must_use]
    pub fn transformed(&self, affine: &Affine) -> Self {
        if !super::is_axis_aligned(affine) {
            return Self::from_regions(self.rects().map(|rect| {
                Shape::Polygon(
                    rect.corners()
                        .iter()
                        .map(|p| super::transform_point(affine, *p))
                        .collect(),
                )
                .to_region()
            }));
        }
        let (sx, sy) = (affine.x.x, affine.y.y);
        let (tx, ty) = (affine.z.x, affine.z.y);
        if sx == 0.0 || sy == 0.0 {
            return Self::empty();
        }
        let map = |a: f64, b: f64, scale: f64, offset: f64| {
            let (a, b) = (a * scale + offset, b * scale + offset);
            if a <= b {
                (a, b)
            } else {
                (b, a)
            }
        };
        let mut bands: Vec<Band> = self
            .bands
            .iter()
            .map(|band| {
                let (top, bottom) = map(band.top, band.bottom, sy, ty);
                let mut spans: Spans = band
                    .spans
                    .iter()
                    .map(|span| {
                        let (start, end) = map(span.start, span.end, sx, tx);
                        Span { start, end }
                    })
                    .collect();
                if sx < 0.0 {
                    spans.reverse();
                }
                Band { top, bottom, spans }
            })
            .collect();
        if sy < 0.0 {
            bands.reverse();
        }
        Self::from_bands(bands)
    }
    fn from_regions(regions: impl Iterator<Item = Self>) -> Self {
        regions.fold(Self::empty(), |acc, region| acc.union(&region))
    }

    /// Boundary of the region as line segments, for drawing an outline (marching ants).
    /// Horizontal edges come first, then vertical ones.
    #[must_use]
    pub fn outline(&self) -> Vec<[Point; 2]> {
        let mut segments = Vec::new();
        let empty = Spans::new();

        // Horizontal edges sit wherever coverage differs between the band above and below.
        let mut edges: Vec<f64> = self
            .bands
            .iter()
            .flat_map(|band| [band.top, band.bottom])
            .collect();
        edges.dedup();
        for y in edges {
            let above = self
                .bands
                .iter()
                .find(|band| band.bottom == y)
                .map_or(&empty, |band| &band.spans);
            let below = self
                .bands
                .iter()
                .find(|band| band.top == y)
                .map_or(&empty, |band| &band.spans);
            for span in combine_spans(above, below, |a, b| a != b) {
                segments.push([Point::new(span.start, y), Point::new(span.end, y)]);
            }
        }
        // Every span end is a vertical edge, as spans never touch.
        for band in &self.bands {
            for span in &band.spans {
                for x in [span.start, span.end] {
                    segments.push([Point::new(x, band.top), Point::new(x, band.bottom)]);
                }
            }
        }
        segments
    }

    fn band_at(&self, y: f64) -> Option<&Band> {
        let idx = self.bands.partition_point(|band| band.bottom <= y);
        self.bands.get(idx).filter(|band| band.top <= y)
    }
    fn boolean(&self, other: &Self, op: impl Fn(bool, bool) -> bool + Copy) -> Self {
        let mut ys: Vec<f64> = self
            .bands
            .iter()
            .chain(&other.bands)
            .flat_map(|band| [band.top, band.bottom])
            .collect();
        ys.sort_by(f64::total_cmp);
        ys.dedup();

        let empty = Spans::new();
        let bands = ys.windows(2).map(|pair| {
            let (top, bottom) = (pair[0], pair[1]);
            // Every band edge is in `ys`, so each band either fully covers [top, bottom) or misses it.
            let a = self.band_at(top).map_or(&empty, |band| &band.spans);
            let b = other.band_at(top).map_or(&empty, |band| &band.spans);
            Band {
                top,
                bottom,
                spans: combine_spans(a, b, op),
            }
        });
        Self::from_bands(bands)
    }
}

/// 1D version of [`Region::boolean`].
fn combine_spans(a: &Spans, b: &Spans, op: impl Fn(bool, bool) -> bool) -> Spans {
    let mut xs: SmallVec<[f64; 8]> = a
        .iter()
        .chain(b)
        .flat_map(|span| [span.start, span.end])
        .collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();

    let covers = |spans: &Spans, x: f64| spans.iter().any(|s| s.start <= x && x < s.end);
    let mut out = Spans::new();
    for pair in xs.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if !op(covers(a, start), covers(b, start)) {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.end == start => last.end = end,
            _ => out.push(Span { start, end }),
        }
    }
    out
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::rect(rect)
    }
}
