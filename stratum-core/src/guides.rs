use crate::geom::{self, Affine, Point};

/// Horizontal and vertical guide lines, in document pixels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Guides {
    /// Y positions of horizontal guides.
    pub horizontals: Vec<f64>,
    /// X positions of vertical guides.
    pub verticals: Vec<f64>,
}

impl Guides {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.horizontals.is_empty() && self.verticals.is_empty()
    }
    /// Evenly spaced guides splitting a `width`x`height` canvas into a grid of cells.
    #[must_use]
    pub fn grid(width: u32, height: u32, columns: u32, rows: u32) -> Self {
        let split = |size: u32, parts: u32| -> Vec<f64> {
            let step = f64::from(size) / f64::from(parts.max(1));
            (1..parts).map(|i| f64::from(i) * step).collect()
        };
        Self {
            horizontals: split(height, rows),
            verticals: split(width, columns),
        }
    }
    /// Follow a change of document coordinates. Only the axis-aligned part of `affine` applies,
    /// guides can't rotate.
    pub fn transform(&mut self, affine: &Affine) {
        for y in &mut self.horizontals {
            *y = geom::transform_point(affine, Point::new(0.0, *y)).y;
        }
        for x in &mut self.verticals {
            *x = geom::transform_point(affine, Point::new(*x, 0.0)).x;
        }
    }
}

#[cfg(test)]
mod test {
    use super::Guides;

    #[test]
    fn grid_and_transform() {
        let mut guides = Guides::grid(300, 100, 3, 2);
        assert_eq!(guides.verticals, [100.0, 200.0]);
        assert_eq!(guides.horizontals, [50.0]);
        guides.transform(&crate::geom::translation(-10.0, 5.0));
        assert_eq!(guides.verticals, [90.0, 190.0]);
        assert_eq!(guides.horizontals, [55.0]);
        assert!(Guides::grid(10, 10, 1, 1).is_empty());
    }
}
