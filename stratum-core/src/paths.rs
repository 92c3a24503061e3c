//! Pen tool paths. Unlike the selection, paths follow every change of document coordinates,
//! including the ones replayed by undo and redo.

use crate::geom::{self, Affine, Point};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub anchors: Vec<Point>,
    pub closed: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paths {
    paths: Vec<Path>,
    active: Option<usize>,
}

impl Paths {
    #[must_use]
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }
    /// Add a path and make it active.
    pub fn add(&mut self, path: Path) {
        self.paths.push(path);
        self.active = Some(self.paths.len() - 1);
    }
    #[must_use]
    pub fn active(&self) -> Option<&Path> {
        self.paths.get(self.active?)
    }
    pub fn active_mut(&mut self) -> Option<&mut Path> {
        self.paths.get_mut(self.active?)
    }
    pub fn transform(&mut self, affine: &Affine) {
        for anchor in self.paths.iter_mut().flat_map(|path| &mut path.anchors) {
            *anchor = geom::transform_point(affine, *anchor);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn active_follows_add() {
        let mut paths = Paths::default();
        assert!(paths.active().is_none());
        paths.add(Path::default());
        paths.add(Path {
            anchors: vec![Point::new(1.0, 2.0)],
            closed: false,
        });
        assert_eq!(paths.active().unwrap().anchors.len(), 1);
        paths.transform(&geom::scaling(2.0, 2.0));
        assert_eq!(paths.active().unwrap().anchors[0], Point::new(2.0, 4.0));
    }
}
