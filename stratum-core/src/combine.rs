//! # Shape combiner
//!
//! How a freshly drawn selection shape merges with the selection that's already there.

use crate::geom::Region;

#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Combination {
    /// Throw away the existing selection.
    #[default]
    Replace,
    Add,
    Subtract,
    Intersect,
}

impl Combination {
    /// Combine an existing selection with a new shape. Pure, neither input is modified.
    #[must_use]
    pub fn combine(self, existing: &Region, new: &Region) -> Region {
        match self {
            Self::Replace => new.clone(),
            Self::Add => existing.union(new),
            Self::Subtract => existing.difference(new),
            Self::Intersect => existing.intersection(new),
        }
    }
}
