//! Type-safe parameter keys.

use std::fmt;
use std::hash::Hash;

/// A key naming one searchable dimension.
///
/// `Ord` gives every search space a fixed dimension order, which the
/// optimizers rely on when mapping points to vectors.
pub trait ParamKey: Copy + Eq + Ord + Hash + fmt::Debug {
    /// Name as written in observation logs.
    fn name(&self) -> &'static str;
}

/// The dimensions of the fly hash search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlyParam {
    /// Inverse regularisation strength.
    C,
    /// Number of hidden units.
    KcSize,
    /// Inputs per hidden unit.
    ProjSize,
    /// Words kept per document.
    TopWord,
}

impl FlyParam {
    /// All dimensions in order.
    pub const ALL: [FlyParam; 4] = [Self::C, Self::KcSize, Self::ProjSize, Self::TopWord];

    /// Look a dimension up by its log name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl ParamKey for FlyParam {
    fn name(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::KcSize => "KC_size",
            Self::ProjSize => "proj_size",
            Self::TopWord => "topword",
        }
    }
}

impl fmt::Display for FlyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
