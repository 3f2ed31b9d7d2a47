//! Flow grades: the scalar values of the mwp analysis.
//!
//! A grade classifies how a value can grow relative to one of its
//! dependencies: not at all (`Zero`), bounded by the maximum of its sources
//! (`Max`), additively (`Weak`), polynomially (`Poly`), or not boundable by
//! any polynomial (`Infty`). The grades form a totally ordered set
//! `0 < m < w < p < ∞` ("no worse than"), with two operations:
//!
//! - [`Grade::sum`] merges alternatives (branch union): the worse of the two.
//! - [`Grade::prod`] concatenates flow legs (sequential paths): `Zero` cuts
//!   the path, `Infty` poisons it, otherwise the worse leg wins.

use std::fmt;

/// A scalar flow grade.
///
/// The derived `Ord` is the pointwise "no worse than" order used everywhere
/// in the analysis: `Zero < Max < Weak < Poly < Infty`.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Grade {
    /// No dependency.
    #[default]
    Zero,
    /// Value copied or bounded by the max of its sources.
    Max,
    /// Value can accumulate additively.
    Weak,
    /// Value can grow polynomially (multiplicative flow).
    Poly,
    /// Growth cannot be bounded by any finite grade.
    Infty,
}

impl Grade {
    /// All grades in ascending order.
    pub const ALL: [Grade; 5] = [
        Grade::Zero,
        Grade::Max,
        Grade::Weak,
        Grade::Poly,
        Grade::Infty,
    ];

    /// Sum of two grades (choice union): the maximum.
    ///
    /// ```text
    /// +  | 0  m  w  p  ∞
    /// ---+---------------
    /// 0  | 0  m  w  p  ∞
    /// m  | m  m  w  p  ∞
    /// w  | w  w  w  p  ∞
    /// p  | p  p  p  p  ∞
    /// ∞  | ∞  ∞  ∞  ∞  ∞
    /// ```
    pub fn sum(self, other: Grade) -> Grade {
        self.max(other)
    }

    /// Product of two grades (path concatenation).
    ///
    /// `Zero` annihilates finite grades (no path through an absent edge),
    /// `Infty` absorbs everything including `Zero`, and two finite legs
    /// combine to the worse of the two:
    ///
    /// ```text
    /// ×  | 0  m  w  p  ∞
    /// ---+---------------
    /// 0  | 0  0  0  0  ∞
    /// m  | 0  m  w  p  ∞
    /// w  | 0  w  w  p  ∞
    /// p  | 0  p  p  p  ∞
    /// ∞  | ∞  ∞  ∞  ∞  ∞
    /// ```
    pub fn prod(self, other: Grade) -> Grade {
        if self == Grade::Infty || other == Grade::Infty {
            Grade::Infty
        } else if self == Grade::Zero || other == Grade::Zero {
            Grade::Zero
        } else {
            self.max(other)
        }
    }

    pub fn is_zero(self) -> bool {
        self == Grade::Zero
    }

    pub fn is_infty(self) -> bool {
        self == Grade::Infty
    }

    /// Position in the grade chain, used as a weight when capping
    /// candidate sets.
    pub fn rank(self) -> u32 {
        match self {
            Grade::Zero => 0,
            Grade::Max => 1,
            Grade::Weak => 2,
            Grade::Poly => 3,
            Grade::Infty => 4,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Grade::Zero => "0",
            Grade::Max => "m",
            Grade::Weak => "w",
            Grade::Poly => "p",
            Grade::Infty => "∞",
        };
        write!(f, "{}", c)
    }
}
