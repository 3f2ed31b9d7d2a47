//! Rendering candidate matrices as mwp-bound expressions.
//!
//! A column of a concrete (∞-free) matrix reads directly as a bound on the
//! variable's final value: `m`-sources go under a `max`, `w`-sources add,
//! `p`-sources multiply --- `v' ≤ max(m…, w + …) + p * …`. Bounds are pure
//! post-processing of the candidate set and can be switched off.

use std::fmt;

use crate::grade::Grade;
use crate::types::Universe;

/// The bound for one variable, as the three source lists.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MwpBound {
    /// Sources flowing with grade `m` (max-bounded).
    pub max: Vec<String>,
    /// Sources flowing with grade `w` (additive).
    pub add: Vec<String>,
    /// Sources flowing with grade `p` (multiplicative).
    pub mul: Vec<String>,
}

impl MwpBound {
    /// Read an ∞-free matrix column, indexed by source variable.
    ///
    /// # Panics
    ///
    /// Panics if the column contains `∞`; callers must pick an ∞-free
    /// alternative first.
    pub fn from_column(universe: &Universe, column: &[Grade]) -> Self {
        let mut bound = MwpBound::default();
        for source in universe.vars() {
            let name = universe.name(source).to_string();
            match column[source.index()] {
                Grade::Zero => {}
                Grade::Max => bound.max.push(name),
                Grade::Weak => bound.add.push(name),
                Grade::Poly => bound.mul.push(name),
                Grade::Infty => panic!("Cannot express a bound over an ∞ entry"),
            }
        }
        bound
    }

    pub fn is_empty(&self) -> bool {
        self.max.is_empty() && self.add.is_empty() && self.mul.is_empty()
    }
}

impl fmt::Display for MwpBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        let additive = self.add.join("+");
        let head = match (self.max.is_empty(), additive.is_empty()) {
            (false, false) => format!("max({},{})", self.max.join(","), additive),
            (false, true) => {
                if self.max.len() > 1 {
                    format!("max({})", self.max.join(","))
                } else {
                    self.max[0].clone()
                }
            }
            (true, false) => additive,
            (true, true) => String::new(),
        };
        let product = self.mul.join("*");
        match (head.is_empty(), product.is_empty()) {
            (false, false) => write!(f, "{}+{}", head, product),
            (false, true) => write!(f, "{}", head),
            (true, false) => write!(f, "{}", product),
            (true, true) => unreachable!(),
        }
    }
}

/// Per-variable bounds for one function.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Bound {
    entries: Vec<(String, MwpBound)>,
}

impl Bound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, variable: &str, bound: MwpBound) {
        self.entries.push((variable.to_string(), bound));
    }

    pub fn get(&self, variable: &str) -> Option<&MwpBound> {
        self.entries
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, b)| b)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MwpBound)> {
        self.entries.iter().map(|(n, b)| (n.as_str(), b))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, bound) in &self.entries {
            if !first {
                write!(f, " ∧ ")?;
            }
            write!(f, "{}' ≤ {}", name, bound)?;
            first = false;
        }
        Ok(())
    }
}
