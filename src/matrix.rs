//! Flow matrices over a function's variable universe.
//!
//! A matrix summarizes one code region: entry `(i, j)` is the grade with
//! which the *final* value of variable `j` depends on the *initial* value of
//! variable `i`. The identity matrix (diagonal `m`, `0` elsewhere) is the
//! matrix of the empty statement.
//!
//! Three operations build everything else:
//!
//! - [`Matrix::choice`] --- branch merge, pointwise [`Grade::sum`];
//! - [`Matrix::seq`] --- sequential composition, max-plus matrix product;
//! - [`Matrix::closure`] --- `I + A + A·A + …`, the loop summary.
//!
//! After a closure, a loop correction replaces the gradings that the loop
//! rules forbid with `∞` (see [`Matrix::while_correction`] and
//! [`Matrix::loop_correction`]).

use std::fmt;

use log::trace;

use crate::grade::Grade;
use crate::types::Var;

/// A dense square matrix of flow grades, row-major.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Matrix {
    size: usize,
    data: Vec<Grade>,
}

impl Matrix {
    /// All-`Zero` matrix of the given size.
    pub fn zero(size: usize) -> Self {
        Self {
            size,
            data: vec![Grade::Zero; size * size],
        }
    }

    /// Identity matrix: `m` on the diagonal, `0` elsewhere.
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zero(size);
        for i in 0..size {
            m.data[i * size + i] = Grade::Max;
        }
        m
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: Var, j: Var) -> Grade {
        self.data[i.index() * self.size + j.index()]
    }

    pub fn set(&mut self, i: Var, j: Var, grade: Grade) {
        self.data[i.index() * self.size + j.index()] = grade;
    }

    /// Column `j` as a vector indexed by source variable.
    pub fn column(&self, j: Var) -> Vec<Grade> {
        (0..self.size)
            .map(|i| self.data[i * self.size + j.index()])
            .collect()
    }

    /// Clear column `j` and fill it with the given entries.
    ///
    /// This is the shape of every assignment derivation: the target's
    /// column is replaced wholesale, all other columns keep the identity.
    pub fn replace_column(&mut self, j: Var, entries: &[(Var, Grade)]) {
        for i in 0..self.size {
            self.data[i * self.size + j.index()] = Grade::Zero;
        }
        for &(i, grade) in entries {
            let cell = &mut self.data[i.index() * self.size + j.index()];
            *cell = cell.sum(grade);
        }
    }

    /// Pointwise sum: the merge of two alternative executions.
    pub fn choice(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.size, other.size, "Matrix sizes must match");
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a.sum(b))
            .collect();
        Matrix {
            size: self.size,
            data,
        }
    }

    /// Max-plus matrix product: `self` executed first, then `other`.
    ///
    /// `(self · other)[i][j] = Σ_k self[i][k] × other[k][j]` where `Σ` is
    /// the grade sum (max) and `×` the grade product.
    pub fn seq(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.size, other.size, "Matrix sizes must match");
        let n = self.size;
        let mut out = Matrix::zero(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.data[i * n + k];
                if a.is_zero() {
                    continue;
                }
                for j in 0..n {
                    let cell = &mut out.data[i * n + j];
                    *cell = cell.sum(a.prod(other.data[k * n + j]));
                }
            }
        }
        out
    }

    /// Fixpoint of sequential self-composition: `I + A + A·A + …`.
    ///
    /// Entries only ever increase and the grade chain is finite, so this
    /// terminates. The result summarizes any nonnegative number of
    /// iterations of `self`.
    pub fn closure(&self) -> Matrix {
        let mut fix = Matrix::identity(self.size);
        let mut current = Matrix::identity(self.size);
        let mut rounds = 0usize;
        loop {
            current = current.seq(self);
            let next = fix.choice(&current);
            rounds += 1;
            if next == fix {
                trace!("closure converged after {} rounds", rounds);
                return fix;
            }
            fix = next;
        }
    }

    /// While-loop correction (the W rule): after a closure, a `p` anywhere
    /// or a `w` on the diagonal means the iteration count itself feeds the
    /// growth, so the grading is unsound for an unbounded loop and the
    /// entry becomes `∞`.
    ///
    /// ```text
    /// Before:               After:
    /// | m  0  0  0  0 |     | m  0  0  0  0 |
    /// | 0  w  0  p  0 |     | 0  ∞  0  ∞  0 |
    /// | 0  0  m  0  0 |     | 0  0  m  0  0 |
    /// | w  0  0  m  0 |     | w  0  0  m  0 |
    /// | 0  0  0  0  p |     | 0  0  0  0  ∞ |
    /// ```
    pub fn while_correction(&mut self) {
        let n = self.size;
        for i in 0..n {
            for j in 0..n {
                let g = self.data[i * n + j];
                if g == Grade::Poly || (g == Grade::Weak && i == j) {
                    self.data[i * n + j] = Grade::Infty;
                }
            }
        }
    }

    /// Bounded-loop correction (the L rule), for `loop x { … }` where the
    /// iteration count is the initial value of `x`: any non-`m` diagonal
    /// entry becomes `∞`, and every surviving `p` at column `j` also feeds
    /// `p` from the counter's row into `j` (the count now drives that
    /// growth).
    pub fn loop_correction(&mut self, counter: Var) {
        let n = self.size;
        for i in 0..n {
            for j in 0..n {
                let g = self.data[i * n + j];
                if i == j && !matches!(g, Grade::Max) {
                    self.data[i * n + j] = Grade::Infty;
                } else if g == Grade::Poly {
                    let cell = &mut self.data[counter.index() * n + j];
                    *cell = cell.sum(Grade::Poly);
                }
            }
        }
    }

    /// Pointwise "at least as tight everywhere": `self[i][j] <= other[i][j]`
    /// for all entries. This is the dominance order of the reducer.
    pub fn le(&self, other: &Matrix) -> bool {
        assert_eq!(self.size, other.size, "Matrix sizes must match");
        self.data.iter().zip(&other.data).all(|(&a, &b)| a <= b)
    }

    pub fn has_infty(&self) -> bool {
        self.data.iter().any(|g| g.is_infty())
    }

    pub fn column_has_infty(&self, j: Var) -> bool {
        (0..self.size).any(|i| self.data[i * self.size + j.index()].is_infty())
    }

    /// All `(source, target)` pairs graded `∞`.
    pub fn infty_pairs(&self) -> Vec<(Var, Var)> {
        let mut pairs = Vec::new();
        for i in 0..self.size {
            for j in 0..self.size {
                if self.data[i * self.size + j].is_infty() {
                    pairs.push((Var::new(i), Var::new(j)));
                }
            }
        }
        pairs
    }

    /// Total grade weight, used to order candidates when a set is capped.
    pub fn weight(&self) -> u64 {
        self.data.iter().map(|g| g.rank() as u64).sum()
    }

    /// Entry grades in row-major order; the deterministic tie-break for
    /// equal-weight candidates.
    pub(crate) fn entries(&self) -> &[Grade] {
        &self.data
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix({}x{})", self.size, self.size)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "|")?;
            for j in 0..self.size {
                write!(f, " {}", self.data[i * self.size + j])?;
            }
            write!(f, " |")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> Var {
        Var::new(i)
    }

    #[test]
    fn test_identity_is_seq_neutral() {
        let mut a = Matrix::identity(3);
        a.set(v(0), v(1), Grade::Weak);
        a.set(v(2), v(1), Grade::Poly);
        let id = Matrix::identity(3);
        assert_eq!(a.seq(&id), a);
        assert_eq!(id.seq(&a), a);
    }

    #[test]
    fn test_choice_is_pointwise_max() {
        let mut a = Matrix::identity(2);
        a.set(v(0), v(1), Grade::Weak);
        let mut b = Matrix::identity(2);
        b.set(v(0), v(1), Grade::Max);
        b.set(v(1), v(0), Grade::Poly);
        let c = a.choice(&b);
        assert_eq!(c.get(v(0), v(1)), Grade::Weak);
        assert_eq!(c.get(v(1), v(0)), Grade::Poly);
        assert_eq!(c.get(v(0), v(0)), Grade::Max);
    }

    #[test]
    fn test_seq_chains_paths() {
        // a: x -> y with w;  b: y -> z with m.  Composed: x -> z with w.
        let mut a = Matrix::identity(3);
        a.set(v(0), v(1), Grade::Weak);
        let mut b = Matrix::identity(3);
        b.set(v(1), v(2), Grade::Max);
        let c = a.seq(&b);
        assert_eq!(c.get(v(0), v(2)), Grade::Weak);
        assert_eq!(c.get(v(0), v(1)), Grade::Weak);
        assert_eq!(c.get(v(1), v(2)), Grade::Max);
    }

    #[test]
    fn test_closure_is_fixpoint() {
        let mut a = Matrix::identity(3);
        a.set(v(0), v(1), Grade::Weak);
        a.set(v(1), v(2), Grade::Max);
        let c = a.closure();
        assert_eq!(c.seq(&c), c);
        // Transitive edge appears in the closure:
        assert_eq!(c.get(v(0), v(2)), Grade::Weak);
    }

    #[test]
    fn test_closure_of_identity() {
        let id = Matrix::identity(4);
        assert_eq!(id.closure(), id);
    }

    #[test]
    fn test_while_correction() {
        let mut m = Matrix::identity(5);
        m.set(v(1), v(1), Grade::Weak);
        m.set(v(1), v(3), Grade::Poly);
        m.set(v(3), v(0), Grade::Weak);
        m.set(v(4), v(4), Grade::Poly);
        m.while_correction();
        assert_eq!(m.get(v(1), v(1)), Grade::Infty);
        assert_eq!(m.get(v(1), v(3)), Grade::Infty);
        assert_eq!(m.get(v(3), v(0)), Grade::Weak); // off-diagonal w survives
        assert_eq!(m.get(v(4), v(4)), Grade::Infty);
        assert_eq!(m.get(v(0), v(0)), Grade::Max);
    }

    #[test]
    fn test_loop_correction() {
        let mut m = Matrix::identity(3);
        m.set(v(1), v(1), Grade::Weak); // diagonal above m
        m.set(v(1), v(2), Grade::Poly); // p feeds the counter row
        m.loop_correction(v(0));
        assert_eq!(m.get(v(1), v(1)), Grade::Infty);
        assert_eq!(m.get(v(1), v(2)), Grade::Poly);
        assert_eq!(m.get(v(0), v(2)), Grade::Poly);
        assert_eq!(m.get(v(0), v(0)), Grade::Max);
    }

    #[test]
    fn test_dominance() {
        let id = Matrix::identity(2);
        let mut worse = Matrix::identity(2);
        worse.set(v(0), v(1), Grade::Poly);
        assert!(id.le(&worse));
        assert!(!worse.le(&id));
        assert!(id.le(&id));
    }

    #[test]
    fn test_replace_column() {
        let mut m = Matrix::identity(3);
        m.replace_column(v(2), &[(v(0), Grade::Max), (v(1), Grade::Poly)]);
        assert_eq!(m.get(v(0), v(2)), Grade::Max);
        assert_eq!(m.get(v(1), v(2)), Grade::Poly);
        assert_eq!(m.get(v(2), v(2)), Grade::Zero); // overwritten target
        assert_eq!(m.get(v(0), v(0)), Grade::Max); // identity elsewhere
    }

    #[test]
    fn test_replace_column_merges_repeats() {
        // x := y + y style: the same source twice merges by grade sum.
        let mut m = Matrix::identity(2);
        m.replace_column(v(1), &[(v(0), Grade::Max), (v(0), Grade::Poly)]);
        assert_eq!(m.get(v(0), v(1)), Grade::Poly);
    }
}
