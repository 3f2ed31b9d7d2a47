//! Candidate sets: all essentially-different sound derivations of a region.
//!
//! The proof system underlying the analysis admits several derivations for
//! the same region (a sum can be graded three ways), so a region's result is
//! a *set* of flow matrices. Left unchecked the set grows as `3^k` in the
//! number of gradable statements, and for *independent* statements the
//! alternatives are pairwise incomparable --- no amount of dominance
//! filtering shrinks that product. Two mechanisms keep the representation
//! small:
//!
//! - **Dominance reduction**: after every merge, only the Pareto-minimal
//!   antichain is kept. Sound because a dominated candidate can never
//!   provide a better bound than its dominator.
//! - **Factoring**: a set is stored as a product of independent *factors*,
//!   each holding the alternatives for a private group of columns. Choices
//!   that never interact (assignments to disjoint targets) stay in separate
//!   factors, so `k` independent three-way sums cost `3k` stored matrices
//!   instead of `3^k`. Factors are flattened into one only when a later
//!   statement actually reads or overwrites their columns.
//!
//! A set also carries the number of raw derivations it summarizes (which can
//! be astronomically larger than the representation) and a flag recording
//! whether the configured candidate cap ever forced a truncation.

use std::collections::BTreeSet;

use num_bigint::BigUint;

use log::{debug, warn};

use crate::grade::Grade;
use crate::matrix::Matrix;
use crate::types::Var;

/// Which loop rule to apply after a closure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopRule {
    /// `while`: iteration count unknown.
    While,
    /// Bounded loop driven by the initial value of the counter variable.
    Bounded(Var),
}

/// One independent choice group: the alternative matrices for a private set
/// of columns.
///
/// `writes` are the columns where some alternative differs from the
/// identity; `reads` are the rows feeding those columns. Two factors are
/// independent when neither writes a column the other writes or reads;
/// independent factors compose to a plain column merge, in any order, so
/// the set can keep them apart instead of multiplying them out.
#[derive(Debug, Clone)]
struct Factor {
    items: Vec<Matrix>,
    writes: BTreeSet<Var>,
    reads: BTreeSet<Var>,
}

impl Factor {
    fn new(items: Vec<Matrix>) -> Self {
        assert!(!items.is_empty(), "A factor cannot be empty");
        let size = items[0].size();
        let identity = Matrix::identity(size);
        let mut writes = BTreeSet::new();
        for item in &items {
            for j in (0..size).map(Var::new) {
                if item.column(j) != identity.column(j) {
                    writes.insert(j);
                }
            }
        }
        let mut reads = BTreeSet::new();
        for item in &items {
            for &j in &writes {
                for i in (0..size).map(Var::new) {
                    if !item.get(i, j).is_zero() {
                        reads.insert(i);
                    }
                }
            }
        }
        Self { items, writes, reads }
    }

    fn independent(&self, other: &Factor) -> bool {
        self.writes.is_disjoint(&other.writes)
            && self.writes.is_disjoint(&other.reads)
            && other.writes.is_disjoint(&self.reads)
    }
}

/// A set of non-dominated flow matrices, stored as a product of independent
/// factors.
///
/// Matrices inside a set are never mutated; every operation builds new
/// values and reduces.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    size: usize,
    factors: Vec<Factor>,
    derivations: BigUint,
    truncated: bool,
}

impl CandidateSet {
    /// The set of the empty statement: the identity matrix alone.
    pub fn identity(size: usize) -> Self {
        Self {
            size,
            factors: Vec::new(),
            derivations: BigUint::from(1u32),
            truncated: false,
        }
    }

    /// Build a set from leaf candidates, reducing immediately.
    pub fn from_candidates(items: Vec<Matrix>) -> Self {
        assert!(!items.is_empty(), "A candidate set cannot be empty");
        let derivations = BigUint::from(items.len());
        Self::from_parts(items, derivations, false)
    }

    /// Build a set with an explicit derivation count, e.g. when a call
    /// site inherits the callee summary's count.
    pub(crate) fn from_parts(items: Vec<Matrix>, derivations: BigUint, truncated: bool) -> Self {
        assert!(!items.is_empty(), "A candidate set cannot be empty");
        let size = items[0].size();
        let mut set = Self {
            size,
            factors: Vec::new(),
            derivations,
            truncated,
        };
        set.push_factor(Self::reduce(items));
        set
    }

    /// Number of distinct candidate matrices the set denotes: the product
    /// of the factor sizes (saturating).
    pub fn len(&self) -> usize {
        self.factors
            .iter()
            .fold(1usize, |acc, f| acc.saturating_mul(f.items.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matrices actually held, summed across factors. For `k` independent
    /// three-way choices this is `3k` while [`len`][Self::len] is `3^k`.
    pub fn stored(&self) -> usize {
        self.factors.iter().map(|f| f.items.len()).sum()
    }

    /// Materialize every denoted candidate.
    ///
    /// The result has [`len`][Self::len] entries, which is exponential in
    /// the number of factors; composition never calls this across
    /// independent factors. Intended for flattening small sets (branch
    /// arms, loop bodies) and for tests.
    pub fn candidates(&self) -> Vec<Matrix> {
        let mut out = vec![Matrix::identity(self.size)];
        for factor in &self.factors {
            let mut next = Vec::with_capacity(out.len() * factor.items.len());
            for base in &out {
                for item in &factor.items {
                    next.push(base.seq(item));
                }
            }
            out = next;
        }
        out
    }

    /// The distinct alternatives the set admits for column `j`.
    ///
    /// A column lives entirely in the factor that writes it, so this is
    /// cheap even when [`len`][Self::len] is astronomical. Unwritten
    /// columns have the identity column as their only alternative.
    pub fn column_choices(&self, j: Var) -> Vec<Vec<Grade>> {
        for factor in &self.factors {
            if factor.writes.contains(&j) {
                let mut out: Vec<Vec<Grade>> = Vec::new();
                for item in &factor.items {
                    let column = item.column(j);
                    if !out.contains(&column) {
                        out.push(column);
                    }
                }
                return out;
            }
        }
        vec![Matrix::identity(self.size).column(j)]
    }

    /// Number of raw derivations this set summarizes (before reduction).
    pub fn derivations(&self) -> &BigUint {
        &self.derivations
    }

    /// True if the candidate cap ever discarded non-dominated candidates;
    /// the result is then a sound partial answer, not the full antichain.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Sequential composition: every candidate of `self` followed by every
    /// candidate of `other`.
    ///
    /// Factors of `other` that touch none of `self`'s columns are appended
    /// as-is; only genuinely interacting factors are multiplied out.
    pub fn seq(&self, other: &CandidateSet, cap: usize) -> CandidateSet {
        assert_eq!(self.size, other.size, "Set sizes must match");
        let mut out = self.clone();
        out.derivations = &self.derivations * &other.derivations;
        out.truncated = self.truncated || other.truncated;
        for factor in &other.factors {
            out.absorb(factor, cap);
        }
        out
    }

    /// Branch merge: every candidate of one arm against every candidate of
    /// the other, combined pointwise. Flattens both arms.
    pub fn choice(&self, other: &CandidateSet, cap: usize) -> CandidateSet {
        assert_eq!(self.size, other.size, "Set sizes must match");
        let left = self.candidates();
        let right = other.candidates();
        let mut items = Vec::with_capacity(left.len() * right.len());
        for a in &left {
            for b in &right {
                items.push(a.choice(b));
            }
        }
        let raw = items.len();
        let reduced = Self::reduce(items);
        debug!("merge: {} raw candidates, {} after reduction", raw, reduced.len());
        let mut out = CandidateSet {
            size: self.size,
            factors: Vec::new(),
            derivations: &self.derivations * &other.derivations,
            truncated: self.truncated || other.truncated,
        };
        let items = out.cap_items(reduced, cap);
        out.push_factor(items);
        out
    }

    /// Loop summary: close every candidate and apply the loop rule.
    /// Flattens, since iteration mixes all the body's columns.
    pub fn closure(&self, rule: LoopRule, cap: usize) -> CandidateSet {
        let items: Vec<Matrix> = self
            .candidates()
            .iter()
            .map(|m| {
                let mut closed = m.closure();
                match rule {
                    LoopRule::While => closed.while_correction(),
                    LoopRule::Bounded(counter) => closed.loop_correction(counter),
                }
                closed
            })
            .collect();
        let mut out = CandidateSet {
            size: self.size,
            factors: Vec::new(),
            derivations: self.derivations.clone(),
            truncated: self.truncated,
        };
        let items = out.cap_items(Self::reduce(items), cap);
        out.push_factor(items);
        out
    }

    /// Fold one incoming factor into the set: append it when it is
    /// independent of every resident factor, otherwise multiply it out
    /// with the factors it interacts with.
    fn absorb(&mut self, incoming: &Factor, cap: usize) {
        let factors = std::mem::take(&mut self.factors);
        let (kept, mixed): (Vec<Factor>, Vec<Factor>) =
            factors.into_iter().partition(|f| f.independent(incoming));
        self.factors = kept;
        if mixed.is_empty() {
            let items = self.cap_items(incoming.items.clone(), cap);
            self.push_factor(items);
            return;
        }
        let mut combined = vec![Matrix::identity(self.size)];
        for factor in &mixed {
            combined = Self::cross(&combined, &factor.items);
        }
        let combined = Self::cross(&combined, &incoming.items);
        let raw = combined.len();
        let reduced = Self::reduce(combined);
        debug!("merge: {} raw candidates, {} after reduction", raw, reduced.len());
        let items = self.cap_items(reduced, cap);
        self.push_factor(items);
    }

    fn cross(base: &[Matrix], items: &[Matrix]) -> Vec<Matrix> {
        let mut out = Vec::with_capacity(base.len() * items.len());
        for b in base {
            for m in items {
                out.push(b.seq(m));
            }
        }
        out
    }

    fn push_factor(&mut self, items: Vec<Matrix>) {
        let factor = Factor::new(items);
        // A factor whose alternatives are all the identity denotes nothing.
        if !factor.writes.is_empty() {
            self.factors.push(factor);
        }
    }

    /// Keep only the Pareto-minimal antichain: drop every candidate for
    /// which some retained candidate is pointwise no worse; equal matrices
    /// collapse to one representative.
    fn reduce(items: Vec<Matrix>) -> Vec<Matrix> {
        let mut kept: Vec<Matrix> = Vec::with_capacity(items.len());
        for m in items {
            // Dominated (or duplicate) candidates are discarded...
            if kept.iter().any(|k| k.le(&m)) {
                continue;
            }
            // ...and a new candidate evicts everything it dominates.
            kept.retain(|k| !m.le(k));
            kept.push(m);
        }
        kept
    }

    fn cap_items(&mut self, mut items: Vec<Matrix>, cap: usize) -> Vec<Matrix> {
        // A set must always keep at least one candidate.
        let cap = cap.max(1);
        if items.len() <= cap {
            return items;
        }
        warn!(
            "candidate set of {} exceeds cap {}; keeping lightest candidates",
            items.len(),
            cap
        );
        items.sort_by(|a, b| a.weight().cmp(&b.weight()).then_with(|| a.entries().cmp(b.entries())));
        items.truncate(cap);
        self.truncated = true;
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grade::Grade;

    const CAP: usize = 1024;

    fn v(i: usize) -> Var {
        Var::new(i)
    }

    fn with_entry(size: usize, i: usize, j: usize, g: Grade) -> Matrix {
        let mut m = Matrix::identity(size);
        m.set(v(i), v(j), g);
        m
    }

    /// Three-way alternatives for `target := a + b`.
    fn sum_choices(size: usize, target: usize, a: usize, b: usize) -> CandidateSet {
        let column = |ga, gb| {
            let mut m = Matrix::identity(size);
            m.replace_column(v(target), &[(v(a), ga), (v(b), gb)]);
            m
        };
        CandidateSet::from_candidates(vec![
            column(Grade::Max, Grade::Poly),
            column(Grade::Poly, Grade::Max),
            column(Grade::Weak, Grade::Weak),
        ])
    }

    #[test]
    fn test_reduce_drops_dominated() {
        let tight = Matrix::identity(2);
        let loose = with_entry(2, 0, 1, Grade::Poly);
        let set = CandidateSet::from_candidates(vec![loose, tight]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.candidates(), [Matrix::identity(2)]);
        assert_eq!(set.derivations(), &BigUint::from(2u32));
    }

    #[test]
    fn test_reduce_keeps_incomparable() {
        let a = with_entry(2, 0, 1, Grade::Weak);
        let b = with_entry(2, 1, 0, Grade::Weak);
        let set = CandidateSet::from_candidates(vec![a, b]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_reduce_collapses_duplicates() {
        let a = with_entry(3, 0, 1, Grade::Weak);
        let set = CandidateSet::from_candidates(vec![a.clone(), a.clone(), a]);
        assert_eq!(set.len(), 1);
        // All three raw derivations are still accounted for.
        assert_eq!(set.derivations(), &BigUint::from(3u32));
    }

    #[test]
    fn test_reduction_idempotent() {
        let a = with_entry(2, 0, 1, Grade::Weak);
        let b = with_entry(2, 1, 0, Grade::Poly);
        let once = CandidateSet::reduce(vec![a.clone(), b.clone()]);
        let twice = CandidateSet::reduce(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_antichain_property() {
        let items = vec![
            with_entry(3, 0, 1, Grade::Weak),
            with_entry(3, 0, 1, Grade::Poly),
            with_entry(3, 1, 2, Grade::Max),
            Matrix::identity(3),
        ];
        let set = CandidateSet::from_candidates(items);
        let candidates = set.candidates();
        for (i, a) in candidates.iter().enumerate() {
            for (j, b) in candidates.iter().enumerate() {
                if i != j {
                    assert!(!a.le(b), "reduced set must be an antichain");
                }
            }
        }
    }

    #[test]
    fn test_seq_with_identity_is_noop() {
        let a = with_entry(3, 0, 1, Grade::Weak);
        let b = with_entry(3, 1, 0, Grade::Weak);
        let set = CandidateSet::from_candidates(vec![a, b]);
        let id = CandidateSet::identity(3);
        let composed = set.seq(&id, CAP);
        assert_eq!(composed.candidates(), set.candidates());
        let composed = id.seq(&set, CAP);
        assert_eq!(composed.candidates(), set.candidates());
    }

    #[test]
    fn test_derivations_multiply() {
        let a = CandidateSet::from_candidates(vec![
            with_entry(2, 0, 1, Grade::Weak),
            with_entry(2, 1, 0, Grade::Weak),
        ]);
        let b = a.clone();
        let c = a.seq(&b, CAP);
        assert_eq!(c.derivations(), &BigUint::from(4u32));
    }

    // Choices over disjoint columns never interact, so sequencing them
    // keeps the factors apart: the denoted set is the full product while
    // the stored size only grows additively.
    #[test]
    fn test_independent_choices_stay_factored() {
        let mut set = CandidateSet::identity(6);
        set = set.seq(&sum_choices(6, 0, 1, 2), CAP);
        set = set.seq(&sum_choices(6, 3, 4, 5), CAP);
        assert_eq!(set.len(), 9);
        assert_eq!(set.stored(), 6);
        // Each column still offers exactly its own three alternatives.
        assert_eq!(set.column_choices(v(0)).len(), 3);
        assert_eq!(set.column_choices(v(3)).len(), 3);
        // Unwritten columns have the identity as their only alternative.
        assert_eq!(set.column_choices(v(1)).len(), 1);
        // Materializing yields the full antichain.
        assert_eq!(set.candidates().len(), 9);
    }

    // A statement reading a previously-written column forces the factors
    // to actually multiply out.
    #[test]
    fn test_dependent_choices_are_merged() {
        let mut set = CandidateSet::identity(4);
        set = set.seq(&sum_choices(4, 0, 1, 2), CAP);
        // Target 3 reads column 0, written above: one merged factor.
        set = set.seq(&sum_choices(4, 3, 0, 1), CAP);
        assert_eq!(set.len(), set.stored());
        assert!(set.len() > 3);
    }

    // Overwriting a column drops the earlier alternatives for it.
    #[test]
    fn test_overwrite_collapses_alternatives() {
        let mut set = CandidateSet::identity(3);
        set = set.seq(&sum_choices(3, 0, 1, 2), CAP);
        set = set.seq(&sum_choices(3, 0, 1, 2), CAP);
        assert_eq!(set.len(), 3);
        // Both rounds of raw derivations are still accounted for.
        assert_eq!(set.derivations(), &BigUint::from(9u32));
    }

    #[test]
    fn test_cap_truncates_and_flags() {
        let items = vec![
            with_entry(2, 0, 1, Grade::Max),
            with_entry(2, 1, 0, Grade::Max),
            with_entry(2, 0, 1, Grade::Weak),
        ];
        // Pairwise-incomparable candidates merged under cap 1.
        let a = CandidateSet::from_candidates(vec![items[0].clone()]);
        let b = CandidateSet::from_candidates(vec![items[1].clone(), items[2].clone()]);
        let merged = a.choice(&b, 1);
        assert!(merged.is_truncated());
        assert_eq!(merged.len(), 1);
    }

    // Cap 0 would empty the set; it is clamped to keep one candidate.
    #[test]
    fn test_zero_cap_keeps_one_candidate() {
        let a = CandidateSet::from_candidates(vec![with_entry(2, 0, 1, Grade::Max)]);
        let b = CandidateSet::from_candidates(vec![
            with_entry(2, 1, 0, Grade::Max),
            with_entry(2, 0, 1, Grade::Weak),
        ]);
        // The merge has two incomparable survivors; cap 0 keeps one.
        let merged = a.choice(&b, 0);
        assert_eq!(merged.len(), 1);
        assert!(merged.is_truncated());
        assert_eq!(merged.candidates().len(), 1);
    }

    #[test]
    fn test_closure_fixpoint_per_candidate() {
        let body = CandidateSet::from_candidates(vec![with_entry(3, 0, 1, Grade::Max)]);
        let closed = body.closure(LoopRule::While, CAP);
        for m in closed.candidates() {
            assert_eq!(m.seq(&m), m);
        }
    }
}
