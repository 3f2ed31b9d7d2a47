//! Analysis results, per function and per program.
//!
//! `∞` is part of the result lattice, not an error: a variable is reported
//! unbounded only when *every* candidate derivation places `∞` somewhere in
//! its column. As long as one candidate keeps the column finite, that
//! candidate witnesses a polynomial bound.
//!
//! Everything here is read off per column, so results stay cheap even when
//! the candidate set denotes astronomically many matrices.

use std::fmt;

use crate::bound::{Bound, MwpBound};
use crate::choices::CandidateSet;
use crate::error::AnalysisError;
use crate::grade::Grade;
use crate::types::{Universe, Var};

/// The full result for one successfully analyzed function.
#[derive(Debug, Clone)]
pub struct FuncResult {
    pub name: String,
    pub universe: Universe,
    pub candidates: CandidateSet,
    /// Variables with `∞` in their column under every candidate.
    pub unbounded: Vec<Var>,
    /// Source→target pairs graded `∞` by every candidate: the flows that
    /// make the unbounded variables unbounded.
    pub infinite_flows: Vec<(Var, Var)>,
    /// Per-variable bound expressions for the bounded variables, when
    /// bound evaluation is enabled.
    pub bound: Option<Bound>,
}

impl FuncResult {
    pub fn build(
        name: &str,
        universe: Universe,
        candidates: CandidateSet,
        evaluate_bounds: bool,
    ) -> Self {
        let mut unbounded = Vec::new();
        let mut infinite_flows = Vec::new();
        let mut bound = evaluate_bounds.then(Bound::new);
        for target in universe.vars() {
            let choices = candidates.column_choices(target);
            if choices
                .iter()
                .all(|c| c.iter().any(|g| g.is_infty()))
            {
                unbounded.push(target);
            } else if let Some(bound) = bound.as_mut() {
                if let Some(best) = Self::tightest_column(&choices) {
                    bound.push(
                        universe.name(target),
                        MwpBound::from_column(&universe, best),
                    );
                }
            }
            for source in universe.vars() {
                if choices.iter().all(|c| c[source.index()].is_infty()) {
                    infinite_flows.push((source, target));
                }
            }
        }
        Self {
            name: name.to_string(),
            universe,
            candidates,
            unbounded,
            infinite_flows,
            bound,
        }
    }

    /// True when every variable admits a polynomial bound.
    pub fn is_bounded(&self) -> bool {
        self.unbounded.is_empty()
    }

    pub fn unbounded_names(&self) -> Vec<&str> {
        self.unbounded
            .iter()
            .map(|&v| self.universe.name(v))
            .collect()
    }

    /// The ∞-free column alternative with the lowest total grade rank.
    fn tightest_column(choices: &[Vec<Grade>]) -> Option<&Vec<Grade>> {
        choices
            .iter()
            .filter(|c| !c.iter().any(|g| g.is_infty()))
            .min_by_key(|c| c.iter().map(|g| g.rank() as u64).sum::<u64>())
    }

    /// The tightest grade any candidate assigns to `source → target`;
    /// useful for spot checks.
    pub fn best_grade(&self, source: &str, target: &str) -> Option<Grade> {
        let source = self.universe.lookup(source)?;
        let target = self.universe.lookup(target)?;
        self.candidates
            .column_choices(target)
            .iter()
            .map(|c| c[source.index()])
            .min()
    }
}

impl fmt::Display for FuncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bounded() {
            write!(f, "{}: bounded", self.name)?;
            if let Some(bound) = &self.bound {
                if !bound.is_empty() {
                    write!(f, " ({})", bound)?;
                }
            }
        } else {
            write!(f, "{}: unbounded in {}", self.name, self.unbounded_names().join(", "))?;
        }
        if self.candidates.is_truncated() {
            write!(f, " [truncated]")?;
        }
        Ok(())
    }
}

/// What the analysis concluded about one function.
#[derive(Debug, Clone)]
pub enum FuncOutcome {
    /// Derivation completed; see the result for boundedness.
    Analyzed(FuncResult),
    /// The function could not be derived (e.g. a call to a function with
    /// no summary), but the input itself is well-formed.
    Unanalyzable(AnalysisError),
    /// The input is ill-formed for this function.
    Failed(AnalysisError),
}

/// One function's entry in the program report.
#[derive(Debug, Clone)]
pub struct FuncReport {
    pub name: String,
    pub outcome: FuncOutcome,
}

/// Results for every function of a program, in program order.
#[derive(Debug, Clone, Default)]
pub struct ProgramResult {
    pub functions: Vec<FuncReport>,
}

impl ProgramResult {
    pub fn get(&self, name: &str) -> Option<&FuncOutcome> {
        self.functions
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    /// The result for `name`, if the function was analyzed to completion.
    pub fn analyzed(&self, name: &str) -> Option<&FuncResult> {
        match self.get(name)? {
            FuncOutcome::Analyzed(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.functions
            .iter()
            .all(|r| matches!(r.outcome, FuncOutcome::Analyzed(_)))
    }
}
