//! The analysis driver: statements to candidate sets, functions to results.
//!
//! Composition is purely structural. A block is the sequential product of
//! its statements, a conditional is the pointwise merge of its arms, and a
//! loop is the closure of its body followed by the loop rule's correction.
//! Functions are processed in program order; a function that returns a
//! value leaves behind a summary, and later call sites substitute that
//! summary instead of re-deriving the callee. Per-function failures never
//! abort the siblings.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::ast::{Expr, Function, Program, Stmt};
use crate::choices::{CandidateSet, LoopRule};
use crate::derive;
use crate::error::AnalysisError;
use crate::result::{FuncOutcome, FuncReport, FuncResult, ProgramResult};
use crate::types::{Loc, Universe, Var, VarKind};

/// Name of the synthetic return slot appended to a returning function's
/// universe.
const RET_SLOT: &str = "@ret";

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Evaluate per-variable bound expressions for analyzed functions.
    pub evaluate_bounds: bool,
    /// Summarize returning functions and substitute summaries at call
    /// sites. When off, any call is rejected as requiring pre-inlining.
    pub call_summaries: bool,
    /// Hard cap on the alternatives kept per choice group; overflow keeps
    /// the lightest candidates and flags the result as truncated. Clamped
    /// to at least one so a set is never emptied.
    pub max_candidates: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            evaluate_bounds: true,
            call_summaries: true,
            max_candidates: 1024,
        }
    }
}

/// A callee's reusable interface: its universe (for the formals and return
/// slot) and its reduced candidate set.
#[derive(Debug, Clone)]
pub struct Summary {
    pub universe: Universe,
    pub set: CandidateSet,
}

/// The engine. Stateless between runs; all per-run state lives on the
/// stack of [`Analysis::run`].
#[derive(Debug, Default)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analyze every function of `program`, in program order.
    pub fn run(&self, program: &Program) -> ProgramResult {
        let declared: HashSet<&str> = program
            .functions
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let mut summaries: HashMap<String, Summary> = HashMap::new();
        let mut reports = Vec::with_capacity(program.functions.len());

        for function in &program.functions {
            info!("analyzing function `{}`", function.name);
            let outcome = match self.function(function, &declared, &summaries) {
                Ok((universe, set)) => {
                    debug!(
                        "`{}`: {} candidates summarizing {} derivations",
                        function.name,
                        set.len(),
                        set.derivations()
                    );
                    if function.ret.is_some() {
                        summaries.insert(
                            function.name.clone(),
                            Summary {
                                universe: universe.clone(),
                                set: set.clone(),
                            },
                        );
                    }
                    FuncOutcome::Analyzed(FuncResult::build(
                        &function.name,
                        universe,
                        set,
                        self.config.evaluate_bounds,
                    ))
                }
                Err(e) if e.is_degradation() => {
                    warn!("`{}` is unanalyzable: {}", function.name, e);
                    FuncOutcome::Unanalyzable(e)
                }
                Err(e) => {
                    warn!("`{}` failed: {}", function.name, e);
                    FuncOutcome::Failed(e)
                }
            };
            reports.push(FuncReport {
                name: function.name.clone(),
                outcome,
            });
        }
        ProgramResult { functions: reports }
    }

    fn function(
        &self,
        function: &Function,
        declared: &HashSet<&str>,
        summaries: &HashMap<String, Summary>,
    ) -> Result<(Universe, CandidateSet), AnalysisError> {
        let mut universe = Universe::new();
        for (name, kind) in function
            .params
            .iter()
            .map(|p| (p, VarKind::Param))
            .chain(function.locals.iter().map(|l| (l, VarKind::Local)))
        {
            if universe.push(name, kind).is_none() {
                return Err(AnalysisError::DuplicateVariable {
                    func: function.name.clone(),
                    name: name.clone(),
                });
            }
        }
        if function.ret.is_some() && universe.push(RET_SLOT, VarKind::Ret).is_none() {
            return Err(AnalysisError::DuplicateVariable {
                func: function.name.clone(),
                name: RET_SLOT.to_string(),
            });
        }

        let mut set = self.block(&universe, &function.body, declared, summaries)?;
        if let Some(ret) = &function.ret {
            let assign = derive::assign(&universe, RET_SLOT, ret, Loc::default())?;
            set = set.seq(&assign, self.config.max_candidates);
        }
        Ok((universe, set))
    }

    fn block(
        &self,
        universe: &Universe,
        stmts: &[Stmt],
        declared: &HashSet<&str>,
        summaries: &HashMap<String, Summary>,
    ) -> Result<CandidateSet, AnalysisError> {
        let mut set = CandidateSet::identity(universe.len());
        for stmt in stmts {
            let next = self.stmt(universe, stmt, declared, summaries)?;
            set = set.seq(&next, self.config.max_candidates);
        }
        Ok(set)
    }

    fn stmt(
        &self,
        universe: &Universe,
        stmt: &Stmt,
        declared: &HashSet<&str>,
        summaries: &HashMap<String, Summary>,
    ) -> Result<CandidateSet, AnalysisError> {
        let cap = self.config.max_candidates;
        match stmt {
            Stmt::Skip => Ok(CandidateSet::identity(universe.len())),

            Stmt::Assign { target, value, loc } => derive::assign(universe, target, value, *loc),

            Stmt::If {
                guard,
                then,
                otherwise,
                loc,
            } => {
                self.check_guard(universe, guard, *loc)?;
                let then = self.block(universe, then, declared, summaries)?;
                let otherwise = self.block(universe, otherwise, declared, summaries)?;
                Ok(then.choice(&otherwise, cap))
            }

            Stmt::While { guard, body, loc } => {
                self.check_guard(universe, guard, *loc)?;
                let body = self.block(universe, body, declared, summaries)?;
                Ok(body.closure(LoopRule::While, cap))
            }

            Stmt::Loop { counter, body, loc } => {
                let counter = self.lookup(universe, counter, *loc)?;
                let body = self.block(universe, body, declared, summaries)?;
                Ok(body.closure(LoopRule::Bounded(counter), cap))
            }

            Stmt::Call {
                target,
                func,
                args,
                loc,
            } => {
                if !self.config.call_summaries {
                    return Err(AnalysisError::CallsRequireInlining {
                        name: func.clone(),
                        loc: *loc,
                    });
                }
                if !declared.contains(func.as_str()) {
                    return Err(AnalysisError::UnknownFunction {
                        name: func.clone(),
                        loc: *loc,
                    });
                }
                let summary =
                    summaries
                        .get(func)
                        .ok_or_else(|| AnalysisError::UnsummarizedCall {
                            name: func.clone(),
                            loc: *loc,
                        })?;
                derive::call(universe, target, args, func, summary, *loc)
            }
        }
    }

    /// Guards gate control flow but contribute no value flow; they are
    /// only checked for well-formedness.
    fn check_guard(
        &self,
        universe: &Universe,
        guard: &Expr,
        loc: Loc,
    ) -> Result<(), AnalysisError> {
        for name in guard.variables() {
            self.lookup(universe, name, loc)?;
        }
        Ok(())
    }

    fn lookup(&self, universe: &Universe, name: &str, loc: Loc) -> Result<Var, AnalysisError> {
        universe
            .lookup(name)
            .ok_or_else(|| AnalysisError::UndeclaredVariable {
                name: name.to_string(),
                loc,
            })
    }
}
