//! Leaf derivation: one primitive statement to a candidate set.
//!
//! Assignments are graded by the shape of their right-hand side:
//!
//! - copy `x := y` and max-type expressions (`-`, `/`, ops with a constant
//!   operand) grade their sources `m` --- the result is bounded by the
//!   maximum of its sources;
//! - an additive combination admits several sound gradings: one operand
//!   `m` with the rest `p`, for each operand, or everything `w`. This is
//!   the source of the `3^k` derivation explosion;
//! - any variable-by-variable multiplication makes the whole right-hand
//!   side multiplicative: every source grades `p`, one candidate;
//! - a constant clears the target's column entirely (constants are inputs
//!   in disguise).
//!
//! Calls substitute the callee's summary: the target's column receives, for
//! each formal parameter, the grade the summary's return slot places on it,
//! remapped to the actual argument.

use log::debug;

use crate::analysis::Summary;
use crate::ast::{BinOp, Expr};
use crate::choices::CandidateSet;
use crate::error::AnalysisError;
use crate::grade::Grade;
use crate::matrix::Matrix;
use crate::types::{Loc, Universe, Var};

/// The gradable shapes of a right-hand side.
#[derive(Debug, Clone, Eq, PartialEq)]
enum Shape {
    Constant,
    Copy(Var),
    MaxType(Vec<Var>),
    Additive(Vec<Var>),
    Multiplicative(Vec<Var>),
}

fn lookup(universe: &Universe, name: &str, loc: Loc) -> Result<Var, AnalysisError> {
    universe
        .lookup(name)
        .ok_or_else(|| AnalysisError::UndeclaredVariable {
            name: name.to_string(),
            loc,
        })
}

/// True if the tree multiplies two variable-bearing subexpressions.
fn has_var_mul(expr: &Expr) -> bool {
    match expr {
        Expr::Var(_) | Expr::Const(_) => false,
        Expr::Bin(op, lhs, rhs) => {
            (*op == BinOp::Mul && !lhs.variables().is_empty() && !rhs.variables().is_empty())
                || has_var_mul(lhs)
                || has_var_mul(rhs)
        }
    }
}

/// True if the tree adds two variable-bearing subexpressions.
fn has_var_add(expr: &Expr) -> bool {
    match expr {
        Expr::Var(_) | Expr::Const(_) => false,
        Expr::Bin(op, lhs, rhs) => {
            (*op == BinOp::Add && !lhs.variables().is_empty() && !rhs.variables().is_empty())
                || has_var_add(lhs)
                || has_var_add(rhs)
        }
    }
}

fn classify(expr: &Expr, universe: &Universe, loc: Loc) -> Result<Shape, AnalysisError> {
    let mut vars = Vec::new();
    for name in expr.variables() {
        vars.push(lookup(universe, name, loc)?);
    }
    if vars.is_empty() {
        return Ok(Shape::Constant);
    }
    if let Expr::Var(_) = expr {
        return Ok(Shape::Copy(vars[0]));
    }
    if has_var_mul(expr) {
        Ok(Shape::Multiplicative(vars))
    } else if has_var_add(expr) {
        Ok(Shape::Additive(vars))
    } else {
        // Pure subtraction/division chains and constant-operand ops:
        // bounded by the maximum of the sources.
        Ok(Shape::MaxType(vars))
    }
}

fn column_matrix(universe: &Universe, target: Var, entries: &[(Var, Grade)]) -> Matrix {
    let mut m = Matrix::identity(universe.len());
    m.replace_column(target, entries);
    m
}

/// Derive `target := value`.
pub fn assign(
    universe: &Universe,
    target: &str,
    value: &Expr,
    loc: Loc,
) -> Result<CandidateSet, AnalysisError> {
    let target = lookup(universe, target, loc)?;
    let shape = classify(value, universe, loc)?;
    debug!("derive {} := {:?}", universe.name(target), shape);

    let candidates = match shape {
        Shape::Constant => {
            vec![column_matrix(universe, target, &[])]
        }
        Shape::Copy(source) => {
            vec![column_matrix(universe, target, &[(source, Grade::Max)])]
        }
        Shape::MaxType(vars) => {
            let entries: Vec<_> = vars.into_iter().map(|v| (v, Grade::Max)).collect();
            vec![column_matrix(universe, target, &entries)]
        }
        Shape::Multiplicative(vars) => {
            let entries: Vec<_> = vars.into_iter().map(|v| (v, Grade::Poly)).collect();
            vec![column_matrix(universe, target, &entries)]
        }
        Shape::Additive(vars) => {
            // One candidate per operand position (that operand `m`, the
            // rest `p`), plus the all-`w` grading. Repeated variables
            // merge to their worst role, and dominated gradings are
            // dropped by the reduction (`y + y` collapses to `w`).
            let mut out = Vec::with_capacity(vars.len() + 1);
            for pick in 0..vars.len() {
                let entries: Vec<_> = vars
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (v, if i == pick { Grade::Max } else { Grade::Poly }))
                    .collect();
                out.push(column_matrix(universe, target, &entries));
            }
            let weak: Vec<_> = vars.iter().map(|&v| (v, Grade::Weak)).collect();
            out.push(column_matrix(universe, target, &weak));
            out
        }
    };
    Ok(CandidateSet::from_candidates(candidates))
}

/// Derive `target := callee(args…)` by summary substitution.
pub fn call(
    universe: &Universe,
    target: &str,
    args: &[String],
    callee_name: &str,
    callee: &Summary,
    loc: Loc,
) -> Result<CandidateSet, AnalysisError> {
    let target = lookup(universe, target, loc)?;
    let formals: Vec<Var> = callee.universe.params().collect();
    if formals.len() != args.len() {
        return Err(AnalysisError::ArityMismatch {
            name: callee_name.to_string(),
            expected: formals.len(),
            given: args.len(),
            loc,
        });
    }
    let mut actuals = Vec::with_capacity(args.len());
    for arg in args {
        actuals.push(lookup(universe, arg, loc)?);
    }
    debug!(
        "derive {} := {}(…) from summary with {} candidates",
        universe.name(target),
        callee_name,
        callee.set.len()
    );

    // Only the summary's return column matters here; alternatives for the
    // callee's other columns are invisible to the caller.
    let items = match callee.universe.ret() {
        Some(ret) => callee
            .set
            .column_choices(ret)
            .into_iter()
            .map(|column| {
                let mut entries = Vec::new();
                for (&formal, &actual) in formals.iter().zip(&actuals) {
                    let grade = column[formal.index()];
                    if !grade.is_zero() {
                        entries.push((actual, grade));
                    }
                }
                column_matrix(universe, target, &entries)
            })
            .collect(),
        None => vec![column_matrix(universe, target, &[])],
    };
    Ok(CandidateSet::from_parts(
        items,
        callee.set.derivations().clone(),
        callee.set.is_truncated(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::types::VarKind;

    fn universe(names: &[&str]) -> Universe {
        let mut u = Universe::new();
        for name in names {
            u.push(name, VarKind::Param).unwrap();
        }
        u
    }

    fn v(i: usize) -> Var {
        Var::new(i)
    }

    #[test]
    fn test_copy() {
        let u = universe(&["x", "y"]);
        let set = assign(&u, "x", &Expr::var("y"), Loc::default()).unwrap();
        assert_eq!(set.len(), 1);
        let items = set.candidates();
        assert_eq!(items[0].get(v(1), v(0)), Grade::Max);
        assert_eq!(items[0].get(v(0), v(0)), Grade::Zero);
        assert_eq!(items[0].get(v(1), v(1)), Grade::Max);
    }

    #[test]
    fn test_constant_clears_column() {
        let u = universe(&["x", "y"]);
        let set = assign(&u, "x", &Expr::int(5), Loc::default()).unwrap();
        assert_eq!(set.len(), 1);
        let items = set.candidates();
        assert_eq!(items[0].get(v(0), v(0)), Grade::Zero);
        assert_eq!(items[0].get(v(1), v(0)), Grade::Zero);
    }

    #[test]
    fn test_addition_three_candidates() {
        let u = universe(&["x", "y", "z"]);
        let set = assign(
            &u,
            "x",
            &Expr::add(Expr::var("y"), Expr::var("z")),
            Loc::default(),
        )
        .unwrap();
        // (m,p), (p,m), (w,w) --- pairwise incomparable.
        assert_eq!(set.len(), 3);
        let gradings: Vec<(Grade, Grade)> = set
            .candidates()
            .iter()
            .map(|m| (m.get(v(1), v(0)), m.get(v(2), v(0))))
            .collect();
        assert!(gradings.contains(&(Grade::Max, Grade::Poly)));
        assert!(gradings.contains(&(Grade::Poly, Grade::Max)));
        assert!(gradings.contains(&(Grade::Weak, Grade::Weak)));
    }

    #[test]
    fn test_self_addition_collapses_to_weak() {
        let u = universe(&["x", "y"]);
        let set = assign(
            &u,
            "x",
            &Expr::add(Expr::var("y"), Expr::var("y")),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.candidates()[0].get(v(1), v(0)), Grade::Weak);
    }

    #[test]
    fn test_subtraction_is_max_type() {
        let u = universe(&["x", "y"]);
        let set = assign(
            &u,
            "x",
            &Expr::sub(Expr::var("x"), Expr::var("y")),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        let items = set.candidates();
        assert_eq!(items[0].get(v(0), v(0)), Grade::Max);
        assert_eq!(items[0].get(v(1), v(0)), Grade::Max);
    }

    #[test]
    fn test_multiplication_is_poly() {
        let u = universe(&["x", "y", "z"]);
        let set = assign(
            &u,
            "x",
            &Expr::mul(Expr::var("y"), Expr::var("z")),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        let items = set.candidates();
        assert_eq!(items[0].get(v(1), v(0)), Grade::Poly);
        assert_eq!(items[0].get(v(2), v(0)), Grade::Poly);
    }

    #[test]
    fn test_squaring_is_poly() {
        let u = universe(&["p"]);
        let set = assign(
            &u,
            "p",
            &Expr::mul(Expr::var("p"), Expr::var("p")),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.candidates()[0].get(v(0), v(0)), Grade::Poly);
    }

    #[test]
    fn test_constant_operand_is_max_type() {
        let u = universe(&["n"]);
        let set = assign(
            &u,
            "n",
            &Expr::div(Expr::var("n"), Expr::int(2)),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.candidates()[0].get(v(0), v(0)), Grade::Max);

        let set = assign(
            &u,
            "n",
            &Expr::add(Expr::var("n"), Expr::int(1)),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.candidates()[0].get(v(0), v(0)), Grade::Max);
    }

    #[test]
    fn test_mul_inside_sum_is_multiplicative() {
        let u = universe(&["x", "y", "z", "w"]);
        let set = assign(
            &u,
            "x",
            &Expr::add(Expr::var("y"), Expr::mul(Expr::var("z"), Expr::var("w"))),
            Loc::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        let items = set.candidates();
        assert_eq!(items[0].get(v(1), v(0)), Grade::Poly);
        assert_eq!(items[0].get(v(2), v(0)), Grade::Poly);
        assert_eq!(items[0].get(v(3), v(0)), Grade::Poly);
    }

    #[test]
    fn test_undeclared_variable() {
        let u = universe(&["x"]);
        let err = assign(&u, "x", &Expr::var("nope"), Loc::new(4)).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UndeclaredVariable {
                name: "nope".to_string(),
                loc: Loc::new(4),
            }
        );
        let err = assign(&u, "nope", &Expr::int(0), Loc::new(9)).unwrap_err();
        assert!(matches!(err, AnalysisError::UndeclaredVariable { .. }));
    }
}
