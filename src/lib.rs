//! # mwp-rs: polynomial growth-bound certification via flow matrices
//!
//! **`mwp-rs`** derives *mwp-bounds* for imperative programs: a static
//! analysis that certifies, per variable, whether the value computed by a
//! function grows at most polynomially in the function's inputs.
//!
//! ## How it works
//!
//! Every variable-to-variable dependency is graded by a *flow*: `0` (no
//! influence), `m` (maximum of sources), `w` (additive), `p` (polynomial),
//! or `∞` (no polynomial bound). A function body is summarized by square
//! matrices over these grades --- sequencing is a max-plus matrix product,
//! branching is a pointwise merge, and loops take a fixpoint closure
//! followed by a correction for the loop kind.
//!
//! Because the underlying proof system admits several derivations per
//! program (an addition can be graded three ways), a result is a *set* of
//! candidate matrices, kept reduced to its non-dominated antichain. A
//! variable is unbounded only if **every** candidate grades its column `∞`;
//! a single finite candidate is a certificate of polynomial growth, and its
//! column reads off directly as a bound expression like
//! `x' ≤ max(x,y) + n*z`.
//!
//! ## Basic Usage
//!
//! ```rust
//! use mwp_rs::analysis::Analysis;
//! use mwp_rs::ast::{Expr, Function, Program, Stmt};
//!
//! // while (x != y) { if (x > y) x = x - y; else y = y - x; }
//! let gcd = Function::new("gcd", &["x", "y"])
//!     .with_body(vec![Stmt::while_loop(
//!         Expr::sub(Expr::var("x"), Expr::var("y")),
//!         vec![Stmt::cond(
//!             Expr::sub(Expr::var("x"), Expr::var("y")),
//!             vec![Stmt::assign("x", Expr::sub(Expr::var("x"), Expr::var("y")))],
//!             vec![Stmt::assign("y", Expr::sub(Expr::var("y"), Expr::var("x")))],
//!         )],
//!     )])
//!     .returns(Expr::var("x"));
//!
//! let result = Analysis::new().run(&Program::new(vec![gcd]));
//! let gcd = result.analyzed("gcd").unwrap();
//! assert!(gcd.is_bounded());
//! ```
//!
//! ## Core Components
//!
//! - **[`analysis`]**: The driver. [`Analysis`][crate::analysis::Analysis]
//!   walks a [`Program`][crate::ast::Program] and produces a
//!   [`ProgramResult`][crate::result::ProgramResult].
//! - **[`grade`]** / **[`matrix`]**: The flow semiring and the matrix
//!   algebra (product, merge, closure, loop corrections).
//! - **[`choices`]**: Candidate sets --- factored storage of independent
//!   choice groups, antichain reduction, derivation-count bookkeeping.
//! - **[`derive`]**: Grading of primitive statements (assignments, calls).
//! - **[`bound`]**: Rendering finite columns as bound expressions.

pub mod analysis;
pub mod ast;
pub mod bound;
pub mod choices;
pub mod derive;
pub mod error;
pub mod grade;
pub mod matrix;
pub mod result;
pub mod types;
