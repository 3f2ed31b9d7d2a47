//! Analysis error taxonomy.
//!
//! Errors are always scoped to one function: a failure here never aborts the
//! analysis of sibling functions. `∞` is an analysis *result*, not an error,
//! and candidate-cap overflow is a flagged partial result, not an error.

use thiserror::Error;

use crate::types::Loc;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AnalysisError {
    /// A statement mentions a variable the function never declared.
    #[error("undeclared variable `{name}` at {loc}")]
    UndeclaredVariable { name: String, loc: Loc },

    /// Two declarations share one name within a function.
    #[error("duplicate variable `{name}` in function `{func}`")]
    DuplicateVariable { func: String, name: String },

    /// A call names a function the program does not define.
    #[error("call to unknown function `{name}` at {loc}")]
    UnknownFunction { name: String, loc: Loc },

    /// A call to a function that exists but has no summary yet (forward
    /// reference or recursion). Degrades the caller to "unanalyzable"
    /// instead of failing it.
    #[error("call to unsummarized function `{name}` at {loc}")]
    UnsummarizedCall { name: String, loc: Loc },

    /// Calls are configured to require pre-inlined input.
    #[error("call to `{name}` at {loc}, but calls require pre-inlining")]
    CallsRequireInlining { name: String, loc: Loc },

    /// A call's argument count does not match the callee's formals.
    #[error("call to `{name}` at {loc}: expected {expected} arguments, got {given}")]
    ArityMismatch {
        name: String,
        expected: usize,
        given: usize,
        loc: Loc,
    },
}

impl AnalysisError {
    /// True for errors that degrade a function's result to "unanalyzable"
    /// rather than failing it outright.
    pub fn is_degradation(&self) -> bool {
        matches!(self, AnalysisError::UnsummarizedCall { .. })
    }
}
