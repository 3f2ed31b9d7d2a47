//! Structured program representation consumed by the analysis.
//!
//! An external parser is expected to produce these values; the constructors
//! here make it convenient to build programs by hand (tests do this a lot).
//! Only the constructs the derivation rules know about are representable:
//! assignments over copy/additive/multiplicative expressions, conditionals,
//! `while` loops, bounded loops, and first-order calls.

use crate::types::Loc;

/// A whole program: the unit handed to [`Analysis::run`][crate::analysis::Analysis::run].
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }
}

/// One function: name, ordered formals, locals, body, optional return value.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub body: Vec<Stmt>,
    pub ret: Option<Expr>,
}

impl Function {
    pub fn new(name: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            locals: Vec::new(),
            body: Vec::new(),
            ret: None,
        }
    }

    pub fn with_locals(mut self, locals: &[&str]) -> Self {
        self.locals = locals.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn returns(mut self, expr: Expr) -> Self {
        self.ret = Some(expr);
        self
    }
}

/// Binary operators the deriver can grade.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Right-hand-side expressions.
#[derive(Debug, Clone)]
pub enum Expr {
    Var(String),
    Const(i64),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn int(value: i64) -> Self {
        Expr::Const(value)
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Bin(BinOp::Add, Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::Bin(BinOp::Sub, Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Expr::Bin(BinOp::Mul, Box::new(lhs), Box::new(rhs))
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Expr::Bin(BinOp::Div, Box::new(lhs), Box::new(rhs))
    }

    /// Variable names mentioned anywhere in the expression, left to right,
    /// with repeats.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Var(name) => out.push(name),
            Expr::Const(_) => {}
            Expr::Bin(_, lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }
}

/// Statements. Guards of `if`/`while` are read-only: they gate control flow
/// but contribute no value flow.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// No-op; derives the identity.
    Skip,
    /// `target := value`.
    Assign {
        target: String,
        value: Expr,
        loc: Loc,
    },
    /// `if guard { then } else { otherwise }` (missing else = empty vec).
    If {
        guard: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
        loc: Loc,
    },
    /// `while guard { body }`.
    While {
        guard: Expr,
        body: Vec<Stmt>,
        loc: Loc,
    },
    /// Bounded loop running `counter`-initial-value many iterations.
    Loop {
        counter: String,
        body: Vec<Stmt>,
        loc: Loc,
    },
    /// `target := func(args…)`; arguments are variables.
    Call {
        target: String,
        func: String,
        args: Vec<String>,
        loc: Loc,
    },
}

impl Stmt {
    pub fn assign(target: &str, value: Expr) -> Self {
        Stmt::Assign {
            target: target.to_string(),
            value,
            loc: Loc::default(),
        }
    }

    pub fn cond(guard: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If {
            guard,
            then,
            otherwise,
            loc: Loc::default(),
        }
    }

    pub fn while_loop(guard: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            guard,
            body,
            loc: Loc::default(),
        }
    }

    pub fn bounded_loop(counter: &str, body: Vec<Stmt>) -> Self {
        Stmt::Loop {
            counter: counter.to_string(),
            body,
            loc: Loc::default(),
        }
    }

    pub fn call(target: &str, func: &str, args: &[&str]) -> Self {
        Stmt::Call {
            target: target.to_string(),
            func: func.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            loc: Loc::default(),
        }
    }

    /// Attach a source line to the statement.
    pub fn at(mut self, line: u32) -> Self {
        let loc = Loc::new(line);
        match &mut self {
            Stmt::Skip => {}
            Stmt::Assign { loc: l, .. }
            | Stmt::If { loc: l, .. }
            | Stmt::While { loc: l, .. }
            | Stmt::Loop { loc: l, .. }
            | Stmt::Call { loc: l, .. } => *l = loc,
        }
        self
    }

    pub fn loc(&self) -> Loc {
        match self {
            Stmt::Skip => Loc::default(),
            Stmt::Assign { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::Loop { loc, .. }
            | Stmt::Call { loc, .. } => *loc,
        }
    }
}
