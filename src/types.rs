//! Type-safe indices for the analysis.
//!
//! Every function gets its own *universe*: an ordered, arena-style index of
//! the variables the function can mention. Matrices are addressed through
//! [`Var`] indices, never through names, so two functions using the same
//! variable name cannot alias each other's entries.

use std::collections::HashMap;
use std::fmt;

/// A variable index within one function's universe (0-based).
///
/// A `Var` is only meaningful relative to the [`Universe`] that issued it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    pub fn new(index: usize) -> Self {
        Var(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A source location (line number), carried by statements for diagnostics.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Loc(u32);

impl Loc {
    pub fn new(line: u32) -> Self {
        Loc(line)
    }

    pub fn line(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

/// The role of a variable within its function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VarKind {
    /// Formal parameter (an input of the analysis).
    Param,
    /// Local variable.
    Local,
    /// Synthetic return slot, appended last when the function returns
    /// a value.
    Ret,
}

/// Ordered variable index for one function.
///
/// Parameters come first, in declaration order, then locals, then the
/// optional return slot. Lookup by name is only done once, when statements
/// are derived; everything after that is index-based.
#[derive(Debug, Clone)]
pub struct Universe {
    names: Vec<String>,
    kinds: Vec<VarKind>,
    by_name: HashMap<String, Var>,
}

impl Universe {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            kinds: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Add a variable. Returns `None` if the name is already taken.
    pub fn push(&mut self, name: &str, kind: VarKind) -> Option<Var> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let var = Var::new(self.names.len());
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.by_name.insert(name.to_string(), var);
        Some(var)
    }

    pub fn lookup(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, var: Var) -> &str {
        &self.names[var.index()]
    }

    pub fn kind(&self, var: Var) -> VarKind {
        self.kinds[var.index()]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        (0..self.names.len()).map(Var::new)
    }

    /// The return slot, if one was registered.
    pub fn ret(&self) -> Option<Var> {
        self.vars().find(|&v| self.kind(v) == VarKind::Ret)
    }

    /// Formal parameters, in declaration order.
    pub fn params(&self) -> impl Iterator<Item = Var> + '_ {
        self.vars().filter(|&v| self.kind(v) == VarKind::Param)
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_lookup() {
        let mut u = Universe::new();
        let x = u.push("x", VarKind::Param).unwrap();
        let y = u.push("y", VarKind::Local).unwrap();
        assert_eq!(u.lookup("x"), Some(x));
        assert_eq!(u.lookup("y"), Some(y));
        assert_eq!(u.lookup("z"), None);
        assert_eq!(u.name(x), "x");
        assert_eq!(u.kind(y), VarKind::Local);
        assert!(x < y);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut u = Universe::new();
        assert!(u.push("x", VarKind::Param).is_some());
        assert!(u.push("x", VarKind::Local).is_none());
        assert_eq!(u.len(), 1);
    }

    #[test]
    fn test_params_and_ret() {
        let mut u = Universe::new();
        u.push("a", VarKind::Param).unwrap();
        u.push("t", VarKind::Local).unwrap();
        u.push("b", VarKind::Param).unwrap();
        let r = u.push("@ret", VarKind::Ret).unwrap();
        let params: Vec<_> = u.params().map(|v| u.name(v).to_string()).collect();
        assert_eq!(params, ["a", "b"]);
        assert_eq!(u.ret(), Some(r));
    }
}
