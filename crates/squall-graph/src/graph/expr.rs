//! Symbolic index expressions for edge subsets and region ranges.
//!
//! Subset bounds coming out of the stencil compiler are not plain integers:
//! views and halo-relative domains leave behind floor-division expressions
//! over layout symbols. The instrumentation pass resolves these with
//! [`IndexExpr::simplify`] before building iteration ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A symbolic index expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexExpr {
    Const(i64),
    Sym(String),
    Add(Box<IndexExpr>, Box<IndexExpr>),
    Sub(Box<IndexExpr>, Box<IndexExpr>),
    Mul(Box<IndexExpr>, Box<IndexExpr>),
    /// Floor division, rounding toward negative infinity.
    FloorDiv(Box<IndexExpr>, Box<IndexExpr>),
}

impl IndexExpr {
    /// Shorthand for a symbol expression.
    pub fn sym(name: impl Into<String>) -> Self {
        Self::Sym(name.into())
    }

    /// Folds constant arithmetic, including floor division.
    ///
    /// Symbols are left in place; only fully-constant subtrees collapse.
    pub fn simplify(&self) -> IndexExpr {
        match self {
            IndexExpr::Const(_) | IndexExpr::Sym(_) => self.clone(),
            IndexExpr::Add(a, b) => match (a.simplify(), b.simplify()) {
                (IndexExpr::Const(a), IndexExpr::Const(b)) => IndexExpr::Const(a + b),
                (a, IndexExpr::Const(0)) => a,
                (IndexExpr::Const(0), b) => b,
                (a, b) => IndexExpr::Add(Box::new(a), Box::new(b)),
            },
            IndexExpr::Sub(a, b) => match (a.simplify(), b.simplify()) {
                (IndexExpr::Const(a), IndexExpr::Const(b)) => IndexExpr::Const(a - b),
                (a, IndexExpr::Const(0)) => a,
                (a, b) => IndexExpr::Sub(Box::new(a), Box::new(b)),
            },
            IndexExpr::Mul(a, b) => match (a.simplify(), b.simplify()) {
                (IndexExpr::Const(a), IndexExpr::Const(b)) => IndexExpr::Const(a * b),
                (a, IndexExpr::Const(1)) => a,
                (IndexExpr::Const(1), b) => b,
                (a, b) => IndexExpr::Mul(Box::new(a), Box::new(b)),
            },
            IndexExpr::FloorDiv(a, b) => match (a.simplify(), b.simplify()) {
                (IndexExpr::Const(a), IndexExpr::Const(b)) if b != 0 => {
                    IndexExpr::Const(a.div_euclid(b))
                }
                (a, IndexExpr::Const(1)) => a,
                (a, b) => IndexExpr::FloorDiv(Box::new(a), Box::new(b)),
            },
        }
    }

    /// Returns the constant value if the expression is fully resolved.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            IndexExpr::Const(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexExpr::Const(v) => write!(f, "{}", v),
            IndexExpr::Sym(s) => write!(f, "{}", s),
            IndexExpr::Add(a, b) => write!(f, "({} + {})", a, b),
            IndexExpr::Sub(a, b) => write!(f, "({} - {})", a, b),
            IndexExpr::Mul(a, b) => write!(f, "({} * {})", a, b),
            IndexExpr::FloorDiv(a, b) => write!(f, "int_floor({}, {})", a, b),
        }
    }
}

/// One dimension of an edge subset or region iteration domain:
/// `begin..=end` with `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetRange {
    pub begin: IndexExpr,
    pub end: IndexExpr,
    pub step: IndexExpr,
}

impl SubsetRange {
    /// A constant range `begin..=end` with unit step.
    pub fn new(begin: i64, end: i64) -> Self {
        Self {
            begin: IndexExpr::Const(begin),
            end: IndexExpr::Const(end),
            step: IndexExpr::Const(1),
        }
    }

    /// Simplifies every bound of the range.
    pub fn simplify(&self) -> SubsetRange {
        SubsetRange {
            begin: self.begin.simplify(),
            end: self.end.simplify(),
            step: self.step.simplify(),
        }
    }
}
