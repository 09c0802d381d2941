//! Expression trees evaluated over tuples.
//!
//! Predicates, mappers, join keys, group keys, collector inputs and match
//! weights are all [`Expr`] values. Because they are plain data, two
//! constraints that declare the same expression over the same parent build a
//! single shared node.
//!
//! `Param(i)` reads element `i` of the tuple being evaluated. `Field` reads a
//! field of the fact that an inner expression refers to, so
//! `Expr::field(0, 2)` is "field 2 of the first tuple element".

use std::ops::{Add, Div, Mul, Neg, Not, Sub};

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueKind};

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    Param(usize),
    /// Field `field` of the fact referenced by `base`.
    Field {
        base: Box<Expr>,
        field: usize,
    },
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Abs(Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    IsNone(Box<Expr>),
    /// Length of a list value.
    Len(Box<Expr>),
    Contains(Box<Expr>, Box<Expr>),
    /// Explicit numeric conversion between value kinds.
    Convert(Box<Expr>, ValueKind),
    /// Call of a user function registered under `function`.
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn none() -> Self {
        Expr::Literal(Value::None)
    }

    pub fn int(value: i32) -> Self {
        Expr::Literal(Value::Int(value))
    }

    pub fn long(value: i64) -> Self {
        Expr::Literal(Value::Long(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Value::Bool(value))
    }

    pub fn param(idx: usize) -> Self {
        Expr::Param(idx)
    }

    /// Field `field_idx` of the fact at tuple position `param_idx`.
    pub fn field(param_idx: usize, field_idx: usize) -> Self {
        Expr::ref_field(Expr::Param(param_idx), field_idx)
    }

    /// Field `field_idx` of the fact that `base` evaluates to.
    pub fn ref_field(base: Expr, field_idx: usize) -> Self {
        Expr::Field {
            base: Box::new(base),
            field: field_idx,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::Eq(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn ne(left: Expr, right: Expr) -> Self {
        Expr::Ne(Box::new(left), Box::new(right))
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::Lt(Box::new(left), Box::new(right))
    }

    pub fn le(left: Expr, right: Expr) -> Self {
        Expr::Le(Box::new(left), Box::new(right))
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Expr::Gt(Box::new(left), Box::new(right))
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::Ge(Box::new(left), Box::new(right))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn abs(expr: Expr) -> Self {
        Expr::Abs(Box::new(expr))
    }

    pub fn modulo(left: Expr, right: Expr) -> Self {
        Expr::Mod(Box::new(left), Box::new(right))
    }

    pub fn min(left: Expr, right: Expr) -> Self {
        Expr::Min(Box::new(left), Box::new(right))
    }

    pub fn max(left: Expr, right: Expr) -> Self {
        Expr::Max(Box::new(left), Box::new(right))
    }

    pub fn if_then_else(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn is_none(expr: Expr) -> Self {
        Expr::IsNone(Box::new(expr))
    }

    pub fn is_not_none(expr: Expr) -> Self {
        Expr::not(Expr::is_none(expr))
    }

    pub fn len(expr: Expr) -> Self {
        Expr::Len(Box::new(expr))
    }

    pub fn contains(list: Expr, elem: Expr) -> Self {
        Expr::Contains(Box::new(list), Box::new(elem))
    }

    pub fn convert(expr: Expr, kind: ValueKind) -> Self {
        Expr::Convert(Box::new(expr), kind)
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: function.into(),
            args,
        }
    }

    /// Direct children of this node.
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Param(_) => Vec::new(),
            Expr::Field { base, .. } => vec![&**base],
            Expr::Not(e)
            | Expr::Neg(e)
            | Expr::Abs(e)
            | Expr::IsNone(e)
            | Expr::Len(e)
            | Expr::Convert(e, _) => vec![&**e],
            Expr::Eq(a, b)
            | Expr::Ne(a, b)
            | Expr::Lt(a, b)
            | Expr::Le(a, b)
            | Expr::Gt(a, b)
            | Expr::Ge(a, b)
            | Expr::And(a, b)
            | Expr::Or(a, b)
            | Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Mod(a, b)
            | Expr::Min(a, b)
            | Expr::Max(a, b)
            | Expr::Contains(a, b) => vec![&**a, &**b],
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => vec![&**cond, &**then_expr, &**else_expr],
            Expr::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Highest tuple position this expression reads, if any.
    ///
    /// Stream builders compare it against the stream arity.
    pub fn max_param(&self) -> Option<usize> {
        let own = match self {
            Expr::Param(idx) => Some(*idx),
            _ => None,
        };
        self.children()
            .into_iter()
            .filter_map(Expr::max_param)
            .chain(own)
            .max()
    }

    /// Names of all user functions this expression calls.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_function_names(&mut names);
        names
    }

    fn collect_function_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Expr::Call { function, .. } = self {
            out.push(function);
        }
        for child in self.children() {
            child.collect_function_names(out);
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::Not(Box::new(self))
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Self::Output {
        Expr::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_param() {
        assert_eq!(Expr::int(1).max_param(), None);
        assert_eq!(Expr::field(2, 0).max_param(), Some(2));
        let e = Expr::gt(Expr::field(0, 1) + Expr::param(3), Expr::int(5));
        assert_eq!(e.max_param(), Some(3));
    }

    #[test]
    fn test_structural_equality() {
        let a = Expr::gt(Expr::field(0, 1), Expr::int(5));
        let b = Expr::gt(Expr::field(0, 1), Expr::int(5));
        let c = Expr::gt(Expr::field(0, 1), Expr::int(6));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_function_names() {
        let e = Expr::and(
            Expr::call("overlaps", vec![Expr::param(0), Expr::param(1)]),
            Expr::not(Expr::call("isWeekend", vec![Expr::field(0, 3)])),
        );
        assert_eq!(e.function_names(), vec!["overlaps", "isWeekend"]);
    }

    #[test]
    fn test_operator_sugar() {
        let e = Expr::field(0, 1) - Expr::int(25);
        assert_eq!(
            e,
            Expr::Sub(Box::new(Expr::field(0, 1)), Box::new(Expr::int(25)))
        );
    }
}
