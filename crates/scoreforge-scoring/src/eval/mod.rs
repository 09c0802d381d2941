//! Expression evaluation over tuples.

pub(crate) mod ops;


use scoreforge_core::{Expr, Value};

use crate::error::{ScoreError, ScoreResult};
use crate::facts::FactStore;
use crate::function::FunctionRegistry;

pub use ops::compare_values;

/// Everything an expression may read besides the tuple itself.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub facts: &'a FactStore,
    pub functions: &'a FunctionRegistry,
}

impl<'a> EvalContext<'a> {
    pub fn new(facts: &'a FactStore, functions: &'a FunctionRegistry) -> Self {
        Self { facts, functions }
    }

    /// Evaluates `expr` with `params` as the tuple elements.
    pub fn eval(&self, expr: &Expr, params: &[Value]) -> ScoreResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Param(idx) => params.get(*idx).cloned().ok_or(ScoreError::ParamOutOfRange {
                param: *idx,
                arity: params.len(),
            }),

            Expr::Field { base, field } => match self.eval(base, params)? {
                Value::None => Ok(Value::None),
                Value::Fact(key) => self.facts.field(key, *field),
                other => Err(ScoreError::TypeMismatch {
                    context: "field access",
                    expected: "fact",
                    actual: other.kind(),
                }),
            },

            Expr::Eq(l, r) => Ok(Value::Bool(self.eval(l, params)? == self.eval(r, params)?)),
            Expr::Ne(l, r) => Ok(Value::Bool(self.eval(l, params)? != self.eval(r, params)?)),
            Expr::Lt(l, r) => self.compare(l, r, params, |o| o.is_lt()),
            Expr::Le(l, r) => self.compare(l, r, params, |o| o.is_le()),
            Expr::Gt(l, r) => self.compare(l, r, params, |o| o.is_gt()),
            Expr::Ge(l, r) => self.compare(l, r, params, |o| o.is_ge()),

            Expr::And(l, r) => {
                let result = self.test(l, params)? && self.test(r, params)?;
                Ok(Value::Bool(result))
            }
            Expr::Or(l, r) => {
                let result = self.test(l, params)? || self.test(r, params)?;
                Ok(Value::Bool(result))
            }
            Expr::Not(e) => match self.eval(e, params)? {
                Value::None => Ok(Value::None),
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(ScoreError::TypeMismatch {
                    context: "negation",
                    expected: "bool",
                    actual: other.kind(),
                }),
            },

            Expr::Add(l, r) => ops::arithmetic(ops::Op::Add, self.eval(l, params)?, self.eval(r, params)?),
            Expr::Sub(l, r) => ops::arithmetic(ops::Op::Sub, self.eval(l, params)?, self.eval(r, params)?),
            Expr::Mul(l, r) => ops::arithmetic(ops::Op::Mul, self.eval(l, params)?, self.eval(r, params)?),
            Expr::Div(l, r) => ops::arithmetic(ops::Op::Div, self.eval(l, params)?, self.eval(r, params)?),
            Expr::Mod(l, r) => ops::arithmetic(ops::Op::Rem, self.eval(l, params)?, self.eval(r, params)?),
            Expr::Neg(e) => ops::negate(self.eval(e, params)?),
            Expr::Abs(e) => ops::absolute(self.eval(e, params)?),
            Expr::Min(l, r) => ops::extreme(self.eval(l, params)?, self.eval(r, params)?, false),
            Expr::Max(l, r) => ops::extreme(self.eval(l, params)?, self.eval(r, params)?, true),

            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.test(cond, params)? {
                    self.eval(then_expr, params)
                } else {
                    self.eval(else_expr, params)
                }
            }

            Expr::IsNone(e) => Ok(Value::Bool(self.eval(e, params)?.is_none())),

            Expr::Len(e) => match self.eval(e, params)? {
                Value::None => Ok(Value::None),
                Value::List(items) => ops::length(items.len()),
                Value::Str(s) => ops::length(s.chars().count()),
                other => Err(ScoreError::TypeMismatch {
                    context: "length",
                    expected: "list",
                    actual: other.kind(),
                }),
            },

            Expr::Contains(list, elem) => {
                let elem = self.eval(elem, params)?;
                match self.eval(list, params)? {
                    Value::None => Ok(Value::Bool(false)),
                    Value::List(items) => Ok(Value::Bool(items.contains(&elem))),
                    other => Err(ScoreError::TypeMismatch {
                        context: "contains",
                        expected: "list",
                        actual: other.kind(),
                    }),
                }
            }

            Expr::Convert(e, kind) => ops::convert(self.eval(e, params)?, *kind),

            Expr::Call { function, args } => {
                let f = self
                    .functions
                    .get(function)
                    .ok_or_else(|| ScoreError::UnknownFunction(function.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, params))
                    .collect::<ScoreResult<Vec<_>>>()?;
                Ok(f(&args))
            }
        }
    }

    /// Evaluates a predicate. `None` counts as false.
    pub fn test(&self, expr: &Expr, params: &[Value]) -> ScoreResult<bool> {
        match self.eval(expr, params)? {
            Value::Bool(b) => Ok(b),
            Value::None => Ok(false),
            other => Err(ScoreError::TypeMismatch {
                context: "predicate",
                expected: "bool",
                actual: other.kind(),
            }),
        }
    }

    fn compare(
        &self,
        l: &Expr,
        r: &Expr,
        params: &[Value],
        accept: fn(std::cmp::Ordering) -> bool,
    ) -> ScoreResult<Value> {
        let l = self.eval(l, params)?;
        let r = self.eval(r, params)?;
        Ok(Value::Bool(compare_values(&l, &r)?.is_some_and(accept)))
    }
}
