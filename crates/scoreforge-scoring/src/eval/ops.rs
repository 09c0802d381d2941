use std::cmp::Ordering;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use scoreforge_core::{Value, ValueKind};

use crate::error::{ScoreError, ScoreResult};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
        }
    }
}

fn overflow(op: Op, l: &Value, r: &Value) -> ScoreError {
    ScoreError::Arithmetic(format!("{} {} {} overflows or divides by zero", l, op.symbol(), r))
}

/// Orders two values of the same kind.
///
/// Null-like operands never compare (`Ok(None)`); operands of different
/// kinds are a type error.
pub fn compare_values(l: &Value, r: &Value) -> ScoreResult<Option<Ordering>> {
    if l.is_null_like() || r.is_null_like() {
        return Ok(None);
    }
    if l.kind() != r.kind() {
        return Err(ScoreError::TypeMismatch {
            context: "comparison",
            expected: l.kind().name(),
            actual: r.kind(),
        });
    }
    Ok(Some(l.cmp(r)))
}

pub(crate) fn arithmetic(op: Op, l: Value, r: Value) -> ScoreResult<Value> {
    if l.is_none() || r.is_none() {
        return Ok(Value::None);
    }
    let result = match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => match op {
            Op::Add => a.checked_add(*b),
            Op::Sub => a.checked_sub(*b),
            Op::Mul => a.checked_mul(*b),
            Op::Div => a.checked_div(*b),
            Op::Rem => a.checked_rem(*b),
        }
        .map(Value::Int),
        (Value::Long(a), Value::Long(b)) => match op {
            Op::Add => a.checked_add(*b),
            Op::Sub => a.checked_sub(*b),
            Op::Mul => a.checked_mul(*b),
            Op::Div => a.checked_div(*b),
            Op::Rem => a.checked_rem(*b),
        }
        .map(Value::Long),
        (Value::Decimal(a), Value::Decimal(b)) => match op {
            Op::Add => a.checked_add(*b),
            Op::Sub => a.checked_sub(*b),
            Op::Mul => a.checked_mul(*b),
            Op::Div => a.checked_div(*b),
            Op::Rem => a.checked_rem(*b),
        }
        .map(Value::Decimal),
        (Value::Float(a), Value::Float(b)) => Some(Value::Float(match op {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
            Op::Rem => a % b,
        })),
        _ if l.is_numeric() && r.is_numeric() => {
            return Err(ScoreError::TypeMismatch {
                context: "arithmetic",
                expected: l.kind().name(),
                actual: r.kind(),
            })
        }
        _ => {
            let offending = if l.is_numeric() { &r } else { &l };
            return Err(ScoreError::TypeMismatch {
                context: "arithmetic",
                expected: "numeric",
                actual: offending.kind(),
            });
        }
    };
    result.ok_or_else(|| overflow(op, &l, &r))
}

pub(crate) fn negate(v: Value) -> ScoreResult<Value> {
    let negated = match &v {
        Value::None => Some(Value::None),
        Value::Int(a) => a.checked_neg().map(Value::Int),
        Value::Long(a) => a.checked_neg().map(Value::Long),
        Value::Decimal(a) => Some(Value::Decimal(-*a)),
        Value::Float(a) => Some(Value::Float(-a)),
        other => {
            return Err(ScoreError::TypeMismatch {
                context: "negation",
                expected: "numeric",
                actual: other.kind(),
            })
        }
    };
    negated.ok_or_else(|| ScoreError::Arithmetic(format!("-{} overflows", v)))
}

pub(crate) fn absolute(v: Value) -> ScoreResult<Value> {
    let abs = match &v {
        Value::None => Some(Value::None),
        Value::Int(a) => a.checked_abs().map(Value::Int),
        Value::Long(a) => a.checked_abs().map(Value::Long),
        Value::Decimal(a) => Some(Value::Decimal(a.abs())),
        Value::Float(a) => Some(Value::Float(a.abs())),
        other => {
            return Err(ScoreError::TypeMismatch {
                context: "abs",
                expected: "numeric",
                actual: other.kind(),
            })
        }
    };
    abs.ok_or_else(|| ScoreError::Arithmetic(format!("abs({}) overflows", v)))
}

pub(crate) fn extreme(l: Value, r: Value, max: bool) -> ScoreResult<Value> {
    match compare_values(&l, &r)? {
        None => Ok(Value::None),
        Some(ordering) => {
            let take_left = if max {
                ordering != Ordering::Less
            } else {
                ordering != Ordering::Greater
            };
            Ok(if take_left { l } else { r })
        }
    }
}

pub(crate) fn length(len: usize) -> ScoreResult<Value> {
    i32::try_from(len)
        .map(Value::Int)
        .map_err(|_| ScoreError::Arithmetic(format!("length {} does not fit an int", len)))
}

pub(crate) fn convert(v: Value, kind: ValueKind) -> ScoreResult<Value> {
    if v.is_none() {
        return Ok(Value::None);
    }
    let converted = match (kind, &v) {
        (_, _) if v.kind() == kind => Some(v.clone()),
        (ValueKind::Int, Value::Long(a)) => i32::try_from(*a).ok().map(Value::Int),
        (ValueKind::Int, Value::Decimal(a)) => a.trunc().to_i32().map(Value::Int),
        (ValueKind::Int, Value::Float(a)) => Decimal::from_f64(a.trunc())
            .and_then(|d| d.to_i32())
            .map(Value::Int),
        (ValueKind::Long, Value::Int(a)) => Some(Value::Long(i64::from(*a))),
        (ValueKind::Long, Value::Decimal(a)) => a.trunc().to_i64().map(Value::Long),
        (ValueKind::Long, Value::Float(a)) => Decimal::from_f64(a.trunc())
            .and_then(|d| d.to_i64())
            .map(Value::Long),
        (ValueKind::Decimal, Value::Int(a)) => Some(Value::Decimal(Decimal::from(*a))),
        (ValueKind::Decimal, Value::Long(a)) => Some(Value::Decimal(Decimal::from(*a))),
        (ValueKind::Decimal, Value::Float(a)) => Decimal::from_f64(*a).map(Value::Decimal),
        (ValueKind::Float, Value::Int(a)) => Some(Value::Float(f64::from(*a))),
        (ValueKind::Float, Value::Long(a)) => Some(Value::Float(*a as f64)),
        (ValueKind::Float, Value::Decimal(a)) => a.to_f64().map(Value::Float),
        (ValueKind::Str, other) => Some(Value::str(&other.to_string())),
        _ => {
            return Err(ScoreError::TypeMismatch {
                context: "conversion",
                expected: kind.name(),
                actual: v.kind(),
            })
        }
    };
    converted.ok_or_else(|| ScoreError::Arithmetic(format!("{} does not fit a {}", v, kind)))
}
