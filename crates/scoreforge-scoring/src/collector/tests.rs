use rust_decimal::Decimal;
use scoreforge_core::{Expr, Value};

use super::*;
use crate::facts::FactStore;
use crate::function::FunctionRegistry;

fn with_ctx<R>(f: impl FnOnce(&EvalContext<'_>) -> R) -> R {
    let facts = FactStore::new();
    let functions = FunctionRegistry::new();
    f(&EvalContext::new(&facts, &functions))
}

fn feed(
    collector: &Collector,
    acc: &mut dyn Accumulator,
    ctx: &EvalContext<'_>,
    value: Value,
) -> UndoToken {
    let input = collector.extract(ctx, &[value]).unwrap();
    acc.insert(input).unwrap()
}

#[test]
fn test_count_insert_and_undo() {
    with_ctx(|ctx| {
        let collector = count();
        let mut acc = collector.supplier();
        let a = feed(&collector, acc.as_mut(), ctx, Value::Int(1));
        feed(&collector, acc.as_mut(), ctx, Value::Int(2));
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(2));

        acc.undo(a).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(1));
    });
}

#[test]
fn test_count_distinct_keeps_duplicates_until_last() {
    with_ctx(|ctx| {
        let collector = count_distinct(Expr::param(0));
        let mut acc = collector.supplier();
        let first = feed(&collector, acc.as_mut(), ctx, Value::Int(7));
        feed(&collector, acc.as_mut(), ctx, Value::Int(7));
        feed(&collector, acc.as_mut(), ctx, Value::Int(8));
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(2));

        acc.undo(first).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(2));
    });
}

#[test]
fn test_sum_skips_none_and_empty_is_zero() {
    with_ctx(|ctx| {
        let collector = sum(Expr::param(0));
        let mut acc = collector.supplier();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(0));

        let ten = feed(&collector, acc.as_mut(), ctx, Value::Int(10));
        let none = feed(&collector, acc.as_mut(), ctx, Value::None);
        feed(&collector, acc.as_mut(), ctx, Value::Int(20));
        assert_eq!(none, UndoToken::Skipped);
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(30));

        acc.undo(ten).unwrap();
        acc.undo(none).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(20));
    });
}

#[test]
fn test_sum_rejects_mixed_kinds() {
    with_ctx(|ctx| {
        let collector = sum(Expr::param(0));
        let mut acc = collector.supplier();
        feed(&collector, acc.as_mut(), ctx, Value::Int(1));
        let input = collector.extract(ctx, &[Value::Long(2)]).unwrap();
        assert!(acc.insert(input).is_err());
    });
}

#[test]
fn test_float_sum_does_not_drift_on_retraction() {
    with_ctx(|ctx| {
        let collector = sum(Expr::param(0));
        let mut acc = collector.supplier();
        let tenth = feed(&collector, acc.as_mut(), ctx, Value::Float(0.1));
        feed(&collector, acc.as_mut(), ctx, Value::Float(0.2));
        acc.undo(tenth).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Float(0.2));
    });
}

#[test]
fn test_float_sum_ignores_insertion_order() {
    with_ctx(|ctx| {
        let collector = sum(Expr::param(0));
        let mut forward = collector.supplier();
        let mut backward = collector.supplier();
        for v in [0.1, 0.2, 0.3, 1e16] {
            feed(&collector, forward.as_mut(), ctx, Value::Float(v));
        }
        for v in [1e16, 0.3, 0.2, 0.1] {
            feed(&collector, backward.as_mut(), ctx, Value::Float(v));
        }
        assert_eq!(forward.result(ctx).unwrap(), backward.result(ctx).unwrap());

        let input = collector.extract(ctx, &[Value::Int(1)]).unwrap();
        assert!(forward.insert(input).is_err());
        assert!(forward.undo(UndoToken::Value(Value::Float(7.0))).is_err());
    });
}

#[test]
fn test_average() {
    with_ctx(|ctx| {
        let collector = average(Expr::param(0));
        let mut acc = collector.supplier();
        assert_eq!(acc.result(ctx).unwrap(), Value::None);

        feed(&collector, acc.as_mut(), ctx, Value::Int(1));
        feed(&collector, acc.as_mut(), ctx, Value::Int(2));
        assert_eq!(acc.result(ctx).unwrap(), Value::Float(1.5));

        let decimal = average(Expr::param(0));
        let mut acc = decimal.supplier();
        feed(&decimal, acc.as_mut(), ctx, Value::Decimal(Decimal::new(15, 1)));
        feed(&decimal, acc.as_mut(), ctx, Value::Decimal(Decimal::new(25, 1)));
        assert_eq!(acc.result(ctx).unwrap(), Value::Decimal(Decimal::from(2)));
    });
}

#[test]
fn test_min_survives_retraction() {
    with_ctx(|ctx| {
        let collector = min(Expr::param(0));
        let mut acc = collector.supplier();
        let tokens: Vec<_> = [5, 3, 5, 1]
            .into_iter()
            .map(|v| feed(&collector, acc.as_mut(), ctx, Value::Int(v)))
            .collect();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(1));

        acc.undo(tokens[3].clone()).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(3));

        acc.undo(tokens[1].clone()).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(5));

        // One of the duplicate minima leaves, the other still holds.
        acc.undo(tokens[0].clone()).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(5));

        acc.undo(tokens[2].clone()).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), Value::None);
    });
}

#[test]
fn test_max_by_property_prefers_earliest_on_tie() {
    with_ctx(|ctx| {
        // Orders lists by their length.
        let collector = max_by(Expr::param(0), Expr::len(Expr::param(0)));
        let mut acc = collector.supplier();
        let ab = Value::List(vec![Value::str("a"), Value::str("b")]);
        let cd = Value::List(vec![Value::str("c"), Value::str("d")]);
        let first = feed(&collector, acc.as_mut(), ctx, ab.clone());
        feed(&collector, acc.as_mut(), ctx, cd.clone());
        feed(&collector, acc.as_mut(), ctx, Value::List(vec![Value::str("e")]));
        assert_eq!(acc.result(ctx).unwrap(), ab);

        acc.undo(first).unwrap();
        assert_eq!(acc.result(ctx).unwrap(), cd);
    });
}

#[test]
fn test_to_list_keeps_insertion_order() {
    with_ctx(|ctx| {
        let collector = to_list(Expr::param(0));
        let mut acc = collector.supplier();
        feed(&collector, acc.as_mut(), ctx, Value::Int(3));
        let middle = feed(&collector, acc.as_mut(), ctx, Value::Int(1));
        feed(&collector, acc.as_mut(), ctx, Value::Int(2));
        acc.undo(middle.clone()).unwrap();

        assert_eq!(
            acc.result(ctx).unwrap(),
            Value::List(vec![Value::Int(3), Value::Int(2)])
        );
        assert!(acc.undo(middle).is_err());
    });
}

#[test]
fn test_and_then_maps_result() {
    with_ctx(|ctx| {
        let collector = count().and_then(Expr::param(0) * Expr::int(10));
        let mut acc = collector.supplier();
        feed(&collector, acc.as_mut(), ctx, Value::Int(0));
        feed(&collector, acc.as_mut(), ctx, Value::Int(0));
        assert_eq!(acc.result(ctx).unwrap(), Value::Int(20));
    });
}

#[test]
fn test_exprs_scopes() {
    let collector = min_by(Expr::field(0, 1), Expr::param(0)).and_then(Expr::param(0));
    let scopes: Vec<_> = collector.exprs().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        scopes,
        vec![ExprScope::Tuple, ExprScope::Element, ExprScope::Element]
    );
}
