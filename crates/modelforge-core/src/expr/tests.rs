use super::*;
use crate::constraint::Sense;
use crate::func::{Coefficient, Predicate};
use crate::value::Value;

fn var(name: &str) -> Variable {
    Variable::continuous(name).bounds(0.0, 10.0)
}

#[test]
fn test_merging_sums_coefficient_functions() {
    let x = var("x");
    let expr = LinearExpr::new()
        .term(&x, Coefficient::from_fn(|v| v.get_f64("a")))
        .term(&x, 2.0);
    assert_eq!(expr.len(), 1);
    let inst = Value::record([("a", Value::from(1.5))]);
    let coeff = &expr.term_for("x").unwrap().coeff;
    assert_eq!(coeff.eval(&inst).unwrap(), 3.5);
}

#[test]
fn test_merging_and_combines_filters() {
    let x = var("x");
    let expr = LinearExpr::new()
        .term_where(&x, 1.0, Predicate::new(|v| Ok(v.as_i64().unwrap_or(0) > 1)))
        .term_where(&x, 1.0, Predicate::new(|v| Ok(v.as_i64().unwrap_or(0) < 5)));
    let filter = expr.term_for("x").unwrap().filter.clone().unwrap();
    assert!(filter.eval(&Value::from(3)).unwrap());
    assert!(!filter.eval(&Value::from(7)).unwrap());
    assert!(!filter.eval(&Value::from(0)).unwrap());
}

#[test]
fn test_operator_algebra() {
    let x = var("x");
    let y = var("y");
    let a = LinearExpr::new().term(&x, 1.0) + 2.0;
    let b = LinearExpr::new().term(&y, 3.0).term(&x, 1.0);
    let diff = a - b;
    assert_eq!(diff.term_for("x").unwrap().coeff.as_constant(), Some(0.0));
    assert_eq!(diff.term_for("y").unwrap().coeff.as_constant(), Some(-3.0));
    assert_eq!(diff.constant(), 2.0);

    let neg = -diff;
    assert_eq!(neg.term_for("y").unwrap().coeff.as_constant(), Some(3.0));
    assert_eq!(neg.constant(), -2.0);
}

#[test]
fn test_scaling_distributes_over_functions() {
    let x = var("x");
    let expr = LinearExpr::new().term(&x, Coefficient::from_fn(|v| v.get_f64("w"))) * -2.0;
    let inst = Value::record([("w", Value::from(4.0))]);
    assert_eq!(expr.term_for("x").unwrap().coeff.eval(&inst).unwrap(), -8.0);
}

#[test]
fn test_parts_round_trip() {
    let x = var("x");
    let y = var("y");
    let expr: Expr = QuadraticExpr::from_linear(LinearExpr::new().term(&x, 1.0))
        .product(&x, &y, 2.0)
        .plus_constant(3.0)
        .into();
    assert!(!expr.is_linear());
    assert_eq!(expr.constant(), 3.0);

    let (linear, quad, nl) = expr.into_parts();
    assert_eq!(linear.constant(), 3.0);
    assert_eq!(quad.len(), 1);
    assert!(nl.is_empty());

    let rebuilt = Expr::from_parts(linear, quad, Vec::new());
    assert!(matches!(rebuilt, Expr::Quadratic(_)));
    let linear_only = Expr::from_parts(LinearExpr::new(), Vec::new(), Vec::new());
    assert!(linear_only.is_linear());
}

#[test]
fn test_mixed_parts_become_nonlinear() {
    let x = var("x");
    let y = var("y");
    let expr = Expr::from_parts(
        LinearExpr::new(),
        vec![QuadraticTerm::new(&x, &y, 1.0)],
        vec![NonlinearTerm::Absolute(AbsoluteTerm {
            var: x.clone(),
            coeff: 1.0,
        })],
    );
    let kinds: Vec<_> = expr.nonlinear_terms().iter().map(|t| t.kind()).collect();
    assert_eq!(kinds, vec![NonlinearKind::Bilinear, NonlinearKind::Absolute]);
}

#[test]
fn test_indicator_variables() {
    let b = Variable::binary_named("b");
    let x = var("x");
    let expr = NonlinearExpr::new().indicator(&b, true, LinearExpr::from(&x), Sense::Le, 4.0);
    let names: Vec<_> = Expr::from(expr).variables().iter().map(|v| v.name().to_string()).collect();
    assert_eq!(names, vec!["b", "x"]);
}

#[test]
fn test_scalar_fn_rejects_non_finite() {
    let f = ScalarFn::new(|x| 1.0 / x);
    assert_eq!(f.eval(2.0).unwrap(), 0.5);
    assert!(f.eval(0.0).is_err());
}
