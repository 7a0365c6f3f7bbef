use modelforge_config::LinearizationConfig;
use modelforge_core::{ExpandedModel, IndexFn, Value, VarKey};
use modelforge_test::{bounded, feasible_interval, feasible_interval_at, model_with, Assignment};

use super::*;

fn linearizer() -> BilinearLinearizer {
    BilinearLinearizer::new(&LinearizationConfig::default())
}

fn expand_with(vars: &[&Variable], mut lin: BilinearLinearizer) -> ExpandedModel {
    let mut model = model_with(vars);
    lin.take_auxiliary().merge_into(&mut model).unwrap();
    model.expand().unwrap()
}

#[test]
fn test_mccormick_tight_at_corners() {
    let (xl, xu, yl, yu) = (-2.0, 3.0, 1.0, 4.0);
    let x = bounded("x", xl, xu);
    let y = bounded("y", yl, yu);
    let mut lin = linearizer();
    let z = lin.product(&x, &y).unwrap();
    assert_eq!(z.finite_bounds(), Some((-8.0, 12.0)));
    let expanded = expand_with(&[&x, &y], lin);

    for (xv, yv) in [(xl, yl), (xl, yu), (xu, yl), (xu, yu)] {
        let at = Assignment::new().set("x", xv).set("y", yv);
        let (lo, hi) = feasible_interval(&expanded, &at, z.name()).unwrap();
        assert!((lo - xv * yv).abs() < 1e-9, "corner ({}, {}) lo {}", xv, yv, lo);
        assert!((hi - xv * yv).abs() < 1e-9, "corner ({}, {}) hi {}", xv, yv, hi);
    }
}

#[test]
fn test_mccormick_interior_is_relaxed() {
    let x = bounded("x", 0.0, 2.0);
    let y = bounded("y", 0.0, 2.0);
    let mut lin = linearizer();
    let z = lin.product(&x, &y).unwrap();
    let expanded = expand_with(&[&x, &y], lin);
    let at = Assignment::new().set("x", 1.0).set("y", 1.0);
    let (lo, hi) = feasible_interval(&expanded, &at, z.name()).unwrap();
    assert!(lo < 1.0 && hi > 1.0);
}

#[test]
fn test_and_truth_table() {
    let x = Variable::binary_named("x");
    let y = Variable::binary_named("y");
    let mut lin = linearizer();
    let z = lin.product(&x, &y).unwrap();
    assert_eq!(z.kind(), VarKind::Binary);
    let expanded = expand_with(&[&x, &y], lin);

    for (xv, yv) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
        let at = Assignment::new().set("x", xv).set("y", yv);
        let expected = if xv == 1.0 && yv == 1.0 { 1.0 } else { 0.0 };
        assert_eq!(
            feasible_interval(&expanded, &at, z.name()),
            Some((expected, expected)),
            "x={} y={}",
            xv,
            yv
        );
    }
}

#[test]
fn test_big_m_exact_at_bounds() {
    for (lower, upper) in [(0.0, 10.0), (-3.0, 10.0), (2.0, 6.0)] {
        let b = Variable::binary_named("b");
        let v = bounded("v", lower, upper);
        let mut lin = linearizer();
        // Continuous operand first exercises the swapped dispatch.
        let z = lin.product(&v, &b).unwrap();
        assert_eq!(z.finite_bounds(), Some((lower.min(0.0), upper.max(0.0))));
        let expanded = expand_with(&[&b, &v], lin);

        for bv in [0.0, 1.0] {
            for vv in [lower, upper] {
                let at = Assignment::new().set("b", bv).set("v", vv);
                let (lo, hi) = feasible_interval(&expanded, &at, z.name()).unwrap();
                assert!((lo - bv * vv).abs() < 1e-9, "b={} v={} lo={}", bv, vv, lo);
                assert!((hi - bv * vv).abs() < 1e-9, "b={} v={} hi={}", bv, vv, hi);
            }
        }
    }
}

#[test]
fn test_big_m_falls_back_to_configured_constant() {
    let b = Variable::binary_named("b");
    let v = Variable::continuous("v").lower(0.0);
    let config = LinearizationConfig {
        big_m: 500.0,
        ..LinearizationConfig::default()
    };
    let mut lin = BilinearLinearizer::new(&config);
    let z = lin.product(&b, &v).unwrap();
    assert_eq!(z.finite_bounds(), Some((0.0, 500.0)));
}

#[test]
fn test_mccormick_requires_bounds() {
    let x = Variable::continuous("x").lower(0.0);
    let y = bounded("y", 0.0, 1.0);
    let err = linearizer().product(&x, &y).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_integer_operand_unsupported() {
    let n = Variable::integer("n").bounds(0.0, 5.0);
    let y = bounded("y", 0.0, 1.0);
    assert!(linearizer().product(&n, &y).unwrap_err().is_unsupported());
    let b = Variable::binary_named("b");
    assert!(linearizer().product(&b, &n).unwrap_err().is_unsupported());
}

#[test]
fn test_products_are_cached_per_pair() {
    let x = bounded("x", 0.0, 1.0);
    let y = bounded("y", 0.0, 1.0);
    let w = bounded("w", 0.0, 1.0);
    let mut lin = linearizer();
    let xy = lin.product(&x, &y).unwrap();
    let yx = lin.product(&y, &x).unwrap();
    let xw = lin.product(&x, &w).unwrap();
    assert_eq!(xy.name(), yx.name());
    assert_ne!(xy.name(), xw.name());
    assert_eq!(lin.cached_products(), 2);
    assert_eq!(lin.auxiliary().variables.len(), 2);
    assert_eq!(lin.auxiliary().constraints.len(), 8);
}

#[test]
fn test_names_skip_reserved() {
    let x = bounded("x", 0.0, 1.0);
    let y = bounded("y", 0.0, 1.0);
    let taken = bounded("aux_mcc_1", 0.0, 1.0);
    let model = model_with(&[&x, &y, &taken]);
    let mut lin = linearizer();
    lin.reserve_model(&model);
    let z = lin.product(&x, &y).unwrap();
    assert_ne!(z.name(), "aux_mcc_1");
    assert!(z.name().starts_with("aux_mcc_"));
}

fn shifts() -> Vec<Value> {
    (1..=3i64)
        .map(|i| Value::record([("id", Value::from(i)), ("cap", Value::from(i as f64))]))
        .collect()
}

#[test]
fn test_indexed_operands_align() {
    let on = Variable::binary_named("on")
        .from_data(shifts())
        .indexed_by(IndexFn::field("id"));
    let load = Variable::continuous("load")
        .bounds(0.0, 8.0)
        .from_data(shifts())
        .indexed_by(IndexFn::field("id"));
    let mut lin = linearizer();
    let z = lin.product(&on, &load).unwrap();
    assert!(z.is_indexed());
    let expanded = expand_with(&[&on, &load], lin);
    assert_eq!(expanded.num_rows(), 12);

    let cases = [(1.0, 5.0, 5.0), (0.0, 7.0, 0.0), (1.0, 8.0, 8.0)];
    let mut at = Assignment::new();
    for (i, &(b, v, product)) in cases.iter().enumerate() {
        let key = Value::from(i as i64 + 1);
        at.insert(VarKey::new("on", key.clone()), b);
        at.insert(VarKey::new("load", key.clone()), v);
        at.insert(VarKey::new(z.name_arc(), key), product);
    }
    for (i, &(_, _, product)) in cases.iter().enumerate() {
        let key = VarKey::new(z.name_arc(), Value::from(i as i64 + 1));
        assert_eq!(feasible_interval_at(&expanded, &at, &key), Some((product, product)));
    }
}

#[test]
fn test_indexed_operands_with_different_keys_rejected() {
    let a = Variable::binary_named("a").from_data([1, 2, 3]);
    let b = Variable::binary_named("b").from_data([1, 2]);
    assert!(linearizer().product(&a, &b).unwrap_err().is_config());
}
