use modelforge_config::LinearizationConfig;
use modelforge_core::{ExpandedModel, SosKind, Value};
use modelforge_test::{all_satisfied, bounded, feasible_interval, model_with, Assignment};

use super::*;

fn linearizer() -> PiecewiseLinearizer {
    PiecewiseLinearizer::new(&LinearizationConfig::default())
}

fn square(x: &Variable, method: PiecewiseMethod) -> PiecewiseTerm {
    PiecewiseTerm::new(x, |x| x * x).segments(4).method(method)
}

fn expand_with(x: &Variable, aux: Auxiliary) -> ExpandedModel {
    let mut model = model_with(&[x]);
    aux.merge_into(&mut model).unwrap();
    model.expand().unwrap()
}

#[test]
fn test_square_on_uniform_breakpoints() {
    let x = bounded("x", 0.0, 4.0);
    let approx = linearizer().approximate(&square(&x, PiecewiseMethod::Sos2)).unwrap();
    assert_eq!(approx.breakpoints, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(approx.values, vec![0.0, 1.0, 4.0, 9.0, 16.0]);
    assert_eq!(approx.segments(), 4);
    assert_eq!(approx.output.finite_bounds(), Some((0.0, 16.0)));
    assert_eq!(approx.interpolate(0.5), Some(0.5));
    assert_eq!(approx.interpolate(4.5), None);
}

#[test]
fn test_sos2_formulation() {
    let x = bounded("x", 0.0, 4.0);
    let mut lin = linearizer();
    let approx = lin.approximate(&square(&x, PiecewiseMethod::Sos2)).unwrap();
    let aux = lin.take_auxiliary();
    // Output plus one weight per breakpoint.
    assert_eq!(aux.variables.len(), 6);
    assert_eq!(aux.constraints.len(), 3);
    assert_eq!(aux.sos_sets.len(), 1);
    assert_eq!(aux.sos_sets[0].kind, SosKind::Sos2);
    let lambdas: Vec<String> = aux.variables[1..].iter().map(|v| v.name().to_string()).collect();

    let expanded = expand_with(&x, aux);
    assert_eq!(expanded.sos_sets().len(), 1);
    assert_eq!(expanded.sos_sets()[0].members.len(), 5);

    for (i, (&bp, &v)) in approx.breakpoints.iter().zip(&approx.values).enumerate() {
        let mut at = Assignment::new().set("x", bp).set(approx.output.name(), v);
        for (j, name) in lambdas.iter().enumerate() {
            at = at.set(name, if i == j { 1.0 } else { 0.0 });
        }
        assert!(all_satisfied(&expanded, &at), "breakpoint {}", bp);
        assert_eq!(
            feasible_interval(&expanded, &at, approx.output.name()),
            Some((v, v))
        );
    }

    // Between adjacent breakpoints the output follows the chord.
    let at = Assignment::new()
        .set("x", 2.5)
        .set(approx.output.name(), 6.5)
        .set(&lambdas[2], 0.5)
        .set(&lambdas[3], 0.5);
    assert!(all_satisfied(&expanded, &at));
}

#[test]
fn test_incremental_formulation() {
    let x = bounded("x", 0.0, 4.0);
    let mut lin = linearizer();
    let approx = lin
        .approximate(&square(&x, PiecewiseMethod::Incremental))
        .unwrap();
    let aux = lin.take_auxiliary();
    assert!(aux.sos_sets.is_empty());
    // Output plus a selector and a fill per segment.
    assert_eq!(aux.variables.len(), 9);
    let selects: Vec<String> = aux.variables[1..].iter().step_by(2).map(|v| v.name().to_string()).collect();
    let fills: Vec<String> = aux.variables[2..].iter().step_by(2).map(|v| v.name().to_string()).collect();
    assert!(aux.variables[1..].iter().step_by(2).all(|v| v.kind() == VarKind::Binary));

    let expanded = expand_with(&x, aux);
    let segments = approx.segments();
    for (i, (&bp, &v)) in approx.breakpoints.iter().zip(&approx.values).enumerate() {
        // The last breakpoint is the full fill of the last segment.
        let (seg, fill) = if i < segments { (i, 0.0) } else { (segments - 1, 1.0) };
        let mut at = Assignment::new().set("x", bp).set(approx.output.name(), v);
        for s in 0..segments {
            at = at.set(&selects[s], if s == seg { 1.0 } else { 0.0 });
            at = at.set(&fills[s], if s == seg { fill } else { 0.0 });
        }
        assert!(all_satisfied(&expanded, &at), "breakpoint {}", bp);
        assert_eq!(
            feasible_interval(&expanded, &at, approx.output.name()),
            Some((v, v))
        );
    }

    // A fill without its selector is rejected.
    let mut at = Assignment::new().set("x", 0.5).set(approx.output.name(), 0.5);
    at = at.set(&fills[0], 0.5).set(&selects[1], 1.0);
    assert!(!all_satisfied(&expanded, &at));
}

/// Weights that place `x` on the chord of segment `seg` at fraction `t`.
fn sos2_at(weights: &[String], seg: usize, t: f64) -> Assignment {
    let mut at = Assignment::new();
    for (j, name) in weights.iter().enumerate() {
        let w = if j == seg { 1.0 - t } else if j == seg + 1 { t } else { 0.0 };
        at = at.set(name, w);
    }
    at
}

fn incremental_at(selects: &[String], fills: &[String], seg: usize, t: f64) -> Assignment {
    let mut at = Assignment::new();
    for s in 0..selects.len() {
        at = at.set(&selects[s], if s == seg { 1.0 } else { 0.0 });
        at = at.set(&fills[s], if s == seg { t } else { 0.0 });
    }
    at
}

#[test]
fn test_sos2_and_incremental_agree() {
    let x = bounded("x", 0.0, 4.0);

    let mut sos2 = linearizer();
    let by_weights = sos2.approximate(&square(&x, PiecewiseMethod::Sos2)).unwrap();
    let aux = sos2.take_auxiliary();
    let weights: Vec<String> = aux.variables[1..].iter().map(|v| v.name().to_string()).collect();
    let sos2_model = expand_with(&x, aux);

    let mut incremental = linearizer();
    let by_fills = incremental
        .approximate(&square(&x, PiecewiseMethod::Incremental))
        .unwrap();
    let aux = incremental.take_auxiliary();
    let selects: Vec<String> = aux.variables[1..].iter().step_by(2).map(|v| v.name().to_string()).collect();
    let fills: Vec<String> = aux.variables[2..].iter().step_by(2).map(|v| v.name().to_string()).collect();
    let incremental_model = expand_with(&x, aux);

    assert_eq!(by_weights.breakpoints, by_fills.breakpoints);
    assert_eq!(by_weights.values, by_fills.values);

    let bps = &by_weights.breakpoints;
    let segments = by_weights.segments();
    // Every breakpoint plus every segment midpoint.
    let mut points: Vec<(usize, f64)> = (0..segments).flat_map(|s| [(s, 0.0), (s, 0.5)]).collect();
    points.push((segments - 1, 1.0));

    for (seg, t) in points {
        let xv = bps[seg] + t * (bps[seg + 1] - bps[seg]);
        let a = feasible_interval(
            &sos2_model,
            &sos2_at(&weights, seg, t).set("x", xv),
            by_weights.output.name(),
        )
        .unwrap();
        let b = feasible_interval(
            &incremental_model,
            &incremental_at(&selects, &fills, seg, t).set("x", xv),
            by_fills.output.name(),
        )
        .unwrap();
        let expected = by_weights.interpolate(xv).unwrap();
        for (lo, hi) in [a, b] {
            assert!((lo - expected).abs() < 1e-9 && (hi - expected).abs() < 1e-9, "x = {}", xv);
        }
    }
}

#[test]
fn test_explicit_domain_overrides_bounds() {
    let x = bounded("x", -10.0, 10.0);
    let term = PiecewiseTerm::new(&x, |x| x.abs()).segments(2).domain(-1.0, 1.0);
    let approx = linearizer().approximate(&term).unwrap();
    assert_eq!(approx.breakpoints, vec![-1.0, 0.0, 1.0]);
}

#[test]
fn test_domain_errors() {
    let free = Variable::continuous("free");
    let err = linearizer()
        .approximate(&PiecewiseTerm::new(&free, |x| x * x))
        .unwrap_err();
    assert!(err.is_config());

    let x = bounded("x", 0.0, 1.0);
    let empty = PiecewiseTerm::new(&x, |x| x).domain(2.0, 2.0);
    assert!(linearizer().approximate(&empty).unwrap_err().is_config());

    let none = PiecewiseTerm::new(&x, |x| x).segments(0);
    assert!(linearizer().approximate(&none).unwrap_err().is_config());
}

#[test]
fn test_logarithmic_unsupported() {
    let x = bounded("x", 0.0, 1.0);
    let term = PiecewiseTerm::new(&x, |x| x).method(PiecewiseMethod::Logarithmic);
    let mut lin = linearizer();
    assert!(lin.approximate(&term).unwrap_err().is_unsupported());
    assert!(lin.auxiliary().is_empty());
}

#[test]
fn test_non_finite_function_value() {
    let x = bounded("x", 0.0, 1.0);
    let term = PiecewiseTerm::new(&x, |x| 1.0 / x).segments(2);
    let err = linearizer().approximate(&term).unwrap_err();
    assert!(matches!(err, ModelForgeError::Evaluation { .. }), "{}", err);
}

#[test]
fn test_configured_defaults_apply() {
    let mut config = LinearizationConfig::default();
    config.piecewise.segments = 3;
    config.piecewise.method = PiecewiseMethod::Incremental;
    let x = bounded("x", 0.0, 3.0);
    let approx = PiecewiseLinearizer::new(&config)
        .approximate(&PiecewiseTerm::new(&x, |x| x * x))
        .unwrap();
    assert_eq!(approx.method, PiecewiseMethod::Incremental);
    assert_eq!(approx.segments(), 3);
}

#[test]
fn test_adaptive_seeded_is_reproducible() {
    let x = bounded("x", 0.0, 2.0);
    let term = PiecewiseTerm::new(&x, |x| x.exp()).segments(5).adaptive(true);
    let a = linearizer().with_seed(Some(3)).approximate(&term).unwrap();
    let b = linearizer().with_seed(Some(3)).approximate(&term).unwrap();
    assert_eq!(a.breakpoints, b.breakpoints);
    assert_eq!(a.breakpoints.first(), Some(&0.0));
    assert_eq!(a.breakpoints.last(), Some(&2.0));
}

#[test]
fn test_indexed_argument_expands_per_key() {
    let x = Variable::continuous("x")
        .bounds(0.0, 2.0)
        .from_data([Value::from(1), Value::from(2)]);
    let mut lin = linearizer();
    let approx = lin
        .approximate(&PiecewiseTerm::new(&x, |x| x * x).segments(2))
        .unwrap();
    assert!(approx.output.is_indexed());
    let expanded = expand_with(&x, lin.take_auxiliary());
    assert_eq!(expanded.sos_sets().len(), 2);
    assert_eq!(expanded.rows().len(), 6);
}
