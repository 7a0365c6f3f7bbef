use modelforge_config::ModelConfig;
use modelforge_core::{
    Constraint, ExpandedModel, LinearExpr, NonlinearExpr, PiecewiseTerm, QuadraticExpr, Sense,
    VarKey, VarKind,
};
use modelforge_test::{all_satisfied, bounded, feasible_interval, model_with, Assignment};

use super::*;

fn milp() -> LinearizationEngine {
    LinearizationEngine::new(SolverCapability::mixed_integer())
}

fn aux_named<'m>(model: &'m Model, prefix: &str) -> Vec<&'m Variable> {
    model
        .variables()
        .iter()
        .filter(|v| v.name().starts_with(prefix))
        .collect()
}

fn objective_coeff(expanded: &ExpandedModel, name: &str) -> Option<f64> {
    let col = expanded.column(&VarKey::scalar(name))?;
    let objective = expanded.objective()?;
    objective.linear.iter().find(|&&(c, _)| c == col).map(|&(_, v)| v)
}

#[test]
fn test_maximize_product_reaches_corner() {
    let x = bounded("x", 0.0, 5.0);
    let y = bounded("y", 0.0, 5.0);
    let mut model = model_with(&[&x, &y]);
    model.maximize(NonlinearExpr::new().bilinear(&x, &y, 1.0));

    let out = milp().linearize(&model).unwrap();
    let z = aux_named(&out, "aux_mcc_");
    assert_eq!(z.len(), 1);
    let z = z[0].name();
    let expanded = out.expand().unwrap();
    assert_eq!(expanded.num_rows(), 4);
    assert_eq!(objective_coeff(&expanded, z), Some(1.0));

    let at = Assignment::new().set("x", 5.0).set("y", 5.0);
    let (_, best) = feasible_interval(&expanded, &at, z).unwrap();
    assert_eq!(best, 25.0);
}

#[test]
fn test_maximize_switched_product() {
    let b = Variable::binary_named("b");
    let v = bounded("v", 0.0, 10.0);
    let mut model = model_with(&[&b, &v]);
    model
        .add_constraint(Constraint::new("force_b").lhs(&b).eq(1.0))
        .unwrap();
    model.maximize(NonlinearExpr::new().bilinear(&b, &v, 1.0));

    let out = milp().linearize(&model).unwrap();
    let z = aux_named(&out, "aux_bigm_")[0].name().to_string();
    let expanded = out.expand().unwrap();
    assert_eq!(expanded.num_rows(), 5);

    let at = Assignment::new().set("b", 1.0).set("v", 10.0);
    assert_eq!(feasible_interval(&expanded, &at, &z), Some((10.0, 10.0)));
    // Nothing better is reachable at a smaller v.
    let at = Assignment::new().set("b", 1.0).set("v", 7.0);
    assert_eq!(feasible_interval(&expanded, &at, &z), Some((7.0, 7.0)));
}

#[test]
fn test_indicator_sign_table() {
    let big_m = 100.0;
    let config = ModelConfig::new().with_big_m(big_m);
    let engine = milp().with_config(&config);
    for condition in [true, false] {
        for sense in [Sense::Le, Sense::Ge] {
            let b = Variable::binary_named("b");
            let x = bounded("x", 0.0, 10.0);
            let mut model = model_with(&[&b, &x]);
            let expr = NonlinearExpr::new().indicator(&b, condition, LinearExpr::new().term(&x, 1.0), sense, 4.0);
            model.add_constraint(Constraint::new("rule").lhs(expr)).unwrap();

            let (out, report) = engine.linearize_with_report(&model).unwrap();
            assert_eq!(report.indicator, 1);
            assert!(out.constraint("rule").is_none());
            let expanded = out.expand().unwrap();
            assert_eq!(expanded.num_rows(), 1);

            for bv in [0.0, 1.0] {
                for xv in [0.0, 2.0, 4.0, 6.0, 10.0] {
                    let active = (bv == 1.0) == condition;
                    let holds = sense.holds(xv, 4.0, 1e-9);
                    let at = Assignment::new().set("b", bv).set("x", xv);
                    assert_eq!(
                        all_satisfied(&expanded, &at),
                        !active || holds,
                        "condition={} sense={} b={} x={}",
                        condition,
                        sense,
                        bv,
                        xv
                    );
                }
            }

            // The inactive row has at least M of slack at the rhs.
            let row = &expanded.rows()[0];
            let inactive = if condition { 0.0 } else { 1.0 };
            let at = Assignment::new().set("b", inactive).set("x", 4.0);
            let activity = row.activity(&at.to_vector(&expanded));
            assert!((activity - row.rhs).abs() >= big_m - 1e-9);
        }
    }
}

#[test]
fn test_indicator_equality_splits() {
    let b = Variable::binary_named("b");
    let x = bounded("x", 0.0, 10.0);
    let mut model = model_with(&[&b, &x]);
    let expr = NonlinearExpr::new().indicator(&b, true, LinearExpr::new().term(&x, 1.0), Sense::Eq, 3.0);
    model.add_constraint(Constraint::new("pin").lhs(expr)).unwrap();

    let expanded = milp().linearize(&model).unwrap().expand().unwrap();
    assert_eq!(expanded.num_rows(), 2);
    let on = |xv| Assignment::new().set("b", 1.0).set("x", xv);
    assert!(all_satisfied(&expanded, &on(3.0)));
    assert!(!all_satisfied(&expanded, &on(2.0)));
    assert!(!all_satisfied(&expanded, &on(4.0)));
    assert!(all_satisfied(&expanded, &Assignment::new().set("x", 9.0)));
}

#[test]
fn test_indicator_needs_binary() {
    let n = Variable::integer("n").bounds(0.0, 3.0);
    let x = bounded("x", 0.0, 10.0);
    let mut model = model_with(&[&n, &x]);
    let expr = NonlinearExpr::new().indicator(&n, true, LinearExpr::new().term(&x, 1.0), Sense::Le, 1.0);
    model.add_constraint(Constraint::new("rule").lhs(expr)).unwrap();
    assert!(milp().linearize(&model).unwrap_err().is_config());
}

#[test]
fn test_absolute_value_is_exact() {
    let x = bounded("x", -3.0, 5.0);
    let mut model = model_with(&[&x]);
    model.minimize(NonlinearExpr::new().absolute(&x, 2.0));

    let out = milp().linearize(&model).unwrap();
    let name = |prefix| aux_named(&out, prefix)[0].name().to_string();
    let (p, n, s, t) = (
        name("aux_abs_pos_"),
        name("aux_abs_neg_"),
        name("aux_abs_sign_"),
        name("aux_abs_4"),
    );
    let expanded = out.expand().unwrap();
    assert_eq!(objective_coeff(&expanded, &t), Some(2.0));

    for (xv, pv, nv, sv) in [(-2.0, 0.0, 2.0, 0.0), (4.0, 4.0, 0.0, 1.0), (-3.0, 0.0, 3.0, 0.0)] {
        let at = Assignment::new()
            .set("x", xv)
            .set(&p, pv)
            .set(&n, nv)
            .set(&s, sv);
        let abs = f64::abs(xv);
        assert_eq!(feasible_interval(&expanded, &at, &t), Some((abs, abs)), "x={}", xv);
    }

    // The sign binary cannot contradict the sign of x.
    let at = Assignment::new().set("x", -2.0).set(&n, 2.0).set(&s, 1.0).set(&t, 2.0);
    assert!(!all_satisfied(&expanded, &at));
}

#[test]
fn test_absolute_of_nonnegative_is_identity() {
    let x = bounded("x", 0.0, 5.0);
    let mut model = model_with(&[&x]);
    model.minimize(NonlinearExpr::new().absolute(&x, 1.0));
    let (out, report) = milp().linearize_with_report(&model).unwrap();
    assert_eq!(report.absolute, 1);
    assert_eq!(report.auxiliary_variables, 0);
    assert_eq!(out.variables().len(), 1);
    let expanded = out.expand().unwrap();
    assert_eq!(objective_coeff(&expanded, "x"), Some(1.0));
}

#[test]
fn test_max_selects_largest_argument() {
    let x = bounded("x", 0.0, 4.0);
    let y = bounded("y", 1.0, 3.0);
    let mut model = model_with(&[&x, &y]);
    model.minimize(NonlinearExpr::new().max(&[x.clone(), y.clone()], &[1.0, 2.0]));

    let out = milp().linearize(&model).unwrap();
    let z = aux_named(&out, "aux_max_")
        .into_iter()
        .find(|v| v.kind() == VarKind::Continuous)
        .unwrap()
        .name()
        .to_string();
    let sel: Vec<String> = aux_named(&out, "aux_max_sel_")
        .iter()
        .map(|v| v.name().to_string())
        .collect();
    assert_eq!(sel.len(), 2);
    let expanded = out.expand().unwrap();

    // max(3, 2 * 1) = 3, picked by the first selector.
    let at = Assignment::new()
        .set("x", 3.0)
        .set("y", 1.0)
        .set(&sel[0], 1.0);
    assert_eq!(feasible_interval(&expanded, &at, &z), Some((3.0, 3.0)));
    // max(1, 2 * 2.5) = 5, picked by the second selector.
    let at = Assignment::new()
        .set("x", 1.0)
        .set("y", 2.5)
        .set(&sel[1], 1.0);
    assert_eq!(feasible_interval(&expanded, &at, &z), Some((5.0, 5.0)));
}

#[test]
fn test_min_selects_smallest_argument() {
    let x = bounded("x", 0.0, 4.0);
    let y = bounded("y", -2.0, 2.0);
    let mut model = model_with(&[&x, &y]);
    model.maximize(NonlinearExpr::new().min(&[x.clone(), y.clone()], &[1.0, 1.0]));

    let out = milp().linearize(&model).unwrap();
    let z = aux_named(&out, "aux_min_")
        .into_iter()
        .find(|v| v.kind() == VarKind::Continuous)
        .unwrap()
        .name()
        .to_string();
    let sel: Vec<String> = aux_named(&out, "aux_min_sel_")
        .iter()
        .map(|v| v.name().to_string())
        .collect();
    let expanded = out.expand().unwrap();

    let at = Assignment::new().set("x", 3.0).set("y", -1.0).set(&sel[1], 1.0);
    assert_eq!(feasible_interval(&expanded, &at, &z), Some((-1.0, -1.0)));
}

#[test]
fn test_min_max_argument_mismatch() {
    let x = bounded("x", 0.0, 4.0);
    let mut model = model_with(&[&x]);
    model.minimize(NonlinearExpr::new().max(&[x.clone()], &[1.0, 2.0]));
    assert!(milp().linearize(&model).unwrap_err().is_config());

    let mut model = model_with(&[&x]);
    model.minimize(NonlinearExpr::new().min(&[], &[]));
    assert!(milp().linearize(&model).unwrap_err().is_config());
}

#[test]
fn test_native_terms_are_kept() {
    let x = bounded("x", -1.0, 5.0);
    let y = bounded("y", 0.0, 5.0);
    let b = Variable::binary_named("b");
    let mut model = model_with(&[&x, &y, &b]);
    let expr = NonlinearExpr::new()
        .bilinear(&x, &y, 1.0)
        .absolute(&x, 1.0)
        .max(&[x.clone(), y.clone()], &[1.0, 1.0])
        .piecewise(PiecewiseTerm::new(&y, |v| v * v).segments(2));
    model.minimize(expr);
    model
        .add_constraint(
            Constraint::new("rule")
                .lhs(NonlinearExpr::new().indicator(&b, true, LinearExpr::new().term(&x, 1.0), Sense::Le, 2.0)),
        )
        .unwrap();

    let engine = LinearizationEngine::new(SolverCapability::gurobi());
    assert!(!engine.needs_linearization(&model));
    let (out, report) = engine.linearize_with_report(&model).unwrap();
    assert_eq!(report.total(), 0);
    assert_eq!(report.native, 5);
    assert_eq!(out.variables().len(), 3);
    assert_eq!(out.objective().unwrap().expr.nonlinear_terms().len(), 4);
    assert!(out.constraint("rule").is_some());
}

#[test]
fn test_convex_square_kept_only_in_minimized_objective() {
    let x = bounded("x", -2.0, 2.0);
    let mut model = model_with(&[&x]);
    model.minimize(QuadraticExpr::new().product(&x, &x, 1.0));
    model
        .add_constraint(
            Constraint::new("ball")
                .lhs(QuadraticExpr::new().product(&x, &x, 1.0))
                .le(3.0),
        )
        .unwrap();

    let (out, report) = LinearizationEngine::new(SolverCapability::cplex())
        .linearize_with_report(&model)
        .unwrap();
    assert_eq!(report.native, 1);
    assert_eq!(report.quadratic, 1);
    assert_eq!(out.objective().unwrap().expr.quadratic_terms().len(), 1);
    assert!(out.constraint("ball").unwrap().lhs_expr().unwrap().is_linear());
    // Quadratic objectives still expand; the constraint is linear now.
    assert!(out.expand().is_ok());

    let mut concave = model_with(&[&x]);
    concave.minimize(QuadraticExpr::new().product(&x, &x, -1.0));
    let engine = LinearizationEngine::new(SolverCapability::cplex());
    assert!(engine.needs_linearization(&concave));
    let (out, report) = engine.linearize_with_report(&concave).unwrap();
    assert_eq!(report.native, 0);
    assert_eq!(report.quadratic, 1);
    assert!(out.objective().unwrap().expr.is_linear());
}

#[test]
fn test_output_is_linear_and_expands() {
    let x = bounded("x", -1.0, 3.0);
    let y = bounded("y", 0.0, 2.0);
    let b = Variable::binary_named("b");
    let mut model = model_with(&[&x, &y, &b]);
    model
        .add_constraint(
            Constraint::new("mixed")
                .lhs(
                    NonlinearExpr::new()
                        .term(&y, 1.0)
                        .bilinear(&x, &y, 1.0)
                        .bilinear(&b, &x, 2.0)
                        .absolute(&x, 1.0)
                        .min(&[x.clone(), y.clone()], &[1.0, -1.0])
                        .piecewise(PiecewiseTerm::new(&y, |v| v.exp()).segments(3)),
                )
                .le(10.0),
        )
        .unwrap();
    model.maximize(QuadraticExpr::new().product(&x, &y, 1.0).term(&b, 1.0));

    let engine = milp();
    assert!(engine.needs_linearization(&model));
    let (out, report) = engine.linearize_with_report(&model).unwrap();
    assert!(!engine.needs_linearization(&out));
    assert_eq!(report.bilinear, 2);
    assert_eq!(report.quadratic, 1);
    assert_eq!(report.absolute, 1);
    assert_eq!(report.min_max, 1);
    assert_eq!(report.piecewise, 1);
    // x * y in the objective reuses the constraint's auxiliary.
    assert_eq!(aux_named(&out, "aux_mcc_").len(), 1);
    let expanded = out.expand().unwrap();
    assert!(expanded.num_rows() > 1);
    assert_eq!(out.constraint("mixed").unwrap().sense(), Sense::Le);
}

#[test]
fn test_sos2_falls_back_to_incremental() {
    let x = bounded("x", 0.0, 4.0);
    let mut model = model_with(&[&x]);
    model.minimize(
        NonlinearExpr::new().piecewise(
            PiecewiseTerm::new(&x, |v| v * v)
                .segments(4)
                .method(PiecewiseMethod::Sos2),
        ),
    );

    let out = milp().linearize(&model).unwrap();
    assert!(out.sos_sets().is_empty());
    assert_eq!(aux_named(&out, "aux_pw_seg_").len(), 4);

    // CPLEX has SOS2 but no native piecewise support.
    let out = LinearizationEngine::new(SolverCapability::cplex())
        .linearize(&model)
        .unwrap();
    assert_eq!(out.sos_sets().len(), 1);
    assert_eq!(aux_named(&out, "aux_pw_lambda_").len(), 5);
}

#[test]
fn test_auxiliary_names_avoid_model_names() {
    let x = bounded("x", 0.0, 1.0);
    let y = bounded("y", 0.0, 1.0);
    let taken = bounded("aux_mcc_1", 0.0, 1.0);
    let mut model = model_with(&[&x, &y, &taken]);
    model.maximize(NonlinearExpr::new().bilinear(&x, &y, 1.0));
    let (out, report) = milp().linearize_with_report(&model).unwrap();
    assert_eq!(report.auxiliary_variables, 1);
    assert_eq!(out.variables().len(), 4);
    assert!(out.expand().is_ok());
}

#[test]
fn test_linear_model_passes_through() {
    let x = bounded("x", 0.0, 1.0);
    let mut model = model_with(&[&x]);
    model
        .add_constraint(Constraint::new("cap").lhs(&x).le(1.0).as_goal(1, 1.0))
        .unwrap();
    model.maximize(&x);
    let engine = milp();
    assert!(!engine.needs_linearization(&model));
    let (out, report) = engine.linearize_with_report(&model).unwrap();
    assert_eq!(report, LinearizationReport::default());
    assert!(out.constraint("cap").unwrap().is_goal());
    assert_eq!(out.expand().unwrap().num_rows(), 1);
}
