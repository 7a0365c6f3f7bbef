//! Tests for model configuration.

use super::*;

#[test]
fn test_defaults() {
    let config = ModelConfig::default();
    assert_eq!(config.random_seed, None);
    assert_eq!(config.linearization.big_m, 1e6);
    assert_eq!(config.linearization.aux_prefix, "aux");
    assert_eq!(config.linearization.piecewise.segments, 10);
    assert_eq!(config.linearization.piecewise.method, PiecewiseMethod::Sos2);
    assert!(!config.linearization.piecewise.adaptive);
    assert_eq!(config.linearization.piecewise.adaptive_samples, 1000);
    assert_eq!(config.goal_programming.mode, GoalMode::Weighted);
    assert_eq!(config.goal_programming.priority_base, 10.0);
    assert_eq!(config.goal_programming.priority_exponent_offset, 6);
    assert_eq!(config.goal_programming.deviation_fixing, DeviationFixing::Tolerance);
    assert_eq!(config.goal_programming.fixing_tolerance, 1e-6);
    assert_eq!(config.rational.max_denominator, 10_000);
    assert_eq!(config.rational.algorithm, RationalAlgorithm::Farey);
    assert!(config.validate().is_ok());
}

#[test]
fn test_toml_parsing() {
    let toml = r#"
        random_seed = 42

        [linearization]
        big_m = 250.0
        aux_prefix = "lin"

        [linearization.piecewise]
        segments = 4
        adaptive = true
        adaptive_samples = 50

        [goal_programming]
        mode = "sequential"
        priority_base = 100.0
        priority_exponent_offset = 3
        deviation_fixing = "exact"

        [rational]
        max_denominator = 64
        algorithm = "stern_brocot"
    "#;

    let config = ModelConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.random_seed, Some(42));
    assert_eq!(config.linearization.big_m, 250.0);
    assert_eq!(config.linearization.aux_prefix, "lin");
    assert_eq!(config.linearization.piecewise.segments, 4);
    assert!(config.linearization.piecewise.adaptive);
    assert_eq!(config.goal_programming.mode, GoalMode::Sequential);
    assert_eq!(config.goal_programming.deviation_fixing, DeviationFixing::Exact);
    assert_eq!(config.goal_programming.fixing_tolerance, 1e-6);
    assert_eq!(config.rational.algorithm, RationalAlgorithm::SternBrocot);
    assert_eq!(config.rational_converter().max_denominator(), 64);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        random_seed: 9
        linearization:
          piecewise:
            method: incremental
        rational:
          algorithm: continued_fraction
          tolerance: 0.000001
    "#;

    let config = ModelConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.random_seed, Some(9));
    assert_eq!(config.linearization.piecewise.method, PiecewiseMethod::Incremental);
    assert_eq!(config.linearization.big_m, 1e6);
    assert_eq!(config.rational.algorithm, RationalAlgorithm::ContinuedFraction);
    assert_eq!(config.rational.tolerance, 1e-6);
}

#[test]
fn test_invalid_values_rejected() {
    let err = ModelConfig::from_toml_str("[linearization]\nbig_m = -1.0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = ModelConfig::from_toml_str("[goal_programming]\npriority_base = 1.0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = ModelConfig::from_toml_str("[rational]\nmax_denominator = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = ModelConfig::from_toml_str("[linearization.piecewise]\nsegments = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = ModelConfig::from_toml_str("[goal_programming]\nmode = \"lexicographic\"").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_builder() {
    let config = ModelConfig::new()
        .with_random_seed(123)
        .with_big_m(1e4)
        .with_segments(6)
        .with_piecewise_method(PiecewiseMethod::Incremental)
        .with_goal_mode(GoalMode::Sequential)
        .with_deviation_fixing(DeviationFixing::Exact)
        .with_rational_algorithm(RationalAlgorithm::ContinuedFraction);

    assert_eq!(config.random_seed, Some(123));
    assert_eq!(config.linearization.big_m, 1e4);
    assert_eq!(config.linearization.piecewise.segments, 6);
    assert_eq!(config.goal_programming.mode, GoalMode::Sequential);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_missing_file() {
    assert!(matches!(
        ModelConfig::load("/nonexistent/model.yaml"),
        Err(ConfigError::Io(_))
    ));
}
