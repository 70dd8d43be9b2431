use lotfolio::solver::Model;

/// Assert that `values` satisfies every bound, integrality requirement and
/// constraint of `model`.
pub fn assert_feasible(model: &Model, values: &[f64], tolerance: f64) {
    let violated = model.violations(values, tolerance);
    assert!(
        violated.is_empty(),
        "{} violates {:?} at {:?}",
        model.name(),
        violated,
        values
    );
}

/// Assert that `values` are whole numbers.
pub fn assert_integral(values: &[f64]) {
    for v in values {
        assert_eq!(v.fract(), 0.0, "expected integral values, got {values:?}");
    }
}
