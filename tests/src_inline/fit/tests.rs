use super::hill::inhibitory_hill;
use super::*;

fn synthetic(ic50: f64, hill: f64, top: f64, bottom: f64) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();
    let y = x
        .iter()
        .map(|&v| inhibitory_hill(v, ic50, hill, top, bottom))
        .collect();
    (x, y)
}

#[test]
fn test_recovers_synthetic_hill_curve() {
    let (x, y) = synthetic(30.0, -2.0, 100.0, 0.0);
    let fit = fit_inhibitory_hill(&x, &y, &FitProfile::default()).unwrap();
    assert!((fit.ic50 - 30.0).abs() <= 1.0, "ic50 = {}", fit.ic50);
    assert!(fit.r_squared >= 0.99, "r2 = {}", fit.r_squared);
    assert!(fit.hill < 0.0);
    assert_eq!(fit.n_points, 10);
}

#[test]
fn test_recovers_curve_with_nonzero_bottom() {
    let (x, y) = synthetic(45.0, -3.0, 90.0, 10.0);
    let fit = fit_inhibitory_hill(&x, &y, &FitProfile::default()).unwrap();
    assert!((fit.ic50 - 45.0).abs() <= 1.0, "ic50 = {}", fit.ic50);
    assert!(fit.r_squared >= 0.99);
}

#[test]
fn test_three_points_is_no_fit() {
    let x = [10.0, 50.0, 90.0];
    let y = [90.0, 50.0, 10.0];
    let err = fit_inhibitory_hill(&x, &y, &FitProfile::default()).unwrap_err();
    assert_eq!(
        err,
        FitError::InsufficientPoints {
            n_valid: 3,
            required: 4
        }
    );
}

#[test]
fn test_nan_pairs_are_dropped_before_counting() {
    let x = [10.0, f64::NAN, 50.0, 70.0, 90.0];
    let y = [90.0, 60.0, f64::NAN, 30.0, 10.0];
    let err = fit_inhibitory_hill(&x, &y, &FitProfile::default()).unwrap_err();
    assert!(matches!(err, FitError::InsufficientPoints { n_valid: 3, .. }));

    let (cx, cy) = clean_pairs(&x, &y);
    assert_eq!(cx, vec![10.0, 70.0, 90.0]);
    assert_eq!(cy, vec![90.0, 30.0, 10.0]);
}

#[test]
fn test_parameters_stay_within_bounds() {
    // Survival above the top bound forces top onto its limit.
    let x = [10.0, 20.0, 40.0, 60.0, 80.0, 95.0];
    let y = [5.0, 20.0, 90.0, 130.0, 140.0, 145.0];
    let profile = FitProfile::default();
    if let Ok(fit) = fit_inhibitory_hill(&x, &y, &profile) {
        let p = [fit.ic50, fit.hill, fit.top, fit.bottom];
        for i in 0..4 {
            assert!(p[i] >= profile.bounds.lower[i] && p[i] <= profile.bounds.upper[i]);
        }
    }
}

#[test]
fn test_negative_knockdown_poisoning_every_step_is_non_finite() {
    let x = [-5.0, 20.0, 30.0, 40.0, 50.0];
    let y = [100.0, 80.0, 40.0, 20.0, 10.0];
    let err = fit_inhibitory_hill(&x, &y, &FitProfile::default()).unwrap_err();
    assert_eq!(err, FitError::NonFinite);
}

#[test]
fn test_length_mismatch() {
    let err = fit_inhibitory_hill(&[1.0, 2.0], &[1.0], &FitProfile::default()).unwrap_err();
    assert_eq!(err, FitError::LengthMismatch(2, 1));
}

#[test]
fn test_r_squared_constant_y_is_zero() {
    assert_eq!(r_squared(&[5.0, 5.0, 5.0], 0.0), 0.0);
    assert!((r_squared(&[1.0, 2.0, 3.0], 0.5) - 0.75).abs() < 1e-12);
}

#[test]
fn test_initial_guess_falls_back_without_positive_x() {
    let profile = FitProfile::default();
    let p = initial_guess(&[0.0, 0.0, -1.0], &[10.0, 40.0, 20.0], &profile);
    assert_eq!(p, [50.0, -1.0, 40.0, 10.0]);
    let p = initial_guess(&[10.0, 20.0, 90.0], &[1.0, 2.0, 3.0], &profile);
    assert_eq!(p[0], 20.0);
}
