use super::*;
use crate::fit::hill::inhibitory_hill;

fn kd_obs(label: &str, kd: f64, survival: f64) -> Observation {
    Observation {
        plate: String::new(),
        well: None,
        well_id: String::new(),
        raw_label: label.to_string(),
        label: label.to_string(),
        gene_base: label.to_string(),
        cell_line: String::new(),
        method: String::new(),
        value: 0.0,
        kd_percent: Some(kd),
        death_pct: 100.0 - survival,
        survival_pct: survival,
        degenerate: false,
    }
}

#[test]
fn test_three_points_is_null_not_error() {
    let fit = fit_group("sh_short", &[10.0, 50.0, 90.0], &[20.0, 50.0, 80.0], &FitProfile::default());
    assert_eq!(fit.status, FitStatus::InsufficientPoints);
    assert_eq!(fit.n_valid, 3);
    assert!(fit.result.is_none());
}

#[test]
fn test_groups_fit_independently() {
    let mut observations = Vec::new();
    for i in 1..=10 {
        let x = i as f64 * 10.0;
        observations.push(kd_obs("shGood", x, inhibitory_hill(x, 30.0, -2.0, 100.0, 0.0)));
    }
    observations.push(kd_obs("shFew", 10.0, 90.0));
    observations.push(kd_obs("shFew", 60.0, 40.0));
    observations.push(kd_obs("shFew", 90.0, f64::NAN));

    let fits = run_stage5(&observations, &FitProfile::default());
    assert_eq!(fits.len(), 2);
    assert_eq!(fits[0].label, "shFew");
    assert_eq!(fits[0].status, FitStatus::InsufficientPoints);
    assert_eq!(fits[0].n_valid, 2);

    assert_eq!(fits[1].label, "shGood");
    assert_eq!(fits[1].status, FitStatus::Ok);
    let result = fits[1].result.unwrap();
    assert!((result.ic50 - 30.0).abs() <= 1.0);
    assert!(result.r_squared >= 0.99);
}

#[test]
fn test_exhausted_budget_is_failed_fit() {
    let x: Vec<f64> = (1..=8).map(|i| i as f64 * 10.0).collect();
    let y: Vec<f64> = x.iter().map(|&v| inhibitory_hill(v, 30.0, -2.0, 100.0, 0.0)).collect();
    let profile = FitProfile {
        max_evaluations: 1,
        ..FitProfile::default()
    };
    let fit = fit_group("sh_budget", &x, &y, &profile);
    assert_eq!(fit.status, FitStatus::Failed);
    assert_eq!(fit.n_valid, 8);
    assert!(fit.result.is_none());
}

#[test]
fn test_negative_knockdown_is_failed_fit() {
    let observations = vec![
        kd_obs("shNeg", -5.0, 100.0),
        kd_obs("shNeg", 20.0, 80.0),
        kd_obs("shNeg", 30.0, 40.0),
        kd_obs("shNeg", 40.0, 20.0),
        kd_obs("shNeg", 50.0, 10.0),
    ];
    let fits = run_stage5(&observations, &FitProfile::default());
    assert_eq!(fits.len(), 1);
    assert_eq!(fits[0].status, FitStatus::Failed);
    assert_eq!(fits[0].n_valid, 5);
    assert!(fits[0].result.is_none());
}

#[test]
fn test_observations_without_knockdown_are_ignored() {
    let mut obs = kd_obs("plate_only", 0.0, 50.0);
    obs.kd_percent = None;
    assert!(run_stage5(&[obs], &FitProfile::default()).is_empty());
}
