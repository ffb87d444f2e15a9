pub mod hill;
pub mod levenberg;

use serde::Serialize;

use crate::model::profile::FitProfile;
use crate::model::stats::median;
use hill::{BOTTOM, HILL, IC50, InhibitoryHill, TOP};
use levenberg::{LmOptions, minimize, sum_squares};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitResult {
    pub ic50: f64,
    pub hill: f64,
    pub top: f64,
    pub bottom: f64,
    pub r_squared: f64,
    pub n_points: usize,
    pub evaluations: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("only {n_valid} valid points, need at least {required}")]
    InsufficientPoints { n_valid: usize, required: usize },
    #[error("optimizer did not converge within {evaluations} evaluations")]
    NonConvergence { evaluations: usize },
    #[error("model produced non-finite values")]
    NonFinite,
    #[error("x and y have different lengths ({0} vs {1})")]
    LengthMismatch(usize, usize),
}

/// Drops pairs where either side is NaN or infinite.
pub fn clean_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .unzip()
}

/// Four-parameter inhibitory Hill fit of survival `y` against knockdown `x`.
pub fn fit_inhibitory_hill(x: &[f64], y: &[f64], profile: &FitProfile) -> Result<FitResult, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch(x.len(), y.len()));
    }
    let (xs, ys) = clean_pairs(x, y);
    if xs.len() < profile.min_points {
        return Err(FitError::InsufficientPoints {
            n_valid: xs.len(),
            required: profile.min_points,
        });
    }

    let p0 = initial_guess(&xs, &ys, profile);
    let opts = LmOptions {
        max_evaluations: profile.max_evaluations,
        ..LmOptions::default()
    };
    let sol = minimize(
        &InhibitoryHill,
        &xs,
        &ys,
        p0,
        profile.bounds.lower,
        profile.bounds.upper,
        &opts,
    )?;
    tracing::debug!(
        cost = sol.cost,
        iterations = sol.iterations,
        evaluations = sol.evaluations,
        "hill fit converged"
    );

    let ss_res = sum_squares(&InhibitoryHill, &xs, &ys, &sol.params);
    let r_squared = r_squared(&ys, ss_res);

    Ok(FitResult {
        ic50: sol.params[IC50],
        hill: sol.params[HILL],
        top: sol.params[TOP],
        bottom: sol.params[BOTTOM],
        r_squared,
        n_points: xs.len(),
        evaluations: sol.evaluations,
    })
}

fn initial_guess(x: &[f64], y: &[f64], profile: &FitProfile) -> [f64; 4] {
    let positive: Vec<f64> = x.iter().copied().filter(|v| *v > 0.0).collect();
    let mut p = [0.0; 4];
    p[IC50] = median(&positive).unwrap_or(profile.default_ic50);
    p[HILL] = profile.initial_hill;
    p[TOP] = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    p[BOTTOM] = y.iter().copied().fold(f64::INFINITY, f64::min);
    p
}

/// `1 - SS_res / SS_tot`, or 0 when every y is identical.
pub fn r_squared(y: &[f64], ss_res: f64) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let m = y.iter().sum::<f64>() / y.len() as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - m) * (v - m)).sum();
    if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 }
}

#[cfg(test)]
#[path = "../../tests/src_inline/fit/tests.rs"]
mod tests;
