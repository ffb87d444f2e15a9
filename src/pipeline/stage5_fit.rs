use std::collections::BTreeMap;

use serde::Serialize;

use crate::fit::{FitError, FitResult, clean_pairs, fit_inhibitory_hill};
use crate::model::profile::FitProfile;
use crate::pipeline::stage3_normalize::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Ok,
    InsufficientPoints,
    Failed,
}

impl FitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitStatus::Ok => "ok",
            FitStatus::InsufficientPoints => "insufficient_points",
            FitStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupFit {
    pub label: String,
    pub n_valid: usize,
    pub status: FitStatus,
    pub result: Option<FitResult>,
}

/// Fits one treatment group. A failed or skipped fit is `None`, never an error.
pub fn fit_group(label: &str, x: &[f64], y: &[f64], profile: &FitProfile) -> GroupFit {
    let n_valid = clean_pairs(x, y).0.len();
    match fit_inhibitory_hill(x, y, profile) {
        Ok(result) => {
            tracing::debug!(
                hairpin = label,
                ic50 = result.ic50,
                r_squared = result.r_squared,
                "hill fit"
            );
            GroupFit {
                label: label.to_string(),
                n_valid,
                status: FitStatus::Ok,
                result: Some(result),
            }
        }
        Err(FitError::InsufficientPoints { n_valid, required }) => {
            tracing::warn!("{label} has {n_valid} valid points (<{required}), skipping fit");
            GroupFit {
                label: label.to_string(),
                n_valid,
                status: FitStatus::InsufficientPoints,
                result: None,
            }
        }
        Err(err) => {
            tracing::warn!("could not fit {label}: {err}");
            GroupFit {
                label: label.to_string(),
                n_valid,
                status: FitStatus::Failed,
                result: None,
            }
        }
    }
}

/// Survival against knockdown, one fit per label, in label order.
pub fn run_stage5(observations: &[Observation], profile: &FitProfile) -> Vec<GroupFit> {
    let mut groups: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for obs in observations {
        let Some(kd) = obs.kd_percent else {
            continue;
        };
        let entry = groups.entry(obs.label.as_str()).or_default();
        entry.0.push(kd);
        entry.1.push(obs.survival_pct);
    }

    let fits: Vec<GroupFit> = groups
        .into_iter()
        .map(|(label, (x, y))| fit_group(label, &x, &y, profile))
        .collect();

    let ok = fits.iter().filter(|f| f.status == FitStatus::Ok).count();
    tracing::info!(groups = fits.len(), fitted = ok, "dose-response fitting done");
    fits
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_fit.rs"]
mod tests;
