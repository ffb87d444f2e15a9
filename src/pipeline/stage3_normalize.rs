use serde::Serialize;

use crate::model::labels::format_label;
use crate::model::profile::AnalysisProfile;
use crate::model::well::{ControlRole, KnockdownReading, WellCoord, WellReading};
use crate::pipeline::stage2_controls::Stage2Output;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub death_pct: f64,
    pub degenerate: bool,
}

/// `(1 - (v - low) / (high - low)) * 100`, or 0 flagged degenerate when `high <= low`.
pub fn normalize(value: f64, high_avg: f64, low_avg: f64) -> Normalized {
    if high_avg > low_avg {
        let survival_fraction = (value - low_avg) / (high_avg - low_avg);
        Normalized {
            death_pct: (1.0 - survival_fraction) * 100.0,
            degenerate: false,
        }
    } else {
        Normalized {
            death_pct: 0.0,
            degenerate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub plate: String,
    pub well: Option<WellCoord>,
    pub well_id: String,
    pub raw_label: String,
    pub label: String,
    pub gene_base: String,
    pub cell_line: String,
    pub method: String,
    pub value: f64,
    pub kd_percent: Option<f64>,
    pub death_pct: f64,
    pub survival_pct: f64,
    pub degenerate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeAudit {
    pub kept: usize,
    pub degenerate: usize,
    pub out_of_range: usize,
    pub missing_controls: usize,
}

#[derive(Debug, Clone)]
pub struct Stage3Output {
    pub observations: Vec<Observation>,
    pub audit: NormalizeAudit,
}

/// Normalizes every test well against its plate's (or the pooled) controls.
pub fn run_stage3(readings: &[WellReading], controls: &Stage2Output, profile: &AnalysisProfile) -> Stage3Output {
    let mut audit = NormalizeAudit::default();
    let mut observations = Vec::new();

    for r in readings.iter().filter(|r| r.role == ControlRole::Test) {
        let Some(agg) = controls.for_plate(&r.plate) else {
            audit.missing_controls += 1;
            continue;
        };
        let n = normalize(r.value, agg.high_avg, agg.low_avg);
        let formatted = format_label(&r.label, profile.label_style);
        let obs = Observation {
            plate: r.plate.clone(),
            well: r.well,
            well_id: r.well.map(|w| w.to_string()).unwrap_or_default(),
            raw_label: r.label.clone(),
            label: formatted.label,
            gene_base: formatted.base,
            cell_line: r.cell_line.clone(),
            method: r.method.clone(),
            value: r.value,
            kd_percent: None,
            death_pct: n.death_pct,
            survival_pct: 100.0 - n.death_pct,
            degenerate: n.degenerate,
        };
        keep_if_plausible(obs, profile, &mut observations, &mut audit);
    }

    finish(observations, audit)
}

/// Knockdown rows are normalized against their own blank/untreated values.
pub fn run_stage3_knockdown(rows: &[KnockdownReading], profile: &AnalysisProfile) -> Stage3Output {
    let mut audit = NormalizeAudit::default();
    let mut observations = Vec::new();

    for r in rows {
        let n = normalize(r.lum, r.untreated, r.blank);
        let formatted = format_label(&r.hairpin, profile.label_style);
        let obs = Observation {
            plate: String::new(),
            well: r.well_id.parse().ok(),
            well_id: r.well_id.clone(),
            raw_label: r.hairpin.clone(),
            label: formatted.label,
            gene_base: formatted.base,
            cell_line: String::new(),
            method: String::new(),
            value: r.lum,
            kd_percent: Some(r.kd_percent),
            death_pct: n.death_pct,
            survival_pct: 100.0 - n.death_pct,
            degenerate: n.degenerate,
        };
        keep_if_plausible(obs, profile, &mut observations, &mut audit);
    }

    finish(observations, audit)
}

fn keep_if_plausible(
    obs: Observation,
    profile: &AnalysisProfile,
    observations: &mut Vec<Observation>,
    audit: &mut NormalizeAudit,
) {
    if obs.degenerate {
        audit.degenerate += 1;
    }
    if let Some(range) = profile.range_filter {
        if !range.contains(obs.death_pct) {
            tracing::debug!(
                plate = %obs.plate,
                well = %obs.well_id,
                label = %obs.label,
                death_pct = obs.death_pct,
                "outside plausible range; dropped"
            );
            audit.out_of_range += 1;
            return;
        }
    }
    observations.push(obs);
}

fn finish(mut observations: Vec<Observation>, mut audit: NormalizeAudit) -> Stage3Output {
    observations.sort_by(|a, b| {
        (&a.plate, a.well, &a.well_id, &a.label).cmp(&(&b.plate, b.well, &b.well_id, &b.label))
    });
    audit.kept = observations.len();
    if audit.degenerate > 0 {
        tracing::warn!(
            "{} observations had a non-positive control denominator; cell death set to 0",
            audit.degenerate
        );
    }
    if audit.out_of_range > 0 {
        tracing::warn!(
            "{} observations outside the plausible range were dropped",
            audit.out_of_range
        );
    }
    if audit.missing_controls > 0 {
        tracing::warn!(
            "{} test wells belong to plates without control aggregates",
            audit.missing_controls
        );
    }
    tracing::info!(kept = audit.kept, "normalization done");
    Stage3Output {
        observations,
        audit,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_normalize.rs"]
mod tests;
