use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::profile::ControlScope;
use crate::model::stats::mean;
use crate::model::well::{ControlRole, WellReading};

/// Key used for the single aggregate in dataset scope.
pub const DATASET_KEY: &str = "*";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlAggregate {
    pub plate: String,
    pub n_high: usize,
    pub high_avg: f64,
    pub n_low: usize,
    pub low_avg: f64,
}

impl ControlAggregate {
    /// Empty reference sets average to 0.
    pub fn from_values(plate: &str, high: &[f64], low: &[f64]) -> Self {
        Self {
            plate: plate.to_string(),
            n_high: high.len(),
            high_avg: mean(high),
            n_low: low.len(),
            low_avg: mean(low),
        }
    }

    pub fn denominator(&self) -> f64 {
        self.high_avg - self.low_avg
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.high_avg > self.low_avg)
    }
}

#[derive(Debug, Clone)]
pub struct Stage2Output {
    pub scope: ControlScope,
    pub controls: BTreeMap<String, ControlAggregate>,
}

impl Stage2Output {
    pub fn for_plate(&self, plate: &str) -> Option<&ControlAggregate> {
        match self.scope {
            ControlScope::Plate => self.controls.get(plate),
            ControlScope::Dataset => self.controls.get(DATASET_KEY),
        }
    }
}

pub fn run_stage2(readings: &[WellReading], scope: ControlScope) -> Stage2Output {
    let mut high: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut low: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut plates: Vec<&str> = Vec::new();

    for r in readings {
        let key = match scope {
            ControlScope::Plate => r.plate.as_str(),
            ControlScope::Dataset => DATASET_KEY,
        };
        if !plates.contains(&key) {
            plates.push(key);
        }
        match r.role {
            ControlRole::High => high.entry(key).or_default().push(r.value),
            ControlRole::Low => low.entry(key).or_default().push(r.value),
            ControlRole::Test | ControlRole::Ignore => {}
        }
    }

    let mut controls = BTreeMap::new();
    for key in plates {
        let h = high.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let l = low.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let agg = ControlAggregate::from_values(key, h, l);
        tracing::info!(
            plate = key,
            high_avg = agg.high_avg,
            low_avg = agg.low_avg,
            "control aggregate"
        );
        if h.is_empty() || l.is_empty() {
            tracing::warn!(
                plate = key,
                n_high = h.len(),
                n_low = l.len(),
                "reference set empty; its average is taken as 0"
            );
        }
        if agg.is_degenerate() {
            tracing::warn!(
                plate = key,
                "reference-high average does not exceed reference-low; cell death set to 0"
            );
        }
        controls.insert(key.to_string(), agg);
    }

    Stage2Output { scope, controls }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_controls.rs"]
mod tests;
