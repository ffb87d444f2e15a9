use std::collections::BTreeMap;

use crate::model::stats::{GroupStats, group_stats, mean};
use crate::pipeline::stage3_normalize::Observation;

/// Field order is the output sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey {
    pub cell_line: String,
    pub method: String,
    pub gene_base: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub death: GroupStats,
    pub mean_survival: f64,
    pub mean_kd: Option<f64>,
}

pub fn run_stage4(observations: &[Observation]) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<GroupKey, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        let key = GroupKey {
            cell_line: obs.cell_line.clone(),
            method: obs.method.clone(),
            gene_base: obs.gene_base.clone(),
            label: obs.label.clone(),
        };
        groups.entry(key).or_default().push(obs);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let death: Vec<f64> = members.iter().map(|o| o.death_pct).collect();
            let survival: Vec<f64> = members.iter().map(|o| o.survival_pct).collect();
            let kd: Vec<f64> = members.iter().filter_map(|o| o.kd_percent).collect();
            GroupSummary {
                key,
                death: group_stats(&death),
                mean_survival: mean(&survival),
                mean_kd: if kd.is_empty() { None } else { Some(mean(&kd)) },
            }
        })
        .collect()
}
