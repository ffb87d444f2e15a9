use serde::Serialize;

use crate::input::LoadAudit;
use crate::model::profile::{ControlScope, LabelStyle, RangeFilter};
use crate::pipeline::stage3_normalize::NormalizeAudit;
use crate::pipeline::stage5_fit::{FitStatus, GroupFit};

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData<'a> {
    pub tool: &'a str,
    pub version: &'a str,
    pub input: InputSection<'a>,
    pub settings: SettingsSection,
    pub rows: &'a LoadAudit,
    pub observations: &'a NormalizeAudit,
    pub controls: ControlSection,
    pub groups: usize,
    /// Only present for knockdown input.
    pub fits: Option<FitCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSection<'a> {
    pub layout: &'a str,
    pub path: &'a str,
    pub platemap: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsSection {
    pub control_scope: ControlScope,
    pub label_style: LabelStyle,
    pub range_filter: Option<RangeFilter>,
    pub average_replicates: bool,
    pub degenerate_policy: &'static str,
    pub sd: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlSection {
    pub aggregates: usize,
    pub degenerate: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FitCounts {
    pub ok: usize,
    pub insufficient_points: usize,
    pub failed: usize,
}

impl FitCounts {
    pub fn from_fits(fits: &[GroupFit]) -> Self {
        let mut counts = Self::default();
        for fit in fits {
            match fit.status {
                FitStatus::Ok => counts.ok += 1,
                FitStatus::InsufficientPoints => counts.insufficient_points += 1,
                FitStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

pub fn render_summary_json(data: &SummaryData<'_>) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(data)?;
    out.push('\n');
    Ok(out)
}
