use std::fs;
use std::path::Path;

use crate::input::{InputLayout, LoadAudit};
use crate::model::profile::AnalysisProfile;
use crate::pipeline::stage2_controls::{ControlAggregate, Stage2Output};
use crate::pipeline::stage3_normalize::{NormalizeAudit, Observation};
use crate::pipeline::stage4_aggregate::GroupSummary;
use crate::pipeline::stage5_fit::GroupFit;
use crate::report::json::{
    ControlSection, FitCounts, InputSection, SettingsSection, SummaryData, render_summary_json,
};
use crate::report::text::render_report_text;
use crate::report::tsv::{render_controls, render_fits, render_observations, render_summary};
use crate::report::{ReportError, write_text};

#[derive(Debug, Clone)]
pub struct Stage6Input<'a> {
    pub tool_name: String,
    pub tool_version: String,

    pub layout: InputLayout,
    pub input_path: String,
    pub platemap_path: Option<String>,
    pub profile: &'a AnalysisProfile,

    pub load_audit: &'a LoadAudit,
    /// `None` for knockdown input, where every row carries its own controls.
    pub controls: Option<&'a Stage2Output>,
    pub observations: &'a [Observation],
    pub normalize_audit: &'a NormalizeAudit,
    pub groups: &'a [GroupSummary],
    pub fits: &'a [GroupFit],
}

pub fn write_reports(input: &Stage6Input<'_>, out_dir: &Path) -> Result<(), ReportError> {
    fs::create_dir_all(out_dir).map_err(|source| ReportError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    write_text(
        &out_dir.join("observations.tsv"),
        &render_observations(input.observations),
    )?;

    let controls = match input.controls {
        Some(stage2) => render_controls(stage2.controls.values()),
        None => render_controls(std::iter::empty::<&ControlAggregate>()),
    };
    write_text(&out_dir.join("controls.tsv"), &controls)?;

    let knockdown = input.layout == InputLayout::Knockdown;
    write_text(
        &out_dir.join("summary.tsv"),
        &render_summary(input.groups, knockdown),
    )?;
    if knockdown {
        write_text(&out_dir.join("fits.tsv"), &render_fits(input.fits))?;
    }

    let summary = build_summary(input);
    write_text(&out_dir.join("summary.json"), &render_summary_json(&summary)?)?;
    write_text(
        &out_dir.join("report.txt"),
        &render_report_text(&summary, input.groups, input.fits),
    )?;

    tracing::info!(out = %out_dir.display(), "reports written");
    Ok(())
}

pub fn build_summary<'a>(input: &'a Stage6Input<'a>) -> SummaryData<'a> {
    let controls = match input.controls {
        Some(stage2) => ControlSection {
            aggregates: stage2.controls.len(),
            degenerate: stage2
                .controls
                .values()
                .filter(|c| c.is_degenerate())
                .count(),
        },
        None => ControlSection::default(),
    };
    SummaryData {
        tool: &input.tool_name,
        version: &input.tool_version,
        input: InputSection {
            layout: input.layout.as_str(),
            path: &input.input_path,
            platemap: input.platemap_path.as_deref(),
        },
        settings: SettingsSection {
            control_scope: input.profile.control_scope,
            label_style: input.profile.label_style,
            range_filter: input.profile.range_filter,
            average_replicates: input.profile.average_replicates,
            degenerate_policy: "zero",
            sd: "sample",
        },
        rows: input.load_audit,
        observations: input.normalize_audit,
        controls,
        groups: input.groups.len(),
        fits: if input.layout == InputLayout::Knockdown {
            Some(FitCounts::from_fits(input.fits))
        } else {
            None
        },
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_report.rs"]
mod tests;
