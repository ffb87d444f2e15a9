use std::fmt::Write;

use crate::pipeline::stage2_controls::ControlAggregate;
use crate::pipeline::stage3_normalize::Observation;
use crate::pipeline::stage4_aggregate::GroupSummary;
use crate::pipeline::stage5_fit::GroupFit;
use crate::report::{format_f64_6, format_opt_6};

pub const OBSERVATIONS_HEADER: [&str; 12] = [
    "plate",
    "well",
    "label",
    "raw_label",
    "gene_base",
    "cell_line",
    "method",
    "value",
    "kd_percent",
    "death_pct",
    "survival_pct",
    "degenerate",
];

pub const CONTROLS_HEADER: [&str; 7] = [
    "plate",
    "n_high",
    "high_avg",
    "n_low",
    "low_avg",
    "denominator",
    "degenerate",
];

pub const SUMMARY_HEADER: [&str; 8] = [
    "cell_line",
    "method",
    "gene_base",
    "label",
    "n",
    "mean",
    "sd",
    "sem",
];

pub const FITS_HEADER: [&str; 8] = [
    "label",
    "n_valid",
    "status",
    "ic50",
    "hill",
    "top",
    "bottom",
    "r_squared",
];

pub fn render_observations(observations: &[Observation]) -> String {
    let mut out = header_line(&OBSERVATIONS_HEADER);
    for obs in observations {
        let row = [
            field(&obs.plate),
            field(&obs.well_id),
            field(&obs.label),
            field(&obs.raw_label),
            field(&obs.gene_base),
            field(&obs.cell_line),
            field(&obs.method),
            format_f64_6(obs.value),
            format_opt_6(obs.kd_percent),
            format_f64_6(obs.death_pct),
            format_f64_6(obs.survival_pct),
            flag(obs.degenerate),
        ];
        push_row(&mut out, &row);
    }
    out
}

pub fn render_controls<'a>(controls: impl IntoIterator<Item = &'a ControlAggregate>) -> String {
    let mut out = header_line(&CONTROLS_HEADER);
    for agg in controls {
        let row = [
            field(&agg.plate),
            agg.n_high.to_string(),
            format_f64_6(agg.high_avg),
            agg.n_low.to_string(),
            format_f64_6(agg.low_avg),
            format_f64_6(agg.denominator()),
            flag(agg.is_degenerate()),
        ];
        push_row(&mut out, &row);
    }
    out
}

/// `with_knockdown` appends `mean_kd` and `mean_survival`.
pub fn render_summary(groups: &[GroupSummary], with_knockdown: bool) -> String {
    let mut header = SUMMARY_HEADER.to_vec();
    if with_knockdown {
        header.extend(["mean_kd", "mean_survival"]);
    }
    let mut out = header_line(&header);
    for g in groups {
        let mut row = vec![
            field(&g.key.cell_line),
            field(&g.key.method),
            field(&g.key.gene_base),
            field(&g.key.label),
            g.death.n.to_string(),
            format_f64_6(g.death.mean),
            format_f64_6(g.death.sd),
            format_f64_6(g.death.sem),
        ];
        if with_knockdown {
            row.push(format_opt_6(g.mean_kd));
            row.push(format_f64_6(g.mean_survival));
        }
        push_row(&mut out, &row);
    }
    out
}

pub fn render_fits(fits: &[GroupFit]) -> String {
    let mut out = header_line(&FITS_HEADER);
    for fit in fits {
        let r = fit.result;
        let row = [
            field(&fit.label),
            fit.n_valid.to_string(),
            fit.status.as_str().to_string(),
            format_opt_6(r.map(|r| r.ic50)),
            format_opt_6(r.map(|r| r.hill)),
            format_opt_6(r.map(|r| r.top)),
            format_opt_6(r.map(|r| r.bottom)),
            format_opt_6(r.map(|r| r.r_squared)),
        ];
        push_row(&mut out, &row);
    }
    out
}

fn header_line(columns: &[&str]) -> String {
    let mut out = columns.join("\t");
    out.push('\n');
    out
}

fn push_row(out: &mut String, row: &[String]) {
    let _ = writeln!(out, "{}", row.join("\t"));
}

// Labels come from user files; keep the column structure intact.
fn field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

fn flag(v: bool) -> String {
    let s = if v { "1" } else { "0" };
    s.to_string()
}
