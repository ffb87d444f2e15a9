use crate::pipeline::stage4_aggregate::GroupSummary;
use crate::pipeline::stage5_fit::GroupFit;
use crate::report::format_f64_6;
use crate::report::json::SummaryData;

pub fn render_report_text(
    summary: &SummaryData<'_>,
    groups: &[GroupSummary],
    fits: &[GroupFit],
) -> String {
    let mut out = String::new();

    out.push_str("Luminescence Cell Death Report\n");
    out.push_str("==============================\n\n");

    out.push_str("1. Input\n");
    out.push_str(&format!("Layout: {}\n", summary.input.layout));
    out.push_str(&format!("File: {}\n", summary.input.path));
    if let Some(platemap) = summary.input.platemap {
        out.push_str(&format!("Plate map: {}\n", platemap));
    }
    out.push_str(&format!(
        "Rows read: {}, dropped: {}, unmapped wells: {}\n",
        summary.rows.rows_read, summary.rows.rows_dropped, summary.rows.unmapped_wells
    ));
    if summary.settings.average_replicates {
        out.push_str(&format!(
            "Technical replicates collapsed: {}\n",
            summary.rows.replicates_collapsed
        ));
    }
    out.push('\n');

    out.push_str("2. Normalization\n");
    out.push_str("cell_death = (1 - (value - low_avg) / (high_avg - low_avg)) * 100\n");
    out.push_str(&format!(
        "Control scope: {}\n",
        summary.settings.control_scope.as_str()
    ));
    out.push_str(&format!(
        "Label style: {}\n",
        summary.settings.label_style.as_str()
    ));
    out.push_str(&format!(
        "Control aggregates: {} ({} degenerate)\n",
        summary.controls.aggregates, summary.controls.degenerate
    ));
    match summary.settings.range_filter {
        Some(r) => out.push_str(&format!(
            "Plausible range: [{}, {}], {} observations dropped\n",
            format_f64_6(r.min),
            format_f64_6(r.max),
            summary.observations.out_of_range
        )),
        None => out.push_str("Plausible range: disabled\n"),
    }
    out.push_str(&format!(
        "Observations kept: {}\n",
        summary.observations.kept
    ));
    if summary.observations.degenerate > 0 {
        out.push_str(&format!(
            "Warning: {} observations had high_avg <= low_avg and were set to 0% cell death\n",
            summary.observations.degenerate
        ));
    }
    if summary.observations.missing_controls > 0 {
        out.push_str(&format!(
            "Warning: {} test wells had no control aggregate\n",
            summary.observations.missing_controls
        ));
    }
    out.push('\n');

    out.push_str("3. Treatment groups\n");
    out.push_str(&format!("Groups: {}\n", groups.len()));
    if let Some(top) = highest_death(groups) {
        out.push_str(&format!(
            "Highest mean cell death: {} ({}%, n={})\n",
            group_name(top),
            format_f64_6(top.death.mean),
            top.death.n
        ));
    }
    let singletons = groups.iter().filter(|g| g.death.n == 1).count();
    if singletons > 0 {
        out.push_str(&format!(
            "Groups with a single observation (sd = 0): {}\n",
            singletons
        ));
    }

    if let Some(counts) = &summary.fits {
        out.push('\n');
        out.push_str("4. Dose-response fits\n");
        out.push_str("survival = bottom + (top - bottom) / (1 + (kd / ic50)^hill)\n");
        out.push_str(&format!(
            "Fitted: {}, too few points: {}, failed: {}\n",
            counts.ok, counts.insufficient_points, counts.failed
        ));
        for fit in fits {
            if let Some(r) = &fit.result {
                out.push_str(&format!(
                    "{}: ic50={} hill={} r2={}\n",
                    fit.label,
                    format_f64_6(r.ic50),
                    format_f64_6(r.hill),
                    format_f64_6(r.r_squared)
                ));
            }
        }
    }

    out
}

fn highest_death(groups: &[GroupSummary]) -> Option<&GroupSummary> {
    // First maximum in group order keeps the choice stable on ties.
    let mut best: Option<&GroupSummary> = None;
    for g in groups {
        if best.is_none_or(|b| g.death.mean > b.death.mean) {
            best = Some(g);
        }
    }
    best
}

fn group_name(g: &GroupSummary) -> String {
    let parts = [
        g.key.cell_line.as_str(),
        g.key.method.as_str(),
        g.key.label.as_str(),
    ];
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" / ")
}
