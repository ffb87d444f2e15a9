use crate::model::profile::LabelStyle;

pub const EMPTY_VECTOR: &str = "Empty Vector";
pub const CONTROL_BASE: &str = "Control";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLabel {
    pub label: String,
    pub base: String,
}

pub fn format_label(raw: &str, style: LabelStyle) -> FormattedLabel {
    match style {
        LabelStyle::Raw => {
            let label = raw.trim().to_string();
            FormattedLabel {
                base: label.clone(),
                label,
            }
        }
        LabelStyle::Hairpin => {
            let label = format_hairpin(raw.trim());
            let base = hairpin_base(&label);
            FormattedLabel { label, base }
        }
    }
}

/// `933_IGFBP1_scram` -> `IGFBP1 Scram`, `933_GPC3_2` -> `GPC3.2`,
/// anything containing `pLKO_Empty` -> `Empty Vector`.
/// Scrambled hairpins win over the empty-vector rule.
fn format_hairpin(raw: &str) -> String {
    let parts: Vec<&str> = raw.split('_').collect();
    if raw.to_ascii_lowercase().contains("scram") {
        if parts.len() >= 3 {
            return format!("{} Scram", parts[1]);
        }
        return raw.to_string();
    }
    if raw.contains("pLKO_Empty") {
        return EMPTY_VECTOR.to_string();
    }
    if parts.len() < 3 {
        return raw.to_string();
    }
    format!("{}.{}", parts[1], parts[2])
}

fn hairpin_base(label: &str) -> String {
    if label == EMPTY_VECTOR {
        return CONTROL_BASE.to_string();
    }
    let head = label.split('.').next().unwrap_or(label);
    head.split(' ').next().unwrap_or(head).to_string()
}
