use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisProfile {
    pub control_scope: ControlScope,
    pub range_filter: Option<RangeFilter>,
    pub label_style: LabelStyle,
    pub average_replicates: bool,
    pub high_labels: Vec<String>,
    pub low_labels: Vec<String>,
    pub ignore_labels: Vec<String>,
    pub fit: FitProfile,
}

/// Inclusive plausible range for cell death percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ControlScope {
    /// One control aggregate per plate.
    Plate,
    /// Controls pooled over every plate in the input.
    Dataset,
}

impl ControlScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlScope::Plate => "plate",
            ControlScope::Dataset => "dataset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    Raw,
    Hairpin,
}

impl LabelStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelStyle::Raw => "raw",
            LabelStyle::Hairpin => "hairpin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBounds {
    pub lower: [f64; 4],
    pub upper: [f64; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitProfile {
    pub min_points: usize,
    pub max_evaluations: usize,
    /// Order: ic50, hill, top, bottom.
    pub bounds: ParamBounds,
    pub default_ic50: f64,
    pub initial_hill: f64,
}

impl Default for FitProfile {
    fn default() -> Self {
        Self {
            min_points: 4,
            max_evaluations: 5000,
            bounds: ParamBounds {
                lower: [0.1, -10.0, 0.0, -20.0],
                upper: [100.0, -0.1, 120.0, 100.0],
            },
            default_ic50: 50.0,
            initial_hill: -1.0,
        }
    }
}

impl AnalysisProfile {
    pub fn default_v1() -> Self {
        Self {
            control_scope: ControlScope::Plate,
            range_filter: Some(RangeFilter {
                min: -50.0,
                max: 110.0,
            }),
            label_style: LabelStyle::Raw,
            average_replicates: false,
            high_labels: vec!["Untreated".to_string(), "Untransduced".to_string()],
            low_labels: vec!["MediaOnly".to_string(), "Media Only".to_string()],
            ignore_labels: vec![
                "Media+Lipofectamine".to_string(),
                "Media+Lipofectamine+2%Triton".to_string(),
            ],
            fit: FitProfile::default(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let profile: AnalysisProfile = serde_json::from_str(&text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if let Some(range) = self.range_filter {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(ProfileError::Invalid(format!(
                    "range_filter min {} must not exceed max {}",
                    range.min, range.max
                )));
            }
        }
        let b = &self.fit.bounds;
        for i in 0..4 {
            if b.lower[i] > b.upper[i] {
                return Err(ProfileError::Invalid(format!(
                    "fit bound {i}: lower {} exceeds upper {}",
                    b.lower[i], b.upper[i]
                )));
            }
        }
        if b.lower[0] <= 0.0 {
            return Err(ProfileError::Invalid(
                "ic50 lower bound must be positive".to_string(),
            ));
        }
        if self.fit.max_evaluations == 0 {
            return Err(ProfileError::Invalid(
                "max_evaluations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn role_for_label(&self, label: &str) -> crate::model::well::ControlRole {
        use crate::model::well::ControlRole;
        let matches = |list: &[String]| list.iter().any(|l| l.eq_ignore_ascii_case(label.trim()));
        if matches(&self.high_labels) {
            ControlRole::High
        } else if matches(&self.low_labels) {
            ControlRole::Low
        } else if matches(&self.ignore_labels) {
            ControlRole::Ignore
        } else {
            ControlRole::Test
        }
    }
}

impl Default for AnalysisProfile {
    fn default() -> Self {
        Self::default_v1()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("cannot read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("profile is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid profile: {0}")]
    Invalid(String),
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/profile.rs"]
mod tests;
