use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

pub mod grid;
pub mod knockdown;
pub mod long_form;
pub mod platemap;

use crate::model::profile::AnalysisProfile;
use crate::model::well::{KnockdownReading, WellReading};
use platemap::{PlateMap, PlateMapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputLayout {
    /// 8x12 plate grids plus a plate map.
    Grid,
    /// One reading per line with plate and treatment columns.
    Long,
    /// Knockdown/survival rows carrying their own controls.
    Knockdown,
}

impl InputLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputLayout::Grid => "grid",
            InputLayout::Long => "long",
            InputLayout::Knockdown => "knockdown",
        }
    }
}

/// Row-level bookkeeping. Dropped rows are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadAudit {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub unmapped_wells: usize,
    pub replicates_collapsed: usize,
}

#[derive(Debug, Clone)]
pub struct InputBundle {
    pub source_path: PathBuf,
    pub readings: Vec<WellReading>,
    pub knockdown: Vec<KnockdownReading>,
    pub audit: LoadAudit,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    PlateMap(#[from] PlateMapError),
}

pub fn load_input(
    layout: InputLayout,
    path: &Path,
    platemap: Option<&PlateMap>,
    profile: &AnalysisProfile,
) -> Result<InputBundle, InputError> {
    if !path.exists() {
        return Err(InputError::MissingInput(format!(
            "input file {} not found",
            path.display()
        )));
    }
    tracing::info!(layout = layout.as_str(), path = %path.display(), "loading input");

    let mut audit = LoadAudit::default();
    let mut readings = Vec::new();
    let mut knockdown = Vec::new();

    match layout {
        InputLayout::Grid => {
            let map = platemap.ok_or_else(|| {
                InputError::MissingInput("--platemap is required for the grid layout".to_string())
            })?;
            readings = grid::load_grid(path, map, &mut audit)?;
        }
        InputLayout::Long => {
            readings = long_form::load_long_form(path, profile, &mut audit)?;
            if profile.average_replicates {
                let before = readings.len();
                readings = long_form::average_replicates(&readings);
                audit.replicates_collapsed = before - readings.len();
            }
        }
        InputLayout::Knockdown => {
            knockdown = knockdown::load_knockdown(path, &mut audit)?;
        }
    }

    if audit.rows_dropped > 0 {
        tracing::warn!(
            "removed {} of {} rows with missing critical values",
            audit.rows_dropped,
            audit.rows_read
        );
    }
    if audit.unmapped_wells > 0 {
        tracing::warn!(
            "{} wells had values but no plate map entry; skipped",
            audit.unmapped_wells
        );
    }
    tracing::info!(
        readings = readings.len(),
        knockdown_rows = knockdown.len(),
        "input loaded"
    );

    Ok(InputBundle {
        source_path: path.to_path_buf(),
        readings,
        knockdown,
        audit,
    })
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn Read>, InputError> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

pub(crate) fn csv_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>, InputError> {
    let reader = open_maybe_gz(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader))
}

/// Case-insensitive header lookup; `_`, ` ` and `-` are ignored.
pub(crate) fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    let wanted = header_key(name);
    headers.iter().position(|h| header_key(h) == wanted)
}

pub(crate) fn require_column(
    headers: &csv::StringRecord,
    name: &str,
    path: &Path,
) -> Result<usize, InputError> {
    header_index(headers, name).ok_or_else(|| {
        InputError::InvalidInput(format!(
            "{} is missing required column '{}'",
            path.display(),
            name
        ))
    })
}

fn header_key(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub(crate) fn field<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Non-numeric and non-finite values count as missing.
pub(crate) fn parse_number(s: Option<&str>) -> Option<f64> {
    s.and_then(|v| v.replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
