pub mod json;
pub mod text;
pub mod tsv;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

/// Missing values are written as `NA`.
pub fn format_opt_6(v: Option<f64>) -> String {
    v.map(format_f64_6).unwrap_or_else(|| "NA".to_string())
}

pub fn write_text(path: &Path, contents: &str) -> Result<(), ReportError> {
    let wrap = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut w = BufWriter::new(File::create(path).map_err(wrap)?);
    w.write_all(contents.as_bytes()).map_err(wrap)?;
    w.flush().map_err(wrap)?;
    Ok(())
}
