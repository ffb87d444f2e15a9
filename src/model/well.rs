use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const PLATE_ROWS: usize = 8;
pub const PLATE_COLS: usize = 12;

const ROW_LETTERS: &[u8; PLATE_ROWS] = b"ABCDEFGH";

/// Position on a 96-well plate. `row` and `col` are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WellCoord {
    pub row: u8,
    pub col: u8,
}

impl WellCoord {
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < PLATE_ROWS && col < PLATE_COLS {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    pub fn row_letter(&self) -> char {
        ROW_LETTERS[self.row as usize] as char
    }
}

impl fmt::Display for WellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.col + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid well coordinate '{0}' (expected A1..H12)")]
pub struct WellCoordError(pub String);

impl FromStr for WellCoord {
    type Err = WellCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .ok_or_else(|| WellCoordError(s.to_string()))?
            .to_ascii_uppercase();
        let row = parse_row_letter(letter).ok_or_else(|| WellCoordError(s.to_string()))?;
        let col: usize = chars
            .as_str()
            .parse()
            .map_err(|_| WellCoordError(s.to_string()))?;
        if col == 0 {
            return Err(WellCoordError(s.to_string()));
        }
        WellCoord::new(row, col - 1).ok_or_else(|| WellCoordError(s.to_string()))
    }
}

pub fn parse_row_letter(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase() as u8;
    ROW_LETTERS.iter().position(|&b| b == upper)
}

/// What a well contributes to normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlRole {
    Test,
    /// Untransduced / untreated wells.
    High,
    /// Media-only / blank wells.
    Low,
    Ignore,
}

impl ControlRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlRole::Test => "test",
            ControlRole::High => "high",
            ControlRole::Low => "low",
            ControlRole::Ignore => "ignore",
        }
    }
}

impl FromStr for ControlRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "sample" => Ok(ControlRole::Test),
            "high" | "untransduced" | "untreated" => Ok(ControlRole::High),
            "low" | "blank" | "media" | "media_only" => Ok(ControlRole::Low),
            "ignore" | "skip" | "excluded" => Ok(ControlRole::Ignore),
            other => Err(format!("unknown control role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WellReading {
    pub plate: String,
    pub well: Option<WellCoord>,
    pub label: String,
    pub role: ControlRole,
    pub cell_line: String,
    pub method: String,
    pub value: f64,
}

/// Knockdown rows carry their own control values per well.
#[derive(Debug, Clone, PartialEq)]
pub struct KnockdownReading {
    pub well_id: String,
    pub hairpin: String,
    pub kd_percent: f64,
    pub lum: f64,
    pub blank: f64,
    pub untreated: f64,
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/well.rs"]
mod tests;
