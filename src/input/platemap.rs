use std::collections::BTreeMap;
use std::path::Path;

use crate::input::{InputError, csv_reader, field, header_index};
use crate::model::well::{ControlRole, WellCoord};

/// Plate key that applies to every plate without its own entry.
pub const ANY_PLATE: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateMapEntry {
    pub role: ControlRole,
    pub label: String,
}

/// Validated `(plate, well) -> (role, label)` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateMap {
    entries: BTreeMap<(String, WellCoord), PlateMapEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlateMapError {
    #[error("plate map line {line}: {source}")]
    BadWell {
        line: usize,
        #[source]
        source: crate::model::well::WellCoordError,
    },
    #[error("plate map line {line}: {message}")]
    BadRole { line: usize, message: String },
    #[error("plate map line {line}: duplicate entry for plate {plate} well {well}")]
    Duplicate {
        line: usize,
        plate: String,
        well: WellCoord,
    },
    #[error("plate map line {line}: test well {well} has no label")]
    MissingLabel { line: usize, well: WellCoord },
    #[error("plate map is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("plate map has no entries")]
    Empty,
}

impl PlateMap {
    pub fn insert(
        &mut self,
        plate: &str,
        well: WellCoord,
        entry: PlateMapEntry,
    ) -> Result<(), (String, WellCoord)> {
        let key = (plate.to_string(), well);
        if self.entries.contains_key(&key) {
            return Err(key);
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Plate-specific entries win over `*` entries.
    pub fn resolve(&self, plate: &str, well: WellCoord) -> Option<&PlateMapEntry> {
        self.entries
            .get(&(plate.to_string(), well))
            .or_else(|| self.entries.get(&(ANY_PLATE.to_string(), well)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn load_platemap(path: &Path) -> Result<PlateMap, InputError> {
    let mut reader = csv_reader(path, b'\t')?;
    let headers = reader.headers()?.clone();

    let well_idx = header_index(&headers, "well").ok_or(PlateMapError::MissingColumn("well"))?;
    let role_idx = header_index(&headers, "role").ok_or(PlateMapError::MissingColumn("role"))?;
    let plate_idx = header_index(&headers, "plate");
    let label_idx = header_index(&headers, "label");

    let mut map = PlateMap::default();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let Some(well_text) = field(&record, Some(well_idx)) else {
            continue;
        };
        let well: WellCoord = well_text
            .parse()
            .map_err(|source| PlateMapError::BadWell { line, source })?;
        let role: ControlRole = field(&record, Some(role_idx))
            .unwrap_or("")
            .parse()
            .map_err(|message| PlateMapError::BadRole { line, message })?;
        let plate = field(&record, plate_idx).unwrap_or(ANY_PLATE);
        let label = match field(&record, label_idx) {
            Some(l) => l.to_string(),
            None if role == ControlRole::Test => {
                return Err(PlateMapError::MissingLabel { line, well }.into());
            }
            None => role.as_str().to_string(),
        };

        map.insert(plate, well, PlateMapEntry { role, label })
            .map_err(|(plate, well)| PlateMapError::Duplicate { line, plate, well })?;
    }

    if map.is_empty() {
        return Err(PlateMapError::Empty.into());
    }
    tracing::info!(entries = map.len(), path = %path.display(), "plate map loaded");
    Ok(map)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/platemap.rs"]
mod tests;
