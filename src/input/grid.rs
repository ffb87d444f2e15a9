use std::collections::BTreeSet;
use std::path::Path;

use crate::input::platemap::PlateMap;
use crate::input::{InputError, LoadAudit, csv_reader, field, header_index, parse_number, require_column};
use crate::model::well::{PLATE_COLS, WellCoord, WellReading, parse_row_letter};

/// Reads `plate,cell_line,method,row,1..12` grids. Blank cells are empty wells.
pub fn load_grid(
    path: &Path,
    platemap: &PlateMap,
    audit: &mut LoadAudit,
) -> Result<Vec<WellReading>, InputError> {
    let mut reader = csv_reader(path, b',')?;
    let headers = reader.headers()?.clone();

    let plate_idx = require_column(&headers, "plate", path)?;
    let row_idx = require_column(&headers, "row", path)?;
    let cell_line_idx = header_index(&headers, "cell_line");
    let method_idx = header_index(&headers, "method");

    let mut col_idx = [0usize; PLATE_COLS];
    for (c, slot) in col_idx.iter_mut().enumerate() {
        *slot = require_column(&headers, &(c + 1).to_string(), path)?;
    }

    let mut seen_rows: BTreeSet<(String, usize)> = BTreeSet::new();
    let mut readings = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        audit.rows_read += 1;

        let plate = field(&record, Some(plate_idx));
        let row = field(&record, Some(row_idx)).and_then(|r| {
            let mut chars = r.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => parse_row_letter(letter),
                _ => None,
            }
        });
        let (Some(plate), Some(row)) = (plate, row) else {
            tracing::debug!(line, "grid line without plate or valid row letter; skipping");
            audit.rows_dropped += 1;
            continue;
        };

        if !seen_rows.insert((plate.to_string(), row)) {
            return Err(InputError::InvalidInput(format!(
                "{} line {}: plate {} row {} appears twice",
                path.display(),
                line,
                plate,
                (b'A' + row as u8) as char
            )));
        }

        let cell_line = field(&record, cell_line_idx).unwrap_or("").to_string();
        let method = field(&record, method_idx).unwrap_or("").to_string();

        for (col, &idx) in col_idx.iter().enumerate() {
            let Some(value) = parse_number(field(&record, Some(idx))) else {
                continue;
            };
            let Some(well) = WellCoord::new(row, col) else {
                continue;
            };
            let Some(entry) = platemap.resolve(plate, well) else {
                tracing::debug!(plate, well = %well, "no plate map entry");
                audit.unmapped_wells += 1;
                continue;
            };
            readings.push(WellReading {
                plate: plate.to_string(),
                well: Some(well),
                label: entry.label.clone(),
                role: entry.role,
                cell_line: cell_line.clone(),
                method: method.clone(),
                value,
            });
        }
    }

    Ok(readings)
}
