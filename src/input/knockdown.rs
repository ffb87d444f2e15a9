use std::path::Path;

use crate::input::{InputError, LoadAudit, csv_reader, field, header_index, parse_number};
use crate::model::well::KnockdownReading;

const REQUIRED: [&str; 6] = ["well_id", "hairpin", "kd_percent", "lum", "blank", "untreated"];

pub fn load_knockdown(path: &Path, audit: &mut LoadAudit) -> Result<Vec<KnockdownReading>, InputError> {
    let mut reader = csv_reader(path, b',')?;
    let headers = reader.headers()?.clone();

    let mut idx = [0usize; REQUIRED.len()];
    let mut missing = Vec::new();
    for (slot, name) in idx.iter_mut().zip(REQUIRED) {
        match header_index(&headers, name) {
            Some(i) => *slot = i,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(InputError::InvalidInput(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }
    let [well_idx, hairpin_idx, kd_idx, lum_idx, blank_idx, untreated_idx] = idx;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        audit.rows_read += 1;

        let hairpin = field(&record, Some(hairpin_idx));
        let kd = parse_number(field(&record, Some(kd_idx)));
        let lum = parse_number(field(&record, Some(lum_idx)));
        let blank = parse_number(field(&record, Some(blank_idx)));
        let untreated = parse_number(field(&record, Some(untreated_idx)));

        let (Some(hairpin), Some(kd_percent), Some(lum), Some(blank), Some(untreated)) =
            (hairpin, kd, lum, blank, untreated)
        else {
            audit.rows_dropped += 1;
            continue;
        };

        rows.push(KnockdownReading {
            well_id: field(&record, Some(well_idx)).unwrap_or("").to_string(),
            hairpin: hairpin.to_string(),
            kd_percent,
            lum,
            blank,
            untreated,
        });
    }

    Ok(rows)
}
