use std::collections::BTreeMap;
use std::path::Path;

use crate::input::{InputError, LoadAudit, csv_reader, field, header_index, parse_number, require_column};
use crate::model::profile::AnalysisProfile;
use crate::model::stats::mean;
use crate::model::well::{ControlRole, WellCoord, WellReading};

pub fn load_long_form(
    path: &Path,
    profile: &AnalysisProfile,
    audit: &mut LoadAudit,
) -> Result<Vec<WellReading>, InputError> {
    let mut reader = csv_reader(path, b',')?;
    let headers = reader.headers()?.clone();

    let plate_idx = require_column(&headers, "plate", path)?;
    let treatment_idx = require_column(&headers, "treatment", path)?;
    let value_idx = require_column(&headers, "luminescence", path)?;
    let well_idx = header_index(&headers, "well");
    let role_idx = header_index(&headers, "role");
    let cell_line_idx = header_index(&headers, "cell_line");
    let method_idx = header_index(&headers, "method");

    let mut readings = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        audit.rows_read += 1;

        let plate = field(&record, Some(plate_idx));
        let treatment = field(&record, Some(treatment_idx));
        let value = parse_number(field(&record, Some(value_idx)));
        let (Some(plate), Some(treatment), Some(value)) = (plate, treatment, value) else {
            audit.rows_dropped += 1;
            continue;
        };

        let role = match field(&record, role_idx) {
            Some(text) => match text.parse::<ControlRole>() {
                Ok(role) => role,
                Err(message) => {
                    tracing::warn!(line, "{message}; dropping row");
                    audit.rows_dropped += 1;
                    continue;
                }
            },
            None => profile.role_for_label(treatment),
        };

        let well = match field(&record, well_idx) {
            Some(text) => match text.parse::<WellCoord>() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(line, "{e}; dropping row");
                    audit.rows_dropped += 1;
                    continue;
                }
            },
            None => None,
        };

        readings.push(WellReading {
            plate: plate.to_string(),
            well,
            label: treatment.to_string(),
            role,
            cell_line: field(&record, cell_line_idx).unwrap_or("").to_string(),
            method: field(&record, method_idx).unwrap_or("").to_string(),
            value,
        });
    }

    Ok(readings)
}

/// Collapses technical replicates to one mean reading per plate and treatment.
pub fn average_replicates(readings: &[WellReading]) -> Vec<WellReading> {
    let mut groups: BTreeMap<(&str, &str, &str, &str, ControlRole), Vec<f64>> = BTreeMap::new();
    for r in readings {
        groups
            .entry((&r.plate, &r.cell_line, &r.method, &r.label, r.role))
            .or_default()
            .push(r.value);
    }
    groups
        .into_iter()
        .map(|((plate, cell_line, method, label, role), values)| WellReading {
            plate: plate.to_string(),
            well: None,
            label: label.to_string(),
            role,
            cell_line: cell_line.to_string(),
            method: method.to_string(),
            value: mean(&values),
        })
        .collect()
}
