//! CSV ingestion for the panel directory, provider batches, and coordinates.

use std::collections::HashSet;

use log::warn;

use crate::config::{BatchColumns, DirectoryColumns};
use crate::error::ReconError;
use crate::geo::{Coordinates, CoordinateTable};
use crate::model::{PanelProvider, PanelStatus, RawProviderRecord};

struct CsvTable<'a> {
    headers: Vec<String>,
    reader: csv::Reader<&'a [u8]>,
}

fn open_csv(csv_data: &str) -> Result<CsvTable<'_>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    Ok(CsvTable { headers, reader })
}

fn column(headers: &[String], source: &str, name: &str) -> Result<usize, ReconError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReconError::MissingColumn {
            source: source.into(),
            column: name.into(),
        })
}

fn cell(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").to_string()
}

/// Load panel providers. Status values are matched case-insensitively.
pub fn load_directory_csv(
    csv_data: &str,
    columns: &DirectoryColumns,
) -> Result<Vec<PanelProvider>, ReconError> {
    let CsvTable { headers, mut reader } = open_csv(csv_data)?;
    let source = "directory";

    let code_idx = column(&headers, source, &columns.code)?;
    let name_idx = column(&headers, source, &columns.name)?;
    let address_idx = column(&headers, source, &columns.address)?;
    let contact_idx = column(&headers, source, &columns.contact)?;
    let status_idx = column(&headers, source, &columns.panel_status)?;

    let mut providers = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let code = cell(&record, code_idx).trim().to_string();
        let status_raw = cell(&record, status_idx);
        let panel_status = parse_panel_status(&status_raw).ok_or_else(|| ReconError::InvalidProvider {
            code: code.clone(),
            reason: format!("unrecognized panel status '{status_raw}'"),
        })?;

        providers.push(PanelProvider {
            code,
            name: cell(&record, name_idx),
            address: cell(&record, address_idx),
            contact: cell(&record, contact_idx),
            panel_status,
        });
    }

    Ok(providers)
}

/// Accepts the usual spreadsheet spellings of a yes/no panel flag.
pub fn parse_panel_status(value: &str) -> Option<PanelStatus> {
    let folded = value.trim().to_lowercase().replace(['-', '_'], " ");
    let compact: String = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    match compact.as_str() {
        "on panel" | "onpanel" | "panel" | "yes" | "y" | "true" | "1" => Some(PanelStatus::OnPanel),
        "not on panel" | "notonpanel" | "non panel" | "off panel" | "no" | "n" | "false" | "0" => {
            Some(PanelStatus::NotOnPanel)
        }
        _ => None,
    }
}

/// Load one uploaded batch. Every row is tagged with `source_file`.
///
/// Short rows yield empty fields. Duplicate source ids are rejected since
/// the report keys outcomes by them.
pub fn load_batch_csv(
    csv_data: &str,
    columns: &BatchColumns,
    source_file: &str,
) -> Result<Vec<RawProviderRecord>, ReconError> {
    let CsvTable { headers, mut reader } = open_csv(csv_data)?;
    let source = "batch";

    let id_idx = column(&headers, source, &columns.source_id)?;
    let name_idx = column(&headers, source, &columns.name)?;
    let address_idx = column(&headers, source, &columns.address)?;
    let contact_idx = column(&headers, source, &columns.contact)?;

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let source_id = cell(&record, id_idx).trim().to_string();
        if !seen.insert(source_id.clone()) {
            return Err(ReconError::DuplicateSourceId(source_id));
        }
        if record.len() < headers.len() {
            warn!("batch row '{source_id}': {} of {} columns present", record.len(), headers.len());
        }

        rows.push(RawProviderRecord {
            source_id,
            name: cell(&record, name_idx),
            address: cell(&record, address_idx),
            contact: cell(&record, contact_idx),
            source_file: source_file.to_string(),
        });
    }

    Ok(rows)
}

/// Load an `address,latitude,longitude` table.
pub fn load_locations_csv(csv_data: &str) -> Result<CoordinateTable, ReconError> {
    let CsvTable { headers, mut reader } = open_csv(csv_data)?;
    let source = "locations";

    let address_idx = column(&headers, source, "address")?;
    let lat_idx = column(&headers, source, "latitude")?;
    let lon_idx = column(&headers, source, "longitude")?;

    let mut table = CoordinateTable::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let address = cell(&record, address_idx);
        let latitude = parse_coordinate(&address, &cell(&record, lat_idx), 90.0)?;
        let longitude = parse_coordinate(&address, &cell(&record, lon_idx), 180.0)?;
        table.insert(&address, Coordinates { latitude, longitude });
    }

    Ok(table)
}

fn parse_coordinate(address: &str, value: &str, limit: f64) -> Result<f64, ReconError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .ok_or_else(|| ReconError::CoordinateParse {
            address: address.into(),
            value: value.into(),
        })
}
