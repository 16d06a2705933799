// src/output.rs - Reference point tables and run summaries on disk

use std::fs::{self, File};
use std::path::Path;
use csv::{ReaderBuilder, Trim, Writer};
use serde::Serialize;

use crate::calibration::RawLocation;
use crate::classify::ReferencePoint;
use crate::config::LocationsFormat;
use crate::errors::{Result, ShoeContourError};

/// Read raw reference point locations
pub fn load_raw_locations<P: AsRef<Path>>(path: P, format: LocationsFormat) -> Result<Vec<RawLocation>> {
    let path = path.as_ref();
    match format {
        LocationsFormat::Csv => {
            let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
            let mut locations = Vec::new();
            for record in reader.deserialize() {
                let location: RawLocation = record?;
                locations.push(location);
            }
            Ok(locations)
        }
        LocationsFormat::Whitespace => {
            let mut reader = ReaderBuilder::new()
                .delimiter(b' ')
                .has_headers(false)
                .flexible(true)
                .from_path(path)?;

            let mut locations = Vec::new();
            for (line, record) in reader.records().enumerate() {
                let record = record?;
                let field = |i: usize| {
                    record.get(i).ok_or_else(|| {
                        ShoeContourError::Other(format!(
                            "{}:{}: missing column {}",
                            path.display(),
                            line + 1,
                            i
                        ))
                    })
                };
                let parse_err = |what: &str, value: &str| {
                    ShoeContourError::Other(format!(
                        "{}:{}: invalid {} '{}'",
                        path.display(),
                        line + 1,
                        what,
                        value
                    ))
                };

                let shoe = field(1)?;
                let rac_num = field(2)?;
                let x = field(3)?;
                let y = field(4)?;
                locations.push(RawLocation {
                    shoe: shoe.parse().map_err(|_| parse_err("shoe", shoe))?,
                    rac_num: rac_num.parse().map_err(|_| parse_err("point id", rac_num))?,
                    x: x.parse().map_err(|_| parse_err("x", x))?,
                    y: y.parse().map_err(|_| parse_err("y", y))?,
                    kind: record.get(5).filter(|s| !s.is_empty()).map(str::to_string),
                });
            }
            Ok(locations)
        }
    }
}

/// Read a reference point table written by [`write_reference_table`]
pub fn read_reference_table<P: AsRef<Path>>(path: P) -> Result<Vec<ReferencePoint>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let mut table = Vec::new();
    for record in reader.deserialize() {
        let point: ReferencePoint = record?;
        table.push(point);
    }
    Ok(table)
}

/// Write the reference point table as CSV; undefined values are empty cells
pub fn write_reference_table<P: AsRef<Path>>(table: &[ReferencePoint], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(path)?;
    for point in table {
        writer.serialize(point)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write any serializable summary as pretty JSON
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
