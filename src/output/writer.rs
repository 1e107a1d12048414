//! CSV export of the result set

use crate::state::{Record, CSV_HEADER};
use crate::ScrapeError;
use std::collections::HashSet;
use std::io;
use std::path::Path;

/// Writes the header row and one row per record to `path`
///
/// The file is created or truncated. Any failure is fatal for the run.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<(), ScrapeError> {
    let output_error = |source: csv::Error| ScrapeError::Output {
        path: path.display().to_string(),
        source,
    };

    let file = std::fs::File::create(path).map_err(|e| output_error(e.into()))?;
    write_records(file, records).map_err(output_error)?;

    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Writes the header row and one row per record to any writer
pub fn write_records<W: io::Write>(writer: W, records: &[Record]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record(record.csv_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Keeps the first record for every (name, price) pair, preserving order
pub fn dedupe_records(records: Vec<Record>) -> Vec<Record> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        records
            .iter()
            .map(|record| seen.insert(record.natural_key()))
            .collect()
    };

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
