//! Where evaluation records end up: the log stream and an append-only CSV
//! history of oracle values, one row per feed or custom API evaluation.

use anyhow::Result;
use tracing::{debug, info};

use crate::record::EvaluationRecord;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs the full record at debug level.
pub fn print_pretty(record: &EvaluationRecord) {
    debug!("{:#?}", record);
}

/// Logs the record as JSON at info level, so each evaluated value shows up in the
/// stderr stream and the JSON log file.
pub fn print_json(record: &EvaluationRecord) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Appends one evaluation to the CSV history at `path`.
///
/// The header row is written only when the file is new, and missing parent
/// directories are created, so repeated samples of a feed accumulate in one file.
/// Error records share the same columns with the value fields left empty.
pub fn append_record(path: &str, record: &EvaluationRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Reads back the value history written by [`append_record`], oldest first.
pub fn read_records(path: &str) -> Result<Vec<EvaluationRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader.deserialize().collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
