//! CSV persistence for retrieved logged entries.
//!
//! The artifact is a two-column `timestamp,entry` file with a header row,
//! one row per successfully decoded entry, ascending index order. The solar
//! estimation path reads the same file back.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::device::LoggedEntry;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Writes the header row and one row per entry.
pub fn write_entries<W: Write>(mut writer: W, entries: &[LoggedEntry]) -> Result<()> {
    writeln!(writer, "timestamp,entry")?;
    for entry in entries {
        writeln!(
            writer,
            "{},{}",
            entry.timestamp.format(TIMESTAMP_FORMAT),
            entry.value
        )?;
    }
    Ok(())
}

/// Writes the entries to a file, replacing any previous contents.
pub fn write_entries_to_file(path: &Path, entries: &[LoggedEntry]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_entries(&mut writer, entries)?;
    writer.flush()?;
    log::info!("Wrote {} logged entries to {}", entries.len(), path.display());
    Ok(())
}

/// Reads the `entry` column back from a previously written file, skipping
/// the header row.
pub fn read_values_from_file(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut values = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line_no == 0 || line.trim().is_empty() {
            continue;
        }
        let value_field = line.rsplit(',').next().unwrap_or_default();
        let value = value_field
            .trim()
            .parse::<f32>()
            .map_err(|e| ExportError::MalformedRow {
                line: line_no + 1,
                reason: e.to_string(),
            })?;
        values.push(value);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(index: u32, value: f32) -> LoggedEntry {
        let timestamp = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, index, 0)
            .unwrap();
        LoggedEntry {
            index,
            timestamp,
            value,
        }
    }

    #[test]
    fn test_header_only_for_no_entries() {
        let mut out = Vec::new();
        write_entries(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "timestamp,entry\n");
    }

    #[test]
    fn test_rows_in_entry_order() {
        let mut out = Vec::new();
        write_entries(&mut out, &[entry(0, 101.5), entry(1, 99.0)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "timestamp,entry\n2024-06-01 12:00:00,101.5\n2024-06-01 12:01:00,99\n"
        );
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logged_entries.csv");
        write_entries_to_file(&path, &[entry(0, 250.0), entry(1, 300.25)]).unwrap();
        let values = read_values_from_file(&path).unwrap();
        assert_eq!(values, vec![250.0, 300.25]);
    }

    #[test]
    fn test_malformed_row_is_reported_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "timestamp,entry\n2024-06-01 12:00:00,not-a-number\n").unwrap();
        match read_values_from_file(&path).unwrap_err() {
            ExportError::MalformedRow { line, .. } => assert_eq!(line, 2),
            other => panic!("wrong error: {other}"),
        }
    }
}
