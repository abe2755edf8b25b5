//! Materializing CSV exports on local disk.
//!
//! A download sequence truncates its target on the first write and appends
//! every later chunk without its header line, so a file assembled from several
//! partitions carries exactly one header.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv_core::{ReadRecordResult, Terminator};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Create or truncate, then write the whole payload
    Truncate,
    /// Append the payload minus its header line
    Append,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV ends inside a quoted field opened in record {record}")]
    UnterminatedQuote { record: usize },
}

/// What happened to one downloaded payload.
#[derive(Debug)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub mode: WriteMode,
    /// Bytes written to `path`
    pub written: Result<usize, OutputError>,
    /// Data rows in the payload just received, header excluded
    pub rows: Result<usize, OutputError>,
}

impl DownloadReport {
    pub fn row_count(&self) -> Option<usize> {
        self.rows.as_ref().ok().copied()
    }
}

/// Drops everything up to and including the first newline.
pub fn strip_header(payload: &str) -> &str {
    match payload.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    }
}

pub fn write_payload(path: &Path, payload: &str, mode: WriteMode) -> Result<usize, OutputError> {
    let body = match mode {
        WriteMode::Truncate => payload,
        WriteMode::Append => strip_header(payload),
    };

    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Truncate => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };

    let write = |options: &OpenOptions| -> io::Result<()> {
        let mut file = options.open(path)?;
        file.write_all(body.as_bytes())?;
        file.flush()
    };
    write(&options).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(body.len())
}

/// Number of CSV records in `payload` minus the header record.
///
/// An empty line is a record of its own. A payload that ends inside an open
/// quote has no count.
pub fn count_rows(payload: &str) -> Result<usize, OutputError> {
    let bytes = payload.as_bytes();
    let mut reader = csv_core::ReaderBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .build();
    let mut output = [0u8; 4096];
    let mut ends = [0usize; 128];

    let mut records = 0usize;
    let mut pos = 0usize;
    let mut record_start = None;
    loop {
        let start = match record_start {
            Some(start) => start,
            None => {
                // csv_core discards empty lines before a record.
                while bytes.get(pos) == Some(&b'\n') {
                    records += 1;
                    pos += 1;
                }
                record_start = Some(pos);
                pos
            }
        };

        let at_eof = pos == bytes.len();
        let (result, nin, _, _) = reader.read_record(&bytes[pos..], &mut output, &mut ends);
        pos += nin;
        match result {
            ReadRecordResult::InputEmpty
            | ReadRecordResult::OutputFull
            | ReadRecordResult::OutputEndsFull => {}
            ReadRecordResult::Record => {
                // Only a record cut off by EOF can still hold an open quote.
                let quotes = bytes[start..pos].iter().filter(|&&b| b == b'"').count();
                if at_eof && quotes % 2 == 1 {
                    return Err(OutputError::UnterminatedQuote {
                        record: records + 1,
                    });
                }
                records += 1;
                record_start = None;
            }
            ReadRecordResult::End => break,
        }
    }
    Ok(records.saturating_sub(1))
}

/// Writes `payload` and counts its rows. Neither failure stops the other.
pub fn materialize(path: &Path, payload: &str, mode: WriteMode) -> DownloadReport {
    let written = write_payload(path, payload, mode);
    if let Err(err) = &written {
        warn!(error = %err, "download was not saved");
    }

    let rows = count_rows(payload);
    if let Err(err) = &rows {
        warn!(error = %err, "row count unavailable");
    }

    DownloadReport {
        path: path.to_path_buf(),
        mode,
        written,
        rows,
    }
}
