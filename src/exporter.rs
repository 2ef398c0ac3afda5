use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use log::{debug, error, info};

use crate::{
    SpeedRecorderError,
    recording::{Sample, Session},
};

pub const CSV_HEADER: &str = "m/s,t";
pub const EXPORT_FILE_NAME: &str = "mps.csv";
const EXPORT_DIR_PREFIX: &str = "exp-";
const EXPORT_DIR_DATE_FORMAT: &str = "%d%b%y-%H%M";

/// What happened to the export file once its directory was in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    /// The file could not be written. The error has already been logged.
    WriteFailed,
}

/// Renders samples as CSV, one `speed,timestamp` row per sample under an `m/s,t` header.
///
/// Values keep full precision, and whole numbers keep their `.0`. Magnitudes below 1e-4 or
/// from 1e16 up are written in exponent form (`3e-5`, `1e16`), and NaN as `NaN`; every value
/// still parses back to the same `f64`.
pub fn to_csv(samples: &[Sample]) -> String {
    let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + samples.len() * 24);
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    for sample in samples {
        // writing into a String cannot fail
        let _ = writeln!(csv, "{:?},{:?}", sample.speed_mps, sample.timestamp_s);
    }
    csv
}

/// Name of the directory an export made at `at` goes to, e.g. `exp-20mar21-1432`.
pub fn session_dir_name(at: &NaiveDateTime) -> String {
    format!(
        "{}{}",
        EXPORT_DIR_PREFIX,
        at.format(EXPORT_DIR_DATE_FORMAT).to_string().to_lowercase()
    )
}

/// Export `samples` under `destination_root`, naming the directory after the local time now.
pub fn export(
    samples: &[Sample],
    destination_root: &Path,
) -> Result<ExportOutcome, SpeedRecorderError> {
    export_at(samples, destination_root, &Local::now().naive_local())
}

pub fn export_session(
    session: &Session,
    destination_root: &Path,
) -> Result<ExportOutcome, SpeedRecorderError> {
    export(session.samples().as_slice(), destination_root)
}

/// Export `samples` to `<destination_root>/<session dir for at>/mps.csv`.
///
/// Failing to create the directory is an error. Failing to write the file is logged and
/// reported as [`ExportOutcome::WriteFailed`]. An existing file from an export in the same
/// minute is replaced.
pub fn export_at(
    samples: &[Sample],
    destination_root: &Path,
    at: &NaiveDateTime,
) -> Result<ExportOutcome, SpeedRecorderError> {
    let export_dir = destination_root.join(session_dir_name(at));
    if !export_dir.is_dir() {
        debug!("Creating export directory {:?}", export_dir);
        fs::create_dir_all(&export_dir).map_err(|e| SpeedRecorderError::ExportDirectoryError {
            path: format!("{:?}", export_dir),
            source: e,
        })?;
    }

    let export_file = export_dir.join(EXPORT_FILE_NAME);
    match write_atomically(&export_file, &to_csv(samples)) {
        Ok(()) => {
            info!("Exported {} samples to {:?}", samples.len(), export_file);
            Ok(ExportOutcome::Written(export_file))
        }
        Err(e) => {
            error!("Failed to create file: {}", e);
            Ok(ExportOutcome::WriteFailed)
        }
    }
}

/// Write to a sibling temporary file and rename it over `file`, so readers never see a
/// partially written export.
fn write_atomically(file: &Path, contents: &str) -> Result<(), SpeedRecorderError> {
    let tmp_file = file.with_extension("csv.tmp");
    let write_error = |e| SpeedRecorderError::ExportWriteError {
        path: format!("{:?}", file),
        source: e,
    };

    let result = File::create(&tmp_file)
        .and_then(|f| {
            let mut writer = BufWriter::new(f);
            writer.write_all(contents.as_bytes())?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()
        })
        .and_then(|_| fs::rename(&tmp_file, file));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_file);
    }
    result.map_err(write_error)
}
