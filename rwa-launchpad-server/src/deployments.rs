//! Deployment record files.
//!
//! Both operational binaries persist a JSON record of what they deployed or
//! launched under `deployments/`, named `<prefix>-<unix-millis>.json`.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;

/// Writes a deployment record and returns its path.
///
/// # Errors
///
/// Returns I/O errors from directory creation or the file write.
pub fn write_record(prefix: &str, record: &serde_json::Value) -> io::Result<PathBuf> {
    let dir = PathBuf::from("deployments");
    fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{prefix}-{}.json", Utc::now().timestamp_millis()));
    let body = serde_json::to_string_pretty(record)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&path, body)?;
    Ok(path)
}
