//! JSON snapshots of the full record set.
//!
//! One file per mutation, never read back by the application.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vault_core::error::VaultError;
use vault_core::types::Record;

/// Upper bound on same-instant suffixes before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Contents of one backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub captured_at: DateTime<Utc>,
    pub total_records: usize,
    pub records: Vec<Record>,
}

/// Writes snapshot files into a backup directory.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
}

impl BackupWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a snapshot of `records` and return the file path.
    ///
    /// Creates the directory when missing. Never overwrites an existing file.
    pub fn write_snapshot(&self, records: &[Record]) -> Result<PathBuf, VaultError> {
        std::fs::create_dir_all(&self.dir)?;

        let captured_at = Utc::now();
        let snapshot = BackupSnapshot {
            captured_at,
            total_records: records.len(),
            records: records.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&snapshot)?;

        let stem = format!("backup_{}", file_timestamp(captured_at));
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{}.json", stem)
            } else {
                format!("{}_{}.json", stem, attempt)
            };
            let path = self.dir.join(file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_remove(&path, file, &body)?;
                    info!(path = %path.display(), total = records.len(), "Backup created");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(VaultError::Storage(format!(
            "could not find a free backup file name for {}",
            stem
        )))
    }
}

/// Write `body` to the freshly created `path`, deleting it again if the write
/// fails so no truncated snapshot is left behind.
fn write_or_remove<W: Write>(path: &Path, mut file: W, body: &[u8]) -> std::io::Result<()> {
    let result = file.write_all(body).and_then(|()| file.flush());
    if let Err(e) = result {
        drop(file);
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "Failed to remove partial backup");
        }
        return Err(e);
    }
    Ok(())
}

/// RFC 3339 with microseconds, with `:` and `.` made filesystem-safe.
fn file_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
        .replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn sample() -> Vec<Record> {
        vec![Record {
            id: 1,
            name: "ann".to_string(),
            created: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }]
    }

    fn json_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_file_timestamp_is_filesystem_safe() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        let stamp = file_timestamp(at);
        assert_eq!(stamp, "2024-03-01T12-30-45-000000Z");
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('.'));
    }

    #[test]
    fn test_write_snapshot_creates_dir_and_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(root.path().join("backups"));

        let path = writer.write_snapshot(&sample()).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backup_"));
        assert!(name.ends_with(".json"));

        let snapshot: BackupSnapshot =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(snapshot.total_records, 1);
        assert_eq!(snapshot.records, sample());
    }

    #[test]
    fn test_every_call_writes_a_new_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(root.path());

        for _ in 0..5 {
            writer.write_snapshot(&sample()).unwrap();
        }
        assert_eq!(json_files(root.path()).len(), 5);
    }

    #[test]
    fn test_empty_snapshot() {
        let root = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(root.path());
        let path = writer.write_snapshot(&[]).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(value["total_records"], 0);
        assert_eq!(value["records"], serde_json::json!([]));
    }

    /// Accepts a few bytes, then fails like a full disk.
    struct FailingWriter {
        accepted: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.accepted >= 4 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            let n = buf.len().min(4 - self.accepted);
            self.accepted += n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("backup_partial.json");
        std::fs::write(&path, b"{\"ca").unwrap();

        let err = write_or_remove(&path, FailingWriter { accepted: 0 }, b"{\"captured_at\":1}")
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
    }

    #[test]
    fn test_successful_write_keeps_file() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("backup_ok.json");
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .unwrap();

        write_or_remove(&path, file, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_unwritable_dir_is_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let writer = BackupWriter::new(blocker.join("backups"));
        assert!(writer.write_snapshot(&sample()).is_err());
    }
}
