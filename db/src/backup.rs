//! Timestamped copies of the database file.
//!
//! A backup never fails the caller: every error is folded into the returned
//! [`BackupResult`], so a schema run can proceed (or not) on its own terms.
//!
//! The source is copied while a shared SQLite read lock is held on it. A file
//! that another connection holds exclusively (or is mid-write) is refused
//! with [`DbError::Locked`] instead of being copied in an inconsistent state.
//!
//! # Examples
//!
//! ```no_run
//! use vehicle_auth_db::BackupService;
//!
//! let service = BackupService::new("Backup Database", "Database-Backup");
//! let result = service.backup("Database.db");
//! println!("{}", result.message);
//!
//! let info = service.info();
//! println!("{} backups, {} bytes", info.backup_count, info.total_size);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use rusqlite::{Connection, ErrorCode, OpenFlags};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::BackupConfig;
use crate::error::{DbError, Result};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// How long a backup waits for a writer to release the source by default.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Outcome of a backup attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupResult {
    pub success: bool,
    pub message: String,
    pub produced_path: Option<PathBuf>,
    pub size_bytes: u64,
    /// Hex SHA-256 of the copy.
    pub checksum: Option<String>,
}

impl BackupResult {
    fn failed(err: &DbError) -> Self {
        Self {
            success: false,
            message: format!("Backup failed: {err}"),
            produced_path: None,
            size_bytes: 0,
            checksum: None,
        }
    }
}

/// Summary of the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub available: bool,
    pub backup_count: usize,
    pub total_size: u64,
    pub message: String,
}

/// A backup file found in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Creates, lists and prunes backups in one directory.
#[derive(Debug, Clone)]
pub struct BackupService {
    directory: PathBuf,
    prefix: String,
    lock_timeout: Duration,
}

impl BackupService {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets how long to wait for another connection's lock on the source.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn from_config(config: &BackupConfig) -> Self {
        Self::new(config.directory.clone(), config.prefix.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name for a backup of `source` taken at `at`.
    ///
    /// ```
    /// use chrono::{Local, TimeZone};
    /// use vehicle_auth_db::BackupService;
    ///
    /// let service = BackupService::new("backups", "Database-Backup");
    /// let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    /// assert_eq!(
    ///     service.backup_name("Database.db".as_ref(), at),
    ///     "Database-Backup-20240309-140507.db"
    /// );
    /// assert_eq!(
    ///     service.backup_name("Database".as_ref(), at),
    ///     "Database-Backup-20240309-140507.db"
    /// );
    /// ```
    pub fn backup_name(&self, source: &Path, at: DateTime<Local>) -> String {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("db");
        format!("{}-{}.{}", self.prefix, at.format(TIMESTAMP_FORMAT), ext)
    }

    /// Backs up `source` under the current local time.
    pub fn backup(&self, source: impl AsRef<Path>) -> BackupResult {
        self.backup_at(source, Local::now())
    }

    /// Backs up `source` under the timestamp `at`.
    pub fn backup_at(&self, source: impl AsRef<Path>, at: DateTime<Local>) -> BackupResult {
        let source = source.as_ref();
        match self.copy(source, at) {
            Ok((path, size_bytes, checksum)) => {
                info!(
                    backup = %path.display(),
                    size = size_bytes,
                    "Database backup created"
                );
                BackupResult {
                    success: true,
                    message: format!("Backup created successfully ({})", format_size(size_bytes)),
                    produced_path: Some(path),
                    size_bytes,
                    checksum: Some(checksum),
                }
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Database backup failed");
                BackupResult::failed(&e)
            }
        }
    }

    fn copy(&self, source: &Path, at: DateTime<Local>) -> Result<(PathBuf, u64, String)> {
        let is_file = fs::metadata(source).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return Err(DbError::SourceMissing(source.to_path_buf()));
        }
        // Held until the copy is done; dropping it ends the read transaction.
        let _lock = self.read_lock(source)?;
        let mut input = File::open(source)?;

        fs::create_dir_all(&self.directory)?;
        let destination = self.directory.join(self.backup_name(source, at));
        let mut output = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(DbError::DestinationExists(destination));
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = copy_hashed(&mut input, &mut output).and_then(|(size, expected)| {
            drop(output);
            let actual = file_checksum(&destination)?;
            if actual != expected {
                return Err(DbError::ChecksumMismatch { expected, actual });
            }
            Ok((size, actual))
        });

        match outcome {
            Ok((size, checksum)) => Ok((destination, size, checksum)),
            Err(e) => {
                // Never leave a partial copy behind.
                let _ = fs::remove_file(&destination);
                Err(e)
            }
        }
    }

    /// Opens `source` read-only and starts a read transaction on it, which
    /// holds a shared lock and keeps writers from touching the file.
    fn read_lock(&self, source: &Path) -> Result<Connection> {
        let lock = || -> rusqlite::Result<Connection> {
            let conn = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            conn.busy_timeout(self.lock_timeout)?;
            conn.execute_batch("BEGIN")?;
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(conn)
        };
        lock().map_err(|e| lock_error(source, e))
    }

    /// Backups in the directory, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let marker = format!("{}-", self.prefix);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if metadata.is_file() && name.starts_with(&marker) {
                entries.push(BackupEntry {
                    path: entry.path(),
                    size_bytes: metadata.len(),
                });
            }
        }
        // The timestamp after the prefix sorts chronologically.
        entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(entries)
    }

    pub fn info(&self) -> BackupInfo {
        if !self.directory.is_dir() {
            return BackupInfo {
                available: false,
                backup_count: 0,
                total_size: 0,
                message: "Backup directory does not exist".to_string(),
            };
        }
        match self.list() {
            Ok(entries) => {
                let total_size = entries.iter().map(|e| e.size_bytes).sum();
                BackupInfo {
                    available: true,
                    backup_count: entries.len(),
                    total_size,
                    message: format!(
                        "{} backup(s), {} total",
                        entries.len(),
                        format_size(total_size)
                    ),
                }
            }
            Err(e) => BackupInfo {
                available: false,
                backup_count: 0,
                total_size: 0,
                message: format!("Error reading backup directory: {e}"),
            },
        }
    }

    /// Deletes all but the newest `keep` backups and returns how many were
    /// removed. `keep == 0` keeps everything.
    pub fn cleanup(&self, keep: usize) -> usize {
        if keep == 0 {
            return 0;
        }
        let entries = match self.list() {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "No backups to clean up");
                return 0;
            }
        };

        let excess = entries.len().saturating_sub(keep);
        let mut removed = 0;
        for entry in entries.iter().take(excess) {
            match fs::remove_file(&entry.path) {
                Ok(()) => {
                    debug!(backup = %entry.path.display(), "Removed old backup");
                    removed += 1;
                }
                Err(e) => warn!(backup = %entry.path.display(), error = %e, "Failed to remove old backup"),
            }
        }
        removed
    }
}

fn lock_error(source: &Path, err: rusqlite::Error) -> DbError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            DbError::Locked(source.to_path_buf())
        }
        _ => DbError::Database(err),
    }
}

fn copy_hashed(input: &mut impl Read, output: &mut impl Write) -> Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let read = input.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        output.write_all(&buffer[..read])?;
        total += read as u64;
    }
    output.flush()?;
    Ok((total, format!("{:x}", hasher.finalize())))
}

/// Hex SHA-256 of a file's contents.
///
/// # Errors
///
/// Returns [`DbError::Io`] if the file cannot be read.
pub fn file_checksum(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Human-readable size with one decimal above a kilobyte.
///
/// ```
/// use vehicle_auth_db::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else {
        format!("{:.1} GB", b / (KB * KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(second: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 9, 30, second).unwrap()
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_backup_name_keeps_extension() {
        let service = BackupService::new("b", "P");
        assert_eq!(service.backup_name(Path::new("x.sqlite"), at(1)), "P-20240115-093001.sqlite");
    }

    #[test]
    fn test_copy_hashed_matches_digest() {
        let data = b"vehicle authorization".to_vec();
        let mut out = Vec::new();
        let (size, checksum) = copy_hashed(&mut data.as_slice(), &mut out).unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(out, data);
        assert_eq!(checksum, format!("{:x}", Sha256::digest(&data)));
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("P-20240101-000000.db"), b"a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"b").unwrap();
        fs::create_dir(dir.path().join("P-20240102-000000.db")).unwrap();

        let service = BackupService::new(dir.path(), "P");
        let entries = service.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size_bytes, 1);
    }
}
