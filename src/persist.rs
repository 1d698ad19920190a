//! Staged write-back of an edited photo.
//!
//! The whole image is encoded into memory first; the file on disk is only
//! opened for writing once that has succeeded.

use std::fs::{File, FileTimes, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime, TimeZone, Utc};

use crate::codec::{ImageCodec, ImageFormat, Photo};
use crate::error::PersistError;

/// How [`commit`] should treat the file on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Encode only; never write the file or touch its timestamps.
    pub preview: bool,
    /// Copy the original to `<file>.bak` before overwriting it.
    pub backup_original: bool,
    /// Set the file's timestamps to this value after writing.
    pub file_times: Option<NaiveDateTime>,
}

/// What [`commit`] actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Size of the encoded image.
    pub encoded_len: usize,
    /// Whether the file on disk was rewritten.
    pub written: bool,
    pub backup_path: Option<PathBuf>,
    /// Whether modified/accessed times were set.
    pub times_synced: bool,
    /// Whether the creation time was also set (not possible on every platform).
    pub created_synced: bool,
}

/// Encode `photo` and, unless previewing, replace `target` with the result.
///
/// The photo is consumed by encoding, so it is released on every path. If
/// encoding fails the target file is left exactly as it was. A failure while
/// writing may leave the file partially written.
pub fn commit(
    codec: &dyn ImageCodec,
    photo: Photo,
    format: ImageFormat,
    target: &Path,
    options: &CommitOptions,
) -> Result<CommitReport, PersistError> {
    let staged = codec.encode(photo, format)?;
    let mut report = CommitReport {
        encoded_len: staged.len(),
        ..CommitReport::default()
    };
    log::debug!("Staged {} bytes for {}", staged.len(), target.display());

    if options.preview {
        log::debug!("Preview only, not writing {}", target.display());
        return Ok(report);
    }

    if options.backup_original {
        report.backup_path = Some(backup_file(target)?);
    }

    write_staged(target, &staged).map_err(|source| PersistError::WriteFailed {
        path: target.to_path_buf(),
        source,
    })?;
    report.written = true;
    drop(staged);

    if let Some(when) = options.file_times {
        report.created_synced =
            set_file_times(target, when).map_err(|source| PersistError::TimestampSyncFailed {
                path: target.to_path_buf(),
                source,
            })?;
        report.times_synced = true;
    }

    Ok(report)
}

fn write_staged(target: &Path, staged: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(target)?;
    file.write_all(staged)?;
    file.flush()?;
    file.sync_all()
}

/// `photo.jpg` -> `photo.jpg.bak`, `photo` -> `photo.bak`.
fn backup_path_for(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if !ext.is_empty() => {
            path.with_extension(format!("{}.bak", ext.to_string_lossy()))
        }
        _ => {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(".bak");
            path.with_file_name(name)
        }
    }
}

/// Create a backup of the original file, unless one already exists.
fn backup_file(path: &Path) -> Result<PathBuf, PersistError> {
    let backup_path = backup_path_for(path);

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).map_err(|source| PersistError::BackupFailed {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Interpret an EXIF date (which has no zone) as local time.
pub fn to_system_time(when: NaiveDateTime) -> SystemTime {
    match Local.from_local_datetime(&when).earliest() {
        Some(local) => SystemTime::from(local),
        // Skipped by a DST transition; fall back to reading it as UTC.
        None => SystemTime::from(Utc.from_utc_datetime(&when)),
    }
}

/// Set modified and accessed times, plus creation time where supported.
/// Returns whether the creation time was set.
pub fn set_file_times(path: &Path, when: NaiveDateTime) -> std::io::Result<bool> {
    let time = to_system_time(when);
    let times = FileTimes::new().set_accessed(time).set_modified(time);

    #[cfg(windows)]
    let (times, created) = {
        use std::os::windows::fs::FileTimesExt;
        (times.set_created(time), true)
    };
    #[cfg(target_os = "macos")]
    let (times, created) = {
        use std::os::macos::fs::FileTimesExt;
        (times.set_created(time), true)
    };
    #[cfg(not(any(windows, target_os = "macos")))]
    let created = false;

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_times(times)?;

    if !created {
        log::debug!(
            "Creation time of {} left unchanged (not settable on this platform)",
            path.display()
        );
    }
    Ok(created)
}
