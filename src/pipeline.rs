use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use serde::Serialize;
use walkdir::WalkDir;

use crate::adjust::DateAdjustment;
use crate::codec::{ImageCodec, ImageFormat, Photo};
use crate::error::{CodecOpenError, ProcessError};
use crate::exif::{self, LocatedTag, TAG_DATE_TIME_ORIGINAL};
use crate::persist::{self, CommitOptions};

/// How a single file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    /// The new date was written.
    Updated,
    /// The new date was computed and encoded, but nothing was written.
    Previewed,
    /// The file cannot be edited (malformed tag, no template, no date to shift).
    Skipped(String),
    /// Something went wrong reading, encoding or writing the file.
    Failed(String),
}

impl FileStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, FileStatus::Failed(_))
    }
}

/// The result of processing one file.
///
/// `new_date_taken` is set as soon as the new value has been computed, so a
/// file that failed while being written still reports what it would have
/// received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDateOutcome {
    pub path: PathBuf,
    pub old_date_taken: Option<NaiveDateTime>,
    pub new_date_taken: Option<NaiveDateTime>,
    pub status: FileStatus,
}

/// A pass-through record for downstream tools (e.g. renaming by date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratedRecord {
    pub path: PathBuf,
    pub old_date_taken: Option<NaiveDateTime>,
    pub new_date_taken: NaiveDateTime,
}

impl FileDateOutcome {
    /// The decorated record for this file, if it got a new date.
    pub fn decorated(&self) -> Option<DecoratedRecord> {
        match self.status {
            FileStatus::Updated | FileStatus::Previewed => Some(DecoratedRecord {
                path: self.path.clone(),
                old_date_taken: self.old_date_taken,
                new_date_taken: self.new_date_taken?,
            }),
            _ => None,
        }
    }
}

/// Per-file processing switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Encode but never write (dry run).
    pub preview: bool,
    /// Set the file's timestamps to the new date taken.
    pub sync_file_times: bool,
    /// Keep a `.bak` copy of each file before overwriting it.
    pub backup_originals: bool,
    /// Stop the batch after the first failed file.
    pub stop_on_first_failure: bool,
    /// Descend into subdirectories of directory arguments.
    pub recursive: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            preview: false,
            sync_file_times: true,
            backup_originals: false,
            stop_on_first_failure: false,
            recursive: false,
        }
    }
}

/// Resolve path arguments into the list of files to process.
///
/// - a file is taken as-is, whatever its extension (the codec decides if it
///   is an image);
/// - a directory contributes its supported images (recursively if asked);
/// - `*` and `?` in the last path component match files in that directory.
///
/// Anything that resolves to nothing is passed through unchanged, so it is
/// reported per file by [`process_file`].
pub fn resolve_paths(specs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for spec in specs {
        if spec.is_file() {
            files.push(spec.clone());
        } else if spec.is_dir() {
            let mut found: Vec<PathBuf> = walk(spec, if recursive { usize::MAX } else { 1 })
                .filter(|p| is_supported_image(p))
                .collect();
            found.sort();
            log::debug!("{}: {} image(s)", spec.display(), found.len());
            files.extend(found);
        } else if let Some(matches) = expand_wildcard(spec) {
            if matches.is_empty() {
                files.push(spec.clone());
            } else {
                files.extend(matches);
            }
        } else {
            files.push(spec.clone());
        }
    }

    files
}

fn walk(dir: &Path, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}

/// Expand `dir/pattern` where the pattern contains `*` or `?`.
/// Returns `None` when the last component is not a pattern.
fn expand_wildcard(spec: &Path) -> Option<Vec<PathBuf>> {
    let pattern = spec.file_name()?.to_str()?;
    if !pattern.contains(['*', '?']) {
        return None;
    }
    let parent = match spec.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut matches: Vec<PathBuf> = walk(parent, 1)
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| wildcard_match(pattern, name))
        })
        .collect();
    matches.sort();
    Some(matches)
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let n: Vec<char> = name.to_lowercase().chars().collect();

    // Classic greedy match with backtracking to the last '*'.
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_some()
}

/// Read the current date taken of a file without changing anything.
///
/// `Ok(None)` means the image has no DateTimeOriginal tag.
pub fn read_date_taken(
    path: &Path,
    codec: &dyn ImageCodec,
) -> Result<Option<NaiveDateTime>, ProcessError> {
    if !path.is_file() {
        return Err(ProcessError::Path(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(CodecOpenError::from)?;
    let photo = codec.decode(bytes)?;
    match photo.try_get(TAG_DATE_TIME_ORIGINAL) {
        Some(tag) => Ok(Some(exif::decode(tag.value())?)),
        None => Ok(None),
    }
}

/// Process a single file: read, compute, re-encode, commit.
///
/// Never fails as a whole; every problem is folded into the returned
/// outcome's status and logged as one warning.
pub fn process_file(
    path: &Path,
    adjustment: &DateAdjustment,
    codec: &dyn ImageCodec,
    options: &ProcessOptions,
) -> FileDateOutcome {
    let edit = edit_file(path, adjustment, codec, options);

    let status = match edit.result {
        Ok(()) if options.preview => FileStatus::Previewed,
        Ok(()) => FileStatus::Updated,
        Err(e) => {
            let reason = e.to_string();
            log::warn!("{}: {reason}", path.display());
            if e.is_skip() {
                FileStatus::Skipped(reason)
            } else {
                FileStatus::Failed(reason)
            }
        }
    };

    FileDateOutcome {
        path: path.to_path_buf(),
        old_date_taken: edit.old_date_taken,
        new_date_taken: edit.new_date_taken,
        status,
    }
}

/// How far an edit got, and how it ended.
struct Edit {
    old_date_taken: Option<NaiveDateTime>,
    new_date_taken: Option<NaiveDateTime>,
    result: Result<(), ProcessError>,
}

fn edit_file(
    path: &Path,
    adjustment: &DateAdjustment,
    codec: &dyn ImageCodec,
    options: &ProcessOptions,
) -> Edit {
    let (photo, located, old) = match read_current(path, codec) {
        Ok(current) => current,
        Err(e) => {
            return Edit {
                old_date_taken: None,
                new_date_taken: None,
                result: Err(e),
            };
        }
    };

    let new = match adjustment.compute(old) {
        Ok(new) => new,
        Err(e) => {
            return Edit {
                old_date_taken: old,
                new_date_taken: None,
                result: Err(e.into()),
            };
        }
    };

    log::debug!(
        "{}: {} -> {}{}",
        path.display(),
        old.map_or_else(|| "(none)".to_string(), |d| d.to_string()),
        new,
        if located.is_synthesized() { " (new tag)" } else { "" }
    );

    Edit {
        old_date_taken: old,
        new_date_taken: Some(new),
        result: write_new(path, photo, located, new, codec, options),
    }
}

/// Decode a file and find its date tag, decoding the current value if any.
///
/// The file contents move into the photo; both are dropped together when the
/// photo is encoded or the edit stops early.
fn read_current(
    path: &Path,
    codec: &dyn ImageCodec,
) -> Result<(Photo, LocatedTag, Option<NaiveDateTime>), ProcessError> {
    if !path.is_file() {
        return Err(ProcessError::Path(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(CodecOpenError::from)?;
    let photo = codec.decode(bytes)?;
    let located = exif::locate(&photo)?;
    let old = match &located {
        LocatedTag::Existing(tag) => Some(exif::decode(tag.value())?),
        LocatedTag::Synthesized(_) => None,
    };
    Ok((photo, located, old))
}

fn write_new(
    path: &Path,
    mut photo: Photo,
    located: LocatedTag,
    new: NaiveDateTime,
    codec: &dyn ImageCodec,
    options: &ProcessOptions,
) -> Result<(), ProcessError> {
    let format: ImageFormat = photo.format();
    let encoded = exif::encode(&new)?;

    let mut tag = located.into_tag();
    tag.set_value(encoded.to_vec());
    photo.set_property_item(tag)?;

    let commit_options = CommitOptions {
        preview: options.preview,
        backup_original: options.backup_originals,
        file_times: options.sync_file_times.then_some(new),
    };
    let report = persist::commit(codec, photo, format, path, &commit_options)?;

    if let Some(ref backup) = report.backup_path {
        log::debug!("Backup: {}", backup.display());
    }
    Ok(())
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<FileDateOutcome>,
    /// The batch stopped early (strict mode or cancellation).
    pub aborted: bool,
}

impl BatchReport {
    pub fn updated(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Updated | FileStatus::Previewed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::is_failed)
    }

    /// Decorated records for every file that got a new date.
    pub fn decorated(&self) -> Vec<DecoratedRecord> {
        self.outcomes.iter().filter_map(FileDateOutcome::decorated).collect()
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Runs one adjustment over many files, strictly one file at a time.
pub struct BatchDriver<'a> {
    codec: &'a dyn ImageCodec,
    options: ProcessOptions,
    cancel: Arc<AtomicBool>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(codec: &'a dyn ImageCodec, options: ProcessOptions) -> Self {
        Self {
            codec,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A flag that stops the batch before the next file when set.
    /// A file already being processed always runs to completion.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Resolve `specs` and process every file they name.
    pub fn run(&self, specs: &[PathBuf], adjustment: &DateAdjustment) -> BatchReport {
        let files = resolve_paths(specs, self.options.recursive);
        self.run_files(&files, adjustment)
    }

    /// Process already-resolved files in order.
    pub fn run_files(&self, files: &[PathBuf], adjustment: &DateAdjustment) -> BatchReport {
        let total = files.len();
        let mut report = BatchReport::default();

        for (i, path) in files.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                log::warn!("Cancelled; {} file(s) not processed", total - i);
                report.aborted = true;
                break;
            }

            log::info!("[{}/{}] Processing: {}", i + 1, total, path.display());
            let outcome = process_file(path, adjustment, self.codec, &self.options);
            let failed = outcome.status.is_failed();
            report.outcomes.push(outcome);

            if failed && self.options.stop_on_first_failure {
                log::warn!(
                    "Stopping after first failure; {} file(s) not processed",
                    total - i - 1
                );
                report.aborted = true;
                break;
            }
        }

        log::info!(
            "Done: {} updated, {} skipped, {} failed out of {} file(s)",
            report.updated(),
            report.skipped(),
            report.failed(),
            total
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ContainerCodec;
    use crate::exif::{FORMAT_ASCII, FORMAT_SHORT, TAG_ORIENTATION};
    use crate::test_support::{
        TiffBuilder, ascii, camera_tiff, dateless_tiff, jpeg_with_exif, plain_jpeg,
    };
    use chrono::{NaiveDate, TimeDelta};
    use std::fs;
    use tempfile::TempDir;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn no_times() -> ProcessOptions {
        ProcessOptions {
            sync_file_times: false,
            ..ProcessOptions::default()
        }
    }

    fn stored_date(path: &Path) -> Option<NaiveDateTime> {
        read_date_taken(path, &ContainerCodec).unwrap()
    }

    // ── resolve_paths ────────────────────────────────────────────────

    #[test]
    fn resolve_single_file_any_extension() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        assert_eq!(resolve_paths(&[txt.clone()], false), vec![txt]);
    }

    #[test]
    fn resolve_directory_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.JPG"), b"fake").unwrap();
        fs::write(dir.path().join("a.png"), b"fake").unwrap();
        fs::write(dir.path().join("c.txt"), b"fake").unwrap();

        let files = resolve_paths(&[dir.path().to_path_buf()], false);
        assert_eq!(
            files,
            vec![dir.path().join("a.png"), dir.path().join("b.JPG")]
        );
    }

    #[test]
    fn resolve_directory_recursion_is_optional() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.webp"), b"fake").unwrap();

        assert_eq!(resolve_paths(&[dir.path().to_path_buf()], false).len(), 1);
        assert_eq!(resolve_paths(&[dir.path().to_path_buf()], true).len(), 2);
    }

    #[test]
    fn resolve_wildcards() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("IMG_001.jpg"), b"fake").unwrap();
        fs::write(dir.path().join("IMG_002.jpg"), b"fake").unwrap();
        fs::write(dir.path().join("other.jpg"), b"fake").unwrap();

        let files = resolve_paths(&[dir.path().join("img_00?.JPG")], false);
        assert_eq!(
            files,
            vec![dir.path().join("IMG_001.jpg"), dir.path().join("IMG_002.jpg")]
        );

        let all = resolve_paths(&[dir.path().join("*.jpg")], false);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn resolve_keeps_unresolvable_specs() {
        let missing = PathBuf::from("/nonexistent/path/photo.jpg");
        let no_match = PathBuf::from("/nonexistent/*.jpg");
        assert_eq!(
            resolve_paths(&[missing.clone(), no_match.clone()], false),
            vec![missing, no_match]
        );
    }

    #[test]
    fn wildcard_matching() {
        assert!(wildcard_match("*.jpg", "a.jpg"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(wildcard_match("?.png", "x.PNG"));
        assert!(!wildcard_match("?.png", "xy.png"));
        assert!(!wildcard_match("*.jpg", "a.jpeg"));
    }

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(!is_supported_image(Path::new("photo.heic")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    // ── process_file ─────────────────────────────────────────────────

    #[test]
    fn end_to_end_absolute_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"))).unwrap();

        let adjustment = DateAdjustment::Absolute(dt(1964, 3, 21, 0, 0, 0));
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());

        assert_eq!(
            outcome,
            FileDateOutcome {
                path: path.clone(),
                old_date_taken: Some(dt(2013, 8, 15, 10, 30, 0)),
                new_date_taken: Some(dt(1964, 3, 21, 0, 0, 0)),
                status: FileStatus::Updated,
            }
        );

        let photo = ContainerCodec.decode(fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            photo.try_get(TAG_DATE_TIME_ORIGINAL).unwrap().value(),
            b"1964:03:21 00:00:00\0"
        );
    }

    #[test]
    fn missing_tag_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.jpg");
        fs::write(&path, jpeg_with_exif(&dateless_tiff())).unwrap();

        let adjustment = DateAdjustment::Absolute(dt(1950, 6, 1, 12, 0, 0));
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());

        assert_eq!(outcome.status, FileStatus::Updated);
        assert_eq!(outcome.old_date_taken, None);
        assert_eq!(stored_date(&path), Some(dt(1950, 6, 1, 12, 0, 0)));

        // The template tag itself is still there.
        let photo = ContainerCodec.decode(fs::read(&path).unwrap()).unwrap();
        assert_eq!(photo.try_get(TAG_ORIENTATION).unwrap().value(), &[1, 0]);
    }

    #[test]
    fn shift_existing_moves_each_files_own_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"))).unwrap();

        let adjustment = DateAdjustment::ShiftExisting {
            delta: TimeDelta::try_minutes(-45).unwrap(),
        };
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());

        assert_eq!(outcome.status, FileStatus::Updated);
        assert_eq!(stored_date(&path), Some(dt(2013, 8, 15, 9, 45, 0)));
    }

    #[test]
    fn repeated_shifts_keep_the_file_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"));
        fs::write(&path, &original).unwrap();

        let adjustment = DateAdjustment::ShiftExisting {
            delta: TimeDelta::try_minutes(1).unwrap(),
        };
        for _ in 0..20 {
            let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());
            assert_eq!(outcome.status, FileStatus::Updated);
            assert_eq!(fs::read(&path).unwrap().len(), original.len());
        }
        assert_eq!(stored_date(&path), Some(dt(2013, 8, 15, 10, 50, 0)));
    }

    #[test]
    fn adjust_failure_still_reports_old_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_exif(&camera_tiff("9999:12:31 23:00:00"))).unwrap();

        let adjustment = DateAdjustment::ShiftExisting {
            delta: TimeDelta::try_days(1).unwrap(),
        };
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());

        assert!(matches!(outcome.status, FileStatus::Skipped(_)));
        assert_eq!(outcome.old_date_taken, Some(dt(9999, 12, 31, 23, 0, 0)));
        assert_eq!(outcome.new_date_taken, None);
    }

    #[test]
    fn shift_existing_skips_files_without_a_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = jpeg_with_exif(&dateless_tiff());
        fs::write(&path, &original).unwrap();

        let adjustment = DateAdjustment::ShiftExisting {
            delta: TimeDelta::try_hours(1).unwrap(),
        };
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());

        assert!(matches!(outcome.status, FileStatus::Skipped(_)));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn malformed_tag_is_skipped_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let tiff = TiffBuilder::little_endian()
            .primary(TAG_ORIENTATION, FORMAT_SHORT, vec![1, 0])
            .exif(TAG_DATE_TIME_ORIGINAL, FORMAT_ASCII, ascii("2013-08-15"))
            .build();
        let original = jpeg_with_exif(&tiff);
        fs::write(&path, &original).unwrap();

        let adjustment = DateAdjustment::Absolute(dt(2000, 1, 1, 0, 0, 0));
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());

        assert!(matches!(outcome.status, FileStatus::Skipped(ref r) if r.contains("malformed")));
        assert_eq!(outcome.old_date_taken, None);
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn image_without_metadata_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bare.jpg");
        fs::write(&path, plain_jpeg()).unwrap();

        let adjustment = DateAdjustment::Absolute(dt(2000, 1, 1, 0, 0, 0));
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &no_times());
        assert!(matches!(outcome.status, FileStatus::Skipped(_)));
    }

    #[test]
    fn preview_reports_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"));
        fs::write(&path, &original).unwrap();

        let options = ProcessOptions {
            preview: true,
            ..ProcessOptions::default()
        };
        let adjustment = DateAdjustment::Absolute(dt(1964, 3, 21, 0, 0, 0));
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &options);

        assert_eq!(outcome.status, FileStatus::Previewed);
        assert_eq!(outcome.new_date_taken, Some(dt(1964, 3, 21, 0, 0, 0)));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn missing_file_fails() {
        let adjustment = DateAdjustment::Absolute(dt(2000, 1, 1, 0, 0, 0));
        let outcome = process_file(
            Path::new("/nonexistent/photo.jpg"),
            &adjustment,
            &ContainerCodec,
            &no_times(),
        );
        assert!(outcome.status.is_failed());
        assert_eq!(outcome.new_date_taken, None);
    }

    #[test]
    fn sync_file_times_by_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"))).unwrap();

        let adjustment = DateAdjustment::Absolute(dt(1999, 12, 31, 23, 59, 0));
        let outcome = process_file(&path, &adjustment, &ContainerCodec, &ProcessOptions::default());

        assert_eq!(outcome.status, FileStatus::Updated);
        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(modified, persist::to_system_time(dt(1999, 12, 31, 23, 59, 0)));
    }

    // ── BatchDriver ──────────────────────────────────────────────────

    fn three_files(dir: &Path) -> Vec<PathBuf> {
        let a = dir.join("1.jpg");
        let b = dir.join("2.jpg");
        let c = dir.join("3.jpg");
        fs::write(&a, jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"))).unwrap();
        fs::write(&b, b"\xff\xd8 this is not really a jpeg").unwrap();
        fs::write(&c, jpeg_with_exif(&camera_tiff("2014:01:01 00:00:00"))).unwrap();
        vec![a, b, c]
    }

    #[test]
    fn batch_continues_past_a_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let files = three_files(dir.path());

        let driver = BatchDriver::new(&ContainerCodec, no_times());
        let adjustment = DateAdjustment::Absolute(dt(1964, 3, 21, 0, 0, 0));
        let report = driver.run(&files, &adjustment);

        assert!(!report.aborted);
        let statuses: Vec<bool> = report.outcomes.iter().map(|o| o.status.is_failed()).collect();
        assert_eq!(statuses, vec![false, true, false]);
        assert_eq!(report.outcomes[0].status, FileStatus::Updated);
        assert_eq!(report.outcomes[2].status, FileStatus::Updated);
        assert_eq!((report.updated(), report.skipped(), report.failed()), (2, 0, 1));
        assert_eq!(stored_date(&files[2]), Some(dt(1964, 3, 21, 0, 0, 0)));
    }

    #[test]
    fn strict_mode_stops_after_first_failure() {
        let dir = TempDir::new().unwrap();
        let files = three_files(dir.path());
        let original_third = fs::read(&files[2]).unwrap();

        let options = ProcessOptions {
            stop_on_first_failure: true,
            ..no_times()
        };
        let driver = BatchDriver::new(&ContainerCodec, options);
        let adjustment = DateAdjustment::Absolute(dt(1964, 3, 21, 0, 0, 0));
        let report = driver.run(&files, &adjustment);

        assert!(report.aborted);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(fs::read(&files[2]).unwrap(), original_third);
    }

    #[test]
    fn cancelled_batch_processes_nothing_further() {
        let dir = TempDir::new().unwrap();
        let files = three_files(dir.path());

        let driver = BatchDriver::new(&ContainerCodec, no_times());
        driver.cancel_handle().store(true, Ordering::SeqCst);
        let report = driver.run(&files, &DateAdjustment::Absolute(dt(2000, 1, 1, 0, 0, 0)));

        assert!(report.aborted);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn unresolvable_spec_is_reported_as_failed() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("1.jpg");
        fs::write(&good, jpeg_with_exif(&camera_tiff("2013:08:15 10:30:00"))).unwrap();
        let missing = dir.path().join("missing.jpg");

        let driver = BatchDriver::new(&ContainerCodec, no_times());
        let report = driver.run(
            &[missing.clone(), good.clone()],
            &DateAdjustment::Absolute(dt(2000, 1, 1, 0, 0, 0)),
        );

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].path, missing);
        assert!(report.outcomes[0].status.is_failed());
        assert_eq!(report.outcomes[1].status, FileStatus::Updated);
    }

    #[test]
    fn decorated_records_cover_changed_files_only() {
        let dir = TempDir::new().unwrap();
        let files = three_files(dir.path());

        let driver = BatchDriver::new(&ContainerCodec, no_times());
        let report = driver.run(&files, &DateAdjustment::Absolute(dt(1964, 3, 21, 0, 0, 0)));
        let records = report.decorated();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, files[0]);
        assert_eq!(records[0].old_date_taken, Some(dt(2013, 8, 15, 10, 30, 0)));
        assert_eq!(records[0].new_date_taken, dt(1964, 3, 21, 0, 0, 0));

        let json = serde_json::to_value(&records[1]).unwrap();
        assert_eq!(json["old_date_taken"], "2014-01-01T00:00:00");
        assert_eq!(json["new_date_taken"], "1964-03-21T00:00:00");
    }

    #[test]
    fn outcome_status_serializes_with_reason() {
        let outcome = FileDateOutcome {
            path: PathBuf::from("x.jpg"),
            old_date_taken: None,
            new_date_taken: None,
            status: FileStatus::Failed("boom".into()),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"]["kind"], "failed");
        assert_eq!(json["status"]["reason"], "boom");
        assert!(json["old_date_taken"].is_null());
    }
}
