//! Error types for date-taken editing.
//!
//! Every error here is recoverable at the per-file boundary: the batch driver
//! turns it into a [`FileStatus`](crate::pipeline::FileStatus) and moves on to
//! the next file.

use std::path::PathBuf;

use thiserror::Error;

/// The date tag bytes could not be decoded, or a date cannot be encoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed date tag: {0}")]
    Malformed(String),

    #[error("year {0} cannot be stored in a four-digit EXIF date")]
    OutOfRange(i32),
}

/// No date tag could be fabricated for an image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagSynthesisError {
    #[error("image has no metadata tag to use as a template for DateTimeOriginal")]
    NoTemplateAvailable,
}

/// The image could not be opened as a supported image with readable metadata.
#[derive(Debug, Error)]
pub enum CodecOpenError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("unsupported or unrecognized image format")]
    UnsupportedFormat,

    #[error("failed to parse {format} container: {reason}")]
    Container { format: &'static str, reason: String },

    #[error("unreadable EXIF block: {0}")]
    Exif(#[from] ExifError),
}

/// Structural problems with a raw TIFF/EXIF block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExifError {
    #[error("EXIF block too short ({0} bytes)")]
    TooShort(usize),

    #[error("invalid TIFF byte order marker")]
    ByteOrder,

    #[error("invalid TIFF magic number {0}")]
    Magic(u16),

    #[error("{ifd} offset {offset} out of bounds")]
    OutOfBounds { ifd: &'static str, offset: usize },

    #[error("tag {id} has {length} bytes, not a whole number of type-{data_type} values")]
    Misaligned { id: u16, data_type: u16, length: u32 },

    #[error("EXIF block would exceed {0} bytes")]
    TooLarge(usize),
}

/// The in-memory image could not be re-encoded.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode a {actual} image as {requested}")]
    FormatMismatch {
        actual: &'static str,
        requested: &'static str,
    },

    #[error(transparent)]
    Exif(#[from] ExifError),

    #[error("{0}")]
    Other(String),
}

/// The new date could not be computed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdjustError {
    #[error("no existing date taken to shift")]
    NoExistingDate,

    #[error("resulting date is out of range")]
    OutOfRange,

    #[error("invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },
}

/// Failure staging or committing the re-encoded image.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Encoding failed; the file on disk was not touched.
    #[error("failed to encode image: {0}")]
    EncodeFailed(#[from] EncodeError),

    /// The backup copy could not be made; the file on disk was not touched.
    #[error("failed to back up {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing failed. The file may be incomplete if the transfer was interrupted.
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The image was written but its filesystem timestamps could not be set.
    #[error("failed to set file timestamps on {path}: {source}")]
    TimestampSyncFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Any failure while processing a single file.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("path does not resolve to an existing file: {0}")]
    Path(PathBuf),

    #[error(transparent)]
    CodecOpen(#[from] CodecOpenError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    TagSynthesis(#[from] TagSynthesisError),

    #[error(transparent)]
    Adjust(#[from] AdjustError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl ProcessError {
    /// Whether this condition leaves the file as-is without being a fault.
    ///
    /// A malformed existing tag, a missing template or a date that cannot be
    /// computed all mean "this file cannot be edited", not "something broke".
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ProcessError::Codec(CodecError::Malformed(_))
                | ProcessError::TagSynthesis(_)
                | ProcessError::Adjust(_)
        )
    }
}
