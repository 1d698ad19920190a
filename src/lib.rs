//! # datetaken
//!
//! Rewrite the EXIF "date taken" (DateTimeOriginal, tag 36867) of JPEG, PNG and
//! WebP images, optionally syncing the file's own timestamps to the new date.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline module, which
//! handles the full read → compute → write flow for a batch of files:
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use datetaken::adjust::DateAdjustment;
//! use datetaken::codec::ContainerCodec;
//! use datetaken::config::Config;
//! use datetaken::pipeline::BatchDriver;
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     let when = NaiveDate::from_ymd_opt(1964, 3, 21)
//!         .and_then(|d| d.and_hms_opt(0, 0, 0))
//!         .expect("valid date");
//!     let adjustment = DateAdjustment::Absolute(when);
//!
//!     let driver = BatchDriver::new(&ContainerCodec, config.process_options());
//!     let report = driver.run(&[PathBuf::from("./scans")], &adjustment);
//!
//!     for record in report.decorated() {
//!         println!("{}: {:?} -> {}", record.path.display(), record.old_date_taken, record.new_date_taken);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The steps the pipeline runs per file are available individually:
//!
//! ```rust,no_run
//! use datetaken::adjust::{DateAdjustment, parse_offset};
//! use datetaken::codec::{ContainerCodec, ImageCodec};
//! use datetaken::exif::{self, LocatedTag};
//! use datetaken::persist::{CommitOptions, commit};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("photo.jpg");
//!     let codec = ContainerCodec;
//!
//!     // 1. Decode and find (or synthesize) the DateTimeOriginal tag
//!     let mut photo = codec.decode(std::fs::read(path)?)?;
//!     let located = exif::locate(&photo)?;
//!     let old = match &located {
//!         LocatedTag::Existing(tag) => Some(exif::decode(tag.value())?),
//!         LocatedTag::Synthesized(_) => None,
//!     };
//!
//!     // 2. Shift it back by an hour
//!     let adjustment = DateAdjustment::ShiftExisting { delta: parse_offset("-1h")? };
//!     let new = adjustment.compute(old)?;
//!
//!     // 3. Store and write back
//!     let mut tag = located.into_tag();
//!     tag.set_value(exif::encode(&new)?.to_vec());
//!     photo.set_property_item(tag)?;
//!     let format = photo.format();
//!     commit(&codec, photo, format, path, &CommitOptions::default())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Where the EXIF block lives |
//! |--------|----------------------------|
//! | JPEG (`.jpg`, `.jpeg`, `.jpe`, `.jfif`) | APP1 segment |
//! | PNG (`.png`) | `eXIf` chunk |
//! | WebP (`.webp`) | `EXIF` RIFF chunk |
//!
//! ## Modules
//!
//! - [`adjust`]: how the new date is computed, and parsing of dates/offsets
//! - [`codec`]: image container decoding/encoding around the EXIF block
//! - [`config`]: configuration types and loading/saving
//! - [`error`]: typed errors for every per-file failure
//! - [`exif`]: the date value codec, tag lookup/synthesis, and IFD handling
//! - [`persist`]: staged write-back, backups, and file timestamps
//! - [`pipeline`]: path resolution, per-file processing, and the batch driver

pub mod adjust;
pub mod codec;
pub mod config;
pub mod error;
pub mod exif;
pub mod persist;
pub mod pipeline;

#[cfg(test)]
mod test_support;
