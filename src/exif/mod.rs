//! The DateTimeOriginal tag and the EXIF property list it lives in.
//!
//! - [`decode`] / [`encode`]: the fixed-width `yyyy:MM:dd HH:mm:ss\0` value
//! - [`locate`]: find tag 36867 on a [`Photo`](crate::codec::Photo), or
//!   fabricate it from a template tag
//! - [`ExifBlock`]: IFD0 + Exif sub-IFD reader/writer used by the codec

mod date;
mod ifd;
mod locator;

pub use date::{ENCODED_LEN, EncodedDateTime, decode, encode};
pub use ifd::{
    Directory, ExifBlock, FORMAT_ASCII, FORMAT_LONG, FORMAT_SHORT, MetadataTag,
    TAG_DATE_TIME_ORIGINAL, TAG_EXIF_IFD_POINTER, TAG_ORIENTATION,
};
pub use locator::{LocatedTag, locate, synthesize_from};
