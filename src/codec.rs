//! The image codec: turns file bytes into an in-memory [`Photo`] exposing its
//! metadata tags, and turns a (possibly mutated) photo back into file bytes.
//!
//! Only the metadata container is touched. Pixel data is carried through as
//! opaque segments/chunks by `img-parts`, so re-encoding is lossless.

use std::path::Path;

use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use serde::Serialize;

use crate::error::{CodecOpenError, EncodeError, ExifError, TagSynthesisError};
use crate::exif::{ExifBlock, MetadataTag};

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const JPEG_APP1: u8 = 0xE1;
// Segment length is a u16 that counts its own two bytes.
const JPEG_SEGMENT_MAX: usize = 65533;

/// Image formats whose metadata can be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    /// Determine the format from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Determine the format from the leading bytes of a file.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
        }
    }
}

enum Container {
    Jpeg(Jpeg),
    Png(Png),
    WebP(WebP),
}

impl Container {
    fn parse(format: ImageFormat, bytes: Bytes) -> Result<Self, CodecOpenError> {
        let container_err = |e: img_parts::Error| CodecOpenError::Container {
            format: format.name(),
            reason: e.to_string(),
        };
        Ok(match format {
            ImageFormat::Jpeg => Container::Jpeg(Jpeg::from_bytes(bytes).map_err(container_err)?),
            ImageFormat::Png => Container::Png(Png::from_bytes(bytes).map_err(container_err)?),
            ImageFormat::WebP => Container::WebP(WebP::from_bytes(bytes).map_err(container_err)?),
        })
    }

    /// The raw TIFF data of the EXIF block, without any `Exif\0\0` prefix.
    fn exif(&self) -> Option<Bytes> {
        let raw = match self {
            Container::Jpeg(jpeg) => {
                let pos = find_exif_segment_pos(jpeg)?;
                jpeg.segments()[pos].contents().clone()
            }
            Container::Png(png) => png.exif()?,
            Container::WebP(webp) => webp.exif()?,
        };
        if raw.starts_with(EXIF_PREFIX) {
            Some(raw.slice(EXIF_PREFIX.len()..))
        } else {
            Some(raw)
        }
    }

    fn replace_exif(&mut self, tiff: Vec<u8>) -> Result<(), EncodeError> {
        match self {
            Container::Jpeg(jpeg) => {
                if EXIF_PREFIX.len() + tiff.len() > JPEG_SEGMENT_MAX {
                    return Err(ExifError::TooLarge(JPEG_SEGMENT_MAX - EXIF_PREFIX.len()).into());
                }
                let mut contents = Vec::with_capacity(EXIF_PREFIX.len() + tiff.len());
                contents.extend_from_slice(EXIF_PREFIX);
                contents.extend_from_slice(&tiff);
                let segment = JpegSegment::new_with_contents(JPEG_APP1, Bytes::from(contents));

                // Replace in place so EXIF keeps its position ahead of XMP.
                let pos = find_exif_segment_pos(jpeg);
                let segments = jpeg.segments_mut();
                match pos {
                    Some(pos) => segments[pos] = segment,
                    None => {
                        let at = segments.len().min(1);
                        segments.insert(at, segment);
                    }
                }
            }
            Container::Png(png) => png.set_exif(Some(Bytes::from(tiff))),
            Container::WebP(webp) => webp.set_exif(Some(Bytes::from(tiff))),
        }
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Container::Jpeg(jpeg) => jpeg.encoder().bytes().to_vec(),
            Container::Png(png) => png.encoder().bytes().to_vec(),
            Container::WebP(webp) => webp.encoder().bytes().to_vec(),
        }
    }
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == JPEG_APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// An image decoded into memory, with its metadata exposed as a property list.
///
/// Owns the whole file contents. Dropping it (or handing it to
/// [`ImageCodec::encode`]) releases everything read for the file.
pub struct Photo {
    container: Container,
    format: ImageFormat,
    exif: Option<ExifBlock>,
}

impl Photo {
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Look up a property by tag id.
    pub fn try_get(&self, id: u16) -> Option<&MetadataTag> {
        self.exif.as_ref()?.get(id)
    }

    /// Every property on the image, in file order.
    pub fn property_items(&self) -> impl Iterator<Item = &MetadataTag> {
        self.exif.iter().flat_map(|block| block.tags())
    }

    /// Store a property, replacing any with the same id.
    ///
    /// An image without an EXIF block has no property slots at all, so there
    /// is nowhere to put the tag.
    pub fn set_property_item(&mut self, tag: MetadataTag) -> Result<(), TagSynthesisError> {
        let block = self
            .exif
            .as_mut()
            .ok_or(TagSynthesisError::NoTemplateAvailable)?;
        block.set(tag);
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.exif.as_ref().is_some_and(ExifBlock::is_modified)
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("format", &self.format)
            .field("properties", &self.property_items().count())
            .field("modified", &self.is_modified())
            .finish()
    }
}

/// Decodes file bytes into a [`Photo`] and encodes it back.
pub trait ImageCodec {
    /// Decode a complete file. The bytes are moved into the photo.
    fn decode(&self, bytes: Vec<u8>) -> Result<Photo, CodecOpenError>;

    /// Re-encode a photo in `format`. The photo is consumed whether or not
    /// encoding succeeds.
    fn encode(&self, photo: Photo, format: ImageFormat) -> Result<Vec<u8>, EncodeError>;
}

/// The default codec: JPEG, PNG and WebP via `img-parts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerCodec;

impl ImageCodec for ContainerCodec {
    fn decode(&self, bytes: Vec<u8>) -> Result<Photo, CodecOpenError> {
        let format = ImageFormat::sniff(&bytes).ok_or(CodecOpenError::UnsupportedFormat)?;
        let container = Container::parse(format, Bytes::from(bytes))?;
        let exif = container
            .exif()
            .map(|raw| ExifBlock::parse(&raw))
            .transpose()?;

        log::debug!(
            "Decoded {} image ({})",
            format.name(),
            if exif.is_some() { "with EXIF" } else { "no EXIF" }
        );

        Ok(Photo {
            container,
            format,
            exif,
        })
    }

    fn encode(&self, photo: Photo, format: ImageFormat) -> Result<Vec<u8>, EncodeError> {
        if photo.format != format {
            return Err(EncodeError::FormatMismatch {
                actual: photo.format.name(),
                requested: format.name(),
            });
        }

        let Photo {
            mut container,
            exif,
            ..
        } = photo;

        if let Some(block) = exif.filter(ExifBlock::is_modified) {
            container.replace_exif(block.to_bytes()?)?;
        }

        Ok(container.into_bytes())
    }
}
