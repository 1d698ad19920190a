//! Fixtures shared by the unit tests: hand-built TIFF blocks and real
//! JPEG/PNG files produced with the `image` crate.

use std::io::Cursor;

use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};

use crate::exif::{FORMAT_LONG, TAG_EXIF_IFD_POINTER};

type RawTag = (u16, u16, Vec<u8>);

/// ASCII value bytes with the trailing NUL.
pub fn ascii(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

/// Builds a minimal TIFF block with an IFD0 and an optional Exif sub-IFD.
pub struct TiffBuilder {
    big_endian: bool,
    primary: Vec<RawTag>,
    exif: Vec<RawTag>,
}

impl TiffBuilder {
    pub fn little_endian() -> Self {
        Self {
            big_endian: false,
            primary: Vec::new(),
            exif: Vec::new(),
        }
    }

    pub fn big_endian() -> Self {
        Self {
            big_endian: true,
            ..Self::little_endian()
        }
    }

    pub fn primary(mut self, id: u16, data_type: u16, value: Vec<u8>) -> Self {
        self.primary.push((id, data_type, value));
        self
    }

    pub fn exif(mut self, id: u16, data_type: u16, value: Vec<u8>) -> Self {
        self.exif.push((id, data_type, value));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = if self.big_endian {
            b"MM\0*\0\0\0\0".to_vec()
        } else {
            b"II*\0\0\0\0\0".to_vec()
        };

        let exif_offset = if self.exif.is_empty() {
            None
        } else {
            Some(self.write_dir(&mut out, &self.exif))
        };

        let mut primary = self.primary.clone();
        if let Some(offset) = exif_offset {
            primary.push((TAG_EXIF_IFD_POINTER, FORMAT_LONG, self.u32(offset).to_vec()));
        }
        let ifd0 = self.write_dir(&mut out, &primary);
        let header = self.u32(ifd0);
        out[4..8].copy_from_slice(&header);
        out
    }

    fn write_dir(&self, out: &mut Vec<u8>, tags: &[RawTag]) -> u32 {
        if out.len() % 2 != 0 {
            out.push(0);
        }
        let start = out.len();
        let data_start = start + 2 + tags.len() * 12 + 4;
        let mut blobs = Vec::new();

        out.extend_from_slice(&self.u16(tags.len() as u16));
        for (id, data_type, value) in tags {
            let size = match data_type {
                3 => 2,
                4 => 4,
                5 => 8,
                _ => 1,
            };
            out.extend_from_slice(&self.u16(*id));
            out.extend_from_slice(&self.u16(*data_type));
            out.extend_from_slice(&self.u32((value.len() / size) as u32));
            if value.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..value.len()].copy_from_slice(value);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&self.u32((data_start + blobs.len()) as u32));
                blobs.extend_from_slice(value);
                if value.len() % 2 != 0 {
                    blobs.push(0);
                }
            }
        }
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&blobs);
        start as u32
    }

    fn u16(&self, v: u16) -> [u8; 2] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn u32(&self, v: u32) -> [u8; 4] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }
}

/// A small JPEG without any EXIF segment.
pub fn plain_jpeg() -> Vec<u8> {
    encode_sample(image::ImageFormat::Jpeg)
}

/// A small PNG without any EXIF chunk.
pub fn plain_png() -> Vec<u8> {
    encode_sample(image::ImageFormat::Png)
}

/// A small lossless WebP without any EXIF chunk.
pub fn plain_webp() -> Vec<u8> {
    encode_sample(image::ImageFormat::WebP)
}

fn encode_sample(format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([x as u8 * 16, y as u8 * 16, 128]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

/// A JPEG carrying `tiff` in an APP1 EXIF segment right after APP0.
pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(plain_jpeg())).unwrap();
    let mut contents = b"Exif\0\0".to_vec();
    contents.extend_from_slice(tiff);
    let segments = jpeg.segments_mut();
    let at = segments.len().min(1);
    segments.insert(at, JpegSegment::new_with_contents(0xE1, Bytes::from(contents)));
    jpeg.encoder().bytes().to_vec()
}

/// A PNG carrying `tiff` in an eXIf chunk.
pub fn png_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut png = Png::from_bytes(Bytes::from(plain_png())).unwrap();
    png.set_exif(Some(Bytes::from(tiff.to_vec())));
    png.encoder().bytes().to_vec()
}

/// A WebP carrying `tiff` in an EXIF chunk.
pub fn webp_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut webp = WebP::from_bytes(Bytes::from(plain_webp())).unwrap();
    webp.set_exif(Some(Bytes::from(tiff.to_vec())));
    webp.encoder().bytes().to_vec()
}

/// A camera-like EXIF block: Orientation in IFD0 and DateTimeOriginal in the
/// Exif sub-IFD.
pub fn camera_tiff(date: &str) -> Vec<u8> {
    TiffBuilder::little_endian()
        .primary(crate::exif::TAG_ORIENTATION, crate::exif::FORMAT_SHORT, vec![1, 0])
        .primary(0x010F, crate::exif::FORMAT_ASCII, ascii("TestCam"))
        .exif(crate::exif::TAG_DATE_TIME_ORIGINAL, crate::exif::FORMAT_ASCII, ascii(date))
        .build()
}

/// An EXIF block with an Orientation tag and no date at all.
pub fn dateless_tiff() -> Vec<u8> {
    TiffBuilder::little_endian()
        .primary(crate::exif::TAG_ORIENTATION, crate::exif::FORMAT_SHORT, vec![1, 0])
        .build()
}
