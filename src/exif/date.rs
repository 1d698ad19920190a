use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::CodecError;

/// Width of an encoded EXIF date, terminator included.
pub const ENCODED_LEN: usize = 20;

/// Byte positions of the separators in `yyyy:MM:dd HH:mm:ss`.
const COLONS: [usize; 4] = [4, 7, 13, 16];
const SPACE: usize = 10;

/// An EXIF date in its on-disk form: `yyyy:MM:dd HH:mm:ss` plus one NUL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedDateTime([u8; ENCODED_LEN]);

impl EncodedDateTime {
    pub fn as_bytes(&self) -> &[u8; ENCODED_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for EncodedDateTime {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Decode the raw value of a DateTimeOriginal tag.
///
/// The NUL terminator is part of the format: a value without it, with
/// anything after it, or of any other length is rejected.
pub fn decode(bytes: &[u8]) -> Result<NaiveDateTime, CodecError> {
    if bytes.len() != ENCODED_LEN {
        return Err(CodecError::Malformed(format!(
            "expected {ENCODED_LEN} bytes, found {}",
            bytes.len()
        )));
    }
    if bytes[ENCODED_LEN - 1] != 0 {
        return Err(CodecError::Malformed("missing NUL terminator".into()));
    }

    let text = &bytes[..ENCODED_LEN - 1];
    for (i, &b) in text.iter().enumerate() {
        let ok = if COLONS.contains(&i) {
            b == b':'
        } else if i == SPACE {
            b == b' '
        } else {
            b.is_ascii_digit()
        };
        if !ok {
            return Err(CodecError::Malformed(format!(
                "unexpected byte 0x{b:02x} at position {i} in '{}'",
                String::from_utf8_lossy(text)
            )));
        }
    }

    let year = field(text, 0, 4) as i32;
    let month = field(text, 5, 2);
    let day = field(text, 8, 2);
    let hour = field(text, 11, 2);
    let minute = field(text, 14, 2);
    let second = field(text, 17, 2);

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            CodecError::Malformed(format!(
                "'{}' is not a valid calendar date",
                String::from_utf8_lossy(text)
            ))
        })
}

/// Encode a date as a DateTimeOriginal value. Sub-second precision is dropped.
pub fn encode(datetime: &NaiveDateTime) -> Result<EncodedDateTime, CodecError> {
    let year = datetime.year();
    if !(0..=9999).contains(&year) {
        return Err(CodecError::OutOfRange(year));
    }

    let text = format!(
        "{:04}:{:02}:{:02} {:02}:{:02}:{:02}",
        year,
        datetime.month(),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    );

    let mut out = [0u8; ENCODED_LEN];
    out[..ENCODED_LEN - 1].copy_from_slice(text.as_bytes());
    Ok(EncodedDateTime(out))
}

/// Parse a run of ASCII digits already validated by [`decode`].
fn field(text: &[u8], start: usize, len: usize) -> u32 {
    text[start..start + len]
        .iter()
        .fold(0, |acc, &b| acc * 10 + u32::from(b - b'0'))
}
