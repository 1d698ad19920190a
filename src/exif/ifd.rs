use crate::error::ExifError;

/// Orientation (IFD0). Present in almost every camera file, so it is the
/// preferred template when DateTimeOriginal has to be synthesized.
pub const TAG_ORIENTATION: u16 = 0x0112;
/// Pointer from IFD0 to the Exif sub-IFD.
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
/// DateTimeOriginal (Exif sub-IFD), 36867.
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

/// TIFF data format codes.
pub const FORMAT_ASCII: u16 = 2;
pub const FORMAT_SHORT: u16 = 3;
pub const FORMAT_LONG: u16 = 4;

const ENTRY_LEN: usize = 12;

/// One property of an image's EXIF block: a tag id, its TIFF data format and
/// its raw value bytes (in the block's byte order).
///
/// `length` always equals `value.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTag {
    id: u16,
    data_type: u16,
    length: u32,
    value: Vec<u8>,
}

impl MetadataTag {
    pub fn new(id: u16, data_type: u16, value: Vec<u8>) -> Self {
        Self {
            id,
            data_type,
            length: value.len() as u32,
            value,
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn data_type(&self) -> u16 {
        self.data_type
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_id(&mut self, id: u16) {
        self.id = id;
    }

    pub fn set_data_type(&mut self, data_type: u16) {
        self.data_type = data_type;
    }

    /// Replace the value bytes, keeping `length` in step.
    pub fn set_value(&mut self, value: Vec<u8>) {
        self.length = value.len() as u32;
        self.value = value;
    }
}

/// Which IFD a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directory {
    Primary,
    Exif,
}

impl Directory {
    /// Where a tag that does not exist yet has to be placed.
    fn home_of(id: u16) -> Self {
        match id {
            0x829A | 0x829D | 0x8822 | 0x8824 | 0x8827..=0x8832 | 0x9000..=0xA4FF => {
                Directory::Exif
            }
            _ => Directory::Primary,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    directory: Directory,
    tag: MetadataTag,
    /// The entry exactly as it was read, kept until the tag is resized or
    /// retyped. Kept entries are written back verbatim so their offsets
    /// (maker notes, sub-IFD pointers) keep pointing into the original.
    raw: Option<[u8; ENTRY_LEN]>,
    /// Where the value bytes sit in the original block, inline or not.
    value_at: Option<usize>,
}

impl Entry {
    /// Whether `tag` can overwrite this entry's value bytes where they are.
    fn fits_in_place(&self, tag: &MetadataTag) -> bool {
        self.raw.is_some()
            && self.value_at.is_some()
            && self.tag.data_type == tag.data_type
            && self.tag.value.len() == tag.value.len()
    }
}

/// Reads and writes integers in the byte order of a TIFF block.
#[derive(Debug, Clone, Copy)]
struct ByteOrder {
    big_endian: bool,
}

impl ByteOrder {
    fn read_u16(self, data: &[u8], offset: usize) -> u16 {
        let b = [data[offset], data[offset + 1]];
        if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        }
    }

    fn read_u32(self, data: &[u8], offset: usize) -> u32 {
        let b = [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ];
        if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        }
    }

    fn encode_u16(self, val: u16) -> [u8; 2] {
        if self.big_endian {
            val.to_be_bytes()
        } else {
            val.to_le_bytes()
        }
    }

    fn encode_u32(self, val: u32) -> [u8; 4] {
        if self.big_endian {
            val.to_be_bytes()
        } else {
            val.to_le_bytes()
        }
    }
}

/// Size in bytes of one value of a TIFF data format.
fn format_size(data_type: u16) -> Option<usize> {
    match data_type {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 | 13 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// The property list of one EXIF block (IFD0 and the Exif sub-IFD).
///
/// Rewriting never moves the original bytes. A value replaced by one of the
/// same type and size is overwritten where it lies, so repeated edits of the
/// same tag keep the block the same size. Anything else (a new tag, a resized
/// value) appends fresh IFDs after the original and repoints the header.
/// Either way, whatever this type does not model (thumbnail IFD, GPS IFD,
/// maker notes) survives untouched.
#[derive(Debug, Clone)]
pub struct ExifBlock {
    original: Vec<u8>,
    order: ByteOrder,
    entries: Vec<Entry>,
    primary_next: u32,
    exif_next: u32,
    modified: bool,
}

impl ExifBlock {
    /// Parse a TIFF-structured EXIF block (starting at the byte order marker).
    pub fn parse(data: &[u8]) -> Result<Self, ExifError> {
        if data.len() < 8 {
            return Err(ExifError::TooShort(data.len()));
        }

        let order = match &data[0..2] {
            b"MM" => ByteOrder { big_endian: true },
            b"II" => ByteOrder { big_endian: false },
            _ => return Err(ExifError::ByteOrder),
        };

        let magic = order.read_u16(data, 2);
        if magic != 42 {
            return Err(ExifError::Magic(magic));
        }

        let ifd0_offset = order.read_u32(data, 4) as usize;
        let (mut entries, primary_next) =
            read_ifd(data, ifd0_offset, order, Directory::Primary)?;

        let exif_offset = entries
            .iter()
            .find(|e| e.tag.id == TAG_EXIF_IFD_POINTER && e.tag.value.len() == 4)
            .map(|e| order.read_u32(&e.tag.value, 0) as usize);

        let mut exif_next = 0;
        if let Some(offset) = exif_offset {
            let (exif_entries, next) = read_ifd(data, offset, order, Directory::Exif)?;
            entries.extend(exif_entries);
            exif_next = next;
        }

        log::debug!(
            "Parsed EXIF block: {} bytes, {} tags, {}",
            data.len(),
            entries.len(),
            if order.big_endian { "big-endian" } else { "little-endian" }
        );

        Ok(Self {
            original: data.to_vec(),
            order,
            entries,
            primary_next,
            exif_next,
            modified: false,
        })
    }

    pub fn is_big_endian(&self) -> bool {
        self.order.big_endian
    }

    /// All tags, IFD0 first, each directory in file order.
    pub fn tags(&self) -> impl Iterator<Item = &MetadataTag> {
        self.entries.iter().map(|e| &e.tag)
    }

    pub fn get(&self, id: u16) -> Option<&MetadataTag> {
        self.entries.iter().find(|e| e.tag.id == id).map(|e| &e.tag)
    }

    /// The directory a tag currently lives in.
    pub fn directory_of(&self, id: u16) -> Option<Directory> {
        self.entries
            .iter()
            .find(|e| e.tag.id == id)
            .map(|e| e.directory)
    }

    /// Store a tag, replacing the one with the same id or adding it to the
    /// directory it belongs in.
    pub fn set(&mut self, tag: MetadataTag) {
        match self.entries.iter_mut().find(|e| e.tag.id == tag.id) {
            Some(entry) => {
                if entry.fits_in_place(&tag) {
                    // Inline values live in the entry itself.
                    if let Some(raw) = entry.raw.as_mut() {
                        if tag.value.len() <= 4 {
                            raw[8..8 + tag.value.len()].copy_from_slice(&tag.value);
                        }
                    }
                } else {
                    entry.raw = None;
                    entry.value_at = None;
                }
                entry.tag = tag;
            }
            None => self.entries.push(Entry {
                directory: Directory::home_of(tag.id),
                tag,
                raw: None,
                value_at: None,
            }),
        }
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Serialize the block. An unmodified block is returned byte-for-byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ExifError> {
        if !self.modified {
            return Ok(self.original.clone());
        }

        let order = self.order;
        let mut out = self.original.clone();
        for entry in self.entries.iter().filter(|e| e.raw.is_some()) {
            if let Some(at) = entry.value_at {
                out[at..at + entry.tag.value.len()].copy_from_slice(&entry.tag.value);
            }
        }

        if self.entries.iter().all(|e| e.raw.is_some()) {
            log::debug!("Rewrote EXIF block in place ({} bytes)", out.len());
            return Ok(out);
        }

        if out.len() % 2 != 0 {
            out.push(0);
        }

        let exif_entries: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| e.directory == Directory::Exif)
            .cloned()
            .collect();

        let exif_offset = if exif_entries.is_empty() {
            None
        } else {
            Some(write_ifd(&mut out, &exif_entries, self.exif_next, order)?)
        };

        let mut primary: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| e.directory == Directory::Primary)
            .cloned()
            .collect();

        if let Some(offset) = exif_offset {
            let pointer =
                MetadataTag::new(TAG_EXIF_IFD_POINTER, FORMAT_LONG, order.encode_u32(offset).to_vec());
            match primary.iter_mut().find(|e| e.tag.id == TAG_EXIF_IFD_POINTER) {
                Some(entry) => {
                    entry.tag = pointer;
                    entry.raw = None;
                    entry.value_at = None;
                }
                None => primary.push(Entry {
                    directory: Directory::Primary,
                    tag: pointer,
                    raw: None,
                    value_at: None,
                }),
            }
        }

        let primary_offset = write_ifd(&mut out, &primary, self.primary_next, order)?;
        out[4..8].copy_from_slice(&order.encode_u32(primary_offset));

        log::debug!(
            "Rewrote EXIF block: {} -> {} bytes",
            self.original.len(),
            out.len()
        );
        Ok(out)
    }
}

fn read_ifd(
    data: &[u8],
    offset: usize,
    order: ByteOrder,
    directory: Directory,
) -> Result<(Vec<Entry>, u32), ExifError> {
    let ifd = match directory {
        Directory::Primary => "IFD0",
        Directory::Exif => "Exif IFD",
    };
    if offset < 8 || offset + 2 > data.len() {
        return Err(ExifError::OutOfBounds { ifd, offset });
    }

    let count = order.read_u16(data, offset) as usize;
    let start = offset + 2;
    let end = start + count * ENTRY_LEN;
    if end > data.len() {
        return Err(ExifError::OutOfBounds { ifd, offset: end });
    }
    // Some writers drop the trailing next-IFD pointer of the last directory.
    let next = if end + 4 <= data.len() {
        order.read_u32(data, end)
    } else {
        0
    };

    let entries = (0..count)
        .map(|i| {
            let at = start + i * ENTRY_LEN;
            let mut raw = [0u8; ENTRY_LEN];
            raw.copy_from_slice(&data[at..at + ENTRY_LEN]);

            let id = order.read_u16(&raw, 0);
            let data_type = order.read_u16(&raw, 2);
            let count = order.read_u32(&raw, 4) as usize;
            let located = format_size(data_type)
                .and_then(|size| size.checked_mul(count))
                .and_then(|len| {
                    let value_at = if len <= 4 {
                        at + 8
                    } else {
                        order.read_u32(&raw, 8) as usize
                    };
                    data.get(value_at..value_at.checked_add(len)?)
                        .map(|value| (value.to_vec(), value_at))
                });
            let (value, value_at) = match located {
                Some((value, value_at)) => (value, Some(value_at)),
                None => (Vec::new(), None),
            };

            Entry {
                directory,
                tag: MetadataTag::new(id, data_type, value),
                raw: Some(raw),
                value_at,
            }
        })
        .collect();

    Ok((entries, next))
}

/// Append an IFD (sorted by tag id, as TIFF requires) followed by the data of
/// its out-of-line values. Returns the offset of the IFD.
fn write_ifd(
    out: &mut Vec<u8>,
    entries: &[Entry],
    next: u32,
    order: ByteOrder,
) -> Result<u32, ExifError> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.tag.id);

    let start = out.len();
    let table_len = 2 + sorted.len() * ENTRY_LEN + 4;
    let mut data_offset = start + table_len;

    let mut table = Vec::with_capacity(table_len);
    let mut blobs = Vec::new();

    table.extend_from_slice(&order.encode_u16(sorted.len() as u16));
    for entry in sorted {
        if let Some(raw) = entry.raw {
            table.extend_from_slice(&raw);
            continue;
        }

        let tag = &entry.tag;
        let count = match format_size(tag.data_type) {
            Some(size) if tag.value.len() % size != 0 => {
                return Err(ExifError::Misaligned {
                    id: tag.id,
                    data_type: tag.data_type,
                    length: tag.length,
                });
            }
            Some(size) => tag.value.len() / size,
            None => tag.value.len(),
        };

        table.extend_from_slice(&order.encode_u16(tag.id));
        table.extend_from_slice(&order.encode_u16(tag.data_type));
        table.extend_from_slice(&order.encode_u32(to_offset(count)?));

        if tag.value.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..tag.value.len()].copy_from_slice(&tag.value);
            table.extend_from_slice(&inline);
        } else {
            table.extend_from_slice(&order.encode_u32(to_offset(data_offset)?));
            blobs.extend_from_slice(&tag.value);
            if tag.value.len() % 2 != 0 {
                blobs.push(0);
            }
            data_offset = start + table_len + blobs.len();
        }
    }
    table.extend_from_slice(&order.encode_u32(next));

    out.extend_from_slice(&table);
    out.extend_from_slice(&blobs);
    to_offset(start)
}

fn to_offset(value: usize) -> Result<u32, ExifError> {
    u32::try_from(value).map_err(|_| ExifError::TooLarge(u32::MAX as usize))
}
