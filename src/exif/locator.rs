use crate::codec::Photo;
use crate::error::TagSynthesisError;

use super::date::ENCODED_LEN;
use super::ifd::{FORMAT_ASCII, MetadataTag, TAG_DATE_TIME_ORIGINAL, TAG_ORIENTATION};

/// The DateTimeOriginal tag found on (or made up for) an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedTag {
    /// The image already carries tag 36867; its bytes are untouched.
    Existing(MetadataTag),
    /// The image had no tag 36867; this one was cloned from a template.
    Synthesized(MetadataTag),
}

impl LocatedTag {
    pub fn tag(&self) -> &MetadataTag {
        match self {
            LocatedTag::Existing(tag) | LocatedTag::Synthesized(tag) => tag,
        }
    }

    pub fn into_tag(self) -> MetadataTag {
        match self {
            LocatedTag::Existing(tag) | LocatedTag::Synthesized(tag) => tag,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, LocatedTag::Synthesized(_))
    }
}

/// Get the DateTimeOriginal tag of `photo`, synthesizing one when absent.
///
/// Synthesis clones Orientation (274) if the image has it, otherwise the first
/// property on the image. An image with no properties at all cannot get a
/// date tag.
pub fn locate(photo: &Photo) -> Result<LocatedTag, TagSynthesisError> {
    if let Some(tag) = photo.try_get(TAG_DATE_TIME_ORIGINAL) {
        return Ok(LocatedTag::Existing(tag.clone()));
    }

    let template = photo
        .try_get(TAG_ORIENTATION)
        .or_else(|| photo.property_items().next())
        .ok_or(TagSynthesisError::NoTemplateAvailable)?;

    log::debug!(
        "No DateTimeOriginal tag; synthesizing from template tag {}",
        template.id()
    );
    Ok(LocatedTag::Synthesized(synthesize_from(template)))
}

/// Relabel a copy of an existing tag as an empty DateTimeOriginal slot.
///
/// Metadata writers generally cannot mint a property from nothing, only
/// repurpose one they already hold; cloning keeps that contract. The value is
/// 20 NUL bytes until the caller stores the encoded date.
pub fn synthesize_from(template: &MetadataTag) -> MetadataTag {
    let mut tag = template.clone();
    tag.set_id(TAG_DATE_TIME_ORIGINAL);
    tag.set_data_type(FORMAT_ASCII);
    tag.set_value(vec![0; ENCODED_LEN]);
    tag
}
