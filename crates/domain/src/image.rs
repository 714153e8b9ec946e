use serde::{Deserialize, Serialize};

use crate::{DomainError, ImageHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ImageId(i64);

impl ImageId {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::InvalidImageId(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for ImageId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ImageId> for i64 {
    fn from(value: ImageId) -> Self {
        value.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which stored payload a fetch reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
    #[default]
    Full,
    Thumbnail,
}

impl ImageVariant {
    pub fn from_thumbnail_flag(thumbnail: bool) -> Self {
        if thumbnail {
            Self::Thumbnail
        } else {
            Self::Full
        }
    }

    pub fn is_thumbnail(self) -> bool {
        matches!(self, Self::Thumbnail)
    }
}

impl std::fmt::Display for ImageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Thumbnail => f.write_str("thumbnail"),
        }
    }
}

/// A stored image as seen by the list builder: its identity and precomputed fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedImage {
    pub id: ImageId,
    pub hash: ImageHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
    pub color_type: String,
    pub has_alpha: bool,
}

/// Decoded pixels, tightly packed RGBA8 rows.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
