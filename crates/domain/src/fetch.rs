use crate::{ImageId, ImageVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub image_id: ImageId,
    pub variant: ImageVariant,
}

impl FetchRequest {
    pub fn full(image_id: ImageId) -> Self {
        Self {
            image_id,
            variant: ImageVariant::Full,
        }
    }

    pub fn thumbnail(image_id: ImageId) -> Self {
        Self {
            image_id,
            variant: ImageVariant::Thumbnail,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchMetrics {
    pub issued: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl FetchMetrics {
    /// Fetches issued but not yet delivered.
    pub fn in_flight(&self) -> u64 {
        self.issued.saturating_sub(self.succeeded + self.failed)
    }

    pub fn delivered(&self) -> u64 {
        self.succeeded + self.failed
    }
}
