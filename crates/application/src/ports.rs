use photoflow_domain::{Bitmap, HashedImage, ImageId, ImageMetadata};

use crate::ApplicationError;

/// The persistent catalog of images and their payloads.
pub trait ImageStore: Send + Sync {
    /// All images in catalog order.
    fn enumerate(&self) -> Result<Vec<HashedImage>, ApplicationError>;

    fn find_image(&self, image_id: ImageId) -> Result<Option<HashedImage>, ApplicationError>;

    /// Opens an isolated read view rooted at the store's current state.
    fn snapshot(&self) -> Result<Box<dyn StoreSnapshot>, ApplicationError>;
}

/// A private read view owned by exactly one fetch.
pub trait StoreSnapshot: Send {
    fn resolve(&mut self, image_id: ImageId) -> Result<Option<HashedImage>, ApplicationError>;

    fn full_payload(&mut self, image: &HashedImage) -> Result<Option<Vec<u8>>, ApplicationError>;

    fn thumbnail_payload(
        &mut self,
        image: &HashedImage,
    ) -> Result<Option<Vec<u8>>, ApplicationError>;
}

pub trait ImageDecoder: Send + Sync {
    fn decode_bitmap(&self, bytes: &[u8]) -> Result<Bitmap, ApplicationError>;

    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageMetadata, ApplicationError>;
}
