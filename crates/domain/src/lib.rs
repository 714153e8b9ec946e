mod error;
mod fetch;
mod hash;
mod image;
mod list;

pub use error::DomainError;
pub use fetch::{FetchMetrics, FetchRequest};
pub use hash::{ImageHash, PerceptualHash};
pub use image::{Bitmap, HashedImage, ImageId, ImageMetadata, ImageVariant};
pub use list::{build_list, ListBuilder, ListEntry, TrailingGroup};
