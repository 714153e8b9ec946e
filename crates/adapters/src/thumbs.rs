use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};
use photoflow_application::ApplicationError;

pub const THUMBNAIL_SIZE: u32 = 256;
const THUMBNAIL_QUALITY: u8 = 85;

/// Encodes a JPEG thumbnail that fits inside a `THUMBNAIL_SIZE` square. Smaller images
/// keep their size.
pub fn thumbnail_jpeg(source: &[u8]) -> Result<Vec<u8>, ApplicationError> {
    let image = image::load_from_memory(source)
        .map_err(|error| ApplicationError::Decode(error.to_string()))?;
    let fitted = if image.width() <= THUMBNAIL_SIZE && image.height() <= THUMBNAIL_SIZE {
        image
    } else {
        image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
    };
    let thumb = DynamicImage::ImageRgb8(fitted.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    thumb
        .write_to(&mut out, ImageOutputFormat::Jpeg(THUMBNAIL_QUALITY))
        .map_err(|error| ApplicationError::Io(error.to_string()))?;
    Ok(out.into_inner())
}
