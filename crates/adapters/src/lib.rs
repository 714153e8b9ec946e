pub mod migrations;
pub mod presenters;
pub mod sqlite;
pub mod thumbs;

pub use presenters::{present_bitmap, present_entry, present_metadata, present_payload};
pub use sqlite::{NewImage, SqliteImageStore};
pub use thumbs::thumbnail_jpeg;

use std::io::Cursor;

use image::io::Reader as ImageReader;
use photoflow_application::{ApplicationError, ImageDecoder};
use photoflow_domain::{Bitmap, ImageMetadata};

#[derive(Debug, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode_bitmap(&self, bytes: &[u8]) -> Result<Bitmap, ApplicationError> {
        let image = image::load_from_memory(bytes)
            .map_err(|error| ApplicationError::Decode(error.to_string()))?;
        let rgba = image.to_rgba8();
        Ok(Bitmap {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }

    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageMetadata, ApplicationError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|error| ApplicationError::Decode(error.to_string()))?;
        let format = reader.format();
        let image = reader
            .decode()
            .map_err(|error| ApplicationError::Decode(error.to_string()))?;
        let color = image.color();

        Ok(ImageMetadata {
            width: image.width(),
            height: image.height(),
            format: format.map(|format| format!("{format:?}")),
            color_type: format!("{color:?}"),
            has_alpha: color.has_alpha(),
        })
    }
}
