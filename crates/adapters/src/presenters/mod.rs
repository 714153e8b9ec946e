use photoflow_domain::{Bitmap, ImageId, ImageMetadata, ImageVariant, ListEntry};

pub fn present_entry(entry: &ListEntry) -> String {
    match entry {
        ListEntry::Single(image_id) => format!("image\t{image_id}"),
        ListEntry::Group(_) => {
            let ids = entry
                .ids()
                .iter()
                .map(ImageId::to_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("group\t{ids}")
        }
    }
}

pub fn present_payload(image_id: ImageId, variant: ImageVariant, byte_len: usize) -> String {
    format!("image {image_id} {variant} payload: {byte_len} bytes")
}

pub fn present_metadata(image_id: ImageId, metadata: &ImageMetadata) -> String {
    format!(
        "image {} metadata format={} color={} alpha={} {}x{}",
        image_id,
        metadata.format.as_deref().unwrap_or("unknown"),
        metadata.color_type,
        metadata.has_alpha,
        metadata.width,
        metadata.height
    )
}

pub fn present_bitmap(image_id: ImageId, variant: ImageVariant, bitmap: &Bitmap) -> String {
    format!(
        "decoded image {} ({}, {}x{}, {} bytes)",
        image_id,
        variant,
        bitmap.width,
        bitmap.height,
        bitmap.byte_len()
    )
}
