use photoflow_domain::{ImageId, ImageVariant};

#[derive(Debug, Clone, Default)]
pub struct ListImagesCommand;

#[derive(Debug, Clone, Copy)]
pub struct FindImageCommand {
    pub image_id: ImageId,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchDataCommand {
    pub image_id: ImageId,
    pub variant: ImageVariant,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchMetadataCommand {
    pub image_id: ImageId,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchImageCommand {
    pub image_id: ImageId,
    pub variant: ImageVariant,
}

#[derive(Debug, Clone, Default)]
pub struct FetchMetricsQuery;
