use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use photoflow_domain::{
    Bitmap, FetchMetrics, FetchRequest, HashedImage, ImageId, ImageMetadata, ListBuilder,
    ListEntry, TrailingGroup,
};
use tracing::debug;

use crate::{
    ApplicationError, DecodeLane, FetchDataCommand, FetchError, FetchImageCommand,
    FetchMetadataCommand, FetchMetricsQuery, FetchPipeline, FindImageCommand, ImageDecoder,
    ImageStore, ListImagesCommand, OwnerThread, DEFAULT_LANE_NAME,
};

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub lane_name: String,
    pub fetch_timeout: Option<Duration>,
    pub trailing_group: TrailingGroup,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            lane_name: DEFAULT_LANE_NAME.to_string(),
            fetch_timeout: None,
            trailing_group: TrailingGroup::Flush,
        }
    }
}

/// Entry point for browsing and loading catalog images.
///
/// `image_list` and `find_image` are bound to the thread that built the manager.
/// The `fetch_*` operations can be called from anywhere and return futures that
/// resolve after the decode lane has processed the payload.
pub struct ImageManager {
    store: Arc<dyn ImageStore>,
    decoder: Arc<dyn ImageDecoder>,
    pipeline: FetchPipeline,
    builder: ListBuilder,
    owner: OwnerThread,
}

impl ImageManager {
    pub fn new(
        store: Arc<dyn ImageStore>,
        decoder: Arc<dyn ImageDecoder>,
        config: ManagerConfig,
    ) -> Result<Self, ApplicationError> {
        let lane = Arc::new(DecodeLane::spawn(config.lane_name)?);
        let pipeline = FetchPipeline::new(Arc::clone(&store), lane, config.fetch_timeout);
        Ok(Self {
            store,
            decoder,
            pipeline,
            builder: ListBuilder::new(config.trailing_group),
            owner: OwnerThread::current(),
        })
    }

    pub fn image_list(
        &self,
        _command: ListImagesCommand,
    ) -> Result<Vec<ListEntry>, ApplicationError> {
        self.owner.ensure_current("image_list")?;
        let images = self.store.enumerate()?;
        let image_count = images.len();
        let entries = self
            .builder
            .build(images.into_iter().map(|image| (image.id, image.hash)));
        debug!(images = image_count, entries = entries.len(), "built image list");
        Ok(entries)
    }

    pub fn find_image(&self, command: FindImageCommand) -> Result<HashedImage, ApplicationError> {
        self.owner.ensure_current("find_image")?;
        self.store.find_image(command.image_id)?.ok_or_else(|| {
            ApplicationError::NotFound(format!("image not found for id={}", command.image_id))
        })
    }

    pub fn fetch_data(
        &self,
        command: FetchDataCommand,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send + 'static {
        self.pipeline.fetch(FetchRequest {
            image_id: command.image_id,
            variant: command.variant,
        })
    }

    /// Metadata is always read from the full payload.
    pub fn fetch_metadata(
        &self,
        command: FetchMetadataCommand,
    ) -> impl Future<Output = Result<ImageMetadata, FetchError>> + Send + 'static {
        let decoder = Arc::clone(&self.decoder);
        let image_id = command.image_id;
        self.pipeline
            .fetch_with(FetchRequest::full(image_id), move |bytes| {
                decoder
                    .decode_metadata(&bytes)
                    .map_err(|error| decode_failed(image_id, error))
            })
    }

    pub fn fetch_image(
        &self,
        command: FetchImageCommand,
    ) -> impl Future<Output = Result<Bitmap, FetchError>> + Send + 'static {
        let decoder = Arc::clone(&self.decoder);
        let image_id = command.image_id;
        let request = FetchRequest {
            image_id,
            variant: command.variant,
        };
        self.pipeline.fetch_with(request, move |bytes| {
            decoder
                .decode_bitmap(&bytes)
                .map_err(|error| decode_failed(image_id, error))
        })
    }

    pub fn metrics(&self, _query: FetchMetricsQuery) -> Result<FetchMetrics, ApplicationError> {
        self.pipeline.metrics()
    }

    /// Closes the decode lane. Fetches already handed to the lane still complete; later
    /// fetches fail with [`FetchError::LaneClosed`].
    pub fn shutdown(&self) {
        self.pipeline.lane().close();
    }
}

fn decode_failed(id: ImageId, error: ApplicationError) -> FetchError {
    FetchError::DecodeFailed {
        id,
        reason: error.to_string(),
    }
}
