mod confinement;
mod error;
#[cfg(test)]
mod fakes;
mod lane;
mod manager;
mod pipeline;
mod ports;
mod use_cases;

pub use confinement::OwnerThread;
pub use error::{ApplicationError, ErrorKind, FetchError};
pub use lane::{DecodeLane, DEFAULT_LANE_NAME};
pub use manager::{ImageManager, ManagerConfig};
pub use pipeline::FetchPipeline;
pub use ports::{ImageDecoder, ImageStore, StoreSnapshot};
pub use use_cases::{
    FetchDataCommand, FetchImageCommand, FetchMetadataCommand, FetchMetricsQuery,
    FindImageCommand, ListImagesCommand,
};
