//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use photoflow_domain::{Bitmap, HashedImage, ImageHash, ImageId, ImageMetadata};

use crate::{ApplicationError, ImageDecoder, ImageStore, StoreSnapshot};

#[derive(Debug, Clone)]
pub struct FakeImage {
    hash: ImageHash,
    data: Option<Vec<u8>>,
    thumbnail: Option<Vec<u8>>,
}

impl FakeImage {
    pub fn new(hash: u64) -> Self {
        Self {
            hash: ImageHash::new(hash),
            data: None,
            thumbnail: None,
        }
    }

    pub fn with_data(mut self, bytes: &[u8]) -> Self {
        self.data = Some(bytes.to_vec());
        self
    }

    pub fn with_thumbnail(mut self, bytes: &[u8]) -> Self {
        self.thumbnail = Some(bytes.to_vec());
        self
    }
}

#[derive(Default)]
pub struct FakeStore {
    images: Mutex<Vec<(i64, FakeImage)>>,
    snapshots: AtomicUsize,
    fail_snapshots: AtomicBool,
    panic_snapshots: AtomicBool,
    snapshot_delay: Mutex<Option<Duration>>,
}

impl FakeStore {
    pub fn insert(&self, id: i64, image: FakeImage) {
        self.images.lock().expect("lock").push((id, image));
    }

    pub fn snapshots_opened(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn fail_snapshots(&self) {
        self.fail_snapshots.store(true, Ordering::SeqCst);
    }

    pub fn panic_snapshots(&self) {
        self.panic_snapshots.store(true, Ordering::SeqCst);
    }

    pub fn delay_snapshots(&self, delay: Duration) {
        *self.snapshot_delay.lock().expect("lock") = Some(delay);
    }
}

fn hashed(id: i64, image: &FakeImage) -> HashedImage {
    HashedImage {
        id: ImageId::new(id).expect("positive id"),
        hash: image.hash,
    }
}

impl ImageStore for FakeStore {
    fn enumerate(&self) -> Result<Vec<HashedImage>, ApplicationError> {
        Ok(self
            .images
            .lock()
            .expect("lock")
            .iter()
            .map(|(id, image)| hashed(*id, image))
            .collect())
    }

    fn find_image(&self, image_id: ImageId) -> Result<Option<HashedImage>, ApplicationError> {
        Ok(self
            .images
            .lock()
            .expect("lock")
            .iter()
            .find(|(id, _)| *id == image_id.get())
            .map(|(id, image)| hashed(*id, image)))
    }

    fn snapshot(&self) -> Result<Box<dyn StoreSnapshot>, ApplicationError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = *self.snapshot_delay.lock().expect("lock") {
            thread::sleep(delay);
        }
        if self.panic_snapshots.load(Ordering::SeqCst) {
            panic!("snapshot connection vanished");
        }
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(ApplicationError::Persistence("database is locked".to_string()));
        }
        let images = self
            .images
            .lock()
            .expect("lock")
            .iter()
            .cloned()
            .collect::<HashMap<_, _>>();
        Ok(Box::new(FakeSnapshot { images }))
    }
}

struct FakeSnapshot {
    images: HashMap<i64, FakeImage>,
}

impl StoreSnapshot for FakeSnapshot {
    fn resolve(&mut self, image_id: ImageId) -> Result<Option<HashedImage>, ApplicationError> {
        Ok(self
            .images
            .get(&image_id.get())
            .map(|image| hashed(image_id.get(), image)))
    }

    fn full_payload(&mut self, image: &HashedImage) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(self
            .images
            .get(&image.id.get())
            .and_then(|found| found.data.clone()))
    }

    fn thumbnail_payload(
        &mut self,
        image: &HashedImage,
    ) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(self
            .images
            .get(&image.id.get())
            .and_then(|found| found.thumbnail.clone()))
    }
}

/// Accepts payloads starting with `IMG`; the payload length becomes the width.
#[derive(Default)]
pub struct FakeDecoder {
    decode_threads: Mutex<Vec<Option<String>>>,
}

impl FakeDecoder {
    pub fn decode_threads(&self) -> Vec<Option<String>> {
        self.decode_threads.lock().expect("lock").clone()
    }

    fn check(&self, bytes: &[u8]) -> Result<u32, ApplicationError> {
        self.decode_threads
            .lock()
            .expect("lock")
            .push(thread::current().name().map(str::to_string));
        if !bytes.starts_with(b"IMG") {
            return Err(ApplicationError::Decode("unrecognized image header".to_string()));
        }
        Ok(bytes.len() as u32)
    }
}

impl ImageDecoder for FakeDecoder {
    fn decode_bitmap(&self, bytes: &[u8]) -> Result<Bitmap, ApplicationError> {
        let width = self.check(bytes)?;
        Ok(Bitmap {
            width,
            height: 1,
            pixels: vec![0; width as usize * 4],
        })
    }

    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageMetadata, ApplicationError> {
        let width = self.check(bytes)?;
        Ok(ImageMetadata {
            width,
            height: 1,
            format: Some("Fake".to_string()),
            color_type: "Rgba8".to_string(),
            has_alpha: true,
        })
    }
}
