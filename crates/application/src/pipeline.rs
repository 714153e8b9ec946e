use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use photoflow_domain::{FetchMetrics, FetchRequest, ImageVariant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{ApplicationError, DecodeLane, FetchError, ImageStore};

#[derive(Default)]
struct MetricsState {
    issued: u64,
    succeeded: u64,
    failed: u64,
}

impl MetricsState {
    fn snapshot(&self) -> FetchMetrics {
        FetchMetrics {
            issued: self.issued,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

/// Settles one fetch in the metrics. Only the first report counts, so a fetch that timed
/// out is not counted again when its lane job finishes later.
struct Outcome {
    request: FetchRequest,
    metrics: Arc<Mutex<MetricsState>>,
    recorded: AtomicBool,
}

impl Outcome {
    fn new(request: FetchRequest, metrics: Arc<Mutex<MetricsState>>) -> Self {
        Self {
            request,
            metrics,
            recorded: AtomicBool::new(false),
        }
    }

    /// Returns false when the fetch was already settled.
    fn record(&self, error: Option<&FetchError>) -> bool {
        if self.recorded.swap(true, Ordering::AcqRel) {
            return false;
        }
        record_outcome(&self.metrics, self.request, error);
        true
    }
}

/// Reads image payloads off the store and hands them to the decode lane.
///
/// Every fetch reads through its own store snapshot on a blocking task, so concurrent
/// fetches never share store state. Whatever the read produced is then passed to the
/// lane, which runs the caller's transform and delivers exactly one result.
pub struct FetchPipeline {
    store: Arc<dyn ImageStore>,
    lane: Arc<DecodeLane>,
    metrics: Arc<Mutex<MetricsState>>,
    fetch_timeout: Option<Duration>,
}

impl FetchPipeline {
    pub fn new(
        store: Arc<dyn ImageStore>,
        lane: Arc<DecodeLane>,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            lane,
            metrics: Arc::new(Mutex::new(MetricsState::default())),
            fetch_timeout,
        }
    }

    pub fn lane(&self) -> &DecodeLane {
        &self.lane
    }

    /// Raw payload bytes for `request`.
    pub fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send + 'static {
        self.fetch_with(request, Ok)
    }

    /// Fetches the payload and applies `transform` to it on the decode lane.
    ///
    /// Nothing happens until the returned future is first polled, which must be inside a
    /// tokio runtime. Once started the fetch always runs to completion; dropping the future
    /// only discards its result.
    pub fn fetch_with<T, F>(
        &self,
        request: FetchRequest,
        transform: F,
    ) -> impl Future<Output = Result<T, FetchError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce(Vec<u8>) -> Result<T, FetchError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let lane = Arc::clone(&self.lane);
        let metrics = Arc::clone(&self.metrics);
        let fetch_timeout = self.fetch_timeout;

        async move {
            let (result_tx, mut result_rx) = oneshot::channel();
            record_issued(&metrics);
            debug!(image_id = %request.image_id, variant = %request.variant, "fetch issued");
            let outcome = Arc::new(Outcome::new(request, metrics));

            let lane_outcome = Arc::clone(&outcome);
            tokio::task::spawn_blocking(move || {
                let read = panic::catch_unwind(AssertUnwindSafe(|| {
                    read_payload(store.as_ref(), request)
                }))
                .unwrap_or_else(|_| Err(FetchError::Store("store panicked".to_string())));
                let job_outcome = Arc::clone(&lane_outcome);
                let submitted = lane.submit(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| read.and_then(transform)))
                        .unwrap_or_else(|_| {
                            Err(FetchError::DecodeFailed {
                                id: request.image_id,
                                reason: "decoder panicked".to_string(),
                            })
                        });
                    job_outcome.record(result.as_ref().err());
                    let _ = result_tx.send(result);
                });
                if let Err(error) = submitted {
                    warn!(image_id = %request.image_id, %error, "decode lane rejected fetch");
                    lane_outcome.record(Some(&FetchError::LaneClosed));
                }
            });

            let received = match fetch_timeout {
                Some(limit) => match tokio::time::timeout(limit, &mut result_rx).await {
                    Ok(received) => received,
                    Err(_) => {
                        let timed_out = FetchError::TimedOut(limit);
                        if outcome.record(Some(&timed_out)) {
                            return Err(timed_out);
                        }
                        // The lane settled this fetch just as the timer fired.
                        result_rx.await
                    }
                },
                None => result_rx.await,
            };
            received.unwrap_or_else(|_| {
                outcome.record(Some(&FetchError::LaneClosed));
                Err(FetchError::LaneClosed)
            })
        }
    }

    pub fn metrics(&self) -> Result<FetchMetrics, ApplicationError> {
        let metrics = self
            .metrics
            .lock()
            .map_err(|_| ApplicationError::Io("fetch metrics lock poisoned".to_string()))?;
        Ok(metrics.snapshot())
    }
}

fn read_payload(store: &dyn ImageStore, request: FetchRequest) -> Result<Vec<u8>, FetchError> {
    let mut snapshot = store.snapshot().map_err(store_error)?;
    let image = snapshot
        .resolve(request.image_id)
        .map_err(store_error)?
        .ok_or(FetchError::ImageNotFound(request.image_id))?;

    let payload = match request.variant {
        ImageVariant::Full => snapshot.full_payload(&image),
        ImageVariant::Thumbnail => snapshot.thumbnail_payload(&image),
    }
    .map_err(store_error)?;

    payload.ok_or(FetchError::PayloadMissing {
        id: request.image_id,
        variant: request.variant,
    })
}

fn store_error(error: ApplicationError) -> FetchError {
    FetchError::Store(error.to_string())
}

fn record_issued(metrics: &Mutex<MetricsState>) {
    if let Ok(mut m) = metrics.lock() {
        m.issued += 1;
    }
}

fn record_outcome(
    metrics: &Mutex<MetricsState>,
    request: FetchRequest,
    error: Option<&FetchError>,
) {
    if let Ok(mut m) = metrics.lock() {
        match error {
            None => m.succeeded += 1,
            Some(_) => m.failed += 1,
        }
    }
    match error {
        None => debug!(image_id = %request.image_id, variant = %request.variant, "fetch delivered"),
        Some(error) => {
            warn!(image_id = %request.image_id, variant = %request.variant, %error, "fetch failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use photoflow_domain::ImageId;

    use crate::fakes::{FakeImage, FakeStore};
    use crate::ErrorKind;

    fn id(value: i64) -> ImageId {
        ImageId::new(value).expect("id")
    }

    fn pipeline_over(
        store: FakeStore,
        fetch_timeout: Option<Duration>,
    ) -> (Arc<FakeStore>, FetchPipeline) {
        let store = Arc::new(store);
        let lane = Arc::new(DecodeLane::spawn("test-lane").expect("lane"));
        let pipeline = FetchPipeline::new(store.clone(), lane, fetch_timeout);
        (store, pipeline)
    }

    fn sample_store() -> FakeStore {
        let store = FakeStore::default();
        store.insert(
            1,
            FakeImage::new(0x00)
                .with_data(b"full-1")
                .with_thumbnail(b"thumb-1"),
        );
        store.insert(2, FakeImage::new(0x01).with_data(b"full-2"));
        store
    }

    #[tokio::test]
    async fn fetch_returns_the_selected_payload() {
        let (_, pipeline) = pipeline_over(sample_store(), None);

        let full = pipeline.fetch(FetchRequest::full(id(1))).await.expect("full");
        let thumb = pipeline
            .fetch(FetchRequest::thumbnail(id(1)))
            .await
            .expect("thumbnail");

        assert_eq!(full, b"full-1");
        assert_eq!(thumb, b"thumb-1");
    }

    #[tokio::test]
    async fn missing_image_reports_image_not_found() {
        let (_, pipeline) = pipeline_over(sample_store(), None);

        let error = pipeline
            .fetch(FetchRequest::thumbnail(id(99)))
            .await
            .expect_err("missing image");

        assert_eq!(error, FetchError::ImageNotFound(id(99)));
        assert_eq!(error.kind(), ErrorKind::ImageNotFound);
    }

    #[tokio::test]
    async fn missing_payload_reports_unable_to_read() {
        let (_, pipeline) = pipeline_over(sample_store(), None);

        let error = pipeline
            .fetch(FetchRequest::thumbnail(id(2)))
            .await
            .expect_err("no thumbnail stored");

        assert_eq!(
            error,
            FetchError::PayloadMissing {
                id: id(2),
                variant: ImageVariant::Thumbnail,
            }
        );
        assert_eq!(error.kind(), ErrorKind::UnableToReadImage);
    }

    #[tokio::test]
    async fn store_failures_are_delivered_as_errors() {
        let store = sample_store();
        store.fail_snapshots();
        let (_, pipeline) = pipeline_over(store, None);

        let error = pipeline
            .fetch(FetchRequest::full(id(1)))
            .await
            .expect_err("snapshot fails");

        assert!(matches!(error, FetchError::Store(_)));
        assert_eq!(error.kind(), ErrorKind::UnableToReadImage);
    }

    #[tokio::test]
    async fn every_fetch_reads_through_its_own_snapshot() {
        let (store, pipeline) = pipeline_over(sample_store(), None);

        for _ in 0..3 {
            pipeline.fetch(FetchRequest::full(id(1))).await.expect("fetch");
        }

        assert_eq!(store.snapshots_opened(), 3);
    }

    #[tokio::test]
    async fn fetch_is_lazy_until_polled() {
        let (store, pipeline) = pipeline_over(sample_store(), None);

        let pending = pipeline.fetch(FetchRequest::full(id(1)));
        assert_eq!(store.snapshots_opened(), 0);
        assert_eq!(pipeline.metrics().expect("metrics").issued, 0);

        pending.await.expect("fetch");
        assert_eq!(store.snapshots_opened(), 1);
    }

    #[tokio::test]
    async fn transform_runs_on_the_decode_lane() {
        let (_, pipeline) = pipeline_over(sample_store(), None);

        let thread_name = pipeline
            .fetch_with(FetchRequest::full(id(1)), |_bytes| {
                Ok(thread::current().name().map(str::to_string))
            })
            .await
            .expect("fetch");

        assert_eq!(thread_name.as_deref(), Some("test-lane"));
    }

    #[tokio::test]
    async fn panicking_transform_fails_only_its_own_fetch() {
        let (_, pipeline) = pipeline_over(sample_store(), None);

        let error = pipeline
            .fetch_with(FetchRequest::full(id(1)), |_bytes| -> Result<(), FetchError> {
                panic!("corrupt decoder state")
            })
            .await
            .expect_err("panic becomes an error");
        assert!(matches!(error, FetchError::DecodeFailed { .. }));

        let bytes = pipeline
            .fetch(FetchRequest::full(id(2)))
            .await
            .expect("lane still alive");
        assert_eq!(bytes, b"full-2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fetches_are_isolated_and_delivered_once() {
        let store = FakeStore::default();
        for value in 1..=8 {
            let payload = format!("payload-{value}");
            store.insert(value, FakeImage::new(0).with_data(payload.as_bytes()));
        }
        let (_, pipeline) = pipeline_over(store, None);

        let mut requests: Vec<FetchRequest> =
            (1..=8).map(|value| FetchRequest::full(id(value))).collect();
        requests.insert(4, FetchRequest::full(id(404)));

        let handles: Vec<_> = requests
            .iter()
            .map(|request| tokio::spawn(pipeline.fetch(*request)))
            .collect();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.expect("fetch task"));
        }

        for (request, result) in requests.iter().zip(results) {
            if request.image_id == id(404) {
                assert_eq!(result, Err(FetchError::ImageNotFound(id(404))));
            } else {
                let expected = format!("payload-{}", request.image_id.get());
                assert_eq!(result.expect("valid fetch"), expected.into_bytes());
            }
        }

        let metrics = pipeline.metrics().expect("metrics");
        assert_eq!(metrics.issued, 9);
        assert_eq!(metrics.succeeded, 8);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn transforms_never_overlap() {
        let store = FakeStore::default();
        for value in 1..=6 {
            store.insert(value, FakeImage::new(0).with_data(b"bytes"));
        }
        let (_, pipeline) = pipeline_over(store, None);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (1..=6)
            .map(|value| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(pipeline.fetch_with(FetchRequest::full(id(value)), move |bytes| {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(15));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(bytes.len())
                }))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.expect("fetch task"), Ok(5));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_store_hits_the_fetch_timeout() {
        let store = sample_store();
        store.delay_snapshots(Duration::from_millis(200));
        let (_, pipeline) = pipeline_over(store, Some(Duration::from_millis(20)));

        let error = pipeline
            .fetch(FetchRequest::full(id(1)))
            .await
            .expect_err("timeout");

        assert_eq!(error, FetchError::TimedOut(Duration::from_millis(20)));
        assert_eq!(error.kind(), ErrorKind::UnableToReadImage);

        // Let the store read finish and the lane run the late job.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let metrics = pipeline.metrics().expect("metrics");
        assert_eq!(metrics.issued, 1);
        assert_eq!(metrics.succeeded, 0);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.in_flight(), 0);
    }

    #[tokio::test]
    async fn panicking_store_fails_the_fetch_and_settles_metrics() {
        let store = sample_store();
        store.panic_snapshots();
        let (_, pipeline) = pipeline_over(store, None);

        let error = pipeline
            .fetch(FetchRequest::full(id(1)))
            .await
            .expect_err("store panicked");

        assert_eq!(error, FetchError::Store("store panicked".to_string()));
        assert_eq!(error.kind(), ErrorKind::UnableToReadImage);
        let metrics = pipeline.metrics().expect("metrics");
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.in_flight(), 0);
    }

    #[tokio::test]
    async fn closed_lane_fails_new_fetches() {
        let (_, pipeline) = pipeline_over(sample_store(), None);
        pipeline.lane().close();

        let error = pipeline
            .fetch(FetchRequest::full(id(1)))
            .await
            .expect_err("lane closed");

        assert_eq!(error, FetchError::LaneClosed);
        assert_eq!(error.kind(), ErrorKind::UnableToReadImage);
        let metrics = pipeline.metrics().expect("metrics");
        assert_eq!(metrics.issued, 1);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.in_flight(), 0);
    }
}
