use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{error, info};

use crate::ApplicationError;

pub const DEFAULT_LANE_NAME: &str = "photoflow-decode";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single background thread that runs submitted jobs one at a time, in submission order.
///
/// Closing the lane stops accepting work and lets the thread finish everything already
/// queued. Dropping the lane closes it and joins the thread.
pub struct DecodeLane {
    name: String,
    worker_id: ThreadId,
    submit_tx: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Option<JoinHandle<()>>,
}

impl DecodeLane {
    pub fn spawn(name: impl Into<String>) -> Result<Self, ApplicationError> {
        let name = name.into();
        let (submit_tx, submit_rx) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(submit_rx))
            .map_err(|error| {
                ApplicationError::Io(format!("failed to spawn decode lane: {error}"))
            })?;
        info!(lane = %name, "decode lane started");

        Ok(Self {
            name,
            worker_id: worker.thread().id(),
            submit_tx: Mutex::new(Some(submit_tx)),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when called from inside a job running on this lane.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    pub fn is_closed(&self) -> bool {
        self.submit_tx
            .lock()
            .map(|sender| sender.is_none())
            .unwrap_or(true)
    }

    /// Stops accepting jobs. Jobs already queued still run.
    pub fn close(&self) {
        if let Ok(mut sender) = self.submit_tx.lock() {
            if sender.take().is_some() {
                info!(lane = %self.name, "decode lane closed");
            }
        }
    }

    pub fn submit<F>(&self, job: F) -> Result<(), ApplicationError>
    where
        F: FnOnce() + Send + 'static,
    {
        let closed = || ApplicationError::LaneClosed(self.name.clone());
        let sender = self.submit_tx.lock().map_err(|_| closed())?;
        let sender = sender.as_ref().ok_or_else(closed)?;
        sender.send(Box::new(job)).map_err(|_| closed())
    }
}

impl Drop for DecodeLane {
    fn drop(&mut self) {
        match self.submit_tx.get_mut() {
            Ok(sender) => drop(sender.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
        if let Some(worker) = self.worker.take() {
            if thread::current().id() == self.worker_id {
                return;
            }
            if worker.join().is_err() {
                error!(lane = %self.name, "decode lane thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for DecodeLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeLane")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn run_worker(submit_rx: mpsc::Receiver<Job>) {
    while let Ok(job) = submit_rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("decode lane job panicked");
        }
    }
    info!("decode lane drained and stopped");
}
