use std::thread::{self, ThreadId};

use tracing::warn;

use crate::ApplicationError;

/// Remembers which thread created an object so that thread-bound operations can refuse
/// to run anywhere else.
#[derive(Debug, Clone)]
pub struct OwnerThread {
    id: ThreadId,
    name: Option<String>,
}

impl OwnerThread {
    pub fn current() -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().map(str::to_string),
        }
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    pub fn ensure_current(&self, operation: &'static str) -> Result<(), ApplicationError> {
        if self.is_current() {
            return Ok(());
        }
        warn!(
            operation,
            owner = self.name.as_deref().unwrap_or("<unnamed>"),
            "thread-bound operation called from another thread"
        );
        Err(ApplicationError::OffOwnerThread { operation })
    }
}
