//! In-memory [`EventTransport`] recording accepted payloads.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sync_core::{EventTransport, OutboundEvent, SyncError};

#[derive(Default)]
struct Inner {
    accepted: Vec<Vec<u8>>,
    reject_next: usize,
    shutdowns: usize,
}

/// Transport that accepts every payload into a shared buffer. Clones
/// share state. `reject_next(n)` injects per-submission rejections.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    pub fn new() -> MemoryTransport {
        MemoryTransport::default()
    }

    pub fn reject_next(&self, n: usize) {
        self.inner.lock().unwrap().reject_next = n;
    }

    pub fn accepted_count(&self) -> usize {
        self.inner.lock().unwrap().accepted.len()
    }

    pub fn shutdown_count(&self) -> usize {
        self.inner.lock().unwrap().shutdowns
    }

    /// Decode every accepted payload as the canonical wire format.
    pub fn accepted_events(&self) -> Vec<OutboundEvent> {
        self.inner
            .lock()
            .unwrap()
            .accepted
            .iter()
            .map(|payload| OutboundEvent::from_json(payload).expect("payload is wire-format JSON"))
            .collect()
    }
}

#[async_trait]
impl EventTransport for MemoryTransport {
    async fn submit(&self, payload: Vec<u8>) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reject_next > 0 {
            inner.reject_next -= 1;
            return Err(SyncError::Publish("injected rejection".into()));
        }
        inner.accepted.push(payload);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        self.inner.lock().unwrap().shutdowns += 1;
        Ok(())
    }
}
