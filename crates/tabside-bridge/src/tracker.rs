//! Request tracking for host communication
//!
//! Every request sent to the host carries an id; the host answers with a
//! response line carrying the same id. The tracker hands out ids and routes
//! each response to the task waiting on it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::{oneshot, RwLock};

use tabside_core::prelude::*;

struct PendingRequest {
    response_tx: oneshot::Sender<HostResponse>,
    created_at: Instant,
    method: &'static str,
}

/// Response from the host
#[derive(Debug, Clone, PartialEq)]
pub struct HostResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

impl HostResponse {
    pub fn new(id: u64, result: Option<Value>, error: Option<Value>) -> Self {
        Self { id, result, error }
    }

    pub fn failure(id: u64, error: Value) -> Self {
        Self::new(id, None, Some(error))
    }
}

/// Tracks pending requests and matches responses
pub struct RequestTracker {
    next_id: AtomicU64,
    pending: Arc<RwLock<HashMap<u64, PendingRequest>>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new pending request.
    /// Returns (request_id, receiver for response)
    pub async fn register(&self, method: &'static str) -> (u64, oneshot::Receiver<HostResponse>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        self.pending.write().await.insert(
            id,
            PendingRequest {
                response_tx: tx,
                created_at: Instant::now(),
                method,
            },
        );

        (id, rx)
    }

    /// Route a response from the host.
    /// Returns true if it matched a pending request
    pub async fn handle_response(&self, id: u64, result: Option<Value>, error: Option<Value>) -> bool {
        match self.pending.write().await.remove(&id) {
            Some(pending) => {
                trace!(
                    "Response #{} for {} after {:?}",
                    id,
                    pending.method,
                    pending.created_at.elapsed()
                );
                let _ = pending
                    .response_tx
                    .send(HostResponse::new(id, result, error));
                true
            }
            None => false,
        }
    }

    /// Drop a single pending request; its waiter sees the channel close
    pub async fn forget(&self, id: u64) -> bool {
        self.pending.write().await.remove(&id).is_some()
    }

    /// Fail every pending request (e.g., on shutdown)
    pub async fn cancel_all(&self) -> usize {
        let mut pending = self.pending.write().await;
        let count = pending.len();
        for (id, req) in pending.drain() {
            let _ = req
                .response_tx
                .send(HostResponse::failure(id, Value::from("Request cancelled")));
        }
        count
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}
