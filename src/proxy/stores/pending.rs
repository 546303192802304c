// Pending-request store: the bridge between the POST that registers a run
// request and the later GET that actually opens its SSE stream.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Lifecycle of a registered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone)]
struct PendingRequest {
    payload: Value,
    status: RequestStatus,
}

/// In-memory store of registered run requests, keyed by an unguessable
/// UUIDv4 id. Entries are evicted by a background timer a fixed delay after
/// their stream reaches a terminal state; every operation tolerates
/// "already gone" so eviction can never race destructively.
#[derive(Debug, Default)]
pub struct PendingRequestStore {
    entries: DashMap<String, PendingRequest>,
}

impl PendingRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload under a freshly generated id and return the id.
    pub fn register(&self, payload: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries.insert(
            id.clone(),
            PendingRequest {
                payload,
                status: RequestStatus::Pending,
            },
        );
        id
    }

    /// Read a stored payload without changing its status.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.entries.get(id).map(|e| e.payload.clone())
    }

    /// Atomically move a `Pending` entry to `InProgress` and hand back its
    /// payload. Returns `None` for unknown ids and for entries already
    /// claimed — only one stream may ever be opened per id.
    pub fn claim(&self, id: &str) -> Option<Value> {
        let mut entry = self.entries.get_mut(id)?;
        if entry.status != RequestStatus::Pending {
            return None;
        }
        entry.status = RequestStatus::InProgress;
        Some(entry.payload.clone())
    }

    /// Update an entry's status. No-op when the entry is already evicted —
    /// a background task may finish after the timer fired.
    pub fn set_status(&self, id: &str, status: RequestStatus) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.status = status;
        }
    }

    /// Schedule removal of the entry after `delay`, regardless of its final
    /// status. The timer is independent of any client connection.
    pub fn evict_after(self: &Arc<Self>, id: &str, delay: Duration) {
        let store = Arc::clone(self);
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if store.entries.remove(&id).is_some() {
                debug!("Evicted pending request {}", id);
            }
        });
    }

    #[cfg(test)]
    fn status_of(&self, id: &str) -> Option<RequestStatus> {
        self.entries.get(id).map(|e| e.status)
    }
}
