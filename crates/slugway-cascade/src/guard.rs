use parking_lot::Mutex;
use slugway_core::{CorrelationId, PageId};
use std::collections::HashMap;
use std::sync::Arc;

type WriteKey = (CorrelationId, PageId);

/// Slug writes a running cascade currently has in flight.
///
/// A write is keyed by the correlation id it carries and the page it lands
/// on. A slug hook that fires for exactly such a write belongs to the
/// cascade itself and must not start another one; saves with any other
/// correlation id are independent edits.
#[derive(Debug, Default)]
pub struct InFlightPages {
    writes: Mutex<HashMap<WriteKey, usize>>,
}

impl InFlightPages {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, correlation_id: &CorrelationId, page_id: PageId) -> bool {
        self.writes
            .lock()
            .contains_key(&(correlation_id.clone(), page_id))
    }

    /// Marks the write of `page_id` tagged `correlation_id` until the
    /// returned guard is dropped.
    pub fn hold(
        self: &Arc<Self>,
        correlation_id: &CorrelationId,
        page_id: PageId,
    ) -> ReentrancyGuard {
        let key = (correlation_id.clone(), page_id);
        *self.writes.lock().entry(key.clone()).or_insert(0) += 1;
        ReentrancyGuard {
            registry: Arc::clone(self),
            key,
        }
    }

    fn release(&self, key: &WriteKey) {
        let mut writes = self.writes.lock();
        if let Some(count) = writes.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                writes.remove(key);
            }
        }
    }
}

/// Releases its mark on drop, whether the guarded write succeeded or not.
#[derive(Debug)]
pub struct ReentrancyGuard {
    registry: Arc<InFlightPages>,
    key: WriteKey,
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
