use crate::endpoint::{Endpoint, EndpointHandle, EndpointId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) struct BusInner {
    next_id: AtomicU64,
    endpoints: Mutex<HashMap<EndpointId, EndpointHandle>>,
}

impl BusInner {
    fn endpoints(&self) -> MutexGuard<'_, HashMap<EndpointId, EndpointHandle>> {
        self.endpoints.lock().expect("endpoint table lock poisoned")
    }

    pub(crate) fn remove(&self, id: EndpointId) {
        self.endpoints().remove(&id);
    }

    pub(crate) fn handles_except(&self, id: EndpointId) -> Vec<EndpointHandle> {
        self.endpoints()
            .iter()
            .filter(|(other, _)| **other != id)
            .map(|(_, handle)| handle.clone())
            .collect()
    }
}

/// In-process message bus connecting a set of endpoints.
///
/// Must be used from within a tokio runtime: creating an endpoint spawns
/// its delivery pump.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(0),
                endpoints: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create and register a new endpoint
    pub fn endpoint(&self) -> Endpoint {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let endpoint = Endpoint::create(Arc::clone(&self.inner), id);
        self.inner.endpoints().insert(id, endpoint.handle());
        endpoint
    }

    /// Look up a live endpoint's handle by id
    pub fn handle(&self, id: EndpointId) -> Option<EndpointHandle> {
        self.inner.endpoints().get(&id).cloned()
    }

    /// Number of currently registered endpoints
    pub fn endpoint_count(&self) -> usize {
        self.inner.endpoints().len()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}
