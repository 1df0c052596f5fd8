use std::collections::{HashMap, VecDeque};

use crate::ids::RequestId;
use crate::request::ServiceRequest;

/// How many requests each device keeps for correlation.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Fixed-capacity map of requests ordered by insertion.
///
/// Eviction is by insertion order, not access order: recording past
/// capacity drops the oldest key. Re-recording a present key re-queues it
/// as newest without growing the map.
#[derive(Debug)]
pub struct RequestHistory {
    capacity: usize,
    order: VecDeque<RequestId>,
    entries: HashMap<RequestId, ServiceRequest>,
}

impl RequestHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be nonzero");
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            entries: HashMap::with_capacity(capacity + 1),
        }
    }

    /// Upsert a request keyed by its correlation id.
    pub fn record(&mut self, req: ServiceRequest) {
        let id = req.request_id;
        if self.entries.insert(id, req).is_some() {
            self.order.retain(|key| *key != id);
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn get(&self, request_id: RequestId) -> Option<&ServiceRequest> {
        self.entries.get(&request_id)
    }

    pub fn contains(&self, request_id: RequestId) -> bool {
        self.entries.contains_key(&request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
