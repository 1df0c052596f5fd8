use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;

use sortbin_core::DustbinId;

use crate::connection::DeviceConnection;

/// Process-wide map of live device sessions plus an online counter.
///
/// The counter is co-updated with map edits: the insert/remove return
/// values decide whether it moves, so a same-id reconnect replaces the
/// entry without recounting and the counter always equals the map size.
pub struct ConnectionRegistry {
    connections: DashMap<DustbinId, Arc<DeviceConnection>>,
    online: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            online: AtomicUsize::new(0),
        }
    }

    /// Admit a device session. Always succeeds.
    ///
    /// A session already registered under the same id is superseded: its
    /// entry is replaced without touching the counter, and it is retired
    /// so its writer stops rather than lingering until the old transport
    /// notices.
    pub fn connect(
        &self,
        dustbin_id: DustbinId,
        outbound: mpsc::Sender<String>,
    ) -> Arc<DeviceConnection> {
        let conn = Arc::new(DeviceConnection::new(dustbin_id, outbound));
        match self.connections.insert(dustbin_id, Arc::clone(&conn)) {
            Some(superseded) => {
                superseded.retire();
                info!(
                    dustbin_id = %dustbin_id,
                    online = self.online_count(),
                    "dustbin reconnected, superseding live session"
                );
            }
            None => {
                self.online.fetch_add(1, Ordering::Relaxed);
                info!(
                    dustbin_id = %dustbin_id,
                    online = self.online_count(),
                    "dustbin connected"
                );
            }
        }
        conn
    }

    /// Remove a device session if present. Idempotent.
    pub fn disconnect(&self, dustbin_id: DustbinId) {
        if let Some((_, conn)) = self.connections.remove(&dustbin_id) {
            conn.retire();
            self.online.fetch_sub(1, Ordering::Relaxed);
            info!(
                dustbin_id = %dustbin_id,
                online = self.online_count(),
                "dustbin disconnected"
            );
        }
    }

    /// Remove `conn` only if it is still the live session for its id.
    ///
    /// Session teardown uses this instead of [`disconnect`] so that a
    /// superseded session closing late cannot evict its replacement.
    ///
    /// [`disconnect`]: ConnectionRegistry::disconnect
    pub fn disconnect_session(&self, conn: &Arc<DeviceConnection>) {
        let dustbin_id = conn.dustbin_id();
        let removed = self
            .connections
            .remove_if(&dustbin_id, |_, current| Arc::ptr_eq(current, conn));
        if removed.is_some() {
            conn.retire();
            self.online.fetch_sub(1, Ordering::Relaxed);
            info!(
                dustbin_id = %dustbin_id,
                online = self.online_count(),
                "dustbin disconnected"
            );
        }
    }

    /// Current session for a device, if connected. Pure read.
    pub fn get(&self, dustbin_id: DustbinId) -> Option<Arc<DeviceConnection>> {
        self.connections
            .get(&dustbin_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_connected(&self, dustbin_id: DustbinId) -> bool {
        self.connections.contains_key(&dustbin_id)
    }

    /// Number of devices currently online.
    pub fn online_count(&self) -> usize {
        self.online.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Registry tests never write to the channel, so the receiver half can
    // be dropped immediately.
    fn channel() -> mpsc::Sender<String> {
        let (tx, _rx) = mpsc::channel(8);
        tx
    }

    #[test]
    fn counter_tracks_connects_and_disconnects() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.online_count(), 0);

        registry.connect(DustbinId::new(1), channel());
        registry.connect(DustbinId::new(2), channel());
        assert_eq!(registry.online_count(), 2);

        registry.disconnect(DustbinId::new(1));
        assert_eq!(registry.online_count(), 1);

        registry.disconnect(DustbinId::new(2));
        assert_eq!(registry.online_count(), 0);
    }

    #[test]
    fn same_id_reconnect_replaces_without_recounting() {
        let registry = ConnectionRegistry::new();
        let first = registry.connect(DustbinId::new(7), channel());
        let second = registry.connect(DustbinId::new(7), channel());

        assert_eq!(registry.online_count(), 1);
        assert!(first.is_retired());
        assert!(!second.is_retired());

        let current = registry.get(DustbinId::new(7)).unwrap();
        assert!(Arc::ptr_eq(&current, &second));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let registry = ConnectionRegistry::new();
        registry.connect(DustbinId::new(3), channel());

        registry.disconnect(DustbinId::new(3));
        registry.disconnect(DustbinId::new(3));
        registry.disconnect(DustbinId::new(99));
        assert_eq!(registry.online_count(), 0);
    }

    #[test]
    fn superseded_session_teardown_cannot_evict_replacement() {
        let registry = ConnectionRegistry::new();
        let first = registry.connect(DustbinId::new(7), channel());
        let second = registry.connect(DustbinId::new(7), channel());

        // The old transport finally notices and tears down.
        registry.disconnect_session(&first);
        assert_eq!(registry.online_count(), 1);
        assert!(registry.is_connected(DustbinId::new(7)));

        registry.disconnect_session(&second);
        assert_eq!(registry.online_count(), 0);
        assert!(!registry.is_connected(DustbinId::new(7)));
    }

    #[test]
    fn lookup_is_a_pure_read() {
        let registry = ConnectionRegistry::new();
        assert!(registry.get(DustbinId::new(1)).is_none());
        assert_eq!(registry.online_count(), 0);

        registry.connect(DustbinId::new(1), channel());
        assert!(registry.get(DustbinId::new(1)).is_some());
        assert_eq!(registry.online_count(), 1);
    }

    #[test]
    fn counter_matches_map_under_concurrent_churn() {
        let registry = Arc::new(ConnectionRegistry::new());

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for round in 0..100 {
                        let id = DustbinId::new(worker * 100 + round % 10);
                        registry.connect(id, channel());
                        if round % 3 == 0 {
                            registry.disconnect(id);
                        }
                    }
                });
            }
        });

        let live: usize = (0..8)
            .flat_map(|worker| (0..10).map(move |n| DustbinId::new(worker * 100 + n)))
            .filter(|id| registry.is_connected(*id))
            .count();
        assert_eq!(registry.online_count(), live);
    }
}
