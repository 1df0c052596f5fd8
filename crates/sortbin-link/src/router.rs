use std::sync::Arc;

use sortbin_core::{DustbinId, RequestId, ServiceRequest, UserId};

use crate::error::LinkError;
use crate::registry::ConnectionRegistry;

/// Boundary API the rest of the system uses to talk to devices.
///
/// Cheap to clone; every clone routes through the same registry.
#[derive(Clone)]
pub struct RequestRouter {
    registry: Arc<ConnectionRegistry>,
}

impl RequestRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Push a command to the device addressed by `req.dustbin_id`.
    ///
    /// This is the only way the rest of the system writes to a device.
    pub fn send_request(&self, req: &ServiceRequest) -> Result<(), LinkError> {
        let conn = self
            .registry
            .get(req.dustbin_id)
            .ok_or(LinkError::DeviceNotConnected(req.dustbin_id))?;
        conn.send(req)
    }

    /// Retrieve a previously sent or received request from a device's
    /// history.
    pub fn get_request(
        &self,
        dustbin_id: DustbinId,
        request_id: RequestId,
    ) -> Result<ServiceRequest, LinkError> {
        let conn = self
            .registry
            .get(dustbin_id)
            .ok_or(LinkError::DeviceNotConnected(dustbin_id))?;
        conn.get_request(request_id)
    }

    /// Synthesize a lid-open command when the caller supplies no explicit
    /// description or correlation id.
    pub fn generate_new_request(&self, user_id: UserId, dustbin_id: DustbinId) -> ServiceRequest {
        ServiceRequest::lid_open(user_id, dustbin_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound;
    use chrono::Utc;
    use sortbin_core::{RequestKind, LID_OPEN_DESCRIPTION};
    use tokio::sync::mpsc;

    fn setup() -> (Arc<ConnectionRegistry>, RequestRouter) {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = RequestRouter::new(Arc::clone(&registry));
        (registry, router)
    }

    fn req(dustbin_id: i64, request_id: i64) -> ServiceRequest {
        ServiceRequest::new(
            RequestKind::Pending,
            RequestId::new(request_id),
            UserId::new(1),
            DustbinId::new(dustbin_id),
            "lid",
        )
    }

    #[tokio::test]
    async fn send_request_to_unconnected_device_fails() {
        let (_registry, router) = setup();
        let err = router.send_request(&req(5, 100)).unwrap_err();
        assert!(matches!(err, LinkError::DeviceNotConnected(id) if id == DustbinId::new(5)));
    }

    #[tokio::test]
    async fn send_request_reaches_the_device_and_its_history() {
        let (registry, router) = setup();
        let (tx, mut rx) = mpsc::channel(8);
        registry.connect(DustbinId::new(5), tx);

        router.send_request(&req(5, 100)).unwrap();

        let frame = rx.recv().await.unwrap();
        let on_wire: ServiceRequest = serde_json::from_str(&frame).unwrap();
        assert_eq!(on_wire, req(5, 100));
        assert_eq!(
            router.get_request(DustbinId::new(5), RequestId::new(100)).unwrap(),
            req(5, 100)
        );
    }

    #[tokio::test]
    async fn get_request_on_unconnected_device_fails() {
        let (_registry, router) = setup();
        let err = router
            .get_request(DustbinId::new(5), RequestId::new(100))
            .unwrap_err();
        assert!(matches!(err, LinkError::DeviceNotConnected(_)));
    }

    #[tokio::test]
    async fn get_request_miss_on_connected_device_fails() {
        let (registry, router) = setup();
        let (tx, _rx) = mpsc::channel(8);
        registry.connect(DustbinId::new(5), tx);

        let err = router
            .get_request(DustbinId::new(5), RequestId::new(100))
            .unwrap_err();
        assert!(matches!(err, LinkError::RequestNotFound { .. }));
    }

    #[tokio::test]
    async fn failed_send_leaves_histories_unchanged() {
        let (registry, router) = setup();
        let (tx, _rx) = mpsc::channel(8);
        let conn = registry.connect(DustbinId::new(5), tx);

        let _ = router.send_request(&req(9, 100));
        assert_eq!(conn.history_len(), 0);
    }

    #[tokio::test]
    async fn generate_new_request_shape() {
        let (_registry, router) = setup();
        let before = Utc::now().timestamp_millis();
        let req = router.generate_new_request(UserId::new(7), DustbinId::new(3));

        assert_eq!(req.kind, RequestKind::Pending);
        assert_eq!(req.user_id, UserId::new(7));
        assert_eq!(req.dustbin_id, DustbinId::new(3));
        assert_eq!(req.description, LID_OPEN_DESCRIPTION);
        assert!(req.request_id.as_i64() >= before);
        assert!(req.request_id.as_i64() <= Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn device_lifecycle_end_to_end() {
        let (registry, router) = setup();

        // Device 5 connects.
        let (tx, _rx) = mpsc::channel(8);
        let conn = registry.connect(DustbinId::new(5), tx);

        // It reports a fulfilled request.
        inbound::handle_frame(
            &conn,
            r#"{"type":0,"requestId":100,"userId":1,"dustbinId":5,"description":"ok"}"#,
        );

        // The boundary API sees the report.
        let recorded = router
            .get_request(DustbinId::new(5), RequestId::new(100))
            .unwrap();
        assert_eq!(recorded.kind, RequestKind::Fulfilled);
        assert_eq!(recorded.user_id, UserId::new(1));
        assert_eq!(recorded.dustbin_id, DustbinId::new(5));
        assert_eq!(recorded.description, "ok");

        // Device 5 disconnects; pushes now fail.
        registry.disconnect(DustbinId::new(5));
        let err = router.send_request(&req(5, 101)).unwrap_err();
        assert!(matches!(err, LinkError::DeviceNotConnected(_)));
    }
}
