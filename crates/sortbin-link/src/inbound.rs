use tracing::{trace, warn};

use sortbin_core::ServiceRequest;

use crate::connection::DeviceConnection;
use crate::error::LinkError;

/// Handle one raw text frame received from a device.
///
/// Devices are best-effort, untrusted senders: an empty frame is a no-op
/// and an unparsable or incomplete frame is logged and dropped. No
/// acknowledgment is returned in either case.
pub fn handle_frame(conn: &DeviceConnection, raw: &str) {
    if raw.is_empty() {
        return;
    }
    match parse_frame(raw) {
        Ok(req) => {
            trace!(
                dustbin_id = %conn.dustbin_id(),
                request_id = %req.request_id,
                "recorded inbound request"
            );
            conn.record_request(req);
        }
        Err(err) => {
            warn!(
                dustbin_id = %conn.dustbin_id(),
                error = %err,
                "discarding malformed inbound frame"
            );
        }
    }
}

/// Parse a device frame into a typed request. Every wire field is
/// required; extra fields are ignored.
pub fn parse_frame(raw: &str) -> Result<ServiceRequest, LinkError> {
    serde_json::from_str(raw).map_err(|err| LinkError::MalformedFrame(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortbin_core::{DustbinId, RequestId, RequestKind};
    use tokio::sync::mpsc;

    fn connection() -> DeviceConnection {
        let (tx, _rx) = mpsc::channel(8);
        DeviceConnection::new(DustbinId::new(5), tx)
    }

    #[test]
    fn valid_frame_is_recorded() {
        let conn = connection();
        handle_frame(
            &conn,
            r#"{"type":0,"requestId":100,"userId":1,"dustbinId":5,"description":"ok"}"#,
        );

        let recorded = conn.get_request(RequestId::new(100)).unwrap();
        assert_eq!(recorded.kind, RequestKind::Fulfilled);
        assert_eq!(recorded.description, "ok");
    }

    #[test]
    fn empty_frame_is_a_noop() {
        let conn = connection();
        handle_frame(&conn, "");
        assert_eq!(conn.history_len(), 0);
    }

    #[test]
    fn garbage_is_silently_discarded() {
        let conn = connection();
        handle_frame(&conn, "not json at all");
        assert_eq!(conn.history_len(), 0);
    }

    #[test]
    fn missing_required_field_is_discarded() {
        let conn = connection();
        handle_frame(
            &conn,
            r#"{"type":0,"requestId":100,"userId":1,"dustbinId":5}"#,
        );
        assert_eq!(conn.history_len(), 0);
    }

    #[test]
    fn unknown_type_code_is_discarded() {
        let conn = connection();
        handle_frame(
            &conn,
            r#"{"type":7,"requestId":100,"userId":1,"dustbinId":5,"description":"ok"}"#,
        );
        assert_eq!(conn.history_len(), 0);
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let conn = connection();
        handle_frame(
            &conn,
            r#"{"type":2,"requestId":1,"userId":1,"dustbinId":5,"description":"ok","battery":87}"#,
        );
        assert_eq!(conn.history_len(), 1);
    }
}
