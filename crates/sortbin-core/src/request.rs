use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ids::{DustbinId, RequestId, UserId};

/// Description carried by auto-generated lid-open commands.
pub const LID_OPEN_DESCRIPTION: &str = "(Auto-generated) Lid-open";

/// Status codes carried in the `type` field of the device wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RequestKind {
    /// Request has been successfully handled.
    Fulfilled = 0,
    /// Request cannot be fulfilled.
    Rejected = 1,
    /// Request has not been processed yet.
    Pending = 2,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown request kind: {0}")]
pub struct UnknownRequestKind(pub i64);

impl TryFrom<i64> for RequestKind {
    type Error = UnknownRequestKind;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Fulfilled),
            1 => Ok(Self::Rejected),
            2 => Ok(Self::Pending),
            other => Err(UnknownRequestKind(other)),
        }
    }
}

impl From<RequestKind> for i64 {
    fn from(kind: RequestKind) -> i64 {
        kind as i64
    }
}

/// A correlated command/report exchanged with a dustbin.
///
/// The same flat shape is used on the wire in both directions. Every
/// field is required; frames missing any of them are rejected at parse
/// time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub request_id: RequestId,
    pub user_id: UserId,
    pub dustbin_id: DustbinId,
    pub description: String,
}

impl ServiceRequest {
    pub fn new(
        kind: RequestKind,
        request_id: RequestId,
        user_id: UserId,
        dustbin_id: DustbinId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            request_id,
            user_id,
            dustbin_id,
            description: description.into(),
        }
    }

    /// Synthesize a lid-open command when the caller supplies no explicit
    /// id or description. The correlation id is the current epoch millis.
    pub fn lid_open(user_id: UserId, dustbin_id: DustbinId) -> Self {
        Self {
            kind: RequestKind::Pending,
            request_id: RequestId::new(Utc::now().timestamp_millis()),
            user_id,
            dustbin_id,
            description: LID_OPEN_DESCRIPTION.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_i64() {
        for (kind, raw) in [
            (RequestKind::Fulfilled, 0),
            (RequestKind::Rejected, 1),
            (RequestKind::Pending, 2),
        ] {
            assert_eq!(i64::from(kind), raw);
            assert_eq!(RequestKind::try_from(raw).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(RequestKind::try_from(3).is_err());
        assert!(RequestKind::try_from(-1).is_err());
    }

    #[test]
    fn wire_format_uses_camel_case_and_numeric_type() {
        let req = ServiceRequest::new(
            RequestKind::Pending,
            RequestId::new(100),
            UserId::new(1),
            DustbinId::new(5),
            "ok",
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], 2);
        assert_eq!(json["requestId"], 100);
        assert_eq!(json["userId"], 1);
        assert_eq!(json["dustbinId"], 5);
        assert_eq!(json["description"], "ok");
    }

    #[test]
    fn parses_a_device_frame() {
        let frame = r#"{"type":0,"requestId":100,"userId":1,"dustbinId":5,"description":"ok"}"#;
        let req: ServiceRequest = serde_json::from_str(frame).unwrap();
        assert_eq!(req.kind, RequestKind::Fulfilled);
        assert_eq!(req.request_id, RequestId::new(100));
        assert_eq!(req.user_id, UserId::new(1));
        assert_eq!(req.dustbin_id, DustbinId::new(5));
        assert_eq!(req.description, "ok");
    }

    #[test]
    fn missing_field_fails_to_parse() {
        let frame = r#"{"type":0,"requestId":100,"userId":1,"dustbinId":5}"#;
        assert!(serde_json::from_str::<ServiceRequest>(frame).is_err());
    }

    #[test]
    fn out_of_range_type_fails_to_parse() {
        let frame = r#"{"type":9,"requestId":100,"userId":1,"dustbinId":5,"description":"ok"}"#;
        assert!(serde_json::from_str::<ServiceRequest>(frame).is_err());
    }

    #[test]
    fn lid_open_command_shape() {
        let before = Utc::now().timestamp_millis();
        let req = ServiceRequest::lid_open(UserId::new(7), DustbinId::new(3));
        let after = Utc::now().timestamp_millis();

        assert_eq!(req.kind, RequestKind::Pending);
        assert_eq!(req.user_id, UserId::new(7));
        assert_eq!(req.dustbin_id, DustbinId::new(3));
        assert_eq!(req.description, LID_OPEN_DESCRIPTION);
        assert!(req.request_id.as_i64() >= before && req.request_id.as_i64() <= after);
    }
}
