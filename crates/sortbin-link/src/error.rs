use sortbin_core::{DustbinId, RequestId};

/// Failures of the device link subsystem.
#[derive(Clone, Debug, thiserror::Error)]
pub enum LinkError {
    /// The registry has no live session for the device.
    #[error("dustbin {0} is not connected")]
    DeviceNotConnected(DustbinId),

    /// The device is connected but its history has no such request.
    #[error("request {request_id} not found for dustbin {dustbin_id}")]
    RequestNotFound {
        dustbin_id: DustbinId,
        request_id: RequestId,
    },

    /// Writing to the device's channel failed. Never retried.
    #[error("write to dustbin {dustbin_id} failed: {reason}")]
    ConnectionWriteFailure {
        dustbin_id: DustbinId,
        reason: String,
    },

    /// An inbound frame could not be parsed. Logged, never surfaced to
    /// the device or to boundary callers.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

impl LinkError {
    /// Whether this failure maps to a not-found at the HTTP boundary.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotConnected(_) | Self::RequestNotFound { .. }
        )
    }
}
