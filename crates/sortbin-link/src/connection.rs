use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sortbin_core::{DustbinId, RequestHistory, RequestId, ServiceRequest};

use crate::error::LinkError;

/// One live device session.
///
/// Owns the outbound half of the session's channel and the bounded
/// history of recent requests. The history is reachable from two call
/// paths, the device's own inbound stream and outbound sends from
/// request handling, serialized by a per-connection lock.
pub struct DeviceConnection {
    dustbin_id: DustbinId,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    history: Mutex<RequestHistory>,
}

impl DeviceConnection {
    pub fn new(dustbin_id: DustbinId, outbound: mpsc::Sender<String>) -> Self {
        Self {
            dustbin_id,
            outbound,
            cancel: CancellationToken::new(),
            history: Mutex::new(RequestHistory::default()),
        }
    }

    pub fn dustbin_id(&self) -> DustbinId {
        self.dustbin_id
    }

    /// Token cancelled when this session is retired, either superseded by
    /// a reconnect or removed on close. The session's writer task selects
    /// on it.
    pub fn cancelled(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fold a request into this connection's history.
    pub fn record_request(&self, req: ServiceRequest) {
        self.history.lock().record(req);
    }

    /// Retrieve a previously recorded request by correlation id.
    pub fn get_request(&self, request_id: RequestId) -> Result<ServiceRequest, LinkError> {
        self.history
            .lock()
            .get(request_id)
            .cloned()
            .ok_or(LinkError::RequestNotFound {
                dustbin_id: self.dustbin_id,
                request_id,
            })
    }

    /// Serialize a request and queue it on the device's channel.
    ///
    /// On success the request is also recorded into this connection's
    /// history, so inbound reports and outbound commands share one
    /// correlation store per device.
    pub fn send(&self, req: &ServiceRequest) -> Result<(), LinkError> {
        if self.cancel.is_cancelled() {
            return Err(self.write_failure("session retired"));
        }
        let frame =
            serde_json::to_string(req).map_err(|err| self.write_failure(&err.to_string()))?;
        self.outbound.try_send(frame).map_err(|err| {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "outbound queue full",
                mpsc::error::TrySendError::Closed(_) => "channel closed",
            };
            self.write_failure(reason)
        })?;
        self.record_request(req.clone());
        Ok(())
    }

    /// Stop this session. Idempotent; `send` fails afterwards.
    pub fn retire(&self) {
        debug!(dustbin_id = %self.dustbin_id, "retiring device session");
        self.cancel.cancel();
    }

    pub fn is_retired(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    fn write_failure(&self, reason: &str) -> LinkError {
        LinkError::ConnectionWriteFailure {
            dustbin_id: self.dustbin_id,
            reason: reason.to_owned(),
        }
    }
}
