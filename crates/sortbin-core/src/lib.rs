pub mod history;
pub mod ids;
pub mod request;

pub use history::{RequestHistory, DEFAULT_HISTORY_CAPACITY};
pub use ids::{DustbinId, RequestId, UserId, WasteId};
pub use request::{RequestKind, ServiceRequest, LID_OPEN_DESCRIPTION};
