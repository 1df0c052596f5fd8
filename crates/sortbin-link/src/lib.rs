//! Live device link subsystem.
//!
//! Each physical dustbin holds one bidirectional channel to the server.
//! The [`ConnectionRegistry`] maps device ids to their current
//! [`DeviceConnection`]; the [`RequestRouter`] is the boundary API the
//! rest of the system uses to push commands to devices and read back
//! recorded requests by correlation id.

pub mod connection;
pub mod error;
pub mod inbound;
pub mod registry;
pub mod router;

pub use connection::DeviceConnection;
pub use error::LinkError;
pub use registry::ConnectionRegistry;
pub use router::RequestRouter;
