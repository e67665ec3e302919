//! A Modbus RTU/TCP farm: thread-safe, non-blocking register cache and
//! polling engine for multiple stations sharing one or more communication
//! ports.
//!
//! The dedicated polling thread serializes all I/O per port; application
//! threads only ever touch the mutex-guarded per-station cache through
//! [`Farm::query`]/[`Farm::query_block`] and enqueue writes through
//! [`Farm::write`]/[`Farm::write_block`] — neither path performs I/O.

pub mod config;
pub mod error;
pub mod farm;
pub mod frame;
pub mod instrument;
pub mod port;
pub mod station;
pub mod transport;
pub mod write_request;

pub use config::Configuration;
pub use error::{ErrorCode, FarmError, FarmResult};
pub use farm::{Farm, PortHandle, StationHandle};
pub use port::Port;
pub use station::Station;
pub use transport::{SerialTransport, TcpTransport, Transport};
pub use write_request::WriteRequest;
