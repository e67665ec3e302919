//! Stable error codes and the richer [`FarmError`] type that carries them.
//!
//! A flat, stable set of error identifiers is kept separate from the
//! richer Rust error type so callers that match on them, log them, or
//! bridge them across an FFI boundary have something that won't shift
//! shape across releases. [`ErrorCode`] is that set. [`FarmError`] is the
//! idiomatic Rust error type actually returned by the public API; it
//! carries whatever extra context is cheap to attach, and
//! [`FarmError::code`] recovers the bare stable identifier for callers
//! that only want that.

use thiserror::Error;

/// The eleven stable error identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    Ok,
    Nyi,
    BadPortHandle,
    BadStationHandle,
    PortNotOpen,
    TimedOut,
    BadRegisterAddress,
    NotReady,
    NotSingleton,
    DeviceException,
    DeviceError,
}

/// Errors surfaced by the public API. Application errors are codes, not
/// exceptions: the polling thread records these on the affected
/// [`crate::station::Station`] and never propagates them upward.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FarmError {
    #[error("operation not yet implemented for count > 1")]
    Nyi,
    #[error("port handle {0} is out of range")]
    BadPortHandle(usize),
    #[error("station handle {0} is out of range")]
    BadStationHandle(usize),
    #[error("port is not open")]
    PortNotOpen,
    #[error("request timed out waiting for a reply")]
    TimedOut,
    #[error("register address {0} is out of range (expected 0..256)")]
    BadRegisterAddress(u16),
    #[error("no successful poll has yet covered this register")]
    NotReady,
    #[error("this process already has a functional Farm instance")]
    NotSingleton,
    #[error("device reported a Modbus exception")]
    DeviceException,
    #[error("device reply was malformed or otherwise invalid")]
    DeviceError,
}

impl FarmError {
    /// The stable [`ErrorCode`] this error maps to.
    pub fn code(self) -> ErrorCode {
        match self {
            FarmError::Nyi => ErrorCode::Nyi,
            FarmError::BadPortHandle(_) => ErrorCode::BadPortHandle,
            FarmError::BadStationHandle(_) => ErrorCode::BadStationHandle,
            FarmError::PortNotOpen => ErrorCode::PortNotOpen,
            FarmError::TimedOut => ErrorCode::TimedOut,
            FarmError::BadRegisterAddress(_) => ErrorCode::BadRegisterAddress,
            FarmError::NotReady => ErrorCode::NotReady,
            FarmError::NotSingleton => ErrorCode::NotSingleton,
            FarmError::DeviceException => ErrorCode::DeviceException,
            FarmError::DeviceError => ErrorCode::DeviceError,
        }
    }
}

/// Either a value or the previous poll/write failure.
pub type FarmResult<T> = Result<T, FarmError>;
