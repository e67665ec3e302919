//! A single shared communication port.
//!
//! Exactly one thread — the poller — performs I/O on a `Port` at a time;
//! `Port` itself holds no concurrency control, it is a thin wrapper the
//! poller drives exclusively. Application threads never touch a `Port`
//! directly.

use std::time::Duration;

use crate::transport::Transport;

/// Wraps one byte transport, hiding the serial-vs-socket distinction from
/// [`crate::station::Station`].
pub struct Port {
    transport: Box<dyn Transport>,
}

impl Port {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Sends `bytes`, returning `true` only if every byte was accepted by
    /// the transport in one call (a short write is treated as failure by
    /// callers, since Modbus RTU frames are not resumable mid-send).
    pub fn send(&mut self, bytes: &[u8]) -> bool {
        match self.transport.send(bytes) {
            Ok(n) if n == bytes.len() => true,
            Ok(n) => {
                log::warn!("short write: sent {n} of {} bytes", bytes.len());
                false
            }
            Err(err) => {
                log::error!("transport send failed: {err}");
                false
            }
        }
    }

    pub fn wait_for_data(&mut self, min_bytes: usize, timeout: Duration) -> bool {
        self.transport.wait_for_data(min_bytes, timeout)
    }

    /// Reads up to `buf.len()` bytes, returning however many are
    /// available now. Port operations never throw: an I/O error collapses
    /// to a zero-length read, letting the Station's own timeout/short-reply
    /// handling take over.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.transport.read(buf).unwrap_or_else(|err| {
            log::error!("transport read failed: {err}");
            0
        })
    }
}
