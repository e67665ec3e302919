//! The minimal byte-transport capability a [`crate::port::Port`] needs.
//! The wire-level bytes a physical link carries are abstracted behind
//! this trait so the same polling/caching logic drives either a serial
//! line or a TCP socket.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Uniform byte channel for one Modbus physical link. Implementations must
/// not block longer than necessary: `wait_for_data` polls internally at a
/// rate no faster than 1 kHz, and `read` is expected to be non-blocking
/// once `wait_for_data` has signalled readiness.
pub trait Transport: Send {
    /// Reflects driver state for serial transports; always `true` for a
    /// transport whose connection is established before handoff (TCP).
    fn is_open(&self) -> bool;

    /// Writes `bytes` in full when possible. Returns the number of bytes
    /// actually sent; a short count is a transport_error the Station / Port
    /// layer treats as failure to send.
    fn send(&mut self, bytes: &[u8]) -> std::io::Result<usize>;

    /// Blocks until at least `min_bytes` have arrived or `timeout` elapses.
    /// Returns `true` if data is ready, `false` on timeout.
    fn wait_for_data(&mut self, min_bytes: usize, timeout: Duration) -> bool;

    /// Reads whatever is available into `buf`, up to its length. Expected
    /// to be non-blocking once `wait_for_data` has returned `true`.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Poll granularity used by [`Transport::wait_for_data`] implementations:
/// no faster than 1 kHz.
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A [`serialport::SerialPort`]-backed transport.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort + Send>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn serialport::SerialPort + Send>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        // serialport has no explicit "is this handle still attached" query
        // beyond attempting I/O; a successfully opened handle is treated as
        // open for the handle's lifetime.
        true
    }

    fn send(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.port.write(bytes)
    }

    fn wait_for_data(&mut self, min_bytes: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.port.bytes_to_read() {
                Ok(n) if n as usize >= min_bytes => return true,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(err),
        }
    }
}

/// A [`std::net::TcpStream`]-backed transport for a Modbus RTU-over-TCP
/// tunnel. The socket is assumed already connected before handoff, so
/// `is_open` always reports `true`.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn is_open(&self) -> bool {
        true
    }

    fn send(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.stream.set_nonblocking(false)?;
        let result = self.stream.write(bytes);
        let _ = self.stream.set_nonblocking(true);
        result
    }

    fn wait_for_data(&mut self, min_bytes: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut probe = vec![0u8; min_bytes.max(1)];
        loop {
            match self.stream.peek(&mut probe) {
                Ok(n) if n >= min_bytes => return true,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(err) => Err(err),
        }
    }
}
