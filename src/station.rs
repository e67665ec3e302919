//! One Modbus slave reached through a specific port. Owns the cache, the
//! polled-range discovery state, and the reader/poller concurrency
//! protocol.

use parking_lot::Mutex;

use crate::config::Configuration;
use crate::error::{FarmError, FarmResult};
use crate::frame::{build_read_request, build_write_single_request, decode_read_reply};
use crate::instrument;
use crate::port::Port;
use crate::write_request::WriteRequest;

/// Registers 0..256 per station.
pub const CACHE_SIZE: usize = 256;

pub type StationHandle = usize;
pub type PortHandle = usize;

struct Inner {
    /// `None` means no range has ever been requested.
    polled_first: Option<u16>,
    polled_count: u16,
    /// `None` means the last poll succeeded (OK); `Some(e)` is the
    /// recorded failure. Starts as `NotReady` once a range is established.
    last_poll_error: Option<FarmError>,
    /// `None` means no write has failed since the last attempt (or none
    /// has ever been attempted).
    last_write_error: Option<FarmError>,
    cache: [i16; CACHE_SIZE],
}

impl Inner {
    fn new() -> Self {
        Self {
            polled_first: None,
            polled_count: 0,
            last_poll_error: None,
            last_write_error: None,
            cache: [0; CACHE_SIZE],
        }
    }
}

pub struct Station {
    handle: StationHandle,
    address: u8,
    port: PortHandle,
    inner: Mutex<Inner>,
}

impl Station {
    pub(crate) fn new(handle: StationHandle, address: u8, port: PortHandle) -> Self {
        Self {
            handle,
            address,
            port,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn handle(&self) -> StationHandle {
        self.handle
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn port_handle(&self) -> PortHandle {
        self.port
    }

    /// Application-facing single-register read.
    pub fn query(&self, reg: u16) -> FarmResult<i16> {
        let _w = instrument::watch("station::query");
        if reg as usize >= CACHE_SIZE {
            return Err(FarmError::BadRegisterAddress(reg));
        }
        let mut inner = self.inner.lock();
        Self::extend_range(&mut inner, reg, 1);
        if let Some(err) = inner.last_poll_error {
            return Err(err);
        }
        Ok(inner.cache[reg as usize])
    }

    /// Application-facing block read.
    pub fn query_block(&self, first_reg: u16, count: u16) -> FarmResult<Vec<i16>> {
        let _w = instrument::watch("station::query_block");
        if count == 0 || first_reg as usize + count as usize > CACHE_SIZE {
            return Err(FarmError::BadRegisterAddress(first_reg));
        }
        let mut inner = self.inner.lock();
        Self::extend_range(&mut inner, first_reg, count);
        if let Some(err) = inner.last_poll_error {
            return Err(err);
        }
        let first = first_reg as usize;
        Ok(inner.cache[first..first + count as usize].to_vec())
    }

    /// Grows the polled range to the smallest contiguous window covering
    /// every register ever requested, marking `not_ready` whenever either
    /// end widens.
    fn extend_range(inner: &mut Inner, first_reg: u16, count: u16) {
        match inner.polled_first {
            None => {
                inner.polled_first = Some(first_reg);
                inner.polled_count = count;
                inner.last_poll_error = Some(FarmError::NotReady);
                log::info!("polled range established: first={first_reg} count={count}");
            }
            Some(old_first) => {
                let old_last = old_first + inner.polled_count - 1;
                let new_last = first_reg + count - 1;
                let mut widened = false;
                let widened_first = if first_reg < old_first {
                    widened = true;
                    first_reg
                } else {
                    old_first
                };
                let widened_last = if new_last > old_last {
                    widened = true;
                    new_last
                } else {
                    old_last
                };
                if widened {
                    inner.polled_first = Some(widened_first);
                    inner.polled_count = widened_last - widened_first + 1;
                    inner.last_poll_error = Some(FarmError::NotReady);
                    log::info!(
                        "polled range extended to first={widened_first} count={}",
                        inner.polled_count
                    );
                }
            }
        }
    }

    /// Current polled range, for diagnostics/tests: `(first, count)`.
    pub fn polled_range(&self) -> Option<(u16, u16)> {
        let inner = self.inner.lock();
        inner.polled_first.map(|first| (first, inner.polled_count))
    }

    /// The most recent write error, or `None` if the last write (if any)
    /// succeeded. `Farm::write` surfaces this *before* overwriting it with
    /// the newly enqueued request's eventual outcome.
    pub fn last_write_error(&self) -> Option<FarmError> {
        self.inner.lock().last_write_error
    }

    /// Poller-facing poll. Called only by the polling thread, which owns
    /// exclusive access to `port` for the duration of the call.
    pub fn poll(&self, port: &mut Port, config: &Configuration) {
        let _w = instrument::watch("station::poll");
        let (first, count) = {
            let inner = self.inner.lock();
            match inner.polled_first {
                Some(first) => (first, inner.polled_count),
                None => return, // never requested: nothing to do
            }
        };

        if !port.is_open() {
            log::error!("station {} poll aborted: port not open", self.handle);
            self.inner.lock().last_poll_error = Some(FarmError::PortNotOpen);
            return;
        }

        let request = build_read_request(self.address, config.read_function_code, first, count);
        log::debug!("station {} poll request: {request:02x?}", self.handle);
        // The reference implementation never inspects SendData's return
        // value either; a partial write is left for WaitForData to time
        // out on.
        let _ = port.send(&request);

        std::thread::sleep(config.inter_frame_delay);
        if !port.wait_for_data(7, config.response_timeout) {
            log::warn!("station {} poll timed out waiting for a reply", self.handle);
            self.inner.lock().last_poll_error = Some(FarmError::TimedOut);
            return;
        }

        // The buffer is zero-filled, matching the reference's `memset`
        // before `ReadData`: a short or malformed reply simply decodes as
        // zeros for the registers it didn't cover, rather than failing the
        // poll. Once WaitForData has signalled readiness, a poll always
        // succeeds -- `port_not_open` and `timed_out` are the only poll
        // failure outcomes.
        let mut buf = [0u8; 1000];
        let n = port.read(&mut buf);
        log::debug!("station {} poll reply ({n} bytes): {:02x?}", self.handle, &buf[..n]);

        let values = decode_read_reply(&buf, count).unwrap_or_else(|| vec![0; count as usize]);
        let mut inner = self.inner.lock();
        for (k, value) in values.into_iter().enumerate() {
            inner.cache[first as usize + k] = value;
        }
        inner.last_poll_error = None;
    }

    /// Poller-facing write. Only `count == 1` is supported; anything else
    /// records `Nyi`.
    pub fn execute_write(&self, port: &mut Port, config: &Configuration, request: &WriteRequest) {
        let _w = instrument::watch("station::execute_write");
        let _ = config; // the write frame has no configurable function code
        if request.count() != 1 {
            log::warn!(
                "station {} write of count {} rejected: block writes are not yet implemented",
                self.handle,
                request.count()
            );
            self.inner.lock().last_write_error = Some(FarmError::Nyi);
            return;
        }
        if !port.is_open() {
            log::error!("station {} write aborted: port not open", self.handle);
            self.inner.lock().last_write_error = Some(FarmError::PortNotOpen);
            return;
        }

        let frame = build_write_single_request(self.address, request.first_reg(), request.values()[0]);
        log::debug!("station {} write request: {frame:02x?}", self.handle);
        if !port.send(&frame) {
            log::error!("station {} write aborted: short write", self.handle);
            self.inner.lock().last_write_error = Some(FarmError::DeviceError);
            return;
        }

        std::thread::sleep(config.inter_frame_delay);
        if !port.wait_for_data(7, config.response_timeout) {
            log::warn!("station {} write timed out waiting for a reply", self.handle);
            self.inner.lock().last_write_error = Some(FarmError::TimedOut);
            return;
        }

        let mut buf = [0u8; 1000];
        let n = port.read(&mut buf);
        let reply = &buf[..n];
        log::debug!("station {} write reply: {reply:02x?}", self.handle);

        let outcome = crate::frame::write_single_reply_outcome(reply);
        if outcome.is_none() {
            log::warn!(
                "station {} write reply had an unexpected function code: {reply:02x?}",
                self.handle
            );
        }
        let mut inner = self.inner.lock();
        inner.last_write_error = match outcome {
            Some(true) => None,
            Some(false) => Some(FarmError::DeviceException),
            None => Some(FarmError::DeviceError),
        };
    }
}
