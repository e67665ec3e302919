//! The top-level coordinator. Holds the port and station vectors, the
//! write queue, and the dedicated polling thread; exposes the public API.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};

use crate::config::Configuration;
use crate::error::{FarmError, FarmResult};
use crate::instrument;
use crate::port::Port;
use crate::station::{Station, CACHE_SIZE};
use crate::transport::Transport;
use crate::write_request::WriteRequest;

pub use crate::station::{PortHandle, StationHandle};

/// Process-wide "has a Farm been constructed" flag: a single explicit,
/// once-initialized global, checked at construction.
static HAS_FARM: AtomicBool = AtomicBool::new(false);

struct FarmState {
    ports: RwLock<Vec<Mutex<Port>>>,
    stations: RwLock<Vec<Arc<Station>>>,
    write_queue: Mutex<VecDeque<WriteRequest>>,
    config: RwLock<Configuration>,
    stop: AtomicBool,
}

/// The top-level Modbus farm. The process may construct exactly one
/// *functional* instance; every subsequent instance is constructed
/// successfully but every one of its public methods returns
/// [`FarmError::NotSingleton`].
pub struct Farm {
    valid: bool,
    state: Arc<FarmState>,
    poller: Option<JoinHandle<()>>,
}

impl Farm {
    /// Constructs a Farm and, if this is the first (and only functional)
    /// instance in the process, spawns the polling thread. Always
    /// succeeds: a non-singleton instance is simply inert.
    pub fn new() -> Farm {
        let valid = !HAS_FARM.swap(true, Ordering::AcqRel);
        let state = Arc::new(FarmState {
            ports: RwLock::new(Vec::new()),
            stations: RwLock::new(Vec::new()),
            write_queue: Mutex::new(VecDeque::new()),
            config: RwLock::new(Configuration::default()),
            stop: AtomicBool::new(false),
        });

        let poller = if valid {
            log::info!("farm started: spawning polling thread");
            let loop_state = Arc::clone(&state);
            Some(std::thread::spawn(move || polling_loop(loop_state)))
        } else {
            log::warn!("a Farm already exists in this process; this instance is inert");
            None
        };

        Farm {
            valid,
            state,
            poller,
        }
    }

    /// Whether this instance is the process's functional singleton.
    pub fn is_singleton(&self) -> bool {
        self.valid
    }

    fn check_singleton(&self) -> FarmResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(FarmError::NotSingleton)
        }
    }

    /// Applies a named configuration preset. The only preset defined is
    /// `"T3000"`.
    pub fn configure(&self, preset_name: &str) -> FarmResult<()> {
        self.check_singleton()?;
        self.state.config.write().apply_preset(preset_name);
        Ok(())
    }

    /// Replaces the active configuration wholesale.
    pub fn set_configuration(&self, config: Configuration) -> FarmResult<()> {
        self.check_singleton()?;
        *self.state.config.write() = config;
        Ok(())
    }

    pub fn configuration(&self) -> Configuration {
        *self.state.config.read()
    }

    /// Appends a port built from `transport`; always succeeds beyond the
    /// singleton guard.
    pub fn add_port(&self, transport: Box<dyn Transport>) -> FarmResult<PortHandle> {
        self.check_singleton()?;
        let mut ports = self.state.ports.write();
        let handle = ports.len();
        ports.push(Mutex::new(Port::new(transport)));
        log::info!("port {handle} added");
        Ok(handle)
    }

    /// Validates `port`, then appends a new station referring to it.
    pub fn add_station(&self, port: PortHandle, address: u8) -> FarmResult<StationHandle> {
        self.check_singleton()?;
        {
            let ports = self.state.ports.read();
            if port >= ports.len() {
                return Err(FarmError::BadPortHandle(port));
            }
        }
        let mut stations = self.state.stations.write();
        let handle = stations.len();
        stations.push(Arc::new(Station::new(handle, address, port)));
        log::info!("station {handle} added (address {address} on port {port})");
        Ok(handle)
    }

    fn station(&self, handle: StationHandle) -> FarmResult<Arc<Station>> {
        self.state
            .stations
            .read()
            .get(handle)
            .cloned()
            .ok_or(FarmError::BadStationHandle(handle))
    }

    /// Single-register read.
    pub fn query(&self, station: StationHandle, reg: u16) -> FarmResult<i16> {
        let _w = instrument::watch("farm::query");
        self.check_singleton()?;
        self.station(station)?.query(reg)
    }

    /// Block read.
    pub fn query_block(&self, station: StationHandle, first_reg: u16, count: u16) -> FarmResult<Vec<i16>> {
        let _w = instrument::watch("farm::query_block");
        self.check_singleton()?;
        self.station(station)?.query_block(first_reg, count)
    }

    /// Enqueues a single-register write and returns the *previous* write
    /// cycle's outcome. `None` means the previous write succeeded (or none
    /// was ever attempted).
    pub fn write(&self, station: StationHandle, reg: u16, value: i16) -> Option<FarmError> {
        self.write_block(station, reg, &[value])
    }

    /// Block write; the single-register form is a convenience wrapper
    /// over this.
    pub fn write_block(&self, station: StationHandle, first_reg: u16, values: &[i16]) -> Option<FarmError> {
        if let Err(err) = self.check_singleton() {
            return Some(err);
        }
        let st = match self.station(station) {
            Ok(st) => st,
            Err(err) => return Some(err),
        };
        if values.is_empty() || first_reg as usize + values.len() > CACHE_SIZE {
            return Some(FarmError::BadRegisterAddress(first_reg));
        }
        let previous = st.last_write_error();
        self.state
            .write_queue
            .lock()
            .push_back(WriteRequest::new(station, first_reg, values.to_vec()));
        previous
    }

    /// Signals the polling thread to exit and joins it. A no-op on a
    /// non-singleton instance, which never spawned a thread.
    pub fn shutdown(mut self) {
        self.state.stop.store(true, Ordering::Release);
        if let Some(handle) = self.poller.take() {
            let _ = handle.join();
            log::info!("farm stopped: polling thread joined");
        }
    }
}

impl Default for Farm {
    fn default() -> Self {
        Farm::new()
    }
}

/// The polling thread body: drain the write queue, then sweep every
/// station, then sleep. Runs until [`FarmState::stop`] is set.
fn polling_loop(state: Arc<FarmState>) {
    loop {
        if state.stop.load(Ordering::Acquire) {
            return;
        }

        drain_write_queue(&state);
        poll_all_stations(&state);

        if state.stop.load(Ordering::Acquire) {
            return;
        }
        std::thread::sleep(state.config.read().poll_interval);
    }
}

fn drain_write_queue(state: &FarmState) {
    loop {
        let request = match state.write_queue.lock().pop_front() {
            Some(request) => request,
            None => break,
        };
        let target = state.stations.read().get(request.station()).cloned();
        let Some(station) = target else {
            log::warn!("dropping write for unknown station {}", request.station());
            continue;
        };
        let ports = state.ports.read();
        let Some(port_slot) = ports.get(station.port_handle()) else {
            log::warn!(
                "dropping write for station {} with unknown port {}",
                station.handle(),
                station.port_handle()
            );
            continue;
        };
        let mut port = port_slot.lock();
        let config = *state.config.read();
        log::debug!(
            "executing write: station {} first_reg {} count {}",
            station.handle(),
            request.first_reg(),
            request.count()
        );
        station.execute_write(&mut port, &config, &request);
    }
}

fn poll_all_stations(state: &FarmState) {
    let stations = state.stations.read();
    let ports = state.ports.read();
    let config = *state.config.read();
    for station in stations.iter() {
        if let Some(port_slot) = ports.get(station.port_handle()) {
            let mut port = port_slot.lock();
            station.poll(&mut port, &config);
        }
    }
}
