//! Shared test double: an in-memory Modbus RTU slave loopback, used by the
//! integration tests in this directory. A hand-rolled
//! [`modbus_farm::Transport`] that answers the same requests a real device
//! would, rather than a mock-object crate.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use modbus_farm::frame::crc16;
use modbus_farm::Transport;

pub struct StubSlave {
    address: u8,
    registers: [i16; 256],
    inbox: VecDeque<u8>,
    /// Artificial per-`wait_for_data` latency, for the concurrency test.
    pub latency: Option<Duration>,
}

impl StubSlave {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            inbox: VecDeque::new(),
            latency: None,
        }
    }

    pub fn set_register(&mut self, reg: u16, value: i16) {
        self.registers[reg as usize] = value;
    }

    pub fn register(&self, reg: u16) -> i16 {
        self.registers[reg as usize]
    }

    fn handle_request(&mut self, request: &[u8]) {
        if request.len() < 8 {
            return;
        }
        let addr = request[0];
        if addr != self.address {
            return; // not addressed to this slave: no reply
        }
        let func = request[1];
        let reg = request[3] as u16;

        match func {
            0x06 => {
                let value = request[5] as i16;
                self.registers[reg as usize] = value;
                // echo the request verbatim as the write-single reply.
                self.inbox.extend(request.iter().copied());
            }
            read_func => {
                let count = request[5] as u16;
                let mut reply = vec![addr, read_func, (count * 2) as u8];
                for k in 0..count {
                    let v = self.registers[reg as usize + k as usize];
                    reply.extend_from_slice(&v.to_be_bytes());
                }
                let crc = crc16(&reply);
                reply.push((crc >> 8) as u8);
                reply.push((crc & 0xFF) as u8);
                self.inbox.extend(reply);
            }
        }
    }
}

impl Transport for StubSlave {
    fn is_open(&self) -> bool {
        true
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.handle_request(bytes);
        Ok(bytes.len())
    }

    fn wait_for_data(&mut self, min_bytes: usize, _timeout: Duration) -> bool {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.inbox.len() >= min_bytes
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.inbox.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbox.pop_front().unwrap();
        }
        Ok(n)
    }
}
