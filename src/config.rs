//! Process-wide configuration for polling cadence and timeouts.

use std::time::Duration;

/// Read-function-code byte and the timing constants that govern a polling
/// cycle, pulled out into one data-driven struct rather than scattered
/// constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    /// Function code used for a polled read (default 3, "read holding
    /// registers"). The `"T3000"` preset also sets this to 3.
    pub read_function_code: u8,
    /// Sleep between polling cycles: 1000 ms.
    pub poll_interval: Duration,
    /// `wait_for_data` deadline after sending a request: 6000 ms.
    pub response_timeout: Duration,
    /// Sleep issued right after sending, before the first `wait_for_data`
    /// poll, to avoid a busy CPU-spin: 50 ms.
    pub inter_frame_delay: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            read_function_code: 3,
            poll_interval: Duration::from_millis(1000),
            response_timeout: Duration::from_millis(6000),
            inter_frame_delay: Duration::from_millis(50),
        }
    }
}

impl Configuration {
    /// Applies a named preset on top of the current configuration. The
    /// only preset defined is `"T3000"`, which pins the read function
    /// code to 3 (already the default).
    pub fn apply_preset(&mut self, preset_name: &str) {
        if preset_name == "T3000" {
            self.read_function_code = 3;
        }
    }
}
