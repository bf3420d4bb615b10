// Test double for the PWM device

use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use super::pca9685::{DeviceError, PwmDevice, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Write(Target, u16),
    Frequency(u16),
    Release,
}

/// Records every device call; clones share the same log
#[derive(Clone, Default)]
pub struct RecordingDevice {
    log: Arc<Mutex<Vec<(Instant, Call)>>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.log.lock().unwrap().push((Instant::now(), call));
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().iter().map(|&(_, c)| c).collect()
    }

    /// Pulse width writes only
    pub fn writes(&self) -> Vec<(Target, u16)> {
        self.timed_writes()
            .into_iter()
            .map(|(_, target, value)| (target, value))
            .collect()
    }

    pub fn timed_writes(&self) -> Vec<(Instant, Target, u16)> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|&(at, call)| match call {
                Call::Write(target, value) => Some((at, target, value)),
                _ => None,
            })
            .collect()
    }
}

impl PwmDevice for RecordingDevice {
    fn set_pulse_width(&mut self, target: Target, value: u16) -> Result<(), DeviceError> {
        self.push(Call::Write(target, value));
        Ok(())
    }

    fn set_frequency(&mut self, hz: u16) -> Result<(), DeviceError> {
        self.push(Call::Frequency(hz));
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.push(Call::Release);
        Ok(())
    }
}
