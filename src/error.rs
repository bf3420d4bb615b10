// Error types for the servo core

use std::path::PathBuf;

use crate::servo::DeviceError;

#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("Invalid channel number: {channel}. Specify 0 .. {}", .count.saturating_sub(1))]
    InvalidChannel { channel: usize, count: usize },

    #[error("ch[{channel}]: invalid pulse width: {value}. Specify 0 or {min} .. {max}")]
    InvalidPulseWidth {
        channel: usize,
        value: u16,
        min: u16,
        max: u16,
    },

    #[error("Invalid batch length: {actual} != {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Servo driver is shut down")]
    Closed,

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Cannot read configuration {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ServoError {
    /// Errors caused by a bad request rather than by the hardware
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            ServoError::InvalidChannel { .. }
                | ServoError::InvalidPulseWidth { .. }
                | ServoError::LengthMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ServoError>;
