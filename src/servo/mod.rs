// Servo output module for the PCA9685 expander
//
// Provides:
// - Pulse width values and limits
// - PWM device seam with PCA9685 and simulated implementations
// - Channel driver validating every write

mod driver;
pub mod pca9685;
pub mod pulse;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{ChannelDriver, DriverSnapshot};
pub use pca9685::{DeviceError, Pca9685Device, PwmDevice, SimulatedDevice, Target};
pub use pulse::{PulseLimits, PulseWidth};
