// PCA9685 16-channel PWM expander on a Linux I2C bus
//
// Pulse widths are given in microseconds and converted to 12-bit on/off
// ticks of the current PWM period. Value 0 is written as "full off".

use linux_embedded_hal::I2cdev;
use pwm_pca9685::{Address, Channel, Pca9685};
use tracing::{debug, info};

/// Internal oscillator of the PCA9685
const OSC_CLOCK_HZ: f64 = 25_000_000.0;

/// Steps per PWM period
const TICKS_PER_PERIOD: u32 = 4096;

/// Outputs available on one chip
pub const OUTPUT_COUNT: usize = 16;

/// Where a pulse width write lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    /// A single output
    Output(usize),
    /// Every output in one primitive write
    All,
}

/// Error types for PWM device access
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("I2C error: {0}")]
    I2c(String),

    #[error("No such output on the device: {0}")]
    NoSuchOutput(usize),

    #[error("Device rejected the input data")]
    InvalidInput,
}

/// The operations the servo core needs from a PWM chip
pub trait PwmDevice: Send {
    /// Set the pulse width (microseconds, 0 = off) of one or all outputs
    fn set_pulse_width(&mut self, target: Target, value: u16) -> Result<(), DeviceError>;

    /// Set the PWM frequency shared by all outputs
    fn set_frequency(&mut self, hz: u16) -> Result<(), DeviceError>;

    /// Stop signal generation and let go of the hardware
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// Parse an I2C slave address given in hex (`0x40`) or decimal (`64`)
pub fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid I2C address {:?}: {}", s, e))
}

/// Prescale register value for a PWM frequency
pub fn prescale_for(hz: u16) -> u8 {
    let hz = f64::from(hz.max(1));
    let prescale = (OSC_CLOCK_HZ / (f64::from(TICKS_PER_PERIOD) * hz)).round() - 1.0;
    // the chip ignores prescale values below 3
    prescale.clamp(3.0, 255.0) as u8
}

/// Convert a pulse width in microseconds to ticks of a period at `hz`
pub fn pulse_to_ticks(pulse_us: u16, hz: u16) -> u16 {
    let ticks = (u64::from(pulse_us) * u64::from(TICKS_PER_PERIOD) * u64::from(hz) + 500_000)
        / 1_000_000;
    ticks.min(u64::from(TICKS_PER_PERIOD - 1)) as u16
}

fn channel(output: usize) -> Result<Channel, DeviceError> {
    let ch = match output {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        n => return Err(DeviceError::NoSuchOutput(n)),
    };
    Ok(ch)
}

fn bus_error<E: std::fmt::Debug>(e: pwm_pca9685::Error<E>) -> DeviceError {
    match e {
        pwm_pca9685::Error::I2C(e) => DeviceError::I2c(format!("{:?}", e)),
        pwm_pca9685::Error::InvalidInputData => DeviceError::InvalidInput,
    }
}

/// PCA9685 reached through `/dev/i2c-N`
pub struct Pca9685Device {
    pwm: Pca9685<I2cdev>,
    frequency_hz: u16,
}

impl Pca9685Device {
    /// Open the I2C bus and wake the chip up
    pub fn open(path: &str, address: u8) -> Result<Self, DeviceError> {
        info!("Opening PCA9685 at 0x{:02X} on {}", address, path);
        let i2c = I2cdev::new(path).map_err(|e| DeviceError::Open {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let mut pwm = Pca9685::new(i2c, Address::from(address)).map_err(bus_error)?;
        pwm.enable().map_err(bus_error)?;

        Ok(Self {
            pwm,
            frequency_hz: crate::config::PWM_FREQUENCY_HZ,
        })
    }
}

impl PwmDevice for Pca9685Device {
    fn set_pulse_width(&mut self, target: Target, value: u16) -> Result<(), DeviceError> {
        let ch = match target {
            Target::Output(n) => channel(n)?,
            Target::All => Channel::All,
        };

        if value == 0 {
            return self.pwm.set_channel_full_off(ch).map_err(bus_error);
        }

        let off = pulse_to_ticks(value, self.frequency_hz);
        debug!("PCA9685 {:?}: {}us -> {} ticks", target, value, off);
        self.pwm.set_channel_on_off(ch, 0, off).map_err(bus_error)
    }

    fn set_frequency(&mut self, hz: u16) -> Result<(), DeviceError> {
        let prescale = prescale_for(hz);
        debug!("PCA9685 frequency {}Hz, prescale {}", hz, prescale);
        self.pwm.set_prescale(prescale).map_err(bus_error)?;
        self.frequency_hz = hz;
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        info!("Putting PCA9685 to sleep");
        self.pwm.disable().map_err(bus_error)
    }
}

/// Stand-in device that only logs, for running without the chip
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    frequency_hz: Option<u16>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frequency set by the last `set_frequency` call
    pub fn frequency_hz(&self) -> Option<u16> {
        self.frequency_hz
    }
}

impl PwmDevice for SimulatedDevice {
    fn set_pulse_width(&mut self, target: Target, value: u16) -> Result<(), DeviceError> {
        if let Target::Output(n) = target {
            if n >= OUTPUT_COUNT {
                return Err(DeviceError::NoSuchOutput(n));
            }
        }
        info!("[sim] {:?} <- {}us", target, value);
        Ok(())
    }

    fn set_frequency(&mut self, hz: u16) -> Result<(), DeviceError> {
        info!("[sim] frequency {}Hz", hz);
        self.frequency_hz = Some(hz);
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        info!("[sim] released");
        Ok(())
    }
}
