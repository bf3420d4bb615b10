// Defaults for the CLI, the bus and the servo pulse limits
use std::time::Duration;

// Configuration file mapping channel -> on/off pulse widths
pub const DEFAULT_CONF_FILE: &str = "/home/pi/music-box-servo.conf";

// Tap timing (seconds)
pub const DEFAULT_ON_INTERVAL: f64 = 0.2;
pub const DEFAULT_OFF_INTERVAL: f64 = 0.2;

// Number of pluckers wired to the expander
pub const DEFAULT_SERVO_N: usize = 15;

// I2C bus and PCA9685 slave address
pub const DEFAULT_I2C_DEVICE: &str = "/dev/i2c-1";
pub const DEFAULT_I2C_ADDRESS: u8 = 0x40;

// Hobby servo PWM period: 20 ms
pub const PWM_FREQUENCY_HZ: u16 = 50;

// Pulse width limits in microseconds
pub const PW_MIN: u16 = 500;
pub const PW_MAX: u16 = 2500;
pub const PW_CENTER: u16 = (PW_MIN + PW_MAX) / 2;

// Time given to the servos to settle after the final freeze
pub const SHUTDOWN_SETTLE: Duration = Duration::from_millis(500);

// Characters of a hole pattern that mark an active hole
pub const HOLE_ON_CHARS: &str = "oO*";
