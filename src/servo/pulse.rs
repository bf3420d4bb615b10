// Pulse width values and the limits they are checked against

use serde::Serialize;
use tracing::warn;

use crate::config::{PWM_FREQUENCY_HZ, PW_MAX, PW_MIN};

/// One entry of a pulse width command.
///
/// `Off` is device value 0 (output fully low), `Active` carries a width in
/// microseconds, `NoOp` leaves the channel's output as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseWidth {
    Off,
    Active(u16),
    NoOp,
}

impl PulseWidth {
    /// Raw integer form used by the configuration file: `0` is off, `-1` is
    /// no-op, anything else must fit a `u16`.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(PulseWidth::Off),
            -1 => Some(PulseWidth::NoOp),
            v => u16::try_from(v).ok().map(PulseWidth::Active),
        }
    }

    /// Value written to the device, `None` for `NoOp`
    pub fn device_value(self) -> Option<u16> {
        match self {
            PulseWidth::Off => Some(0),
            PulseWidth::Active(v) => Some(v),
            PulseWidth::NoOp => None,
        }
    }
}

/// Pulse width bounds and PWM frequency for one family of servos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseLimits {
    pub min: u16,
    pub max: u16,
    pub frequency_hz: u16,
}

impl Default for PulseLimits {
    fn default() -> Self {
        Self {
            min: PW_MIN,
            max: PW_MAX,
            frequency_hz: PWM_FREQUENCY_HZ,
        }
    }
}

impl PulseLimits {
    /// Build limits, swapping `min` and `max` if given in the wrong order
    pub fn new(min: u16, max: u16, frequency_hz: u16) -> Self {
        let (min, max) = if min > max {
            warn!("pw_min({}) > pw_max({}): swap", min, max);
            (max, min)
        } else {
            (min, max)
        };
        Self {
            min,
            max,
            frequency_hz,
        }
    }

    pub fn center(&self) -> u16 {
        ((u32::from(self.min) + u32::from(self.max)) / 2) as u16
    }

    /// Whether `pw` may be written to a channel.
    /// `NoOp` passes since it never reaches the device.
    pub fn allows(&self, pw: PulseWidth) -> bool {
        match pw {
            PulseWidth::Off | PulseWidth::NoOp => true,
            PulseWidth::Active(v) => (self.min..=self.max).contains(&v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json() {
        let pws = [PulseWidth::Off, PulseWidth::Active(1500)];
        assert_eq!(
            serde_json::to_string(&pws).unwrap(),
            r#"["off",{"active":1500}]"#
        );
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(PulseWidth::from_raw(0), Some(PulseWidth::Off));
        assert_eq!(PulseWidth::from_raw(-1), Some(PulseWidth::NoOp));
        assert_eq!(PulseWidth::from_raw(2400), Some(PulseWidth::Active(2400)));
        assert_eq!(PulseWidth::from_raw(-2), None);
        assert_eq!(PulseWidth::from_raw(70_000), None);
    }

    #[test]
    fn test_default_limits() {
        let limits = PulseLimits::default();
        assert_eq!(limits.min, 500);
        assert_eq!(limits.max, 2500);
        assert_eq!(limits.center(), 1500);
        assert_eq!(limits.frequency_hz, 50);
    }

    #[test]
    fn test_limits_swap_when_reversed() {
        let limits = PulseLimits::new(2000, 1000, 50);
        assert_eq!((limits.min, limits.max), (1000, 2000));
    }

    #[test]
    fn test_allows() {
        let limits = PulseLimits::default();
        assert!(limits.allows(PulseWidth::Off));
        assert!(limits.allows(PulseWidth::NoOp));
        assert!(limits.allows(PulseWidth::Active(500)));
        assert!(limits.allows(PulseWidth::Active(2500)));
        // a sentinel must never sneak through as an active width
        assert!(!limits.allows(PulseWidth::Active(1)));
        assert!(!limits.allows(PulseWidth::Active(499)));
        assert!(!limits.allows(PulseWidth::Active(2501)));
    }
}
