// Channel driver: validates pulse widths and forwards them to the PWM device
//
// All device writes go through one lock, so a batch from one caller is never
// interleaved with a batch from another. The last commanded value of every
// channel is kept as a snapshot that is swapped whole after each write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{Instrument, Span, debug, info, warn};

use super::pca9685::{PwmDevice, Target};
use super::pulse::{PulseLimits, PulseWidth};
use crate::config::SHUTDOWN_SETTLE;
use crate::error::{Result, ServoError};

/// Last commanded value of every channel (`Off` or `Active`)
pub type DriverSnapshot = Arc<[PulseWidth]>;

struct DriverState {
    // None once shut down
    device: Option<Box<dyn PwmDevice>>,
    snapshot: DriverSnapshot,
}

/// Sole path from validated pulse widths to the PWM device
pub struct ChannelDriver {
    state: Mutex<DriverState>,
    channel_count: usize,
    limits: PulseLimits,
    span: Span,
}

fn all_off(channel_count: usize) -> DriverSnapshot {
    vec![PulseWidth::Off; channel_count].into()
}

impl ChannelDriver {
    /// Take over `device`: set the PWM frequency and freeze every output
    pub fn new(
        mut device: Box<dyn PwmDevice>,
        channel_count: usize,
        limits: PulseLimits,
        span: Span,
    ) -> Result<Self> {
        {
            let _enter = span.enter();
            info!(
                "Driving {} channels, pulse width {}..{}us at {}Hz",
                channel_count, limits.min, limits.max, limits.frequency_hz
            );
            device.set_frequency(limits.frequency_hz)?;
            device.set_pulse_width(Target::All, 0)?;
        }

        Ok(Self {
            state: Mutex::new(DriverState {
                device: Some(device),
                snapshot: all_off(channel_count),
            }),
            channel_count,
            limits,
            span,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn limits(&self) -> PulseLimits {
        self.limits
    }

    /// Last commanded value of every channel
    pub fn snapshot(&self) -> DriverSnapshot {
        self.lock().snapshot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        // a panic mid-batch leaves the snapshot consistent with what was written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        if channel >= self.channel_count {
            return Err(ServoError::InvalidChannel {
                channel,
                count: self.channel_count,
            });
        }
        Ok(())
    }

    fn check_pulse_width(&self, channel: usize, pw: PulseWidth) -> Result<()> {
        if self.limits.allows(pw) {
            return Ok(());
        }
        Err(ServoError::InvalidPulseWidth {
            channel,
            value: pw.device_value().unwrap_or_default(),
            min: self.limits.min,
            max: self.limits.max,
        })
    }

    /// Set the pulse width of one channel
    pub fn set_one(&self, channel: usize, pw: PulseWidth) -> Result<()> {
        let _enter = self.span.enter();
        debug!("ch={}, pw={:?}", channel, pw);

        self.check_channel(channel)?;
        self.check_pulse_width(channel, pw)?;
        let Some(value) = pw.device_value() else {
            return Ok(());
        };

        let mut state = self.lock();
        let device = state.device.as_mut().ok_or(ServoError::Closed)?;
        device.set_pulse_width(Target::Output(channel), value)?;

        let mut next = state.snapshot.to_vec();
        next[channel] = pw;
        state.snapshot = next.into();
        Ok(())
    }

    /// Set the pulse widths of all channels at once.
    ///
    /// `pws` must hold exactly one entry per channel; `NoOp` entries are
    /// skipped. Entries are validated and written in channel order, and the
    /// first invalid one stops the batch. Channels written before it keep
    /// their new value.
    pub fn set_all(&self, pws: &[PulseWidth]) -> Result<()> {
        let _enter = self.span.enter();
        debug!("pw={:?}", pws);

        if pws.len() != self.channel_count {
            return Err(ServoError::LengthMismatch {
                expected: self.channel_count,
                actual: pws.len(),
            });
        }

        let mut state = self.lock();
        let mut next = state.snapshot.to_vec();
        let device = state.device.as_mut().ok_or(ServoError::Closed)?;

        let mut result = Ok(());
        for (channel, &pw) in pws.iter().enumerate() {
            let Some(value) = pw.device_value() else {
                debug!("ch[{}]: do nothing", channel);
                continue;
            };
            if let Err(e) = self.check_pulse_width(channel, pw) {
                result = Err(e);
                break;
            }
            if let Err(e) = device.set_pulse_width(Target::Output(channel), value) {
                result = Err(e.into());
                break;
            }
            next[channel] = pw;
        }

        state.snapshot = next.into();
        debug!("snapshot={:?}", state.snapshot);
        result
    }

    /// Turn every output off with one broadcast write
    pub fn freeze_all(&self) -> Result<()> {
        let _enter = self.span.enter();
        debug!("Freezing all outputs");

        let mut state = self.lock();
        let device = state.device.as_mut().ok_or(ServoError::Closed)?;
        device.set_pulse_width(Target::All, 0)?;
        state.snapshot = all_off(self.channel_count);
        Ok(())
    }

    /// Freeze all outputs, wait for the servos to settle, then release the
    /// device. Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        self.release_device().instrument(self.span.clone()).await
    }

    async fn release_device(&self) -> Result<()> {
        let (mut device, frozen) = {
            let mut state = self.lock();
            let Some(mut device) = state.device.take() else {
                debug!("Already shut down");
                return Ok(());
            };
            info!("Shutting down servo driver");
            let frozen = device.set_pulse_width(Target::All, 0);
            state.snapshot = all_off(self.channel_count);
            (device, frozen)
        };

        tokio::time::sleep(SHUTDOWN_SETTLE).await;

        let released = device.release();
        if let Err(e) = &frozen {
            warn!("Failed to freeze outputs on shutdown: {}", e);
        }
        frozen?;
        released?;
        info!("Servo driver released");
        Ok(())
    }
}

impl Drop for ChannelDriver {
    fn drop(&mut self) {
        // Freeze and release if shutdown() was never reached (safety measure)
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(mut device) = state.device.take() else {
            return;
        };
        let _enter = self.span.enter();
        warn!("Servo driver dropped without shutdown, freezing all outputs");
        if let Err(e) = device.set_pulse_width(Target::All, 0) {
            warn!("Failed to freeze outputs on drop: {}", e);
        }
        if let Err(e) = device.release() {
            warn!("Failed to release device on drop: {}", e);
        }
    }
}
