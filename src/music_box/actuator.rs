// Tap gestures for the music box pluckers
//
// A tap pushes the selected pins, holds, pulls them back and holds again.
// The actuator may be shared between tasks: the channel table is read-only
// after construction and every batch write is serialized by the driver.
// Overlapping taps on the same channel are last-writer-wins.

use std::time::Duration;

use tracing::{Instrument, Span, debug, info};

use crate::config::HOLE_ON_CHARS;
use crate::error::{Result, ServoError};
use crate::servo::{ChannelDriver, PulseWidth};

use super::table::ChannelTable;

/// Which half of a tap a batch command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Push,
    Pull,
}

/// Channels whose character in `pattern` marks an active hole.
///
/// `"--o-O-*-"` gives `[2, 4, 6]`.
pub fn decode_hole_pattern(pattern: &str) -> Vec<usize> {
    pattern
        .chars()
        .enumerate()
        .filter(|(_, c)| HOLE_ON_CHARS.contains(*c))
        .map(|(i, _)| i)
        .collect()
}

pub struct MusicBoxActuator {
    driver: ChannelDriver,
    table: ChannelTable,
    on_interval: Duration,
    off_interval: Duration,
    span: Span,
}

impl MusicBoxActuator {
    /// Build the actuator and pull every pin to its rest position
    pub fn new(
        driver: ChannelDriver,
        table: ChannelTable,
        on_interval: Duration,
        off_interval: Duration,
        span: Span,
    ) -> Result<Self> {
        if table.len() != driver.channel_count() {
            return Err(ServoError::LengthMismatch {
                expected: driver.channel_count(),
                actual: table.len(),
            });
        }

        let actuator = Self {
            driver,
            table,
            on_interval,
            off_interval,
            span,
        };
        {
            let _enter = actuator.span.enter();
            info!(
                "Music box ready: {} servos, on {:?}, off {:?}",
                actuator.channel_count(),
                on_interval,
                off_interval
            );
        }

        let all: Vec<usize> = (0..actuator.channel_count()).collect();
        actuator.pull(&all)?;
        Ok(actuator)
    }

    pub fn channel_count(&self) -> usize {
        self.driver.channel_count()
    }

    pub fn driver(&self) -> &ChannelDriver {
        &self.driver
    }

    pub fn table(&self) -> &ChannelTable {
        &self.table
    }

    /// Build the batch for one phase: configured widths for `channels`,
    /// `NoOp` for every other channel
    pub fn command(&self, phase: Phase, channels: &[usize]) -> Result<Vec<PulseWidth>> {
        let count = self.channel_count();
        if let Some(&channel) = channels.iter().find(|&&ch| ch >= count) {
            return Err(ServoError::InvalidChannel { channel, count });
        }

        let mut pws = vec![PulseWidth::NoOp; count];
        for &ch in channels {
            let pw = match phase {
                Phase::Push => self.table.on(ch),
                Phase::Pull => self.table.off(ch),
            };
            // table and driver have the same length, checked in new()
            pws[ch] = pw.unwrap_or(PulseWidth::NoOp);
        }
        Ok(pws)
    }

    fn push_pull(&self, phase: Phase, channels: &[usize]) -> Result<()> {
        let _enter = self.span.enter();
        debug!("{:?} ch={:?}", phase, channels);

        let pws = self.command(phase, channels)?;
        self.driver.set_all(&pws)
    }

    /// Push the pins of `channels`
    pub fn push(&self, channels: &[usize]) -> Result<()> {
        self.push_pull(Phase::Push, channels)
    }

    /// Pull the pins of `channels` back
    pub fn pull(&self, channels: &[usize]) -> Result<()> {
        self.push_pull(Phase::Pull, channels)
    }

    /// Pluck the pins of `channels`: push, hold, pull, hold.
    /// Runs to completion once started.
    pub async fn tap(&self, channels: &[usize]) -> Result<()> {
        self.push_hold_pull(channels)
            .instrument(self.span.clone())
            .await
    }

    async fn push_hold_pull(&self, channels: &[usize]) -> Result<()> {
        debug!("tap ch={:?}", channels);
        self.push(channels)?;
        tokio::time::sleep(self.on_interval).await;
        self.pull(channels)?;
        tokio::time::sleep(self.off_interval).await;
        Ok(())
    }

    /// Release the device. Await every in-flight tap first.
    pub async fn shutdown(&self) -> Result<()> {
        self.driver.shutdown().await
    }
}
