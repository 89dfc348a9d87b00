//! Implementation of the abstract clock for the linux platform
//!
//! Packet timestamps come from the kernel: the network layer leaves the
//! timestamp of every packet it hands out or sends with the clock, where the
//! port picks it up through [`Clock::tx_timestamp`] and
//! [`Clock::rx_timestamp`].

use std::{cell::Cell, rc::Rc};

use clock_steering::{unix::UnixClock, Clock as _, TimeOffset};
use lwptp::{clamp_frequency, time::TimeInternal, Clock};

/// Largest frequency correction the kernel accepts, 500 ppm
const MAX_FREQUENCY_ADJUSTMENT_PPB: i32 = 500_000;

#[derive(Debug, Default)]
struct PacketTimestamps {
    tx: Cell<Option<TimeInternal>>,
    rx: Cell<Option<TimeInternal>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("clock error: {0}")]
    Unix(#[from] clock_steering::unix::Error),
    #[error("no transmit timestamp available")]
    MissingTxTimestamp,
    #[error("no receive timestamp available")]
    MissingRxTimestamp,
}

/// A linux system clock. Clones share their captured timestamps.
#[derive(Debug, Clone)]
pub struct LinuxClock {
    clock: UnixClock,
    timestamps: Rc<PacketTimestamps>,
}

impl LinuxClock {
    pub fn realtime() -> Self {
        Self {
            clock: UnixClock::CLOCK_REALTIME,
            timestamps: Rc::default(),
        }
    }

    pub(crate) fn read(&self) -> Result<TimeInternal, ClockError> {
        let now = self.clock.now()?;
        Ok(TimeInternal::new(now.seconds as i64, now.nanos as i64))
    }

    /// Remember the transmit time of the event message that was just sent
    pub fn record_tx(&self, timestamp: TimeInternal) {
        self.timestamps.tx.set(Some(timestamp));
    }

    /// Remember the receive time of the message that is about to be handed
    /// to the port
    pub fn record_rx(&self, timestamp: TimeInternal) {
        self.timestamps.rx.set(Some(timestamp));
    }
}

/// Split an offset in a whole number of seconds and a non-negative amount of
/// nanoseconds, as the kernel wants it
fn time_offset(offset: TimeInternal) -> TimeOffset {
    let nanos = offset.as_nanos();

    TimeOffset {
        seconds: nanos.div_euclid(1_000_000_000) as _,
        nanos: nanos.rem_euclid(1_000_000_000) as _,
    }
}

impl Clock for LinuxClock {
    type Error = ClockError;

    fn now(&self) -> Result<TimeInternal, Self::Error> {
        self.read()
    }

    fn set_time(&mut self, time: TimeInternal) -> Result<(), Self::Error> {
        let offset = time - self.read()?;
        log::info!("stepping clock by {}", offset);

        self.clock.step_clock(time_offset(offset))?;
        Ok(())
    }

    fn adjust_frequency(&mut self, ppb: i32) -> Result<(), Self::Error> {
        let ppb = clamp_frequency(ppb, self.max_frequency_adjustment());
        log::trace!("adjusting clock frequency by {} ppb", ppb);

        // the kernel takes parts per million
        self.clock.set_frequency(ppb as f64 / 1_000.0)?;
        Ok(())
    }

    fn max_frequency_adjustment(&self) -> i32 {
        MAX_FREQUENCY_ADJUSTMENT_PPB
    }

    fn tx_timestamp(&mut self) -> Result<TimeInternal, Self::Error> {
        self.timestamps
            .tx
            .take()
            .ok_or(ClockError::MissingTxTimestamp)
    }

    fn rx_timestamp(&mut self) -> Result<TimeInternal, Self::Error> {
        self.timestamps
            .rx
            .take()
            .ok_or(ClockError::MissingRxTimestamp)
    }
}
