//! Definitions of the abstract clock device

use crate::time::TimeInternal;

/// The hardware clock and timestamping unit used by a port
///
/// Implementations supply the device specific limits, such as the largest
/// frequency correction the oscillator accepts.
pub trait Clock {
    type Error: core::fmt::Debug;

    /// Get the current time of the clock
    fn now(&self) -> Result<TimeInternal, Self::Error>;

    /// Step the clock to the given time
    fn set_time(&mut self, time: TimeInternal) -> Result<(), Self::Error>;

    /// Correct the oscillator frequency, in parts per billion. Positive
    /// values speed the clock up. Values beyond
    /// [`max_frequency_adjustment`](Self::max_frequency_adjustment) are
    /// clamped.
    fn adjust_frequency(&mut self, ppb: i32) -> Result<(), Self::Error>;

    /// Largest frequency correction in parts per billion
    fn max_frequency_adjustment(&self) -> i32;

    /// Transmit timestamp of the last event message sent
    fn tx_timestamp(&mut self) -> Result<TimeInternal, Self::Error>;

    /// Receive timestamp of the last message received
    fn rx_timestamp(&mut self) -> Result<TimeInternal, Self::Error>;
}

/// Limit a frequency correction to `[-max, max]`
pub fn clamp_frequency(ppb: i32, max: i32) -> i32 {
    let max = max.saturating_abs();
    ppb.clamp(-max, max)
}
