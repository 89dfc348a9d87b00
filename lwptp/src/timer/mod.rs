//! Millisecond timers that drive the port
//!
//! The [`TimerBank`] is meant to be shared between the port and a periodic
//! interrupt or thread that calls [`TimerBank::tick`].

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// The timers used by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TimerId {
    PDelayRequest = 0,
    DelayRequest,
    Sync,
    AnnounceReceipt,
    Announce,
    Qualification,
    SyncReceipt,
}

/// Number of timers a port needs
pub const TIMER_COUNT: usize = 7;

impl TimerId {
    pub const ALL: [TimerId; TIMER_COUNT] = [
        TimerId::PDelayRequest,
        TimerId::DelayRequest,
        TimerId::Sync,
        TimerId::AnnounceReceipt,
        TimerId::Announce,
        TimerId::Qualification,
        TimerId::SyncReceipt,
    ];
}

/// A bank of periodic one-shot-flag timers
pub trait TimerService {
    /// (Re)start the timer at `index`, expiring every `interval_ms`
    fn start(&self, index: usize, interval_ms: u32);

    /// Stop the timer at `index` and clear a pending expiry
    fn stop(&self, index: usize);

    /// Whether the timer at `index` expired since the last call. Reading the
    /// flag clears it.
    fn has_expired(&self, index: usize) -> bool;

    /// Monotonic milliseconds since the service started, wrapping at
    /// [`u32::MAX`]
    fn elapsed_ms(&self) -> u32;
}

impl<T: TimerService + ?Sized> TimerService for &T {
    fn start(&self, index: usize, interval_ms: u32) {
        (**self).start(index, interval_ms)
    }

    fn stop(&self, index: usize) {
        (**self).stop(index)
    }

    fn has_expired(&self, index: usize) -> bool {
        (**self).has_expired(index)
    }

    fn elapsed_ms(&self) -> u32 {
        (**self).elapsed_ms()
    }
}

/// Fixed size set of timers counting down in milliseconds
///
/// All state is kept in atomics so a bank in a `static` can be ticked from
/// an interrupt handler while the port reads it. Out of range indices are
/// ignored.
#[derive(Debug)]
pub struct TimerBank<const N: usize = TIMER_COUNT> {
    intervals: [AtomicU32; N],
    remaining: [AtomicU32; N],
    expired: [AtomicBool; N],
    elapsed: AtomicU32,
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU32 = AtomicU32::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const NOT_EXPIRED: AtomicBool = AtomicBool::new(false);

impl<const N: usize> TimerBank<N> {
    pub const fn new() -> Self {
        Self {
            intervals: [ZERO; N],
            remaining: [ZERO; N],
            expired: [NOT_EXPIRED; N],
            elapsed: AtomicU32::new(0),
        }
    }

    /// Advance all running timers by `elapsed_ms`
    pub fn tick(&self, elapsed_ms: u32) {
        self.elapsed.fetch_add(elapsed_ms, Ordering::AcqRel);

        for index in 0..N {
            let interval = self.intervals[index].load(Ordering::Acquire);
            if interval == 0 {
                continue;
            }

            let previous = self.remaining[index]
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                    Some(match remaining.checked_sub(elapsed_ms) {
                        Some(left) if left > 0 => left,
                        _ => interval,
                    })
                })
                .unwrap_or(interval);

            if previous <= elapsed_ms {
                self.expired[index].store(true, Ordering::Release);
            }
        }
    }
}

impl<const N: usize> Default for TimerBank<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TimerService for TimerBank<N> {
    fn start(&self, index: usize, interval_ms: u32) {
        let (Some(interval), Some(remaining), Some(expired)) = (
            self.intervals.get(index),
            self.remaining.get(index),
            self.expired.get(index),
        ) else {
            return;
        };

        log::trace!("timer {} started with {} ms", index, interval_ms);

        interval.store(0, Ordering::Release);
        expired.store(false, Ordering::Release);
        remaining.store(interval_ms, Ordering::Release);
        interval.store(interval_ms, Ordering::Release);
    }

    fn stop(&self, index: usize) {
        if let (Some(interval), Some(expired)) =
            (self.intervals.get(index), self.expired.get(index))
        {
            interval.store(0, Ordering::Release);
            expired.store(false, Ordering::Release);
        }
    }

    fn has_expired(&self, index: usize) -> bool {
        self.expired
            .get(index)
            .map(|expired| expired.swap(false, Ordering::AcqRel))
            .unwrap_or(false)
    }

    fn elapsed_ms(&self) -> u32 {
        self.elapsed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_interval() {
        let timers = TimerBank::<TIMER_COUNT>::new();
        let sync = TimerId::Sync as usize;
        timers.start(sync, 100);

        timers.tick(99);
        assert!(!timers.has_expired(sync));

        timers.tick(1);
        assert!(timers.has_expired(sync));
        // reading clears the flag
        assert!(!timers.has_expired(sync));
    }

    #[test]
    fn timers_are_periodic() {
        let timers = TimerBank::<2>::new();
        timers.start(0, 10);

        for _ in 0..3 {
            timers.tick(5);
            assert!(!timers.has_expired(0));
            timers.tick(5);
            assert!(timers.has_expired(0));
        }
    }

    #[test]
    fn stop_clears_pending_expiry() {
        let timers = TimerBank::<2>::new();
        timers.start(1, 10);
        timers.tick(20);
        timers.stop(1);
        assert!(!timers.has_expired(1));

        timers.tick(100);
        assert!(!timers.has_expired(1));
    }

    #[test]
    fn restart_resets_countdown() {
        let timers = TimerBank::<1>::new();
        timers.start(0, 10);
        timers.tick(8);
        timers.start(0, 10);
        timers.tick(8);
        assert!(!timers.has_expired(0));
        timers.tick(2);
        assert!(timers.has_expired(0));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let timers = TimerBank::<2>::new();
        timers.start(5, 10);
        timers.tick(20);
        assert!(!timers.has_expired(5));
        timers.stop(5);
    }

    #[test]
    fn elapsed_wraps() {
        let timers = TimerBank::<1>::new();
        timers.tick(u32::MAX);
        assert_eq!(timers.elapsed_ms(), u32::MAX);
        timers.tick(2);
        assert_eq!(timers.elapsed_ms(), 1);
    }

    #[test]
    fn usable_as_static() {
        static TIMERS: TimerBank = TimerBank::new();
        let timers: &TimerBank = &TIMERS;
        timers.start(TimerId::Announce as usize, 1);
        TIMERS.tick(1);
        assert!(timers.has_expired(TimerId::Announce as usize));
    }
}
