use rand::Rng;

use super::ConfigError;
use crate::time::{Interval, TimeInternal};

/// Which delay mechanism a port is using.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum DelayMechanism {
    /// End to end delay mechanism. Delay measurement is done directly to the
    /// chosen master, across potential transparent nodes in between.
    #[default]
    E2E,
    /// Peer to peer delay mechanism. Delay measurement is done on the
    /// individual links.
    P2P,
    /// No delay measurement, the mean path delay stays zero
    Disabled,
}

/// Configuration items of the PTP PortDS dataset. Dynamical fields are kept
/// as part of [`Port`](crate::port::Port).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PortConfig {
    /// The mechanism used to measure the delay at this port.
    pub delay_mechanism: DelayMechanism,

    /// The time between announcements.
    pub announce_interval_ms: u32,

    /// Specifies how many announce intervals to wait until the announce
    /// message expires.
    pub announce_receipt_timeout: u8,

    /// Time between two sync messages when this port is in master mode.
    pub sync_interval_ms: u32,

    /// Mean time between two (peer) delay requests.
    pub delay_request_interval_ms: u32,

    /// Upper bound on the foreign master table, at most its capacity.
    pub max_foreign_records: usize,

    /// Subtracted from every receive timestamp
    pub inbound_latency: TimeInternal,

    /// Added to every transmit timestamp
    pub outbound_latency: TimeInternal,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            delay_mechanism: DelayMechanism::E2E,
            announce_interval_ms: 2000,
            announce_receipt_timeout: 3,
            sync_interval_ms: 1000,
            delay_request_interval_ms: 1000,
            max_foreign_records: 5,
            inbound_latency: TimeInternal::ZERO,
            outbound_latency: TimeInternal::ZERO,
        }
    }
}

impl PortConfig {
    pub fn validate(&self, foreign_capacity: usize) -> Result<(), ConfigError> {
        if self.announce_interval_ms == 0
            || self.sync_interval_ms == 0
            || self.delay_request_interval_ms == 0
            || self.announce_receipt_timeout == 0
        {
            return Err(ConfigError::InvalidInterval);
        }

        if self.max_foreign_records == 0 || self.max_foreign_records > foreign_capacity {
            return Err(ConfigError::InvalidForeignRecords {
                capacity: foreign_capacity,
            });
        }

        Ok(())
    }

    pub fn announce_interval(&self) -> Interval {
        Interval::from_millis(self.announce_interval_ms)
    }

    pub fn sync_interval(&self) -> Interval {
        Interval::from_millis(self.sync_interval_ms)
    }

    pub fn min_delay_req_interval(&self) -> Interval {
        Interval::from_millis(self.delay_request_interval_ms)
    }

    /// Time without announce messages after which the master is considered
    /// lost, in milliseconds
    pub fn announce_duration(&self, rng: &mut impl Rng) -> u32 {
        // add some randomness so that not all timers expire at the same time
        let factor = 1.0 + rng.sample::<f64, _>(rand::distributions::Open01);
        let duration = self.announce_interval_ms as f64 * self.announce_receipt_timeout as f64;

        (duration * factor) as u32
    }

    /// Time until the next (peer) delay request, uniformly spread over twice
    /// the configured interval
    pub fn delay_request_duration(&self, rng: &mut impl Rng) -> u32 {
        let factor = 2.0 * rng.sample::<f64, _>(rand::distributions::Open01);

        ((self.delay_request_interval_ms as f64 * factor) as u32).max(1)
    }

    /// Time without sync messages from the parent after which it is
    /// considered lost, in milliseconds
    pub fn sync_receipt_duration(&self) -> u32 {
        self.sync_interval_ms
            .saturating_mul(self.announce_receipt_timeout as u32)
    }
}
