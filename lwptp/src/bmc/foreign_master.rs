//! Implementation of the [ForeignMasterList]

use arrayvec::ArrayVec;

use super::dataset_comparison::ComparisonDataset;
use crate::datastructures::{
    common::PortIdentity,
    messages::{AnnounceMessage, Header},
};

/// The time window in which announce messages are valid.
/// To get the real window, multiply it with the announce interval of the port.
const FOREIGN_MASTER_TIME_WINDOW: u32 = 4;

/// This is the amount of announce messages that must have been received within
/// the time window for a foreign master to be valid
const FOREIGN_MASTER_THRESHOLD: u16 = 2;

/// Announce messages that passed through this many clocks are ignored
const MAX_STEPS_REMOVED: u16 = 255;

/// Default capacity of the foreign master table
pub const DEFAULT_MAX_FOREIGN_RECORDS: usize = 5;

/// The most recent announce of a foreign master and how often it was seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignMasterRecord {
    pub header: Header,
    pub announce: AnnounceMessage,
    /// Announces received within the current window
    pub announce_count: u16,
    /// Timer service milliseconds of the last update
    pub last_update: u32,
}

impl ForeignMasterRecord {
    pub fn port_identity(&self) -> PortIdentity {
        self.header.source_port_identity
    }

    fn age(&self, now: u32) -> u32 {
        now.wrapping_sub(self.last_update)
    }

    pub(crate) fn comparison_dataset(&self) -> ComparisonDataset {
        ComparisonDataset::from_announce_message(&self.header, &self.announce)
    }
}

/// Fixed capacity table of candidate masters
///
/// At most one record per sender port identity is kept. When the table is
/// full, a new sender replaces the least recently updated record.
#[derive(Debug)]
pub struct ForeignMasterList<const N: usize = DEFAULT_MAX_FOREIGN_RECORDS> {
    foreign_masters: ArrayVec<ForeignMasterRecord, N>,
    limit: usize,
    window_ms: u32,
    own_port_identity: PortIdentity,
}

impl<const N: usize> ForeignMasterList<N> {
    /// - `own_port_identity`: The identity of the port for which this list is
    ///   used
    /// - `announce_interval_ms`: The announce interval of the port
    /// - `limit`: The maximum number of records, clamped to `N`
    pub fn new(own_port_identity: PortIdentity, announce_interval_ms: u32, limit: usize) -> Self {
        Self {
            foreign_masters: ArrayVec::new(),
            limit: limit.min(N),
            window_ms: announce_interval_ms.saturating_mul(FOREIGN_MASTER_TIME_WINDOW),
            own_port_identity,
        }
    }

    pub fn len(&self) -> usize {
        self.foreign_masters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foreign_masters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForeignMasterRecord> {
        self.foreign_masters.iter()
    }

    pub fn clear(&mut self) {
        self.foreign_masters.clear();
    }

    /// Store an announce message. Returns whether it was accepted.
    pub fn register_announce_message(
        &mut self,
        header: &Header,
        announce_message: &AnnounceMessage,
        now: u32,
    ) -> bool {
        self.purge_stale(now);

        if !self.is_announce_message_qualified(header, announce_message) {
            return false;
        }

        if let Some(record) = self
            .foreign_masters
            .iter_mut()
            .find(|record| record.port_identity() == header.source_port_identity)
        {
            let newer_by = header.sequence_id.wrapping_sub(record.header.sequence_id);

            if newer_by >= u16::MAX / 2 {
                log::debug!(
                    "ignoring out of order announce {} from {}",
                    header.sequence_id,
                    header.source_port_identity
                );
                return false;
            }

            if newer_by != 0 {
                record.announce_count = record.announce_count.saturating_add(1);
            }
            record.header = *header;
            record.announce = *announce_message;
            record.last_update = now;

            return true;
        }

        let record = ForeignMasterRecord {
            header: *header,
            announce: *announce_message,
            announce_count: 1,
            last_update: now,
        };

        if self.foreign_masters.len() < self.limit {
            self.foreign_masters.push(record);
        } else if let Some(oldest) = self
            .foreign_masters
            .iter_mut()
            .max_by_key(|record| record.age(now))
        {
            log::debug!(
                "foreign master table full, replacing {}",
                oldest.port_identity()
            );
            *oldest = record;
        }

        true
    }

    /// The best record that has been seen often enough recently to be
    /// considered as a master
    pub fn best_qualified(&self, domain_number: u8, now: u32) -> Option<&ForeignMasterRecord> {
        self.foreign_masters
            .iter()
            .filter(|record| {
                record.header.domain_number == domain_number
                    && record.announce_count >= FOREIGN_MASTER_THRESHOLD
                    && record.age(now) <= self.window_ms
            })
            .min_by(|a, b| a.comparison_dataset().compare(&b.comparison_dataset()))
    }

    /// Drop the records that were not updated within the time window
    fn purge_stale(&mut self, now: u32) {
        let window_ms = self.window_ms;
        let before = self.foreign_masters.len();

        self.foreign_masters
            .retain(|record| record.age(now) <= window_ms);

        let purged = before - self.foreign_masters.len();
        if purged > 0 {
            log::debug!("purged {} stale foreign master records", purged);
        }
    }

    fn is_announce_message_qualified(
        &self,
        header: &Header,
        announce_message: &AnnounceMessage,
    ) -> bool {
        let source_identity = header.source_port_identity;

        // 1. The message must not come from our own ptp instance
        if source_identity.clock_identity == self.own_port_identity.clock_identity {
            return false;
        }

        // 2. The grandmaster must not be too far away
        if announce_message.steps_removed >= MAX_STEPS_REMOVED {
            return false;
        }

        true
    }
}
