//! Implementation of the best master clock algorithm [Bmca]

use core::cmp::Ordering;

use super::{
    dataset_comparison::ComparisonDataset,
    foreign_master::{ForeignMasterList, ForeignMasterRecord},
};
use crate::datastructures::{
    common::PortIdentity,
    datasets::DefaultDS,
    messages::{AnnounceMessage, Header},
};

/// Object implementing the Best Master Clock Algorithm for a single port
///
/// Usage:
///
/// - When the port receives an announce message, it registers it with
///   [`Bmca::register_announce_message`]
/// - When it is time to run the algorithm, the port takes the best qualified
///   announce message with [`Bmca::best_announce_message`]
/// - [`Bmca::calculate_recommended_state`] then compares it with the own
///   dataset
#[derive(Debug)]
pub struct Bmca<const N: usize> {
    foreign_master_list: ForeignMasterList<N>,
    own_port_identity: PortIdentity,
}

impl<const N: usize> Bmca<N> {
    pub fn new(
        own_port_identity: PortIdentity,
        announce_interval_ms: u32,
        max_foreign_records: usize,
    ) -> Self {
        Self {
            foreign_master_list: ForeignMasterList::new(
                own_port_identity,
                announce_interval_ms,
                max_foreign_records,
            ),
            own_port_identity,
        }
    }

    /// Register a received announce message to the BMC algorithm. Returns
    /// whether the message was stored.
    pub fn register_announce_message(
        &mut self,
        header: &Header,
        announce_message: &AnnounceMessage,
        now: u32,
    ) -> bool {
        // Ignore messages coming from the same port
        if header.source_port_identity == self.own_port_identity {
            return false;
        }

        self.foreign_master_list
            .register_announce_message(header, announce_message, now)
    }

    /// The best qualified announce message received in `domain_number`
    pub fn best_announce_message(
        &self,
        domain_number: u8,
        now: u32,
    ) -> Option<BestAnnounceMessage> {
        self.foreign_master_list
            .best_qualified(domain_number, now)
            .map(BestAnnounceMessage::from)
    }

    pub fn foreign_masters(&self) -> &ForeignMasterList<N> {
        &self.foreign_master_list
    }

    pub fn clear(&mut self) {
        self.foreign_master_list.clear();
    }

    /// Calculates the recommended port state, the state decision algorithm
    /// for an ordinary clock.
    ///
    /// - `own_data`: The DefaultDS data of our own ptp instance.
    /// - `own_port_identity`: The identity of the port, used as tie-breaker
    ///   when the own clock is seen through a foreign master.
    /// - `best_port_announce_message`: The best qualified foreign announce
    ///   message, if any.
    ///
    /// If None is returned, then the port should remain in the same state as
    /// it is now.
    pub fn calculate_recommended_state(
        own_data: &DefaultDS,
        own_port_identity: PortIdentity,
        best_port_announce_message: Option<BestAnnounceMessage>,
    ) -> Option<RecommendedState> {
        let Some(best) = best_port_announce_message else {
            return (!own_data.slave_only).then_some(RecommendedState::M1(*own_data));
        };

        let d0 = ComparisonDataset::from_own_data(own_data, own_port_identity);
        let erbest = ComparisonDataset::from_announce_message(&best.header, &best.message);

        match d0.compare(&erbest) {
            Ordering::Less | Ordering::Equal if own_data.slave_only => {
                Some(RecommendedState::P1(best))
            }
            Ordering::Less | Ordering::Equal => Some(RecommendedState::M1(*own_data)),
            Ordering::Greater => Some(RecommendedState::S1(best)),
        }
    }
}

/// An announce message together with the header it was received with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestAnnounceMessage {
    pub header: Header,
    pub message: AnnounceMessage,
}

impl From<&ForeignMasterRecord> for BestAnnounceMessage {
    fn from(record: &ForeignMasterRecord) -> Self {
        Self {
            header: record.header,
            message: record.announce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedState {
    /// This clock should be the master
    M1(DefaultDS),
    /// A slave-only clock that is better than every foreign master
    P1(BestAnnounceMessage),
    /// The foreign master should be followed
    S1(BestAnnounceMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::InstanceConfig,
        datastructures::common::{ClockIdentity, ClockQuality, TimeSource, Timestamp},
    };

    const OWN: PortIdentity = PortIdentity {
        clock_identity: ClockIdentity([5; 8]),
        port_number: 1,
    };

    fn own_data(priority_1: u8, slave_only: bool) -> DefaultDS {
        DefaultDS::new(&InstanceConfig {
            clock_identity: OWN.clock_identity,
            priority_1,
            slave_only,
            clock_quality: ClockQuality {
                clock_class: 6,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn foreign(priority_1: u8) -> BestAnnounceMessage {
        let identity = ClockIdentity([9; 8]);
        BestAnnounceMessage {
            header: Header {
                source_port_identity: PortIdentity {
                    clock_identity: identity,
                    port_number: 1,
                },
                ..Default::default()
            },
            message: AnnounceMessage {
                origin_timestamp: Timestamp::default(),
                current_utc_offset: 37,
                grandmaster_priority_1: priority_1,
                grandmaster_clock_quality: ClockQuality {
                    clock_class: 6,
                    ..Default::default()
                },
                grandmaster_priority_2: 128,
                grandmaster_identity: identity,
                steps_removed: 0,
                time_source: TimeSource::Gps,
            },
        }
    }

    #[test]
    fn empty_table() {
        let own = own_data(128, false);
        assert_eq!(
            Bmca::<5>::calculate_recommended_state(&own, OWN, None),
            Some(RecommendedState::M1(own))
        );

        let own = own_data(128, true);
        assert_eq!(Bmca::<5>::calculate_recommended_state(&own, OWN, None), None);
    }

    #[test]
    fn better_own_clock() {
        let own = own_data(100, false);
        assert_eq!(
            Bmca::<5>::calculate_recommended_state(&own, OWN, Some(foreign(200))),
            Some(RecommendedState::M1(own))
        );
    }

    #[test]
    fn better_foreign_clock() {
        let own = own_data(200, false);
        let best = foreign(100);
        assert_eq!(
            Bmca::<5>::calculate_recommended_state(&own, OWN, Some(best)),
            Some(RecommendedState::S1(best))
        );
    }

    #[test]
    fn slave_only_never_masters() {
        let own = own_data(100, true);
        let best = foreign(200);
        assert_eq!(
            Bmca::<5>::calculate_recommended_state(&own, OWN, Some(best)),
            Some(RecommendedState::P1(best))
        );

        let own = own_data(200, true);
        let best = foreign(100);
        assert_eq!(
            Bmca::<5>::calculate_recommended_state(&own, OWN, Some(best)),
            Some(RecommendedState::S1(best))
        );
    }

    #[test]
    fn own_port_is_ignored() {
        let mut bmca = Bmca::<5>::new(OWN, 1000, 5);
        let mut best = foreign(100);
        best.header.source_port_identity = OWN;
        assert!(!bmca.register_announce_message(&best.header, &best.message, 0));
        assert!(bmca.foreign_masters().is_empty());
    }
}
