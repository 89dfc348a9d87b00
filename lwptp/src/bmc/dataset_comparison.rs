//! Data set comparison algorithm, IEEE1588-2008 section 9.3.4

use core::cmp::Ordering;

use crate::datastructures::{
    common::{ClockIdentity, ClockQuality, PortIdentity},
    datasets::DefaultDS,
    messages::{AnnounceMessage, Header},
};

/// A collection of data that is gathered from other sources (mainly announce
/// messages and the DefaultDS). When gathered from two different sources, the
/// [`compare`](ComparisonDataset::compare) method can be used to find out
/// which source is better according to the dataset comparison algorithm.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) struct ComparisonDataset {
    gm_priority_1: u8,
    gm_identity: ClockIdentity,
    gm_clock_quality: ClockQuality,
    gm_priority_2: u8,
    steps_removed: u16,
    identity_of_sender: PortIdentity,
}

impl ComparisonDataset {
    pub(crate) fn from_announce_message(header: &Header, message: &AnnounceMessage) -> Self {
        Self {
            gm_priority_1: message.grandmaster_priority_1,
            gm_identity: message.grandmaster_identity,
            gm_clock_quality: message.grandmaster_clock_quality,
            gm_priority_2: message.grandmaster_priority_2,
            steps_removed: message.steps_removed,
            identity_of_sender: header.source_port_identity,
        }
    }

    pub(crate) fn from_own_data(data: &DefaultDS, port_identity: PortIdentity) -> Self {
        Self {
            gm_priority_1: data.priority_1,
            gm_identity: data.clock_identity,
            gm_clock_quality: data.clock_quality,
            gm_priority_2: data.priority_2,
            steps_removed: 0,
            identity_of_sender: port_identity,
        }
    }

    /// Returns the ordering of `self` in comparison to `other`, where
    /// [`Ordering::Less`] means `self` is the better master.
    pub(crate) fn compare(&self, other: &Self) -> Ordering {
        if self.gm_identity != other.gm_identity {
            self.gm_priority_1
                .cmp(&other.gm_priority_1)
                .then(
                    self.gm_clock_quality
                        .clock_class
                        .cmp(&other.gm_clock_quality.clock_class),
                )
                .then(
                    self.gm_clock_quality
                        .clock_accuracy
                        .cmp(&other.gm_clock_quality.clock_accuracy),
                )
                .then(
                    self.gm_clock_quality
                        .offset_scaled_log_variance
                        .cmp(&other.gm_clock_quality.offset_scaled_log_variance),
                )
                .then(self.gm_priority_2.cmp(&other.gm_priority_2))
                .then(self.gm_identity.cmp(&other.gm_identity))
        } else {
            // same grandmaster seen through different paths
            self.steps_removed
                .cmp(&other.steps_removed)
                .then(self.identity_of_sender.cmp(&other.identity_of_sender))
        }
    }
}
