use core::fmt::{Display, Formatter};

use crate::{datastructures::common::PortIdentity, time::TimeInternal};

/// The state of a [`Port`](super::Port)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    #[default]
    Initializing,
    Faulty,
    Disabled,
    Listening,
    PreMaster,
    Master,
    Passive,
    Uncalibrated(SlaveState),
    Slave(SlaveState),
}

impl PortState {
    /// Whether the port exchanges messages in this state
    pub(super) fn is_operational(&self) -> bool {
        !matches!(
            self,
            PortState::Initializing | PortState::Faulty | PortState::Disabled
        )
    }

    pub(super) fn slave_state(&self) -> Option<&SlaveState> {
        match self {
            PortState::Uncalibrated(state) | PortState::Slave(state) => Some(state),
            _ => None,
        }
    }

    pub(super) fn slave_state_mut(&mut self) -> Option<&mut SlaveState> {
        match self {
            PortState::Uncalibrated(state) | PortState::Slave(state) => Some(state),
            _ => None,
        }
    }
}

impl Display for PortState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PortState::Initializing => write!(f, "Initializing"),
            PortState::Faulty => write!(f, "Faulty"),
            PortState::Disabled => write!(f, "Disabled"),
            PortState::Listening => write!(f, "Listening"),
            PortState::PreMaster => write!(f, "PreMaster"),
            PortState::Master => write!(f, "Master"),
            PortState::Passive => write!(f, "Passive"),
            PortState::Uncalibrated(_) => write!(f, "Uncalibrated"),
            PortState::Slave(_) => write!(f, "Slave"),
        }
    }
}

/// Measurements in progress while following a master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaveState {
    pub(super) remote_master: PortIdentity,

    pub(super) sync_state: SyncState,
    pub(super) delay_state: DelayState,
    pub(super) peer_delay_state: PeerDelayState,

    /// Last `t2 - t1`, needed to complete an end to end delay measurement
    pub(super) master_to_slave: Option<TimeInternal>,
    /// Last unfiltered mean path delay
    pub(super) mean_path_delay: Option<TimeInternal>,
}

impl SlaveState {
    pub(super) fn new(remote_master: PortIdentity) -> Self {
        SlaveState {
            remote_master,
            sync_state: SyncState::Empty,
            delay_state: DelayState::Empty,
            peer_delay_state: PeerDelayState::Empty,
            master_to_slave: None,
            mean_path_delay: None,
        }
    }

    pub fn remote_master(&self) -> PortIdentity {
        self.remote_master
    }
}

/// A two-step sync waiting for its follow up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SyncState {
    Empty,
    Measuring {
        id: u16,
        recv_time: TimeInternal,
        correction: TimeInternal,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum DelayState {
    Empty,
    Measuring { id: u16, send_time: TimeInternal },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum PeerDelayState {
    Empty,
    Measuring {
        id: u16,
        /// Transmit time of the request
        t1: TimeInternal,
        /// Request receive time at the peer and receive time of the response
        response: Option<(TimeInternal, TimeInternal)>,
        correction: TimeInternal,
    },
}
