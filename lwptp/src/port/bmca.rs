use rand::Rng;

use super::{
    state::{PortState, SlaveState},
    Port,
};
use crate::{
    bmc::bmca::{BestAnnounceMessage, Bmca, RecommendedState},
    datastructures::{
        datasets::{ParentDS, TimePropertiesDS},
        messages::{AnnounceMessage, Header},
    },
    filters::Servo,
    network::NetworkPort,
    time::TimeInternal,
    timer::TimerService,
    Clock,
};

// BMCA related functionality of the port
impl<C, N, T, S, R, const FM: usize> Port<C, N, T, S, R, FM>
where
    C: Clock,
    N: NetworkPort,
    T: TimerService,
    S: Servo,
    R: Rng,
{
    pub(super) fn handle_announce(&mut self, header: &Header, announce: &AnnounceMessage) {
        let now = self.timers.elapsed_ms();
        if !self.bmca.register_announce_message(header, announce, now) {
            return;
        }

        log::debug!(
            "received announce {} from {}",
            header.sequence_id,
            header.source_port_identity
        );

        match self.port_state {
            PortState::Listening | PortState::Passive => self.restart_announce_receipt_timer(),
            PortState::Uncalibrated(SlaveState { remote_master, .. })
            | PortState::Slave(SlaveState { remote_master, .. })
                if remote_master == header.source_port_identity =>
            {
                // Keep following the parent with its latest data
                self.restart_announce_receipt_timer();
                self.apply_s1(header, announce);
            }
            _ => {}
        }

        // Self election is left to the announce receipt timeout
        if let Some(best) = self.best_foreign_master() {
            self.apply_bmca(Some(best));
        }
    }

    pub(super) fn handle_announce_receipt_timeout(&mut self) {
        match self.port_state {
            PortState::Listening => {
                self.run_bmca();
                if self.pending_state.is_none() {
                    self.restart_announce_receipt_timer();
                }
            }
            PortState::Passive | PortState::Uncalibrated(_) | PortState::Slave(_) => {
                log::warn!("no announce messages from the master, listening again");
                self.bmca.clear();
                self.clear_parent();
                self.pending_state = Some(PortState::Listening);
            }
            _ => {}
        }
    }

    pub(super) fn handle_sync_receipt_timeout(&mut self) {
        if self.port_state.slave_state().is_some() {
            log::warn!("no sync messages from the master, listening again");
            self.clear_parent();
            self.pending_state = Some(PortState::Listening);
        }
    }

    fn best_foreign_master(&self) -> Option<BestAnnounceMessage> {
        self.bmca
            .best_announce_message(self.default_ds.domain_number, self.timers.elapsed_ms())
    }

    /// Compare the own dataset with the best foreign master and act on the
    /// outcome
    fn run_bmca(&mut self) {
        let best = self.best_foreign_master();
        self.apply_bmca(best);
    }

    fn apply_bmca(&mut self, best: Option<BestAnnounceMessage>) {
        match Bmca::<FM>::calculate_recommended_state(&self.default_ds, self.port_identity, best) {
            Some(recommended_state) => self.set_recommended_state(recommended_state),
            None => log::trace!("no recommended state, remaining in {}", self.port_state),
        }
    }

    fn set_recommended_state(&mut self, recommended_state: RecommendedState) {
        match recommended_state {
            RecommendedState::M1(_) => {
                // a slave-only port never gets recommended the master state
                debug_assert!(!self.default_ds.slave_only);

                self.clear_parent();

                match self.port_state {
                    PortState::Listening
                    | PortState::Passive
                    | PortState::Uncalibrated(_)
                    | PortState::Slave(_) => self.pending_state = Some(PortState::PreMaster),
                    PortState::PreMaster | PortState::Master => {}
                    PortState::Initializing | PortState::Faulty | PortState::Disabled => {}
                }
            }
            RecommendedState::P1(_) => match self.port_state {
                PortState::Listening
                | PortState::PreMaster
                | PortState::Master
                | PortState::Uncalibrated(_)
                | PortState::Slave(_) => self.pending_state = Some(PortState::Passive),
                PortState::Passive => {}
                PortState::Initializing | PortState::Faulty | PortState::Disabled => {}
            },
            RecommendedState::S1(best) => self.set_recommended_slave_state(best),
        }
    }

    fn set_recommended_slave_state(&mut self, best: BestAnnounceMessage) {
        let remote_master = best.header.source_port_identity;

        let update_state = match &self.port_state {
            PortState::Initializing | PortState::Faulty | PortState::Disabled => return,
            // stop sending first, the next announce leads to the slave states
            PortState::Master => {
                self.pending_state = Some(PortState::Listening);
                return;
            }
            PortState::Listening | PortState::PreMaster | PortState::Passive => true,
            PortState::Uncalibrated(state) | PortState::Slave(state) => {
                state.remote_master() != remote_master
            }
        };

        self.apply_s1(&best.header, &best.message);

        if update_state {
            self.pending_state = Some(PortState::Uncalibrated(SlaveState::new(remote_master)));
        }
    }

    /// Follow the sender of `announce`
    fn apply_s1(&mut self, header: &Header, announce: &AnnounceMessage) {
        self.current_ds.steps_removed = announce.steps_removed.saturating_add(1);

        self.parent_ds.parent_port_identity = header.source_port_identity;
        self.parent_ds.grandmaster_identity = announce.grandmaster_identity;
        self.parent_ds.grandmaster_clock_quality = announce.grandmaster_clock_quality;
        self.parent_ds.grandmaster_priority_1 = announce.grandmaster_priority_1;
        self.parent_ds.grandmaster_priority_2 = announce.grandmaster_priority_2;

        self.time_properties_ds = TimePropertiesDS::from_announce(header, announce);
    }

    /// Make the own clock the parent and grandmaster again
    pub(super) fn clear_parent(&mut self) {
        self.current_ds.steps_removed = 0;
        self.current_ds.offset_from_master = TimeInternal::ZERO;
        self.parent_ds = ParentDS::new(self.port_identity, &self.default_ds);
        self.time_properties_ds =
            TimePropertiesDS::new_internal_oscillator(self.instance_config.current_utc_offset);
    }
}
