use rand::Rng;

use super::{
    device_fault,
    state::{DelayState, PeerDelayState, PortState, SyncState},
    wire_timestamp, DeviceFault, Port,
};
use crate::{
    datastructures::messages::{
        DelayRespMessage, FollowUpMessage, Header, Message, PDelayRespFollowUpMessage,
        PDelayRespMessage, SyncMessage,
    },
    filters::Servo,
    network::NetworkPort,
    time::TimeInternal,
    timer::{TimerId, TimerService},
    Clock,
};

impl<C, N, T, S, R, const FM: usize> Port<C, N, T, S, R, FM>
where
    C: Clock,
    N: NetworkPort,
    T: TimerService,
    S: Servo,
    R: Rng,
{
    pub(super) fn handle_sync(
        &mut self,
        header: &Header,
        message: &SyncMessage,
        recv_time: TimeInternal,
    ) -> Result<(), DeviceFault> {
        let Some(state) = self.port_state.slave_state_mut() else {
            return Ok(());
        };

        if state.remote_master != header.source_port_identity {
            log::trace!("ignoring sync from {}", header.source_port_identity);
            return Ok(());
        }

        log::debug!("received sync {}", header.sequence_id);

        let correction = TimeInternal::from_scaled_nanoseconds(header.correction_field);

        if header.two_step_flag {
            state.sync_state = SyncState::Measuring {
                id: header.sequence_id,
                recv_time,
                correction,
            };
            self.start_timer(TimerId::SyncReceipt, self.config.sync_receipt_duration());
            return Ok(());
        }

        self.start_timer(TimerId::SyncReceipt, self.config.sync_receipt_duration());

        let send_time = TimeInternal::from(message.origin_timestamp) + correction;
        self.handle_sync_measurement(send_time, recv_time)
    }

    pub(super) fn handle_follow_up(
        &mut self,
        header: &Header,
        message: &FollowUpMessage,
    ) -> Result<(), DeviceFault> {
        let Some(state) = self.port_state.slave_state_mut() else {
            return Ok(());
        };

        if state.remote_master != header.source_port_identity {
            return Ok(());
        }

        let SyncState::Measuring {
            id,
            recv_time,
            correction,
        } = state.sync_state
        else {
            log::warn!("unexpected follow up {}", header.sequence_id);
            return Ok(());
        };

        if id != header.sequence_id {
            log::warn!(
                "follow up {} does not match sync {}",
                header.sequence_id,
                id
            );
            return Ok(());
        }

        state.sync_state = SyncState::Empty;

        let send_time = TimeInternal::from(message.precise_origin_timestamp)
            + correction
            + TimeInternal::from_scaled_nanoseconds(header.correction_field);
        self.handle_sync_measurement(send_time, recv_time)
    }

    /// A complete `t1`, `t2` pair from the master
    fn handle_sync_measurement(
        &mut self,
        send_time: TimeInternal,
        recv_time: TimeInternal,
    ) -> Result<(), DeviceFault> {
        let master_to_slave = recv_time - send_time;

        let Some(state) = self.port_state.slave_state_mut() else {
            return Ok(());
        };
        state.master_to_slave = Some(master_to_slave);
        let mean_path_delay = state
            .mean_path_delay
            .unwrap_or(self.current_ds.mean_path_delay);

        let offset = master_to_slave - mean_path_delay;

        match self.port_state {
            PortState::Uncalibrated(state) => {
                log::info!("first offset from master: {}", offset);
                self.current_ds.offset_from_master = offset;
                self.pending_state = Some(PortState::Slave(state));
            }
            PortState::Slave(_) => {
                let update = self
                    .servo
                    .update(offset, mean_path_delay, &mut self.clock)
                    .map_err(device_fault)?;

                self.current_ds.offset_from_master = update.offset_from_master;
                self.current_ds.mean_path_delay = update.mean_path_delay;

                log::debug!(
                    "offset from master: {}, mean path delay: {}",
                    update.offset_from_master,
                    update.mean_path_delay
                );
            }
            _ => {}
        }

        Ok(())
    }

    pub(super) fn send_delay_request(&mut self) -> Result<(), DeviceFault> {
        if self.port_state.slave_state().is_none() {
            return Ok(());
        }

        log::trace!("sending delay request");

        let id = self.delay_seq_ids.generate();
        let origin = self.clock.now().map_err(device_fault)?;
        let message =
            Message::delay_req(&self.default_ds, self.port_identity, id, wire_timestamp(origin));

        if self.send_message(&message) {
            let send_time = self.last_tx_time()?;
            if let Some(state) = self.port_state.slave_state_mut() {
                state.delay_state = DelayState::Measuring { id, send_time };
            }
        }

        self.restart_delay_timer();

        Ok(())
    }

    pub(super) fn handle_delay_resp(&mut self, header: &Header, message: &DelayRespMessage) {
        let port_identity = self.port_identity;
        let Some(state) = self.port_state.slave_state_mut() else {
            return;
        };

        if state.remote_master != header.source_port_identity
            || message.requesting_port_identity != port_identity
        {
            return;
        }

        let DelayState::Measuring { id, send_time } = state.delay_state else {
            log::warn!("unexpected delay response {}", header.sequence_id);
            return;
        };

        if id != header.sequence_id {
            log::warn!(
                "delay response {} does not match request {}",
                header.sequence_id,
                id
            );
            return;
        }

        state.delay_state = DelayState::Empty;

        let Some(master_to_slave) = state.master_to_slave else {
            log::debug!("delay response before any sync, ignoring");
            return;
        };

        let recv_time = TimeInternal::from(message.receive_timestamp)
            - TimeInternal::from_scaled_nanoseconds(header.correction_field);
        let slave_to_master = recv_time - send_time;

        self.store_mean_path_delay((master_to_slave + slave_to_master).halve());
    }

    pub(super) fn send_pdelay_request(&mut self) -> Result<(), DeviceFault> {
        if self.port_state.slave_state().is_none() {
            return Ok(());
        }

        log::trace!("sending peer delay request");

        let id = self.pdelay_seq_ids.generate();
        let origin = self.clock.now().map_err(device_fault)?;
        let message =
            Message::pdelay_req(&self.default_ds, self.port_identity, id, wire_timestamp(origin));

        if self.send_message(&message) {
            let t1 = self.last_tx_time()?;
            if let Some(state) = self.port_state.slave_state_mut() {
                state.peer_delay_state = PeerDelayState::Measuring {
                    id,
                    t1,
                    response: None,
                    correction: TimeInternal::ZERO,
                };
            }
        }

        self.restart_delay_timer();

        Ok(())
    }

    pub(super) fn handle_pdelay_resp(
        &mut self,
        header: &Header,
        message: &PDelayRespMessage,
        t4: TimeInternal,
    ) {
        if message.requesting_port_identity != self.port_identity {
            return;
        }

        let Some(state) = self.port_state.slave_state_mut() else {
            return;
        };

        let PeerDelayState::Measuring { id, t1, .. } = state.peer_delay_state else {
            return;
        };

        if id != header.sequence_id {
            log::warn!(
                "peer delay response {} does not match request {}",
                header.sequence_id,
                id
            );
            return;
        }

        let correction = TimeInternal::from_scaled_nanoseconds(header.correction_field);

        if header.two_step_flag {
            state.peer_delay_state = PeerDelayState::Measuring {
                id,
                t1,
                response: Some((message.request_receive_timestamp.into(), t4)),
                correction,
            };
            return;
        }

        // one-step responders put their turnaround time in the correction
        state.peer_delay_state = PeerDelayState::Empty;
        self.store_mean_path_delay(((t4 - t1) - correction).halve());
    }

    pub(super) fn handle_pdelay_resp_follow_up(
        &mut self,
        header: &Header,
        message: &PDelayRespFollowUpMessage,
    ) {
        if message.requesting_port_identity != self.port_identity {
            return;
        }

        let Some(state) = self.port_state.slave_state_mut() else {
            return;
        };

        let PeerDelayState::Measuring {
            id,
            t1,
            response: Some((t2, t4)),
            correction,
        } = state.peer_delay_state
        else {
            return;
        };

        if id != header.sequence_id {
            return;
        }

        state.peer_delay_state = PeerDelayState::Empty;

        let t3 = TimeInternal::from(message.response_origin_timestamp);
        let correction = correction + TimeInternal::from_scaled_nanoseconds(header.correction_field);

        self.store_mean_path_delay(((t4 - t1) - (t3 - t2) - correction).halve());
    }

    fn store_mean_path_delay(&mut self, mean_path_delay: TimeInternal) {
        if mean_path_delay.is_negative() {
            log::warn!("ignoring negative mean path delay {}", mean_path_delay);
            return;
        }

        log::debug!("measured mean path delay: {}", mean_path_delay);

        match &mut self.port_state {
            PortState::Uncalibrated(state) => {
                state.mean_path_delay = Some(mean_path_delay);
                self.current_ds.mean_path_delay = mean_path_delay;
            }
            PortState::Slave(state) => state.mean_path_delay = Some(mean_path_delay),
            _ => {}
        }
    }
}
