use rand::Rng;

use super::{device_fault, state::PortState, wire_timestamp, DeviceFault, Port};
use crate::{
    datastructures::messages::{Header, Message, MessageBody},
    filters::Servo,
    network::NetworkPort,
    time::TimeInternal,
    timer::TimerService,
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
    pub(super) fn send_announce(&mut self) -> Result<(), DeviceFault> {
        if !matches!(self.port_state, PortState::Master) {
            return Ok(());
        }

        log::trace!("sending announce message");

        let mut message = Message::announce(
            &self.default_ds,
            &self.parent_ds,
            &self.current_ds,
            &self.time_properties_ds,
            self.port_identity,
            self.announce_seq_ids.generate(),
            self.config.announce_interval(),
        );
        if let MessageBody::Announce(announce) = &mut message.body {
            announce.origin_timestamp = wire_timestamp(self.clock.now().map_err(device_fault)?);
        }

        self.send_message(&message);

        Ok(())
    }

    /// Send a sync message, followed by a follow up with the precise
    /// transmit time when the clock is two-step
    pub(super) fn send_sync(&mut self) -> Result<(), DeviceFault> {
        if !matches!(self.port_state, PortState::Master) {
            return Ok(());
        }

        log::trace!("sending sync message");

        let sequence_id = self.sync_seq_ids.generate();
        let interval = self.config.sync_interval();
        let origin = self.clock.now().map_err(device_fault)? + self.config.outbound_latency;

        let sync = Message::sync(
            &self.default_ds,
            self.port_identity,
            sequence_id,
            wire_timestamp(origin),
            interval,
        );
        if !self.send_message(&sync) || !self.default_ds.two_step {
            return Ok(());
        }

        let send_time = self.last_tx_time()?;
        let follow_up = Message::follow_up(
            &self.default_ds,
            self.port_identity,
            sequence_id,
            wire_timestamp(send_time),
            interval,
        );
        self.send_message(&follow_up);

        Ok(())
    }

    pub(super) fn handle_delay_req(&mut self, header: &Header, timestamp: TimeInternal) {
        if !matches!(self.port_state, PortState::Master) {
            return;
        }

        log::debug!("received delay request from {}", header.source_port_identity);

        let delay_resp = Message::delay_resp(
            header,
            self.port_identity,
            self.config.min_delay_req_interval(),
            wire_timestamp(timestamp),
        );
        self.send_message(&delay_resp);
    }

    /// Answer a peer delay request with a two-step response
    pub(super) fn handle_pdelay_req(
        &mut self,
        header: &Header,
        timestamp: TimeInternal,
    ) -> Result<(), DeviceFault> {
        if !self.port_state.is_operational() {
            return Ok(());
        }

        log::debug!(
            "received peer delay request from {}",
            header.source_port_identity
        );

        let response = Message::pdelay_resp(header, self.port_identity, wire_timestamp(timestamp));
        if !self.send_message(&response) {
            return Ok(());
        }

        let send_time = self.last_tx_time()?;
        let follow_up =
            Message::pdelay_resp_follow_up(header, self.port_identity, wire_timestamp(send_time));
        self.send_message(&follow_up);

        Ok(())
    }
}
