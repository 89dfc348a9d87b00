//! Ptp network port of an ordinary clock
//!
//! A [`Port`] owns all protocol state together with its collaborators: the
//! [`Clock`], the [`NetworkPort`], the [`TimerService`], a [`Servo`] and a
//! random number generator. It is driven by calling [`Port::step`] (or
//! [`Port::run`]) from a single loop; every call handles expired timers and at
//! most one received message.
//!
//! # Example
//! ```no_run
//! # use lwptp::{
//! #     config::{InstanceConfig, PortConfig, ServoConfig},
//! #     filters::PiServo,
//! #     network::{MessageChannel, NetworkPort},
//! #     port::Port,
//! #     time::TimeInternal,
//! #     timer::TimerBank,
//! #     Clock,
//! # };
//! # struct MyClock;
//! # impl Clock for MyClock {
//! #     type Error = ();
//! #     fn now(&self) -> Result<TimeInternal, ()> { Ok(TimeInternal::ZERO) }
//! #     fn set_time(&mut self, _: TimeInternal) -> Result<(), ()> { Ok(()) }
//! #     fn adjust_frequency(&mut self, _: i32) -> Result<(), ()> { Ok(()) }
//! #     fn max_frequency_adjustment(&self) -> i32 { 500_000 }
//! #     fn tx_timestamp(&mut self) -> Result<TimeInternal, ()> { Ok(TimeInternal::ZERO) }
//! #     fn rx_timestamp(&mut self) -> Result<TimeInternal, ()> { Ok(TimeInternal::ZERO) }
//! # }
//! # struct MyNetwork;
//! # impl NetworkPort for MyNetwork {
//! #     type Error = ();
//! #     fn poll_readable(&mut self, _: u32) -> bool { false }
//! #     fn send(&mut self, _: MessageChannel, _: bool, _: &[u8]) -> Result<(), ()> { Ok(()) }
//! #     fn recv(&mut self, _: &mut [u8]) -> Option<usize> { None }
//! # }
//! # let rng = rand::rngs::mock::StepRng::new(2, 1);
//! static TIMERS: TimerBank = TimerBank::new();
//!
//! let mut port = Port::<_, _, _, PiServo, _>::new(
//!     InstanceConfig::default(),
//!     PortConfig::default(),
//!     ServoConfig::default(),
//!     MyClock,
//!     MyNetwork,
//!     &TIMERS,
//!     rng,
//! );
//!
//! loop {
//!     // TIMERS.tick(..) is called every millisecond elsewhere
//!     port.run(100);
//! }
//! ```

use core::fmt::Debug;

use rand::Rng;
pub use state::{PortState, SlaveState};

use self::sequence_id::SequenceIdGenerator;
use crate::{
    bmc::{
        bmca::Bmca,
        foreign_master::{ForeignMasterList, DEFAULT_MAX_FOREIGN_RECORDS},
    },
    config::{DelayMechanism, InstanceConfig, PortConfig},
    datastructures::{
        common::{PortIdentity, Timestamp},
        datasets::{CurrentDS, DefaultDS, ParentDS, TimePropertiesDS},
        messages::{Message, MessageBody, MAX_DATA_LEN},
    },
    filters::Servo,
    network::{MessageChannel, NetworkPort},
    time::TimeInternal,
    timer::{TimerId, TimerService},
    Clock,
};

mod bmca;
mod master;
mod sequence_id;
mod slave;
mod state;
#[cfg(test)]
mod tests;

/// Number of the single port of an ordinary clock
const PORT_NUMBER: u16 = 1;

/// The clock device failed, the port has to go to [`PortState::Faulty`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeviceFault;

fn device_fault<E: Debug>(error: E) -> DeviceFault {
    log::error!("clock device failure: {:?}", error);
    DeviceFault
}

/// Convert a local time for the wire, times before the epoch are sent as zero
fn wire_timestamp(time: TimeInternal) -> Timestamp {
    Timestamp::try_from(time).unwrap_or_else(|_| {
        log::warn!("time {} cannot be sent in a timestamp", time);
        Timestamp::default()
    })
}

/// A single port of an ordinary clock
///
/// Generic over the collaborators:
/// - `C`: the [`Clock`] that is steered and timestamps packets
/// - `N`: the [`NetworkPort`] carrying PTP traffic
/// - `T`: the [`TimerService`] driving the protocol timers
/// - `S`: the [`Servo`] turning measurements into clock corrections
/// - `R`: the random number generator used to spread timeouts
/// - `FM`: the capacity of the foreign master table
#[derive(Debug)]
pub struct Port<C, N, T, S, R, const FM: usize = DEFAULT_MAX_FOREIGN_RECORDS> {
    instance_config: InstanceConfig,
    config: PortConfig,
    port_identity: PortIdentity,
    port_state: PortState,
    pending_state: Option<PortState>,

    default_ds: DefaultDS,
    parent_ds: ParentDS,
    current_ds: CurrentDS,
    time_properties_ds: TimePropertiesDS,
    bmca: Bmca<FM>,

    clock: C,
    network: N,
    timers: T,
    servo: S,
    rng: R,

    announce_seq_ids: SequenceIdGenerator,
    sync_seq_ids: SequenceIdGenerator,
    delay_seq_ids: SequenceIdGenerator,
    pdelay_seq_ids: SequenceIdGenerator,

    packet_buffer: [u8; MAX_DATA_LEN],
}

impl<C, N, T, S, R, const FM: usize> Port<C, N, T, S, R, FM>
where
    C: Clock,
    N: NetworkPort,
    T: TimerService,
    S: Servo,
    R: Rng,
{
    /// Create a port in [`PortState::Initializing`]. The configuration is
    /// checked on the first [`step`](Self::step).
    pub fn new(
        instance_config: InstanceConfig,
        config: PortConfig,
        servo_config: S::Config,
        clock: C,
        network: N,
        timers: T,
        rng: R,
    ) -> Self {
        let port_identity = PortIdentity {
            clock_identity: instance_config.clock_identity,
            port_number: PORT_NUMBER,
        };
        let default_ds = DefaultDS::new(&instance_config);

        Port {
            instance_config,
            config,
            port_identity,
            port_state: PortState::Initializing,
            pending_state: None,
            default_ds,
            parent_ds: ParentDS::new(port_identity, &default_ds),
            current_ds: CurrentDS::default(),
            time_properties_ds: TimePropertiesDS::new_internal_oscillator(
                instance_config.current_utc_offset,
            ),
            bmca: Bmca::new(
                port_identity,
                config.announce_interval_ms,
                config.max_foreign_records,
            ),
            clock,
            network,
            timers,
            servo: S::new(servo_config),
            rng,
            announce_seq_ids: SequenceIdGenerator::new(),
            sync_seq_ids: SequenceIdGenerator::new(),
            delay_seq_ids: SequenceIdGenerator::new(),
            pdelay_seq_ids: SequenceIdGenerator::new(),
            packet_buffer: [0; MAX_DATA_LEN],
        }
    }

    /// Perform the actions of the current state: handle expired timers and
    /// at most one received message. A state change requested along the way
    /// is applied at the end.
    ///
    /// Returns whether more work may be pending.
    pub fn step(&mut self) -> bool {
        let result = match self.port_state {
            PortState::Initializing => {
                self.initialize();
                Ok(false)
            }
            PortState::Faulty | PortState::Disabled => Ok(self.discard_received()),
            _ => self.step_operational(),
        };

        let mut pending = match result {
            Ok(pending) => pending,
            Err(DeviceFault) => {
                self.pending_state = Some(PortState::Faulty);
                false
            }
        };

        if let Some(state) = self.pending_state.take() {
            self.to_state(state);
            pending = true;
        }

        pending
    }

    /// Wait up to `timeout_ms` for traffic, then keep stepping while work is
    /// pending or messages are waiting.
    pub fn run(&mut self, timeout_ms: u32) {
        self.network.poll_readable(timeout_ms);
        while self.step() || self.network.poll_readable(0) {}
    }

    /// Leave [`PortState::Faulty`] and initialize again
    pub fn recover(&mut self) {
        if matches!(self.port_state, PortState::Faulty) {
            self.to_state(PortState::Initializing);
        }
    }

    /// Stop all protocol activity until [`enable`](Self::enable) is called
    pub fn disable(&mut self) {
        if !matches!(self.port_state, PortState::Disabled) {
            self.to_state(PortState::Disabled);
        }
    }

    pub fn enable(&mut self) {
        if matches!(self.port_state, PortState::Disabled) {
            self.to_state(PortState::Initializing);
        }
    }

    fn initialize(&mut self) {
        let validation = self
            .instance_config
            .validate()
            .and_then(|()| self.config.validate(FM))
            .and_then(|()| self.servo.validate());

        if let Err(error) = validation {
            log::error!("invalid configuration: {:?}", error);
            self.pending_state = Some(PortState::Faulty);
            return;
        }

        self.port_identity = PortIdentity {
            clock_identity: self.instance_config.clock_identity,
            port_number: PORT_NUMBER,
        };
        self.default_ds = DefaultDS::new(&self.instance_config);
        self.current_ds = CurrentDS::default();
        self.clear_parent();
        self.bmca = Bmca::new(
            self.port_identity,
            self.config.announce_interval_ms,
            self.config.max_foreign_records,
        );
        self.servo.reset();

        self.pending_state = Some(PortState::Listening);
    }

    fn step_operational(&mut self) -> Result<bool, DeviceFault> {
        let mut pending = false;

        for timer in TimerId::ALL {
            if self.pending_state.is_some() {
                return Ok(true);
            }

            if self.timers.has_expired(timer as usize) {
                self.handle_timer(timer)?;
                pending = true;
            }
        }

        if self.pending_state.is_some() {
            return Ok(true);
        }

        Ok(self.handle_receive()? || pending)
    }

    fn handle_timer(&mut self, timer: TimerId) -> Result<(), DeviceFault> {
        log::trace!("timer {:?} expired", timer);

        match timer {
            TimerId::PDelayRequest => self.send_pdelay_request()?,
            TimerId::DelayRequest => self.send_delay_request()?,
            TimerId::Sync => self.send_sync()?,
            TimerId::AnnounceReceipt => self.handle_announce_receipt_timeout(),
            TimerId::Announce => self.send_announce()?,
            TimerId::Qualification => {
                if matches!(self.port_state, PortState::PreMaster) {
                    self.pending_state = Some(PortState::Master);
                }
            }
            TimerId::SyncReceipt => self.handle_sync_receipt_timeout(),
        }

        Ok(())
    }

    /// Receive and handle one message. Returns whether one was waiting.
    fn handle_receive(&mut self) -> Result<bool, DeviceFault> {
        let Some(length) = self.network.recv(&mut self.packet_buffer) else {
            return Ok(false);
        };

        let timestamp =
            self.clock.rx_timestamp().map_err(device_fault)? - self.config.inbound_latency;

        let message = match Message::deserialize(&self.packet_buffer[..length]) {
            Ok(message) => message,
            Err(error) => {
                log::debug!("could not parse packet: {:?}", error);
                return Ok(true);
            }
        };

        // Only process messages from the same domain
        if message.header.domain_number != self.default_ds.domain_number {
            log::debug!(
                "ignoring message for domain {}",
                message.header.domain_number
            );
            return Ok(true);
        }

        if message.header.source_port_identity == self.port_identity {
            return Ok(true);
        }

        self.handle_message(message, timestamp)?;

        Ok(true)
    }

    fn handle_message(
        &mut self,
        message: Message,
        timestamp: TimeInternal,
    ) -> Result<(), DeviceFault> {
        let header = message.header;

        match message.body {
            MessageBody::Announce(announce) => self.handle_announce(&header, &announce),
            MessageBody::Sync(sync) => self.handle_sync(&header, &sync, timestamp)?,
            MessageBody::FollowUp(follow_up) => self.handle_follow_up(&header, &follow_up)?,
            MessageBody::DelayReq(_) => self.handle_delay_req(&header, timestamp),
            MessageBody::DelayResp(delay_resp) => self.handle_delay_resp(&header, &delay_resp),
            MessageBody::PDelayReq(_) => self.handle_pdelay_req(&header, timestamp)?,
            MessageBody::PDelayResp(pdelay_resp) => {
                self.handle_pdelay_resp(&header, &pdelay_resp, timestamp)
            }
            MessageBody::PDelayRespFollowUp(follow_up) => {
                self.handle_pdelay_resp_follow_up(&header, &follow_up)
            }
        }

        Ok(())
    }

    /// Drop whatever arrives while the port is not operational
    fn discard_received(&mut self) -> bool {
        self.network.recv(&mut self.packet_buffer).is_some()
    }

    /// Serialize `message` into the packet buffer and send it
    fn send_message(&mut self, message: &Message) -> bool {
        let length = match message.serialize(&mut self.packet_buffer) {
            Ok(length) => length,
            Err(error) => {
                log::error!(
                    "could not serialize {:?} message: {:?}",
                    message.body.content_type(),
                    error
                );
                return false;
            }
        };

        let channel = if message.is_event() {
            MessageChannel::Event
        } else {
            MessageChannel::General
        };

        match self
            .network
            .send(channel, message.is_peer_delay(), &self.packet_buffer[..length])
        {
            Ok(()) => true,
            Err(error) => {
                log::warn!(
                    "could not send {:?} message: {:?}",
                    message.body.content_type(),
                    error
                );
                false
            }
        }
    }

    /// Transmit time of the last event message, including the outbound
    /// latency
    fn last_tx_time(&mut self) -> Result<TimeInternal, DeviceFault> {
        Ok(self.clock.tx_timestamp().map_err(device_fault)? + self.config.outbound_latency)
    }

    fn start_timer(&self, timer: TimerId, interval_ms: u32) {
        self.timers.start(timer as usize, interval_ms);
    }

    fn restart_announce_receipt_timer(&mut self) {
        let duration = self.config.announce_duration(&mut self.rng);
        self.start_timer(TimerId::AnnounceReceipt, duration);
    }

    fn restart_delay_timer(&mut self) {
        let duration = self.config.delay_request_duration(&mut self.rng);
        match self.config.delay_mechanism {
            DelayMechanism::E2E => self.start_timer(TimerId::DelayRequest, duration),
            DelayMechanism::P2P => self.start_timer(TimerId::PDelayRequest, duration),
            DelayMechanism::Disabled => {}
        }
    }

    fn stop_all_timers(&self) {
        for timer in TimerId::ALL {
            self.timers.stop(timer as usize);
        }
    }

    /// Apply a state change: exit actions of the old state, entry actions of
    /// the new one
    fn to_state(&mut self, state: PortState) {
        log::info!(
            "new state for port {}: {} -> {}",
            self.port_identity.port_number,
            self.port_state,
            state
        );

        let keep_timers = matches!(
            (&self.port_state, &state),
            (PortState::Uncalibrated(_), PortState::Slave(_))
        );

        if !keep_timers {
            self.stop_all_timers();
        }

        match &state {
            PortState::Initializing | PortState::Faulty | PortState::Disabled => {}
            PortState::Listening | PortState::Passive => self.restart_announce_receipt_timer(),
            PortState::PreMaster => {
                let intervals = self.current_ds.steps_removed as u32 + 1;
                self.start_timer(
                    TimerId::Qualification,
                    self.config.announce_interval_ms.saturating_mul(intervals),
                );
            }
            PortState::Master => {
                self.start_timer(TimerId::Announce, self.config.announce_interval_ms);
                self.start_timer(TimerId::Sync, self.config.sync_interval_ms);
            }
            PortState::Uncalibrated(_) => {
                self.servo.reset();
                self.restart_announce_receipt_timer();
                self.start_timer(TimerId::SyncReceipt, self.config.sync_receipt_duration());
                self.restart_delay_timer();
            }
            PortState::Slave(_) if keep_timers => {}
            PortState::Slave(_) => {
                self.restart_announce_receipt_timer();
                self.start_timer(TimerId::SyncReceipt, self.config.sync_receipt_duration());
                self.restart_delay_timer();
            }
        }

        self.port_state = state;
    }

    pub fn state(&self) -> &PortState {
        &self.port_state
    }

    pub fn port_identity(&self) -> PortIdentity {
        self.port_identity
    }

    pub fn default_ds(&self) -> &DefaultDS {
        &self.default_ds
    }

    pub fn parent_ds(&self) -> &ParentDS {
        &self.parent_ds
    }

    pub fn current_ds(&self) -> &CurrentDS {
        &self.current_ds
    }

    pub fn time_properties_ds(&self) -> &TimePropertiesDS {
        &self.time_properties_ds
    }

    pub fn foreign_masters(&self) -> &ForeignMasterList<FM> {
        self.bmca.foreign_masters()
    }

    /// Indicate whether this [`Port`] is steering its clock.
    pub fn is_steering(&self) -> bool {
        matches!(self.port_state, PortState::Slave(_))
    }

    /// Indicate whether this [`Port`] is in the master state.
    pub fn is_master(&self) -> bool {
        matches!(self.port_state, PortState::Master)
    }
}
