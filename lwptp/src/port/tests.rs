use std::{cell::RefCell, collections::VecDeque, rc::Rc, vec::Vec};

use rand::rngs::mock::StepRng;

use super::*;
use crate::{
    clock::clamp_frequency,
    config::{ClockIdentity, ClockQuality, ServoConfig, TimeSource},
    datastructures::messages::{
        AnnounceMessage, DelayReqMessage, DelayRespMessage, FollowUpMessage, Header,
        PDelayReqMessage, PDelayRespFollowUpMessage, PDelayRespMessage, SyncMessage,
    },
    filters::PiServo,
    timer::TimerBank,
};

#[derive(Debug, Clone)]
struct Sent {
    channel: MessageChannel,
    link_local: bool,
    data: Vec<u8>,
}

impl Sent {
    fn message(&self) -> Message {
        Message::deserialize(&self.data).unwrap()
    }
}

/// Both sides of the fake link of a test port
#[derive(Debug, Default)]
struct Wire {
    inbox: VecDeque<(Vec<u8>, TimeInternal)>,
    sent: Vec<Sent>,
    last_rx: TimeInternal,
}

type SharedWire = Rc<RefCell<Wire>>;

#[derive(Debug)]
struct TestNetwork {
    wire: SharedWire,
}

impl NetworkPort for TestNetwork {
    type Error = ();

    fn poll_readable(&mut self, _timeout_ms: u32) -> bool {
        !self.wire.borrow().inbox.is_empty()
    }

    fn send(
        &mut self,
        channel: MessageChannel,
        link_local: bool,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.wire.borrow_mut().sent.push(Sent {
            channel,
            link_local,
            data: Vec::from(data),
        });
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Option<usize> {
        let mut wire = self.wire.borrow_mut();
        let (data, time) = wire.inbox.pop_front()?;
        buffer[..data.len()].copy_from_slice(&data);
        wire.last_rx = time;
        Some(data.len())
    }
}

#[derive(Debug)]
struct TestClock {
    wire: SharedWire,
    now: TimeInternal,
    tx_time: TimeInternal,
    frequency: i32,
    fail: bool,
}

impl TestClock {
    fn check(&self) -> Result<(), &'static str> {
        if self.fail {
            Err("device failure")
        } else {
            Ok(())
        }
    }
}

impl Clock for TestClock {
    type Error = &'static str;

    fn now(&self) -> Result<TimeInternal, Self::Error> {
        self.check()?;
        Ok(self.now)
    }

    fn set_time(&mut self, time: TimeInternal) -> Result<(), Self::Error> {
        self.check()?;
        self.now = time;
        Ok(())
    }

    fn adjust_frequency(&mut self, ppb: i32) -> Result<(), Self::Error> {
        self.check()?;
        self.frequency = clamp_frequency(ppb, self.max_frequency_adjustment());
        Ok(())
    }

    fn max_frequency_adjustment(&self) -> i32 {
        500_000
    }

    fn tx_timestamp(&mut self) -> Result<TimeInternal, Self::Error> {
        self.check()?;
        Ok(self.tx_time)
    }

    fn rx_timestamp(&mut self) -> Result<TimeInternal, Self::Error> {
        self.check()?;
        Ok(self.wire.borrow().last_rx)
    }
}

type TestPort = Port<TestClock, TestNetwork, TimerBank, PiServo, StepRng>;

fn identity(byte: u8) -> PortIdentity {
    PortIdentity {
        clock_identity: ClockIdentity([byte; 8]),
        port_number: 1,
    }
}

fn instance_config(byte: u8) -> InstanceConfig {
    InstanceConfig {
        clock_identity: ClockIdentity([byte; 8]),
        ..Default::default()
    }
}

fn setup_test_port_with(
    instance_config: InstanceConfig,
    config: PortConfig,
) -> (TestPort, SharedWire) {
    setup_test_port_with_servo(instance_config, config, ServoConfig::default())
}

fn setup_test_port_with_servo(
    instance_config: InstanceConfig,
    config: PortConfig,
    servo_config: ServoConfig,
) -> (TestPort, SharedWire) {
    let wire = SharedWire::default();
    let clock = TestClock {
        wire: wire.clone(),
        now: TimeInternal::new(1000, 0),
        tx_time: TimeInternal::new(1000, 0),
        frequency: 0,
        fail: false,
    };
    let network = TestNetwork { wire: wire.clone() };

    let port = Port::new(
        instance_config,
        config,
        servo_config,
        clock,
        network,
        TimerBank::new(),
        // spreads timeouts to the middle of their range
        StepRng::new(u64::MAX / 2, 0),
    );

    (port, wire)
}

fn setup_test_port() -> (TestPort, SharedWire) {
    let (mut port, wire) = setup_test_port_with(instance_config(1), PortConfig::default());
    settle(&mut port);
    assert_eq!(port.state(), &PortState::Listening);
    (port, wire)
}

fn settle(port: &mut TestPort) {
    while port.step() {}
}

fn advance(port: &mut TestPort, ms: u32) {
    for _ in 0..ms / 10 {
        port.timers.tick(10);
        settle(port);
    }
}

fn deliver(wire: &SharedWire, message: Message, rx_time: TimeInternal) {
    let mut buffer = [0; MAX_DATA_LEN];
    let length = message.serialize(&mut buffer).unwrap();
    wire.borrow_mut()
        .inbox
        .push_back((Vec::from(&buffer[..length]), rx_time));
}

fn take_sent(wire: &SharedWire) -> Vec<Sent> {
    core::mem::take(&mut wire.borrow_mut().sent)
}

fn header(sender: PortIdentity, sequence_id: u16) -> Header {
    Header {
        source_port_identity: sender,
        sequence_id,
        ..Default::default()
    }
}

fn announce(sender: PortIdentity, sequence_id: u16, priority_1: u8, clock_class: u8) -> Message {
    Message {
        header: Header {
            log_message_interval: 1,
            current_utc_offset_valid: true,
            ptp_timescale: true,
            ..header(sender, sequence_id)
        },
        body: MessageBody::Announce(AnnounceMessage {
            origin_timestamp: Timestamp::default(),
            current_utc_offset: 37,
            grandmaster_priority_1: priority_1,
            grandmaster_clock_quality: ClockQuality {
                clock_class,
                clock_accuracy: 0x21,
                offset_scaled_log_variance: 0x4e5d,
            },
            grandmaster_priority_2: 128,
            grandmaster_identity: sender.clock_identity,
            steps_removed: 0,
            time_source: TimeSource::Gps,
        }),
    }
}

fn one_step_sync(sender: PortIdentity, sequence_id: u16, origin: TimeInternal) -> Message {
    Message {
        header: header(sender, sequence_id),
        body: MessageBody::Sync(SyncMessage {
            origin_timestamp: Timestamp::try_from(origin).unwrap(),
        }),
    }
}

/// Make `master` qualify and win the BMC
fn follow_master(port: &mut TestPort, wire: &SharedWire, master: PortIdentity) {
    for sequence_id in 0..2 {
        deliver(wire, announce(master, sequence_id, 64, 6), TimeInternal::ZERO);
        settle(port);
    }

    let PortState::Uncalibrated(state) = port.state() else {
        panic!("expected uncalibrated, got {}", port.state());
    };
    assert_eq!(state.remote_master(), master);
}

#[test]
fn initialization_starts_listening() {
    let (port, _wire) = setup_test_port();

    assert_eq!(port.port_identity(), identity(1));
    assert_eq!(port.parent_ds().parent_port_identity, identity(1));
    assert_eq!(port.current_ds().steps_removed, 0);
    assert!(port.foreign_masters().is_empty());
}

#[test]
fn invalid_config_is_faulty_until_recovered() {
    let config = InstanceConfig {
        domain_number: 200,
        ..instance_config(1)
    };
    let (mut port, wire) = setup_test_port_with(config, PortConfig::default());

    settle(&mut port);
    assert_eq!(port.state(), &PortState::Faulty);

    // faulty ports drop traffic and send nothing
    deliver(&wire, announce(identity(9), 0, 64, 6), TimeInternal::ZERO);
    advance(&mut port, 20_000);
    assert!(wire.borrow().inbox.is_empty());
    assert!(take_sent(&wire).is_empty());

    port.recover();
    assert_eq!(port.state(), &PortState::Initializing);
    settle(&mut port);
    assert_eq!(port.state(), &PortState::Faulty);
}

#[test]
fn too_many_foreign_records_is_faulty() {
    let config = PortConfig {
        max_foreign_records: DEFAULT_MAX_FOREIGN_RECORDS + 1,
        ..Default::default()
    };
    let (mut port, _wire) = setup_test_port_with(instance_config(1), config);

    settle(&mut port);
    assert_eq!(port.state(), &PortState::Faulty);
}

#[test]
fn negative_servo_gain_is_faulty() {
    let servo_config = ServoConfig {
        proportional_gain: -10,
        ..Default::default()
    };
    let (mut port, wire) =
        setup_test_port_with_servo(instance_config(1), PortConfig::default(), servo_config);

    settle(&mut port);
    assert_eq!(port.state(), &PortState::Faulty);

    advance(&mut port, 20_000);
    assert!(take_sent(&wire).is_empty());
    assert_eq!(port.clock.frequency, 0);
}

#[test]
fn clock_failure_is_faulty_until_recovered() {
    let (mut port, wire) = setup_test_port();

    port.clock.fail = true;
    deliver(&wire, announce(identity(9), 0, 64, 6), TimeInternal::ZERO);
    settle(&mut port);
    assert_eq!(port.state(), &PortState::Faulty);

    port.clock.fail = false;
    port.recover();
    settle(&mut port);
    assert_eq!(port.state(), &PortState::Listening);
}

#[test]
fn self_election() {
    let (mut port, wire) = setup_test_port();

    advance(&mut port, 9_000);
    assert_eq!(port.state(), &PortState::PreMaster);
    assert!(take_sent(&wire).is_empty());

    advance(&mut port, 2_000);
    assert!(port.is_master());

    advance(&mut port, 2_000);
    let announces: Vec<_> = take_sent(&wire)
        .iter()
        .map(Sent::message)
        .filter_map(|message| match message.body {
            MessageBody::Announce(announce) => Some(announce),
            _ => None,
        })
        .collect();

    assert_eq!(announces.len(), 1);
    assert_eq!(announces[0].grandmaster_identity, ClockIdentity([1; 8]));
    assert_eq!(announces[0].grandmaster_priority_1, 128);
    assert_eq!(announces[0].steps_removed, 0);
    assert_eq!(port.parent_ds().grandmaster_identity, ClockIdentity([1; 8]));
}

#[test]
fn slave_only_keeps_listening() {
    let config = InstanceConfig {
        slave_only: true,
        ..instance_config(1)
    };
    let (mut port, wire) = setup_test_port_with(config, PortConfig::default());
    settle(&mut port);

    advance(&mut port, 30_000);
    assert_eq!(port.state(), &PortState::Listening);
    assert_eq!(port.default_ds().clock_quality.clock_class, 248);
    assert!(take_sent(&wire).is_empty());
}

#[test]
fn slave_only_with_worse_master_is_passive() {
    let config = InstanceConfig {
        slave_only: true,
        ..instance_config(1)
    };
    let (mut port, wire) = setup_test_port_with(config, PortConfig::default());
    settle(&mut port);

    for sequence_id in 0..2 {
        deliver(&wire, announce(identity(9), sequence_id, 255, 255), TimeInternal::ZERO);
        settle(&mut port);
    }

    assert_eq!(port.state(), &PortState::Passive);
    // the parent is left alone
    assert_eq!(port.parent_ds().parent_port_identity, identity(1));
}

#[test]
fn slave_only_with_good_quality_is_passive() {
    let config = InstanceConfig {
        slave_only: true,
        clock_quality: ClockQuality {
            clock_class: 6,
            ..Default::default()
        },
        ..instance_config(1)
    };
    let (mut port, wire) = setup_test_port_with(config, PortConfig::default());
    settle(&mut port);

    // same priority1, so the configured class 6 beats the foreign class 248
    for sequence_id in 0..2 {
        deliver(&wire, announce(identity(9), sequence_id, 128, 248), TimeInternal::ZERO);
        settle(&mut port);
    }

    assert_eq!(port.state(), &PortState::Passive);
    assert_eq!(port.default_ds().clock_quality.clock_class, 6);
    assert!(take_sent(&wire)
        .iter()
        .map(Sent::message)
        .all(|message| !matches!(message.body, MessageBody::Announce(_))));
}

#[test]
fn better_master_is_followed() {
    let (mut port, wire) = setup_test_port();
    let master = identity(9);

    // a single announce does not qualify
    deliver(&wire, announce(master, 0, 64, 6), TimeInternal::ZERO);
    settle(&mut port);
    assert_eq!(port.state(), &PortState::Listening);

    deliver(&wire, announce(master, 1, 64, 6), TimeInternal::ZERO);
    settle(&mut port);
    assert!(matches!(port.state(), PortState::Uncalibrated(_)));

    let parent_ds = port.parent_ds();
    assert_eq!(parent_ds.parent_port_identity, master);
    assert_eq!(parent_ds.grandmaster_identity, master.clock_identity);
    assert_eq!(parent_ds.grandmaster_priority_1, 64);
    assert_eq!(parent_ds.grandmaster_clock_quality.clock_class, 6);
    assert_eq!(port.current_ds().steps_removed, 1);

    let time_properties_ds = port.time_properties_ds();
    assert_eq!(time_properties_ds.current_utc_offset, 37);
    assert!(time_properties_ds.current_utc_offset_valid);
    assert_eq!(time_properties_ds.time_source, TimeSource::Gps);
}

#[test]
fn repeated_announce_does_not_qualify() {
    let (mut port, wire) = setup_test_port();

    for _ in 0..3 {
        deliver(&wire, announce(identity(9), 7, 64, 6), TimeInternal::ZERO);
        settle(&mut port);
    }

    assert_eq!(port.state(), &PortState::Listening);
    assert_eq!(port.foreign_masters().len(), 1);
    assert_eq!(port.foreign_masters().iter().next().unwrap().announce_count, 1);
}

#[test]
fn other_domain_is_ignored() {
    let (mut port, wire) = setup_test_port();

    for sequence_id in 0..2 {
        let mut message = announce(identity(9), sequence_id, 64, 6);
        message.header.domain_number = 3;
        deliver(&wire, message, TimeInternal::ZERO);
        settle(&mut port);
    }

    assert_eq!(port.state(), &PortState::Listening);
    assert!(port.foreign_masters().is_empty());
}

#[test]
fn silent_master_returns_to_listening() {
    let (mut port, wire) = setup_test_port();
    let master = identity(9);
    follow_master(&mut port, &wire, master);

    deliver(
        &wire,
        one_step_sync(master, 0, TimeInternal::new(1000, 0)),
        TimeInternal::new(1000, 0),
    );
    settle(&mut port);
    assert!(port.is_steering());

    // syncs keep coming but announces stop
    for sequence_id in 1..10 {
        advance(&mut port, 1_000);
        deliver(
            &wire,
            one_step_sync(master, sequence_id, TimeInternal::new(1000, 0)),
            TimeInternal::new(1000, 0),
        );
        settle(&mut port);
    }

    assert_eq!(port.state(), &PortState::Listening);
    assert_eq!(port.parent_ds().parent_port_identity, identity(1));
    assert_eq!(port.current_ds().steps_removed, 0);
    assert!(port.foreign_masters().is_empty());
}

#[test]
fn missing_syncs_return_to_listening() {
    let (mut port, wire) = setup_test_port();
    follow_master(&mut port, &wire, identity(9));

    // announces keep coming, syncs never do
    for sequence_id in 2..4 {
        advance(&mut port, 1_000);
        deliver(&wire, announce(identity(9), sequence_id, 64, 6), TimeInternal::ZERO);
        settle(&mut port);
        assert!(matches!(port.state(), PortState::Uncalibrated(_)));
    }

    advance(&mut port, 1_000);
    assert_eq!(port.state(), &PortState::Listening);
    assert_eq!(port.parent_ds().parent_port_identity, identity(1));
}

#[test]
fn end_to_end_measurement() {
    let (mut port, wire) = setup_test_port();
    let master = identity(9);
    follow_master(&mut port, &wire, master);

    // t1 = 2000 s, t2 = t1 + 600 ns
    deliver(
        &wire,
        one_step_sync(master, 0, TimeInternal::new(2000, 0)),
        TimeInternal::new(2000, 600),
    );
    settle(&mut port);
    assert!(port.is_steering());
    assert_eq!(port.current_ds().offset_from_master, TimeInternal::from_nanos(600));

    // t3 = 2001 s
    port.clock.tx_time = TimeInternal::new(2001, 0);
    take_sent(&wire);
    advance(&mut port, 1_000);

    let sent = take_sent(&wire);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel, MessageChannel::Event);
    let delay_req = sent[0].message();
    assert!(matches!(delay_req.body, MessageBody::DelayReq(_)));

    // t4 = t3 + 400 ns
    deliver(
        &wire,
        Message {
            header: header(master, delay_req.header.sequence_id),
            body: MessageBody::DelayResp(DelayRespMessage {
                receive_timestamp: Timestamp {
                    seconds: 2001,
                    nanoseconds: 400,
                },
                requesting_port_identity: port.port_identity(),
            }),
        },
        TimeInternal::ZERO,
    );
    settle(&mut port);

    deliver(
        &wire,
        one_step_sync(master, 1, TimeInternal::new(2002, 0)),
        TimeInternal::new(2002, 600),
    );
    settle(&mut port);

    assert_eq!(port.current_ds().mean_path_delay, TimeInternal::from_nanos(500));
    assert_eq!(port.current_ds().offset_from_master, TimeInternal::from_nanos(100));
    // ahead of the master, so slow down
    assert_eq!(port.clock.frequency, -10);
}

#[test]
fn delay_response_for_someone_else_is_ignored() {
    let (mut port, wire) = setup_test_port();
    let master = identity(9);
    follow_master(&mut port, &wire, master);

    deliver(
        &wire,
        one_step_sync(master, 0, TimeInternal::new(2000, 0)),
        TimeInternal::new(2000, 600),
    );
    settle(&mut port);
    take_sent(&wire);
    advance(&mut port, 1_000);
    let delay_req = take_sent(&wire)[0].message();

    deliver(
        &wire,
        Message {
            header: header(master, delay_req.header.sequence_id),
            body: MessageBody::DelayResp(DelayRespMessage {
                receive_timestamp: Timestamp {
                    seconds: 1000,
                    nanoseconds: 400,
                },
                requesting_port_identity: identity(5),
            }),
        },
        TimeInternal::ZERO,
    );
    settle(&mut port);

    let Some(state) = port.state().slave_state() else {
        panic!("expected a slave state");
    };
    assert_eq!(state.mean_path_delay, None);
}

#[test]
fn two_step_sync_from_master() {
    let (mut port, wire) = setup_test_port();

    advance(&mut port, 11_000);
    assert!(port.is_master());
    take_sent(&wire);

    port.clock.tx_time = TimeInternal::new(1234, 5);
    advance(&mut port, 1_000);

    let sent = take_sent(&wire);
    assert_eq!(sent.len(), 2);

    let sync = sent[0].message();
    assert_eq!(sent[0].channel, MessageChannel::Event);
    assert!(!sent[0].link_local);
    assert!(sync.header.two_step_flag);
    assert!(matches!(sync.body, MessageBody::Sync(_)));

    let follow_up = sent[1].message();
    assert_eq!(sent[1].channel, MessageChannel::General);
    assert_eq!(follow_up.header.sequence_id, sync.header.sequence_id);
    let MessageBody::FollowUp(FollowUpMessage {
        precise_origin_timestamp,
    }) = follow_up.body
    else {
        panic!("expected a follow up, got {:?}", follow_up.body);
    };
    assert_eq!(
        precise_origin_timestamp,
        Timestamp {
            seconds: 1234,
            nanoseconds: 5
        }
    );
}

#[test]
fn two_step_sync_is_measured() {
    let (mut port, wire) = setup_test_port();
    let master = identity(9);
    follow_master(&mut port, &wire, master);

    deliver(
        &wire,
        Message {
            header: Header {
                two_step_flag: true,
                ..header(master, 3)
            },
            body: MessageBody::Sync(SyncMessage {
                origin_timestamp: Timestamp::default(),
            }),
        },
        TimeInternal::new(3000, 250),
    );
    settle(&mut port);
    assert!(matches!(port.state(), PortState::Uncalibrated(_)));

    deliver(
        &wire,
        Message {
            header: header(master, 3),
            body: MessageBody::FollowUp(FollowUpMessage {
                precise_origin_timestamp: Timestamp {
                    seconds: 3000,
                    nanoseconds: 0,
                },
            }),
        },
        TimeInternal::ZERO,
    );
    settle(&mut port);

    assert!(port.is_steering());
    assert_eq!(port.current_ds().offset_from_master, TimeInternal::from_nanos(250));
}

#[test]
fn master_answers_delay_request() {
    let (mut port, wire) = setup_test_port();
    advance(&mut port, 11_000);
    assert!(port.is_master());
    take_sent(&wire);

    deliver(
        &wire,
        Message {
            header: header(identity(4), 17),
            body: MessageBody::DelayReq(DelayReqMessage {
                origin_timestamp: Timestamp::default(),
            }),
        },
        TimeInternal::new(1500, 42),
    );
    settle(&mut port);

    let sent = take_sent(&wire);
    assert_eq!(sent.len(), 1);
    let response = sent[0].message();
    assert_eq!(response.header.sequence_id, 17);
    assert_eq!(response.header.source_port_identity, identity(1));
    assert_eq!(
        response.body,
        MessageBody::DelayResp(DelayRespMessage {
            receive_timestamp: Timestamp {
                seconds: 1500,
                nanoseconds: 42
            },
            requesting_port_identity: identity(4),
        })
    );
}

#[test]
fn peer_delay_request_is_answered() {
    let (mut port, wire) = setup_test_port();
    port.clock.tx_time = TimeInternal::new(1000, 900);

    deliver(
        &wire,
        Message {
            header: header(identity(4), 8),
            body: MessageBody::PDelayReq(PDelayReqMessage {
                origin_timestamp: Timestamp::default(),
            }),
        },
        TimeInternal::new(1000, 100),
    );
    settle(&mut port);

    let sent = take_sent(&wire);
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|sent| sent.link_local));

    assert_eq!(sent[0].channel, MessageChannel::Event);
    assert_eq!(
        sent[0].message().body,
        MessageBody::PDelayResp(PDelayRespMessage {
            request_receive_timestamp: Timestamp {
                seconds: 1000,
                nanoseconds: 100
            },
            requesting_port_identity: identity(4),
        })
    );

    assert_eq!(sent[1].channel, MessageChannel::General);
    assert_eq!(
        sent[1].message().body,
        MessageBody::PDelayRespFollowUp(PDelayRespFollowUpMessage {
            response_origin_timestamp: Timestamp {
                seconds: 1000,
                nanoseconds: 900
            },
            requesting_port_identity: identity(4),
        })
    );
}

#[test]
fn peer_delay_measurement() {
    let config = PortConfig {
        delay_mechanism: DelayMechanism::P2P,
        ..Default::default()
    };
    let (mut port, wire) = setup_test_port_with(instance_config(1), config);
    settle(&mut port);
    let master = identity(9);
    follow_master(&mut port, &wire, master);

    // t1 = 1000 s
    port.clock.tx_time = TimeInternal::new(1000, 0);
    take_sent(&wire);
    advance(&mut port, 1_000);

    let sent = take_sent(&wire);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].link_local);
    let request = sent[0].message();
    assert!(matches!(request.body, MessageBody::PDelayReq(_)));
    let sequence_id = request.header.sequence_id;

    // t2 = 1000 s + 300 ns at the peer, t4 = 1000 s + 1000 ns locally
    deliver(
        &wire,
        Message {
            header: Header {
                two_step_flag: true,
                ..header(master, sequence_id)
            },
            body: MessageBody::PDelayResp(PDelayRespMessage {
                request_receive_timestamp: Timestamp {
                    seconds: 1000,
                    nanoseconds: 300,
                },
                requesting_port_identity: port.port_identity(),
            }),
        },
        TimeInternal::new(1000, 1000),
    );
    // t3 = 1000 s + 500 ns at the peer
    deliver(
        &wire,
        Message {
            header: header(master, sequence_id),
            body: MessageBody::PDelayRespFollowUp(PDelayRespFollowUpMessage {
                response_origin_timestamp: Timestamp {
                    seconds: 1000,
                    nanoseconds: 500,
                },
                requesting_port_identity: port.port_identity(),
            }),
        },
        TimeInternal::ZERO,
    );
    settle(&mut port);

    // ((1000 - 0) - (500 - 300)) / 2
    assert_eq!(port.current_ds().mean_path_delay, TimeInternal::from_nanos(400));
}

#[test]
fn disabled_port_is_silent() {
    let (mut port, wire) = setup_test_port();

    port.disable();
    assert_eq!(port.state(), &PortState::Disabled);
    advance(&mut port, 20_000);
    assert_eq!(port.state(), &PortState::Disabled);
    assert!(take_sent(&wire).is_empty());

    port.enable();
    settle(&mut port);
    assert_eq!(port.state(), &PortState::Listening);
}

/// Move the traffic of one port to the other, received at the sender's time
fn pump(from: &TestPort, from_wire: &SharedWire, to_wire: &SharedWire) {
    for sent in take_sent(from_wire) {
        to_wire
            .borrow_mut()
            .inbox
            .push_back((sent.data, from.clock.now));
    }
}

#[test]
fn two_clocks_converge() {
    let config_a = InstanceConfig {
        priority_1: 128,
        clock_quality: ClockQuality {
            clock_class: 6,
            ..Default::default()
        },
        ..instance_config(0xa)
    };
    let config_b = InstanceConfig {
        priority_1: 200,
        clock_quality: ClockQuality {
            clock_class: 6,
            ..Default::default()
        },
        ..instance_config(0xb)
    };

    let (mut port_a, wire_a) = setup_test_port_with(config_a, PortConfig::default());
    let (mut port_b, wire_b) = setup_test_port_with(config_b, PortConfig::default());

    for _ in 0..6_000 {
        port_a.timers.tick(10);
        port_b.timers.tick(10);
        settle(&mut port_a);
        settle(&mut port_b);
        pump(&port_a, &wire_a, &wire_b);
        pump(&port_b, &wire_b, &wire_a);
    }

    assert!(port_a.is_master());
    assert!(port_b.is_steering());
    assert_eq!(port_b.parent_ds().parent_port_identity, port_a.port_identity());
    assert_eq!(port_b.parent_ds().grandmaster_identity, ClockIdentity([0xa; 8]));
    assert_eq!(port_b.current_ds().steps_removed, 1);
}
