//! UDP/IPv4 transport for a single ptp port
//!
//! The sockets are `timestamped-socket` sockets driven by a current thread
//! tokio runtime, so every event message carries the timestamp the kernel (or
//! the network card) took for it.

#![forbid(unsafe_code)]

use std::{
    collections::VecDeque,
    io::ErrorKind,
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};

use lwptp::{
    config::{ClockIdentity, DelayMechanism},
    datastructures::messages::MAX_DATA_LEN,
    network::{MessageChannel, NetworkPort},
    time::TimeInternal,
};
use serde::Deserialize;
use timestamped_socket::{
    interface::{interfaces, InterfaceName},
    socket::{open_interface_udp4, InterfaceTimestampMode, Open, RecvResult, Socket, Timestamp},
};
use tokio::runtime::Runtime;

use crate::clock::{ClockError, LinuxClock};

const IPV4_PRIMARY_MULTICAST: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 129);
const IPV4_PDELAY_MULTICAST: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 107);

type PtpSocket = Socket<SocketAddrV4, Open>;

/// Where the timestamps of event messages are taken
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampingMode {
    /// By the kernel when the packet passes the network stack
    #[default]
    Software,
    /// By the network card. Its clock has to follow the system clock.
    Hardware,
}

impl From<TimestampingMode> for InterfaceTimestampMode {
    fn from(mode: TimestampingMode) -> Self {
        match mode {
            TimestampingMode::Software => InterfaceTimestampMode::SoftwareAll,
            TimestampingMode::Hardware => InterfaceTimestampMode::HardwareAll,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("Not allowed to bind to port {0}")]
    NoBindPermission(u16),
    #[error("Socket bind port {0} already in use")]
    AddressInUse(u16),
    #[error("could not timestamp packet: {0}")]
    Clock(#[from] ClockError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A received message with the time it arrived
#[derive(Debug)]
struct ReceivedPacket {
    data: Vec<u8>,
    timestamp: TimeInternal,
}

/// The event and general sockets of a port, joined to the ptp multicast
/// groups on one interface
pub struct LinuxNetwork {
    runtime: Runtime,
    event_socket: PtpSocket,
    general_socket: PtpSocket,
    received: VecDeque<ReceivedPacket>,
    clock: LinuxClock,
}

fn open_socket(
    interface: InterfaceName,
    channel: MessageChannel,
    timestamping: InterfaceTimestampMode,
) -> Result<PtpSocket, NetworkError> {
    let port = channel.udp_port();

    log::info!("Binding {:?} socket on {:?} port {}", channel, interface, port);

    let socket = open_interface_udp4(interface, port, timestamping).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => NetworkError::NoBindPermission(port),
        ErrorKind::AddrInUse => NetworkError::AddressInUse(port),
        _ => NetworkError::IoError(e),
    })?;

    socket.join_multicast(SocketAddrV4::new(IPV4_PRIMARY_MULTICAST, 0), interface)?;
    socket.join_multicast(SocketAddrV4::new(IPV4_PDELAY_MULTICAST, 0), interface)?;

    Ok(socket)
}

/// Multicast group and port a message is sent to
fn destination(channel: MessageChannel, link_local: bool) -> SocketAddrV4 {
    let group = if link_local {
        IPV4_PDELAY_MULTICAST
    } else {
        IPV4_PRIMARY_MULTICAST
    };

    SocketAddrV4::new(group, channel.udp_port())
}

fn packet_time(timestamp: Timestamp) -> TimeInternal {
    TimeInternal::new(timestamp.seconds as i64, timestamp.nanos as i64)
}

async fn receive(
    socket: &mut PtpSocket,
    channel: MessageChannel,
    clock: &LinuxClock,
) -> Result<ReceivedPacket, NetworkError> {
    let mut buffer = [0; MAX_DATA_LEN];
    let RecvResult {
        bytes_read,
        remote_addr,
        timestamp,
    } = socket.recv(&mut buffer).await?;

    // general messages are not timestamped by the kernel
    let timestamp = match timestamp {
        Some(timestamp) => packet_time(timestamp),
        None => clock.read()?,
    };

    log::trace!(
        "received {} bytes from {} on {:?}",
        bytes_read,
        remote_addr,
        channel
    );

    Ok(ReceivedPacket {
        data: buffer[..bytes_read].to_vec(),
        timestamp,
    })
}

impl LinuxNetwork {
    /// Open both sockets on the named interface
    pub fn open(
        interface: InterfaceName,
        timestamping: TimestampingMode,
        delay_mechanism: DelayMechanism,
        clock: LinuxClock,
    ) -> Result<Self, NetworkError> {
        log::info!(
            "Opening network port on {:?} with {:?} delay mechanism and {:?} timestamping",
            interface,
            delay_mechanism,
            timestamping
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        // the sockets register with the reactor of the runtime
        let (event_socket, general_socket) = {
            let _guard = runtime.enter();
            (
                open_socket(interface, MessageChannel::Event, timestamping.into())?,
                open_socket(
                    interface,
                    MessageChannel::General,
                    InterfaceTimestampMode::None,
                )?,
            )
        };

        Ok(Self {
            runtime,
            event_socket,
            general_socket,
            received: VecDeque::new(),
            clock,
        })
    }

    /// Wait up to `timeout` for the next packet on either socket
    fn receive_within(&mut self, timeout: Duration) -> Result<Option<ReceivedPacket>, NetworkError> {
        let Self {
            runtime,
            event_socket,
            general_socket,
            clock,
            ..
        } = self;

        let clock = &*clock;

        runtime.block_on(async {
            let next = async {
                tokio::select! {
                    biased;
                    result = receive(event_socket, MessageChannel::Event, clock) => result,
                    result = receive(general_socket, MessageChannel::General, clock) => result,
                }
            };

            match tokio::time::timeout(timeout, next).await {
                Ok(result) => result.map(Some),
                Err(_elapsed) => Ok(None),
            }
        })
    }

    fn send_on(
        &mut self,
        channel: MessageChannel,
        destination: SocketAddrV4,
        data: &[u8],
    ) -> Result<Option<Timestamp>, NetworkError> {
        let Self {
            runtime,
            event_socket,
            general_socket,
            ..
        } = self;

        let socket = match channel {
            MessageChannel::Event => event_socket,
            MessageChannel::General => general_socket,
        };

        Ok(runtime.block_on(socket.send_to(data, destination))?)
    }
}

impl NetworkPort for LinuxNetwork {
    type Error = NetworkError;

    fn poll_readable(&mut self, timeout_ms: u32) -> bool {
        if self.received.is_empty() {
            match self.receive_within(Duration::from_millis(timeout_ms.into())) {
                Ok(Some(packet)) => self.received.push_back(packet),
                Ok(None) => {}
                Err(error) => log::warn!("error receiving packet: {}", error),
            }
        }

        !self.received.is_empty()
    }

    fn send(
        &mut self,
        channel: MessageChannel,
        link_local: bool,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let timestamp = self.send_on(channel, destination(channel, link_local), data)?;

        if channel == MessageChannel::Event {
            let timestamp = match timestamp {
                Some(timestamp) => packet_time(timestamp),
                None => {
                    log::debug!("no transmit timestamp from the kernel, reading the clock");
                    self.clock.read()?
                }
            };
            self.clock.record_tx(timestamp);
        }

        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Option<usize> {
        if self.received.is_empty() {
            self.poll_readable(0);
        }

        let packet = self.received.pop_front()?;
        let length = packet.data.len().min(buffer.len());
        buffer[..length].copy_from_slice(&packet.data[..length]);
        self.clock.record_rx(packet.timestamp);

        Some(length)
    }
}

/// Derive a clock identity from the first globally administered unicast MAC
/// address of the system
pub fn get_clock_id() -> Option<ClockIdentity> {
    let mut candidates: Vec<[u8; 6]> = interfaces()
        .ok()?
        .into_iter()
        .filter_map(|(_, data)| data.mac())
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        // Ignore multicast and locally administered mac addresses
        .find(|mac| mac[0] & 0x3 == 0 && mac.iter().any(|x| *x != 0))
        .map(ClockIdentity::from_mac_address)
}
