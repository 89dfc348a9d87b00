//! Definitions of the abstract network transport

/// The two UDP channels PTP uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageChannel {
    /// Timestamped messages, port 319
    Event,
    /// Everything else, port 320
    General,
}

impl MessageChannel {
    pub fn udp_port(self) -> u16 {
        match self {
            MessageChannel::Event => 319,
            MessageChannel::General => 320,
        }
    }
}

/// Abstraction for the sockets of a port
///
/// Received messages are picked up by the port through
/// [`recv`](NetworkPort::recv) whenever it runs; nothing is queued inside the
/// port itself.
pub trait NetworkPort {
    type Error: core::fmt::Debug;

    /// Wait until a message can be received or `timeout_ms` elapses. Returns
    /// whether data is available.
    fn poll_readable(&mut self, timeout_ms: u32) -> bool;

    /// Send a message on the given channel. Peer delay messages set
    /// `link_local` and go to the non-forwardable multicast group.
    fn send(
        &mut self,
        channel: MessageChannel,
        link_local: bool,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Receive one message without blocking, returning its length
    fn recv(&mut self, buffer: &mut [u8]) -> Option<usize>;
}
