//! Ptp network messages

pub use announce::AnnounceMessage;
pub use delay_req::DelayReqMessage;
pub use delay_resp::DelayRespMessage;
pub use follow_up::FollowUpMessage;
pub use header::Header;
pub use p_delay_req::PDelayReqMessage;
pub use p_delay_resp::PDelayRespMessage;
pub use p_delay_resp_follow_up::PDelayRespFollowUpMessage;
pub use sync::SyncMessage;

use super::{
    check_size,
    common::{PortIdentity, Timestamp},
    datasets::{CurrentDS, DefaultDS, ParentDS, TimePropertiesDS},
    WireFormatError,
};
use crate::time::Interval;

mod announce;
mod delay_req;
mod delay_resp;
mod follow_up;
mod header;
mod p_delay_req;
mod p_delay_resp;
mod p_delay_resp_follow_up;
mod sync;

/// Maximum length of a packet
///
/// This can be used to preallocate buffers that can always fit packets
/// received from the network, including any TLV suffix.
pub const MAX_DATA_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum MessageType {
    Sync = 0x0,
    DelayReq = 0x1,
    PDelayReq = 0x2,
    PDelayResp = 0x3,
    FollowUp = 0x8,
    DelayResp = 0x9,
    PDelayRespFollowUp = 0xa,
    Announce = 0xb,
    Signaling = 0xc,
    Management = 0xd,
}

/// Value of the deprecated control field for each message type
fn control_field(message_type: MessageType) -> u8 {
    match message_type {
        MessageType::Sync => 0x00,
        MessageType::DelayReq => 0x01,
        MessageType::FollowUp => 0x02,
        MessageType::DelayResp => 0x03,
        MessageType::Management => 0x04,
        _ => 0x05,
    }
}

/// A decoded PTP message
///
/// Only the message types the port acts upon are represented. Signaling and
/// management messages fail to decode with
/// [`WireFormatError::UnsupportedMessageType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub body: MessageBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageBody {
    Sync(SyncMessage),
    DelayReq(DelayReqMessage),
    PDelayReq(PDelayReqMessage),
    PDelayResp(PDelayRespMessage),
    FollowUp(FollowUpMessage),
    DelayResp(DelayRespMessage),
    PDelayRespFollowUp(PDelayRespFollowUpMessage),
    Announce(AnnounceMessage),
}

impl MessageBody {
    fn wire_size(&self) -> usize {
        match self {
            MessageBody::Sync(m) => m.content_size(),
            MessageBody::DelayReq(m) => m.content_size(),
            MessageBody::PDelayReq(m) => m.content_size(),
            MessageBody::PDelayResp(m) => m.content_size(),
            MessageBody::FollowUp(m) => m.content_size(),
            MessageBody::DelayResp(m) => m.content_size(),
            MessageBody::PDelayRespFollowUp(m) => m.content_size(),
            MessageBody::Announce(m) => m.content_size(),
        }
    }

    pub fn content_type(&self) -> MessageType {
        match self {
            MessageBody::Sync(_) => MessageType::Sync,
            MessageBody::DelayReq(_) => MessageType::DelayReq,
            MessageBody::PDelayReq(_) => MessageType::PDelayReq,
            MessageBody::PDelayResp(_) => MessageType::PDelayResp,
            MessageBody::FollowUp(_) => MessageType::FollowUp,
            MessageBody::DelayResp(_) => MessageType::DelayResp,
            MessageBody::PDelayRespFollowUp(_) => MessageType::PDelayRespFollowUp,
            MessageBody::Announce(_) => MessageType::Announce,
        }
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<usize, WireFormatError> {
        match self {
            MessageBody::Sync(m) => m.serialize_content(buffer)?,
            MessageBody::DelayReq(m) => m.serialize_content(buffer)?,
            MessageBody::PDelayReq(m) => m.serialize_content(buffer)?,
            MessageBody::PDelayResp(m) => m.serialize_content(buffer)?,
            MessageBody::FollowUp(m) => m.serialize_content(buffer)?,
            MessageBody::DelayResp(m) => m.serialize_content(buffer)?,
            MessageBody::PDelayRespFollowUp(m) => m.serialize_content(buffer)?,
            MessageBody::Announce(m) => m.serialize_content(buffer)?,
        }

        Ok(self.wire_size())
    }

    fn deserialize(message_type: u8, buffer: &[u8]) -> Result<Self, WireFormatError> {
        let body = match message_type {
            0x0 => MessageBody::Sync(SyncMessage::deserialize_content(buffer)?),
            0x1 => MessageBody::DelayReq(DelayReqMessage::deserialize_content(buffer)?),
            0x2 => MessageBody::PDelayReq(PDelayReqMessage::deserialize_content(buffer)?),
            0x3 => MessageBody::PDelayResp(PDelayRespMessage::deserialize_content(buffer)?),
            0x8 => MessageBody::FollowUp(FollowUpMessage::deserialize_content(buffer)?),
            0x9 => MessageBody::DelayResp(DelayRespMessage::deserialize_content(buffer)?),
            0xa => MessageBody::PDelayRespFollowUp(
                PDelayRespFollowUpMessage::deserialize_content(buffer)?,
            ),
            0xb => MessageBody::Announce(AnnounceMessage::deserialize_content(buffer)?),
            other => return Err(WireFormatError::UnsupportedMessageType(other)),
        };

        Ok(body)
    }
}

impl Message {
    /// Event messages are timestamped and sent on the event port (319)
    pub fn is_event(&self) -> bool {
        use MessageBody::*;
        match self.body {
            Sync(_) | DelayReq(_) | PDelayReq(_) | PDelayResp(_) => true,
            FollowUp(_) | DelayResp(_) | PDelayRespFollowUp(_) | Announce(_) => false,
        }
    }

    /// Peer delay messages go to the link local multicast address
    pub fn is_peer_delay(&self) -> bool {
        matches!(
            self.body,
            MessageBody::PDelayReq(_)
                | MessageBody::PDelayResp(_)
                | MessageBody::PDelayRespFollowUp(_)
        )
    }

    pub fn wire_size(&self) -> usize {
        Header::WIRE_SIZE + self.body.wire_size()
    }

    /// Serializes the message into the PTP wire format.
    ///
    /// Returns the used buffer size that contains the message or an error.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<usize, WireFormatError> {
        check_size(buffer, self.wire_size())?;

        let (header, body) = buffer.split_at_mut(Header::WIRE_SIZE);
        self.header
            .serialize_header(self.body.content_type(), self.body.wire_size(), header)?;
        let body_size = self.body.serialize(body)?;

        Ok(Header::WIRE_SIZE + body_size)
    }

    /// Deserializes a message from the PTP wire format. Any TLV suffix after
    /// the message body is ignored.
    pub fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        let header_data = Header::deserialize_header(buffer)?;

        let message_length = header_data.message_length as usize;
        if message_length < Header::WIRE_SIZE || message_length > buffer.len() {
            return Err(WireFormatError::InvalidLength);
        }

        let body = MessageBody::deserialize(
            header_data.message_type,
            &buffer[Header::WIRE_SIZE..message_length],
        )?;

        Ok(Message {
            header: header_data.header,
            body,
        })
    }
}

fn base_header(default_ds: &DefaultDS, port_identity: PortIdentity, sequence_id: u16) -> Header {
    Header {
        domain_number: default_ds.domain_number,
        source_port_identity: port_identity,
        sequence_id,
        ..Default::default()
    }
}

/// Interval value used by messages that are not sent periodically
const UNSPECIFIED_INTERVAL: i8 = 0x7f;

impl Message {
    pub(crate) fn announce(
        default_ds: &DefaultDS,
        parent_ds: &ParentDS,
        current_ds: &CurrentDS,
        time_properties_ds: &TimePropertiesDS,
        port_identity: PortIdentity,
        sequence_id: u16,
        interval: Interval,
    ) -> Self {
        let header = Header {
            leap59: time_properties_ds.leap59,
            leap61: time_properties_ds.leap61,
            current_utc_offset_valid: time_properties_ds.current_utc_offset_valid,
            ptp_timescale: time_properties_ds.ptp_timescale,
            time_traceable: time_properties_ds.time_traceable,
            frequency_traceable: time_properties_ds.frequency_traceable,
            log_message_interval: interval.as_log_2(),
            ..base_header(default_ds, port_identity, sequence_id)
        };

        let body = MessageBody::Announce(AnnounceMessage {
            origin_timestamp: Timestamp::default(),
            current_utc_offset: time_properties_ds.current_utc_offset,
            grandmaster_priority_1: parent_ds.grandmaster_priority_1,
            grandmaster_clock_quality: parent_ds.grandmaster_clock_quality,
            grandmaster_priority_2: parent_ds.grandmaster_priority_2,
            grandmaster_identity: parent_ds.grandmaster_identity,
            steps_removed: current_ds.steps_removed,
            time_source: time_properties_ds.time_source,
        });

        Message { header, body }
    }

    pub(crate) fn sync(
        default_ds: &DefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
        origin_timestamp: Timestamp,
        interval: Interval,
    ) -> Self {
        let header = Header {
            two_step_flag: default_ds.two_step,
            log_message_interval: interval.as_log_2(),
            ..base_header(default_ds, port_identity, sequence_id)
        };

        Message {
            header,
            body: MessageBody::Sync(SyncMessage { origin_timestamp }),
        }
    }

    pub(crate) fn follow_up(
        default_ds: &DefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
        precise_origin_timestamp: Timestamp,
        interval: Interval,
    ) -> Self {
        let header = Header {
            log_message_interval: interval.as_log_2(),
            ..base_header(default_ds, port_identity, sequence_id)
        };

        Message {
            header,
            body: MessageBody::FollowUp(FollowUpMessage {
                precise_origin_timestamp,
            }),
        }
    }

    pub(crate) fn delay_req(
        default_ds: &DefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
        origin_timestamp: Timestamp,
    ) -> Self {
        let header = Header {
            log_message_interval: UNSPECIFIED_INTERVAL,
            ..base_header(default_ds, port_identity, sequence_id)
        };

        Message {
            header,
            body: MessageBody::DelayReq(DelayReqMessage { origin_timestamp }),
        }
    }

    pub(crate) fn delay_resp(
        request_header: &Header,
        port_identity: PortIdentity,
        min_delay_req_interval: Interval,
        receive_timestamp: Timestamp,
    ) -> Self {
        let header = Header {
            two_step_flag: false,
            source_port_identity: port_identity,
            log_message_interval: min_delay_req_interval.as_log_2(),
            ..*request_header
        };

        Message {
            header,
            body: MessageBody::DelayResp(DelayRespMessage {
                receive_timestamp,
                requesting_port_identity: request_header.source_port_identity,
            }),
        }
    }

    pub(crate) fn pdelay_req(
        default_ds: &DefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
        origin_timestamp: Timestamp,
    ) -> Self {
        let header = Header {
            log_message_interval: UNSPECIFIED_INTERVAL,
            ..base_header(default_ds, port_identity, sequence_id)
        };

        Message {
            header,
            body: MessageBody::PDelayReq(PDelayReqMessage { origin_timestamp }),
        }
    }

    /// Two-step response carrying the receive time of the request
    pub(crate) fn pdelay_resp(
        request_header: &Header,
        port_identity: PortIdentity,
        request_receive_timestamp: Timestamp,
    ) -> Self {
        let header = Header {
            two_step_flag: true,
            source_port_identity: port_identity,
            correction_field: 0,
            log_message_interval: UNSPECIFIED_INTERVAL,
            ..*request_header
        };

        Message {
            header,
            body: MessageBody::PDelayResp(PDelayRespMessage {
                request_receive_timestamp,
                requesting_port_identity: request_header.source_port_identity,
            }),
        }
    }

    pub(crate) fn pdelay_resp_follow_up(
        request_header: &Header,
        port_identity: PortIdentity,
        response_origin_timestamp: Timestamp,
    ) -> Self {
        let header = Header {
            source_port_identity: port_identity,
            log_message_interval: UNSPECIFIED_INTERVAL,
            ..*request_header
        };

        Message {
            header,
            body: MessageBody::PDelayRespFollowUp(PDelayRespFollowUpMessage {
                response_origin_timestamp,
                requesting_port_identity: request_header.source_port_identity,
            }),
        }
    }
}
