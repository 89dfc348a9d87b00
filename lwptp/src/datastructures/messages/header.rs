use super::{control_field, MessageType};
use crate::datastructures::{
    check_size, common::PortIdentity, read_array, WireFormat, WireFormatError,
};

/// Version of the protocol spoken by this crate
pub(crate) const PTP_VERSION: u8 = 2;

/// The common header in front of every PTP message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub domain_number: u8,
    pub alternate_master_flag: bool,
    pub two_step_flag: bool,
    pub unicast_flag: bool,
    pub ptp_profile_specific_1: bool,
    pub ptp_profile_specific_2: bool,
    pub leap61: bool,
    pub leap59: bool,
    pub current_utc_offset_valid: bool,
    pub ptp_timescale: bool,
    pub time_traceable: bool,
    pub frequency_traceable: bool,
    /// Correction in units of 2^-16 nanoseconds
    pub correction_field: i64,
    pub source_port_identity: PortIdentity,
    pub sequence_id: u16,
    pub log_message_interval: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeserializedHeader {
    pub header: Header,
    pub message_type: u8,
    pub message_length: u16,
}

impl Header {
    pub(crate) const WIRE_SIZE: usize = 34;

    pub(crate) fn serialize_header(
        &self,
        content_type: MessageType,
        content_length: usize,
        buffer: &mut [u8],
    ) -> Result<(), WireFormatError> {
        check_size(buffer, Self::WIRE_SIZE)?;

        let message_length = u16::try_from(content_length + Self::WIRE_SIZE)
            .map_err(|_| WireFormatError::InvalidLength)?;

        buffer[0] = content_type as u8 & 0x0f;
        buffer[1] = PTP_VERSION;
        buffer[2..4].copy_from_slice(&message_length.to_be_bytes());
        buffer[4] = self.domain_number;
        buffer[5] = 0;
        buffer[6] = self.alternate_master_flag as u8
            | (self.two_step_flag as u8) << 1
            | (self.unicast_flag as u8) << 2
            | (self.ptp_profile_specific_1 as u8) << 5
            | (self.ptp_profile_specific_2 as u8) << 6;
        buffer[7] = self.leap61 as u8
            | (self.leap59 as u8) << 1
            | (self.current_utc_offset_valid as u8) << 2
            | (self.ptp_timescale as u8) << 3
            | (self.time_traceable as u8) << 4
            | (self.frequency_traceable as u8) << 5;
        buffer[8..16].copy_from_slice(&self.correction_field.to_be_bytes());
        buffer[16..20].copy_from_slice(&[0, 0, 0, 0]);
        self.source_port_identity.serialize(&mut buffer[20..30])?;
        buffer[30..32].copy_from_slice(&self.sequence_id.to_be_bytes());
        buffer[32] = control_field(content_type);
        buffer[33] = self.log_message_interval as u8;

        Ok(())
    }

    pub(crate) fn deserialize_header(buffer: &[u8]) -> Result<DeserializedHeader, WireFormatError> {
        check_size(buffer, Self::WIRE_SIZE)?;

        let version = buffer[1] & 0x0f;
        if version != PTP_VERSION {
            return Err(WireFormatError::UnsupportedVersion(version));
        }

        Ok(DeserializedHeader {
            header: Self {
                domain_number: buffer[4],
                alternate_master_flag: (buffer[6] & (1 << 0)) > 0,
                two_step_flag: (buffer[6] & (1 << 1)) > 0,
                unicast_flag: (buffer[6] & (1 << 2)) > 0,
                ptp_profile_specific_1: (buffer[6] & (1 << 5)) > 0,
                ptp_profile_specific_2: (buffer[6] & (1 << 6)) > 0,
                leap61: (buffer[7] & (1 << 0)) > 0,
                leap59: (buffer[7] & (1 << 1)) > 0,
                current_utc_offset_valid: (buffer[7] & (1 << 2)) > 0,
                ptp_timescale: (buffer[7] & (1 << 3)) > 0,
                time_traceable: (buffer[7] & (1 << 4)) > 0,
                frequency_traceable: (buffer[7] & (1 << 5)) > 0,
                correction_field: i64::from_be_bytes(read_array(buffer, 8)?),
                source_port_identity: PortIdentity::deserialize(&buffer[20..30])?,
                sequence_id: u16::from_be_bytes(read_array(buffer, 30)?),
                log_message_interval: buffer[33] as i8,
            },
            message_type: buffer[0] & 0x0f,
            message_length: u16::from_be_bytes(read_array(buffer, 2)?),
        })
    }
}
