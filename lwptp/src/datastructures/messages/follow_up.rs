use crate::datastructures::{common::Timestamp, WireFormat, WireFormatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpMessage {
    pub precise_origin_timestamp: Timestamp,
}

impl FollowUpMessage {
    pub(crate) fn content_size(&self) -> usize {
        10
    }

    pub(crate) fn serialize_content(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        self.precise_origin_timestamp.serialize(buffer)
    }

    pub(crate) fn deserialize_content(buffer: &[u8]) -> Result<Self, WireFormatError> {
        Ok(Self {
            precise_origin_timestamp: Timestamp::deserialize(buffer)?,
        })
    }
}
