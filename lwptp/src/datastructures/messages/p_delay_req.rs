use crate::datastructures::{check_size, common::Timestamp, WireFormat, WireFormatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PDelayReqMessage {
    pub origin_timestamp: Timestamp,
}

impl PDelayReqMessage {
    pub(crate) fn content_size(&self) -> usize {
        20
    }

    pub(crate) fn serialize_content(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        check_size(buffer, self.content_size())?;
        self.origin_timestamp.serialize(&mut buffer[0..10])?;
        buffer[10..20].fill(0);

        Ok(())
    }

    pub(crate) fn deserialize_content(buffer: &[u8]) -> Result<Self, WireFormatError> {
        check_size(buffer, 20)?;
        Ok(Self {
            origin_timestamp: Timestamp::deserialize(&buffer[0..10])?,
        })
    }
}
