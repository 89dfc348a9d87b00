use crate::datastructures::{check_size, read_array, WireFormat, WireFormatError};

/// Quality of a clock as advertised in announce messages
///
/// For all three fields a lower value means a better clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockQuality {
    pub clock_class: u8,
    pub clock_accuracy: u8,
    pub offset_scaled_log_variance: u16,
}

impl Default for ClockQuality {
    fn default() -> Self {
        Self {
            clock_class: 248,
            clock_accuracy: 0xfe,
            offset_scaled_log_variance: 0xffff,
        }
    }
}

impl WireFormat for ClockQuality {
    fn wire_size(&self) -> usize {
        4
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        check_size(buffer, 4)?;
        buffer[0] = self.clock_class;
        buffer[1] = self.clock_accuracy;
        buffer[2..4].copy_from_slice(&self.offset_scaled_log_variance.to_be_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        check_size(buffer, 4)?;
        Ok(Self {
            clock_class: buffer[0],
            clock_accuracy: buffer[1],
            offset_scaled_log_variance: u16::from_be_bytes(read_array(buffer, 2)?),
        })
    }
}
