use super::clock_identity::ClockIdentity;
use crate::datastructures::{check_size, read_array, WireFormat, WireFormatError};

/// Identity of a single port of a PTP node
///
/// Ordered lexicographically, clock identity first. This ordering is the
/// final tie-break of the best master clock algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct PortIdentity {
    pub clock_identity: ClockIdentity,
    pub port_number: u16,
}

impl core::fmt::Display for PortIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.clock_identity, self.port_number)
    }
}

impl WireFormat for PortIdentity {
    fn wire_size(&self) -> usize {
        10
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        check_size(buffer, 10)?;
        self.clock_identity.serialize(&mut buffer[0..8])?;
        buffer[8..10].copy_from_slice(&self.port_number.to_be_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        Ok(Self {
            clock_identity: ClockIdentity::deserialize(buffer)?,
            port_number: u16::from_be_bytes(read_array(buffer, 8)?),
        })
    }
}
