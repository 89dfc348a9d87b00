use crate::datastructures::{check_size, read_array, WireFormat, WireFormatError};

/// The identity of a PTP node.
///
/// Must have a unique value for each node in a ptp network. Usually derived
/// from the MAC address of the interface (EUI-64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct ClockIdentity(pub [u8; 8]);

impl ClockIdentity {
    /// Construct an EUI-64 identity from a 48 bit MAC address by inserting
    /// `ff:fe` in the middle
    ///
    /// ```
    /// # use lwptp::config::ClockIdentity;
    /// let id = ClockIdentity::from_mac_address([0x00, 0x1b, 0x21, 0x0a, 0x0b, 0x0c]);
    /// assert_eq!(id.0, [0x00, 0x1b, 0x21, 0xff, 0xfe, 0x0a, 0x0b, 0x0c]);
    /// ```
    pub fn from_mac_address(addr: [u8; 6]) -> Self {
        let mut this = Self([0; 8]);

        this.0[0..3].copy_from_slice(&addr[0..3]);
        this.0[3] = 0xff;
        this.0[4] = 0xfe;
        this.0[5..8].copy_from_slice(&addr[3..6]);

        this
    }
}

impl core::fmt::Display for ClockIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl WireFormat for ClockIdentity {
    fn wire_size(&self) -> usize {
        8
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        check_size(buffer, 8)?;
        buffer[0..8].copy_from_slice(&self.0);
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        Ok(Self(read_array(buffer, 0)?))
    }
}
