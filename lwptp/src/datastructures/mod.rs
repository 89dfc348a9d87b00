//! General datastructures as defined by the ptp spec

use core::fmt::Debug;

pub mod common;
pub mod datasets;
pub mod messages;

/// Errors that can occur while encoding or decoding PTP messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum WireFormatError {
    #[cfg_attr(feature = "std", error("buffer too short"))]
    BufferTooShort,
    #[cfg_attr(feature = "std", error("unsupported ptp version {0}"))]
    UnsupportedVersion(u8),
    #[cfg_attr(feature = "std", error("unsupported message type {0:#x}"))]
    UnsupportedMessageType(u8),
    #[cfg_attr(feature = "std", error("invalid message length"))]
    InvalidLength,
}

pub(crate) trait WireFormat: Debug + Clone + Eq {
    /// The byte size on the wire of this object
    fn wire_size(&self) -> usize;

    /// Serializes the object into the PTP wire format.
    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError>;

    /// Deserializes the object from the PTP wire format.
    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError>;
}

/// Read a fixed size array at `offset`
pub(crate) fn read_array<const N: usize>(
    buffer: &[u8],
    offset: usize,
) -> Result<[u8; N], WireFormatError> {
    buffer
        .get(offset..offset + N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(WireFormatError::BufferTooShort)
}

pub(crate) fn check_size(buffer: &[u8], size: usize) -> Result<(), WireFormatError> {
    if buffer.len() < size {
        Err(WireFormatError::BufferTooShort)
    } else {
        Ok(())
    }
}
