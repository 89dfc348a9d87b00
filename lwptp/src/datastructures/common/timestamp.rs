use crate::{
    datastructures::{check_size, read_array, WireFormat, WireFormatError},
    time::TimeInternal,
};

/// Largest value that fits the 48 bit seconds field
const MAX_SECONDS: u64 = (1 << 48) - 1;

/// An unsigned point in time as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    /// The seconds field of the timestamp.
    /// 48-bit, must be less than 281474976710656
    pub seconds: u64,
    /// The nanoseconds field of the timestamp.
    /// Must be less than 10^9
    pub nanoseconds: u32,
}

/// The value does not fit in a [`Timestamp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[cfg_attr(feature = "std", error("time value does not fit in a timestamp"))]
pub struct TimestampRangeError;

impl TryFrom<TimeInternal> for Timestamp {
    type Error = TimestampRangeError;

    fn try_from(value: TimeInternal) -> Result<Self, Self::Error> {
        if value.is_negative() || value.seconds() as u64 > MAX_SECONDS {
            return Err(TimestampRangeError);
        }

        Ok(Self {
            seconds: value.seconds() as u64,
            nanoseconds: value.nanoseconds() as u32,
        })
    }
}

impl From<Timestamp> for TimeInternal {
    fn from(value: Timestamp) -> Self {
        TimeInternal::new(value.seconds as i64, value.nanoseconds as i64)
    }
}

impl WireFormat for Timestamp {
    fn wire_size(&self) -> usize {
        10
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        check_size(buffer, 10)?;
        buffer[0..6].copy_from_slice(&self.seconds.to_be_bytes()[2..8]);
        buffer[6..10].copy_from_slice(&self.nanoseconds.to_be_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        let mut seconds_buffer = [0; 8];
        seconds_buffer[2..8].copy_from_slice(&read_array::<6>(buffer, 0)?);

        Ok(Self {
            seconds: u64::from_be_bytes(seconds_buffer),
            nanoseconds: u32::from_be_bytes(read_array(buffer, 6)?),
        })
    }
}
