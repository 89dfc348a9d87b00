use super::ConfigError;
use crate::datastructures::common::{ClockIdentity, ClockQuality};

/// Highest domain number usable by a PTP instance
const MAX_DOMAIN_NUMBER: u8 = 127;

/// Configuration of the clock as a whole, used to build the default dataset
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InstanceConfig {
    pub clock_identity: ClockIdentity,
    pub priority_1: u8,
    pub priority_2: u8,
    pub domain_number: u8,
    pub slave_only: bool,
    /// Send a Follow_Up with the precise transmit time after every Sync
    pub two_step: bool,
    pub clock_quality: ClockQuality,
    /// Offset between TAI and UTC in seconds
    pub current_utc_offset: i16,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            clock_identity: ClockIdentity::default(),
            priority_1: 128,
            priority_2: 128,
            domain_number: 0,
            slave_only: false,
            two_step: true,
            clock_quality: ClockQuality::default(),
            current_utc_offset: 37,
        }
    }
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain_number > MAX_DOMAIN_NUMBER {
            return Err(ConfigError::InvalidDomain(self.domain_number));
        }

        if self.priority_1 == 255 && !self.slave_only {
            return Err(ConfigError::InvalidPriority1);
        }

        Ok(())
    }
}
