//! Configuration of a PTP ordinary clock

mod instance;
mod port;
mod servo;

pub use instance::InstanceConfig;
pub use port::{DelayMechanism, PortConfig};
pub use servo::ServoConfig;

pub use crate::datastructures::{
    common::{ClockIdentity, ClockQuality, PortIdentity, TimeSource},
    datasets::TimePropertiesDS,
};

/// Reasons a configuration is rejected during port initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ConfigError {
    #[cfg_attr(feature = "std", error("domain number {0} is outside 0..=127"))]
    InvalidDomain(u8),
    #[cfg_attr(
        feature = "std",
        error("priority1 255 is reserved for slave-only clocks")
    )]
    InvalidPriority1,
    #[cfg_attr(feature = "std", error("message intervals must be at least 1 ms"))]
    InvalidInterval,
    #[cfg_attr(
        feature = "std",
        error("max foreign records must be between 1 and {capacity}")
    )]
    InvalidForeignRecords { capacity: usize },
    #[cfg_attr(feature = "std", error("servo gains must be positive"))]
    InvalidServoGain,
}
