use crate::{
    config::InstanceConfig,
    datastructures::common::{ClockIdentity, ClockQuality},
};

/// The own dataset of this clock, built once from the configuration
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DefaultDS {
    pub clock_identity: ClockIdentity,
    pub clock_quality: ClockQuality,
    pub priority_1: u8,
    pub priority_2: u8,
    pub domain_number: u8,
    pub slave_only: bool,
    pub two_step: bool,
}

impl DefaultDS {
    pub fn new(config: &InstanceConfig) -> Self {
        DefaultDS {
            clock_identity: config.clock_identity,
            clock_quality: config.clock_quality,
            priority_1: config.priority_1,
            priority_2: config.priority_2,
            domain_number: config.domain_number,
            slave_only: config.slave_only,
            two_step: config.two_step,
        }
    }
}
