use super::ConfigError;

/// Parameters of the [`PiServo`](crate::filters::PiServo)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ServoConfig {
    /// Divisor applied to the offset for the proportional term
    pub proportional_gain: i32,
    /// Divisor applied to the offset before it is accumulated as drift
    pub integral_gain: i32,
    /// Log2 of the time constant of the mean path delay filter
    pub delay_filter_stiffness: u8,
    /// Log2 of the time constant of the offset filter
    pub offset_filter_stiffness: u8,
    /// Never touch the clock, only measure
    pub no_adjust: bool,
    /// Never step the clock, slew large offsets at the maximum rate instead
    pub no_reset_clock: bool,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            proportional_gain: 10,
            integral_gain: 1000,
            delay_filter_stiffness: 6,
            offset_filter_stiffness: 1,
            no_adjust: false,
            no_reset_clock: false,
        }
    }
}

impl ServoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proportional_gain <= 0 || self.integral_gain <= 0 {
            return Err(ConfigError::InvalidServoGain);
        }

        Ok(())
    }
}
