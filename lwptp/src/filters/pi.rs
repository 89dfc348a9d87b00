use super::{Servo, ServoAction, ServoUpdate};
use crate::{
    clock::clamp_frequency,
    config::{ConfigError, ServoConfig},
    time::TimeInternal,
    Clock,
};

/// Stiffness beyond which the filter would not settle in reasonable time
const MAX_STIFFNESS: u8 = 16;

/// One pole low-pass filter with a cutoff that tightens as samples come in
#[derive(Debug, Default, Clone, Copy)]
struct OneWayFilter {
    y: i64,
    previous: i64,
    exponent: i64,
}

impl OneWayFilter {
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Filter a sample, which must be smaller than one second
    fn filter(&mut self, nanos: i64, stiffness: u8) -> i64 {
        if self.exponent == 0 {
            self.y = nanos;
            self.previous = nanos;
            self.exponent = 1;
            return nanos;
        }

        let limit = 1i64 << stiffness.min(MAX_STIFFNESS);
        if self.exponent < limit {
            self.exponent += 1;
        } else {
            self.exponent = limit;
        }

        let average = (nanos + self.previous) / 2;
        self.y += (average - self.y) / self.exponent;
        self.previous = nanos;

        self.y
    }

    /// Values of a second or more are passed through and restart the filter
    fn apply(&mut self, value: TimeInternal, stiffness: u8) -> TimeInternal {
        if value.seconds() != 0 {
            self.reset();
            return value;
        }

        TimeInternal::from_nanos(self.filter(value.nanoseconds() as i64, stiffness))
    }
}

/// A proportional-integral servo with filtered inputs
///
/// Offsets of a second or more step the clock (unless disabled), smaller
/// offsets are corrected by slewing the frequency with
/// `-(offset / proportional_gain + drift)`, where the drift integrates
/// `offset / integral_gain`.
#[derive(Debug, Clone)]
pub struct PiServo {
    config: ServoConfig,
    delay_filter: OneWayFilter,
    offset_filter: OneWayFilter,
    /// Accumulated frequency error in ppb
    drift: i64,
}

impl PiServo {
    pub fn drift(&self) -> i64 {
        self.drift
    }

    fn adjust<C: Clock>(&mut self, offset: TimeInternal, clock: &mut C) -> Result<ServoAction, C::Error> {
        let max = clock.max_frequency_adjustment() as i64;

        if offset.abs() >= TimeInternal::new(1, 0) {
            if self.config.no_reset_clock {
                let adjustment = if offset.is_negative() { max } else { -max };
                clock.adjust_frequency(adjustment as i32)?;
                return Ok(ServoAction::Adjusted(adjustment as i32));
            }

            let now = clock.now()?;
            clock.set_time(now - offset)?;
            clock.adjust_frequency(0)?;
            log::info!("stepped clock by {}", -offset);

            self.drift = 0;
            self.offset_filter.reset();
            return Ok(ServoAction::Stepped);
        }

        let nanos = offset.nanoseconds() as i64;
        // gains are positive after validation, a zero gain disables its term
        let proportional = nanos
            .checked_div(self.config.proportional_gain as i64)
            .unwrap_or(0);
        let integral = nanos.checked_div(self.config.integral_gain as i64).unwrap_or(0);

        self.drift = (self.drift + integral).clamp(-max, max);
        let adjustment = (proportional + self.drift).clamp(-max, max);
        let ppb = clamp_frequency(-adjustment as i32, max as i32);

        clock.adjust_frequency(ppb)?;
        log::trace!("adjusted frequency by {} ppb, drift {}", ppb, self.drift);

        Ok(ServoAction::Adjusted(ppb))
    }
}

impl Servo for PiServo {
    type Config = ServoConfig;

    fn new(config: Self::Config) -> Self {
        PiServo {
            config,
            delay_filter: OneWayFilter::default(),
            offset_filter: OneWayFilter::default(),
            drift: 0,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    fn reset(&mut self) {
        self.delay_filter.reset();
        self.offset_filter.reset();
        self.drift = 0;
    }

    fn update<C: Clock>(
        &mut self,
        offset_from_master: TimeInternal,
        mean_path_delay: TimeInternal,
        clock: &mut C,
    ) -> Result<ServoUpdate, C::Error> {
        let mean_path_delay = self
            .delay_filter
            .apply(mean_path_delay, self.config.delay_filter_stiffness);
        let offset_from_master = self
            .offset_filter
            .apply(offset_from_master, self.config.offset_filter_stiffness);

        let action = if self.config.no_adjust {
            ServoAction::None
        } else {
            self.adjust(offset_from_master, clock)?
        };

        Ok(ServoUpdate {
            offset_from_master,
            mean_path_delay,
            action,
        })
    }
}
