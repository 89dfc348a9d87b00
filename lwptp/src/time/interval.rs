use super::floor_log2;

/// A log2 representation of seconds used to describe the pacing of events in
/// PTP
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Interval(i8);

impl core::fmt::Debug for Interval {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Interval")
            .field("millis", &self.as_millis())
            .field("log_base_2", &self.0)
            .finish()
    }
}

impl Interval {
    /// An Interval of one second
    pub const ONE_SECOND: Self = Self(0);

    /// An Interval of two seconds
    pub const TWO_SECONDS: Self = Self(1);

    /// Construct an [`Interval`] from log2 seconds.
    ///
    /// # Example
    /// ```
    /// # use lwptp::time::Interval;
    /// assert_eq!(Interval::from_log_2(2).as_millis(), 4000);
    /// assert_eq!(Interval::from_log_2(-2).as_millis(), 250);
    /// ```
    pub const fn from_log_2(log_2: i8) -> Self {
        Self(log_2)
    }

    /// Construct the [`Interval`] closest to a period in milliseconds,
    /// rounding down to a power of two.
    ///
    /// # Example
    /// ```
    /// # use lwptp::time::Interval;
    /// assert_eq!(Interval::from_millis(1000), Interval::ONE_SECOND);
    /// assert_eq!(Interval::from_millis(2000), Interval::TWO_SECONDS);
    /// assert_eq!(Interval::from_millis(125).as_log_2(), -3);
    /// assert_eq!(Interval::from_millis(3000).as_log_2(), 1);
    /// ```
    pub fn from_millis(millis: u32) -> Self {
        let scaled = (millis as u64 * 1024 + 500) / 1000;
        let log_2 = floor_log2(scaled.min(u32::MAX as u64) as u32) - 10;
        Self(log_2.clamp(i8::MIN as i32, i8::MAX as i32) as i8)
    }

    /// Number of milliseconds in this interval, saturating at the bounds of
    /// [`u32`]
    pub fn as_millis(self) -> u32 {
        if self.0 >= 0 {
            match 1000u32.checked_shl(self.0 as u32) {
                Some(millis) if millis >> self.0 == 1000 => millis,
                _ => u32::MAX,
            }
        } else {
            1000u32.checked_shr(self.0.unsigned_abs() as u32).unwrap_or(0)
        }
    }

    /// Get the log2 of the numbers of seconds of this [`Interval`]
    ///
    /// # Example
    /// ```
    /// # use lwptp::time::Interval;
    /// assert_eq!(Interval::ONE_SECOND.as_log_2(), 0);
    /// assert_eq!(Interval::TWO_SECONDS.as_log_2(), 1);
    /// ```
    pub fn as_log_2(self) -> i8 {
        self.0
    }
}

impl From<i8> for Interval {
    fn from(value: i8) -> Self {
        Self::from_log_2(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two() {
        assert_eq!(Interval::TWO_SECONDS.as_millis(), 2000)
    }

    #[test]
    fn from_millis_rounds_down() {
        assert_eq!(Interval::from_millis(0).as_log_2(), -11);
        assert_eq!(Interval::from_millis(500).as_log_2(), -1);
        assert_eq!(Interval::from_millis(1999).as_log_2(), 0);
        assert_eq!(Interval::from_millis(8000).as_log_2(), 3);
        assert_eq!(Interval::from_millis(u32::MAX).as_log_2(), 21);
    }

    #[test]
    fn millis_saturate() {
        assert_eq!(Interval::from_log_2(22).as_millis(), 4_194_304_000);
        assert_eq!(Interval::from_log_2(23).as_millis(), u32::MAX);
        assert_eq!(Interval::from_log_2(-10).as_millis(), 0);
        assert_eq!(Interval::from_log_2(-128).as_millis(), 0);
    }
}
