use core::{
    fmt::Display,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A signed time value split into seconds and nanoseconds
///
/// Both points in time (seconds since the PTP epoch) and differences between
/// them are represented by this type. Every operation returns a normalized
/// value: the nanoseconds are strictly within one second and never carry a
/// sign opposite to the seconds.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeInternal {
    seconds: i64,
    nanoseconds: i32,
}

impl core::fmt::Debug for TimeInternal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "TimeInternal({self})")
    }
}

impl TimeInternal {
    /// The zero time value
    pub const ZERO: Self = Self {
        seconds: 0,
        nanoseconds: 0,
    };

    /// Create a normalized value from seconds and nanoseconds. The
    /// nanoseconds may be out of range or have a different sign than the
    /// seconds.
    pub fn new(seconds: i64, nanoseconds: i64) -> Self {
        let seconds = seconds.saturating_add(nanoseconds / NANOS_PER_SECOND);
        let nanoseconds = nanoseconds % NANOS_PER_SECOND;

        let (seconds, nanoseconds) = if seconds > 0 && nanoseconds < 0 {
            (seconds - 1, nanoseconds + NANOS_PER_SECOND)
        } else if seconds < 0 && nanoseconds > 0 {
            (seconds + 1, nanoseconds - NANOS_PER_SECOND)
        } else {
            (seconds, nanoseconds)
        };

        Self {
            seconds,
            // in range after the remainder above
            nanoseconds: nanoseconds as i32,
        }
    }

    /// Create a time value from a number of nanoseconds
    pub fn from_nanos(nanos: i64) -> Self {
        Self::new(0, nanos)
    }

    /// Create a time value from a number of milliseconds
    pub fn from_millis(millis: i64) -> Self {
        Self::new(millis / 1000, (millis % 1000) * 1_000_000)
    }

    /// Convert a value in units of 2^-16 nanoseconds, as carried in the
    /// correction field, truncating towards zero.
    ///
    /// ```
    /// # use lwptp::time::TimeInternal;
    /// assert_eq!(TimeInternal::from_scaled_nanoseconds(3 << 16), TimeInternal::from_nanos(3));
    /// assert_eq!(TimeInternal::from_scaled_nanoseconds(-(5 << 16) - 1), TimeInternal::from_nanos(-5));
    /// ```
    pub fn from_scaled_nanoseconds(scaled: i64) -> Self {
        Self::from_nanos(scaled / 65536)
    }

    /// The whole seconds of this value
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// The sub-second part of this value, with the same sign as the seconds
    pub fn nanoseconds(&self) -> i32 {
        self.nanoseconds
    }

    /// The total number of nanoseconds
    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanoseconds as i128
    }

    /// Divide by two, rounding the nanoseconds towards zero
    ///
    /// ```
    /// # use lwptp::time::TimeInternal;
    /// assert_eq!(TimeInternal::new(3, 0).halve(), TimeInternal::new(1, 500_000_000));
    /// assert_eq!(TimeInternal::new(-1, 0).halve(), TimeInternal::new(0, -500_000_000));
    /// ```
    pub fn halve(self) -> Self {
        let nanoseconds = self.nanoseconds as i64 + (self.seconds % 2) * NANOS_PER_SECOND;
        Self::new(self.seconds / 2, nanoseconds / 2)
    }

    pub fn is_negative(&self) -> bool {
        self.seconds < 0 || self.nanoseconds < 0
    }

    pub fn abs(self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self
        }
    }
}

impl Add for TimeInternal {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.seconds.saturating_add(rhs.seconds),
            self.nanoseconds as i64 + rhs.nanoseconds as i64,
        )
    }
}

impl AddAssign for TimeInternal {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for TimeInternal {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.seconds.saturating_sub(rhs.seconds),
            self.nanoseconds as i64 - rhs.nanoseconds as i64,
        )
    }
}

impl SubAssign for TimeInternal {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for TimeInternal {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            seconds: self.seconds.saturating_neg(),
            nanoseconds: -self.nanoseconds,
        }
    }
}

impl Display for TimeInternal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_negative() {
            write!(
                f,
                "-{}.{:09}",
                self.seconds.unsigned_abs(),
                self.nanoseconds.unsigned_abs()
            )
        } else {
            write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
        }
    }
}

/// Position of the most significant set bit, or -1 for zero
///
/// ```
/// # use lwptp::time::floor_log2;
/// assert_eq!(floor_log2(0), -1);
/// assert_eq!(floor_log2(1), 0);
/// assert_eq!(floor_log2(1023), 9);
/// ```
pub fn floor_log2(n: u32) -> i32 {
    if n == 0 {
        -1
    } else {
        31 - n.leading_zeros() as i32
    }
}
