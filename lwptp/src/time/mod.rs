//! Types that describe points in time and durations ([`TimeInternal`]) and
//! the log2 message intervals used on the wire ([`Interval`])

mod interval;
mod time_internal;

pub use interval::Interval;
pub use time_internal::{floor_log2, TimeInternal};
