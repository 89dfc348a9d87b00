use crate::datastructures::{
    common::TimeSource,
    messages::{AnnounceMessage, Header},
};

/// Properties of the timescale distributed by the current grandmaster
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimePropertiesDS {
    pub current_utc_offset: i16,
    pub current_utc_offset_valid: bool,
    pub leap59: bool,
    pub leap61: bool,
    pub time_traceable: bool,
    pub frequency_traceable: bool,
    pub ptp_timescale: bool,
    pub time_source: TimeSource,
}

impl TimePropertiesDS {
    /// Time properties of a free running local oscillator
    pub fn new_internal_oscillator(current_utc_offset: i16) -> Self {
        TimePropertiesDS {
            current_utc_offset,
            current_utc_offset_valid: false,
            leap59: false,
            leap61: false,
            time_traceable: false,
            frequency_traceable: false,
            ptp_timescale: true,
            time_source: TimeSource::InternalOscillator,
        }
    }

    /// Time properties as advertised by an announce message
    pub fn from_announce(header: &Header, announce: &AnnounceMessage) -> Self {
        TimePropertiesDS {
            current_utc_offset: announce.current_utc_offset,
            current_utc_offset_valid: header.current_utc_offset_valid,
            leap59: header.leap59,
            leap61: header.leap61,
            time_traceable: header.time_traceable,
            frequency_traceable: header.frequency_traceable,
            ptp_timescale: header.ptp_timescale,
            time_source: announce.time_source,
        }
    }
}
