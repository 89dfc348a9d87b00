/// Root source of the time distributed by a grandmaster, as carried in the
/// `timeSource` field of announce messages (IEEE1588-2008 section 7.6.2.6)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSource {
    AtomicClock,
    Gps,
    TerrestrialRadio,
    Ptp,
    Ntp,
    HandSet,
    Other,
    #[default]
    InternalOscillator,
    /// Any value outside the ones defined above
    Unknown(u8),
}

impl From<u8> for TimeSource {
    fn from(value: u8) -> Self {
        match value {
            0x10 => Self::AtomicClock,
            0x20 => Self::Gps,
            0x30 => Self::TerrestrialRadio,
            0x40 => Self::Ptp,
            0x50 => Self::Ntp,
            0x60 => Self::HandSet,
            0x90 => Self::Other,
            0xa0 => Self::InternalOscillator,
            v => Self::Unknown(v),
        }
    }
}

impl From<TimeSource> for u8 {
    fn from(value: TimeSource) -> Self {
        match value {
            TimeSource::AtomicClock => 0x10,
            TimeSource::Gps => 0x20,
            TimeSource::TerrestrialRadio => 0x30,
            TimeSource::Ptp => 0x40,
            TimeSource::Ntp => 0x50,
            TimeSource::HandSet => 0x60,
            TimeSource::Other => 0x90,
            TimeSource::InternalOscillator => 0xa0,
            TimeSource::Unknown(v) => v,
        }
    }
}
