//! Definitions and implementations for the clock servo

mod pi;

pub use pi::PiServo;

use crate::{config::ConfigError, time::TimeInternal, Clock};

/// What the servo did to the clock on an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServoAction {
    /// The clock was left alone
    #[default]
    None,
    /// The clock was stepped by the offset
    Stepped,
    /// The frequency was corrected by the given amount of parts per billion
    Adjusted(i32),
}

/// Result of feeding a measurement to a [`Servo`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServoUpdate {
    /// Filtered offset from the master
    pub offset_from_master: TimeInternal,
    /// Filtered mean path delay
    pub mean_path_delay: TimeInternal,
    pub action: ServoAction,
}

/// A servo that steers the local clock towards the master.
///
/// Servos are responsible for dealing with the network noise, and should
/// average out the input a bit so minor network variations are not
/// immediately reflected in the synchronization of the clock.
///
/// This crate provides [`PiServo`], users can implement their own if desired.
pub trait Servo {
    /// Configuration for this [`Servo`]
    ///
    /// This is used to construct a new [`Servo`] instance using
    /// [`new`](`Servo::new`).
    type Config: Clone;

    /// Create a new instance of the servo.
    fn new(config: Self::Config) -> Self;

    /// Check the configuration, called when the port initializes
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Forget all history, called when synchronization to a master ends
    fn reset(&mut self);

    /// Put a new offset measurement, together with the most recent mean path
    /// delay, in the servo. The servo then uses this to adjust the clock.
    fn update<C: Clock>(
        &mut self,
        offset_from_master: TimeInternal,
        mean_path_delay: TimeInternal,
        clock: &mut C,
    ) -> Result<ServoUpdate, C::Error>;
}
