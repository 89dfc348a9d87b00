//! lwptp is a lightweight implementation of a PTP version 2 (IEEE 1588-2008)
//! ordinary clock, written for targets without an allocator.
//!
//! # Device interfaces
//! `lwptp` does not use the standard library. The platform provides:
//! - a [`Clock`] to read, step and steer, which also timestamps packets
//! - a [`NetworkPort`](network::NetworkPort) that sends and receives PTP
//!   packets on the event and general channels
//! - a [`TimerService`](timer::TimerService), for which [`timer::TimerBank`]
//!   is a ready made implementation that only needs a millisecond tick
//!
//! The [`Port`](port::Port) ties these together. It runs the port state
//! machine, the best master clock algorithm and hands offset measurements to
//! a [`Servo`](filters::Servo).
//!
//! On linux, the `lwptp-linux` crate provides ready to use implementations of
//! these interfaces.

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bmc;
mod clock;
pub mod config;
pub mod datastructures;
pub mod filters;
pub mod network;
pub mod port;
pub mod time;
pub mod timer;

pub use clock::{clamp_frequency, Clock};
