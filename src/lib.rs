#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! Alarm clock core: an ordered alarm store, fire detection on a one
//! second poll loop, next-occurrence computation for the countdown
//! display, and snooze as a derived one-time alarm. The binary in
//! `main.rs` owns the loop, audio playback and persistence; everything
//! here is deterministic given the alarms and the current time.

pub mod alarm;
pub mod communication;
pub mod config;
pub mod schedule;
pub mod store;

pub use alarm::{Alarm, Day};
pub use schedule::FireState;
pub use store::AlarmStore;
