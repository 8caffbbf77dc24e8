//! Hour meter: NMEA2000 engine hour meter runtime
//!
//! A library for keeping a device's bus address in crash-consistent storage,
//! persisting addresses the protocol stack re-claims, and emitting periodic
//! engine-hours telemetry.

pub mod config;
pub mod settings;
pub mod stack;
pub mod store;
pub mod telemetry;
pub mod watch;
