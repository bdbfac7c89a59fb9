// FluxSand - Library Root
//
// Everything except peripheral bring-up lives here so it can be tested on
// the host.

pub mod ahrs;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod display;
pub mod drivers;
pub mod env;
pub mod error;
pub mod events;
pub mod gesture;
pub mod input;
pub mod mailbox;
pub mod math;
pub mod modes;
pub mod sand;
pub mod tasks;
pub mod tone;

use std::sync::OnceLock;
use std::time::Instant;

static BOOT: OnceLock<Instant> = OnceLock::new();

/// Microseconds since the first call (effectively since boot).
pub fn now_us() -> u64 {
    BOOT.get_or_init(Instant::now).elapsed().as_micros() as u64
}

pub fn now_ms() -> u64 {
    now_us() / 1000
}
