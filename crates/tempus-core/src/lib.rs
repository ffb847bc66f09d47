//! # tempus-core
//!
//! Pure calendar and time-unit arithmetic for a tick-driven time
//! subsystem. Everything here is stateless: epoch/broken-down
//! conversion, fixed-width formatting, and the `timespec`/`timeval`
//! unit types with their tick conversions. Kernel collaborators (tick
//! counter, RTC device, timer primitive) live in `tempus-posix`.

#![deny(unsafe_code)]

pub mod calendar;
pub mod units;
