//! OTA core: transfer state, commands, events and ports. No I/O.
//!
//! This module contains the OTA update state machine and the data it
//! works on.  All interaction with flash, the SoC reset line and the
//! message broker happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
pub mod state;
