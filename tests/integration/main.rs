//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the in-memory flash and recording sinks.  All tests run on the
//! host (x86_64) with no real hardware required.

mod controller_tests;
mod mocks;
mod router_tests;
