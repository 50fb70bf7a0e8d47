//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock devices or simulated GPIO.  All tests run on the host with
//! no camera or real hardware required.

mod engine_tests;
mod mock_hw;
