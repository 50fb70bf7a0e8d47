//! CHIRP coop sentry library.
//!
//! Exposes the detector, coordination engine, device controllers and
//! adapters for the binary and for integration testing.  Everything that
//! touches hardware goes through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod detector;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod suppression;
