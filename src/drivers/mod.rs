//! Device controllers and the GPIO plumbing beneath them.

pub mod alarm;
pub mod gpio;
pub mod task;
pub mod turret;
