//! Inbound commands to the pipeline.
//!
//! These represent actions requested by the outside world (keyboard,
//! signals) that the [`Pipeline`](super::runner::Pipeline) interprets
//! between frames.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Flip the recorder's enabled flag.
    ToggleRecording,

    /// Clear latched hardware faults and re-arm.
    Restart,

    /// Release every device and leave the frame loop.
    Shutdown,
}
