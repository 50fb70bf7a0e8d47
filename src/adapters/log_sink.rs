//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events through
//! the `log` facade (rendered by `env_logger` in the binary).  A future
//! notification adapter would implement the same trait.

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as a one-line record.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={:?} | turret={:.1}\u{00b0} {:?} {} | alarm={} | \
                     rec={} clip={} | frames={} suppressed={} | streak=+{}/-{}",
                    t.state,
                    t.turret_angle_deg,
                    t.turret_direction,
                    if t.turret_rotating { "sweeping" } else { "held" },
                    if t.alarm_sounding { "ON" } else { "off" },
                    if t.recording_enabled { "on" } else { "off" },
                    if t.clip_active { "open" } else { "-" },
                    t.frames_processed,
                    t.events_suppressed,
                    t.positive_streak,
                    t.negative_streak,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::FaultDetected(fault) => {
                error!("FAULT | {}", fault);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared");
            }
            AppEvent::Started(state) => {
                info!("START | state={:?}", state);
            }
            AppEvent::RecordingToggled(on) => {
                info!("REC   | {}", if *on { "enabled" } else { "disabled" });
            }
            AppEvent::ClipStarted(at) => {
                info!("CLIP  | started at {} ms", at.as_millis());
            }
            AppEvent::ClipStopped => {
                info!("CLIP  | stopped");
            }
            AppEvent::Shutdown => {
                info!("STOP  | devices released");
            }
        }
    }
}
