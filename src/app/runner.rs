//! Frame pipeline: acquire → detect → coordinate → record.
//!
//! [`Pipeline::run`] drives one iteration per frame.  The engine is started
//! on the first good frame (camera confirmed) and shut down on every exit
//! path: source exhausted, quit command, interrupt, frame limit, or a fatal
//! camera error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::detector::MotionDetector;
use crate::error::{CameraError, Error};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{AlarmPort, EventSink, FrameSource, Recorder, TurretPort};
use super::service::CoordinationEngine;

/// Why the frame loop ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    SourceExhausted,
    Quit,
    Interrupted,
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub exit: ExitReason,
}

impl RunSummary {
    const fn new(frames: u64, exit: ExitReason) -> Self {
        Self { frames, exit }
    }
}

/// Borrowed collaborators for one run.
pub struct PipelineIo<'a, S, R, E> {
    pub source: &'a mut S,
    pub recorder: &'a mut R,
    pub sink: &'a mut E,
    pub commands: &'a Receiver<AppCommand>,
    pub stop: &'a AtomicBool,
}

pub struct Pipeline {
    frame_interval: Duration,
    max_consecutive_failures: u32,
    telemetry_interval: u64,
    max_frames: Option<u64>,
}

impl Pipeline {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            frame_interval: config.frame_interval(),
            max_consecutive_failures: config.max_consecutive_frame_failures.max(1),
            telemetry_interval: u64::from(config.telemetry_interval_frames.max(1)),
            max_frames: None,
        }
    }

    /// Stop after `frames` processed frames.
    pub fn with_max_frames(mut self, frames: Option<u64>) -> Self {
        self.max_frames = frames;
        self
    }

    /// Run until the source ends, a quit/interrupt arrives, or the camera
    /// fails for good.  The engine is always shut down before returning.
    pub fn run<T, A, S, R, E>(
        &self,
        engine: &mut CoordinationEngine<T, A>,
        detector: &mut MotionDetector,
        io: PipelineIo<'_, S, R, E>,
    ) -> Result<RunSummary, Error>
    where
        T: TurretPort,
        A: AlarmPort,
        S: FrameSource,
        R: Recorder,
        E: EventSink,
    {
        let PipelineIo {
            source,
            recorder,
            sink,
            commands,
            stop,
        } = io;

        let outcome = self.run_loop(engine, detector, source, recorder, sink, commands, stop);
        engine.shutdown(recorder, sink);

        match &outcome {
            Ok(summary) => info!(
                "pipeline: finished after {} frames ({:?})",
                summary.frames, summary.exit
            ),
            Err(e) => error!("pipeline: aborted: {}", e),
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn run_loop<T, A>(
        &self,
        engine: &mut CoordinationEngine<T, A>,
        detector: &mut MotionDetector,
        source: &mut impl FrameSource,
        recorder: &mut impl Recorder,
        sink: &mut impl EventSink,
        commands: &Receiver<AppCommand>,
        stop: &AtomicBool,
    ) -> Result<RunSummary, Error>
    where
        T: TurretPort,
        A: AlarmPort,
    {
        let mut frames: u64 = 0;
        let mut failures: u32 = 0;
        let mut camera_confirmed = false;

        loop {
            if stop.load(Ordering::SeqCst) {
                info!("pipeline: interrupt received");
                return Ok(RunSummary::new(frames, ExitReason::Interrupted));
            }
            if self.drain_commands(engine, detector, recorder, sink, commands) {
                return Ok(RunSummary::new(frames, ExitReason::Quit));
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => {
                    failures = 0;
                    frame
                }
                Ok(None) if camera_confirmed => {
                    return Ok(RunSummary::new(frames, ExitReason::SourceExhausted));
                }
                Ok(None) => return Err(Error::NoCamera(CameraError::Empty)),
                Err(e) => {
                    failures += 1;
                    if failures >= self.max_consecutive_failures {
                        error!("pipeline: {} consecutive frame failures, giving up", failures);
                        return Err(Error::NoCamera(e));
                    }
                    warn!(
                        "pipeline: frame read failed ({}), skipping ({}/{})",
                        e, failures, self.max_consecutive_failures
                    );
                    std::thread::sleep(self.frame_interval);
                    continue;
                }
            };

            if !camera_confirmed {
                camera_confirmed = true;
                info!("pipeline: camera confirmed ({}x{})", frame.width(), frame.height());
                if let Err(fault) = engine.start(sink) {
                    warn!("pipeline: engine could not arm ({}), continuing idle", fault);
                }
            }

            let began = Instant::now();
            let event = detector.process(&frame);
            engine.handle_event(&event, recorder, sink);
            if engine.clip_active() {
                if let Err(e) = recorder.write_frame(&frame) {
                    warn!("pipeline: clip frame dropped: {}", e);
                }
            }

            frames += 1;
            if frames % self.telemetry_interval == 0 {
                sink.emit(&AppEvent::Telemetry(
                    engine.build_telemetry(recorder.is_enabled()),
                ));
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                return Ok(RunSummary::new(frames, ExitReason::FrameLimit));
            }

            let spent = began.elapsed();
            if spent < self.frame_interval {
                std::thread::sleep(self.frame_interval - spent);
            }
        }
    }

    /// Apply pending commands.  Returns `true` when a shutdown was requested.
    fn drain_commands<T: TurretPort, A: AlarmPort>(
        &self,
        engine: &mut CoordinationEngine<T, A>,
        detector: &mut MotionDetector,
        recorder: &mut impl Recorder,
        sink: &mut impl EventSink,
        commands: &Receiver<AppCommand>,
    ) -> bool {
        loop {
            match commands.try_recv() {
                Ok(AppCommand::ToggleRecording) => {
                    let enabled = recorder.toggle();
                    info!("pipeline: recording {}", if enabled { "enabled" } else { "disabled" });
                    sink.emit(&AppEvent::RecordingToggled(enabled));
                    engine.recording_toggled(enabled, recorder, sink);
                }
                Ok(AppCommand::Restart) if engine.is_faulted() => {
                    detector.reset();
                    if let Err(fault) = engine.restart(recorder, sink) {
                        warn!("pipeline: restart failed: {}", fault);
                    }
                }
                Ok(AppCommand::Restart) => {
                    info!("pipeline: restart ignored, engine is {:?}", engine.state());
                }
                Ok(AppCommand::Shutdown) => {
                    info!("pipeline: quit requested");
                    return true;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return false,
            }
        }
    }
}
