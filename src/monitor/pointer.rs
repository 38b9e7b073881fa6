//! Pointer monitor: capture → buffer → periodic motion analysis → CSV sink.

use crate::analysis::{PointerEngine, POINTER_HEADER};
use crate::buffer::EventBuffer;
use crate::capture::types::{
    InputEvent, PointerClickEvent, PointerMoveEvent, PointerScrollEvent, RawInput, RawInputKind,
};
use crate::capture::{Backend, CaptureKind};
use crate::lifecycle::{MonitorState, StateCell, StopSignal};
use crate::monitor::{run_analysis_loop, Monitor, MonitorError};
use crate::sink::CsvSink;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Monitors pointer behavior for one session.
///
/// Constructed with an analysis period, a sink destination, and the shared
/// session [`StopSignal`]. Not reusable after stopping.
pub struct PointerMonitor {
    period_secs: u64,
    output: PathBuf,
    stop: StopSignal,
    state: Arc<StateCell>,
    buffer: Arc<EventBuffer>,
    injector: Option<Sender<RawInput>>,
    analysis: Option<JoinHandle<()>>,
}

impl PointerMonitor {
    pub fn new(period_secs: u64, output: impl Into<PathBuf>, stop: StopSignal) -> Self {
        Self {
            period_secs,
            output: output.into(),
            stop,
            state: Arc::new(StateCell::new()),
            buffer: Arc::new(EventBuffer::new()),
            injector: None,
            analysis: None,
        }
    }

    /// Sender feeding the capture channel; available after `start`. Lets
    /// tests and demos push synthetic events through the real ingest path.
    pub fn injector(&self) -> Option<Sender<RawInput>> {
        self.injector.clone()
    }
}

impl Monitor for PointerMonitor {
    fn start(&mut self) -> Result<(), MonitorError> {
        if self.state.get() != MonitorState::Idle {
            return Err(MonitorError::AlreadyStarted);
        }
        if self.period_secs == 0 {
            return Err(MonitorError::InvalidPeriod);
        }

        let sink = CsvSink::new(&self.output, POINTER_HEADER);
        sink.ensure_initialized()?;

        let mut backend = Backend::new(CaptureKind::Pointer);
        backend.start()?;
        self.injector = Some(backend.injector());
        self.state.set(MonitorState::Capturing);

        let rx = backend.receiver().clone();
        let buffer = self.buffer.clone();
        let stop = self.stop.clone();
        let ingest = thread::spawn(move || {
            ingest_loop(backend, rx, buffer, stop);
        });

        let buffer = self.buffer.clone();
        let stop = self.stop.clone();
        let state = self.state.clone();
        let period = Duration::from_secs(self.period_secs);
        self.analysis = Some(thread::spawn(move || {
            run_analysis_loop(
                PointerEngine::new(),
                buffer,
                sink,
                period,
                stop,
                state,
                ingest,
                "pointer",
            );
        }));

        Ok(())
    }

    fn request_stop(&self) {
        self.stop.request_stop();
    }

    fn is_active(&self) -> bool {
        matches!(
            self.state.get(),
            MonitorState::Capturing | MonitorState::Stopping
        )
    }

    fn state(&self) -> MonitorState {
        self.state.get()
    }

    fn wait(&mut self) {
        if let Some(handle) = self.analysis.take() {
            let _ = handle.join();
        }
    }
}

/// The single most recent move sample. Monitor-instance state, not buffer
/// state: it survives drains so post-drain moves keep valid derivatives.
struct MoveContinuity {
    x: f64,
    y: f64,
    at: DateTime<Utc>,
}

/// Consume raw pointer events until the session stops, enriching moves with
/// instantaneous distance/speed relative to the previous move sample. Events
/// already emitted when the hook comes down are still appended before the
/// thread exits, so the final analysis drain sees every captured event.
fn ingest_loop(
    mut backend: Backend,
    rx: Receiver<RawInput>,
    buffer: Arc<EventBuffer>,
    stop: StopSignal,
) {
    let mut last_move: Option<MoveContinuity> = None;

    loop {
        if stop.is_stop_requested() {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(raw) => ingest_one(raw, &buffer, &mut last_move),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    backend.stop();
    for raw in rx.try_iter() {
        ingest_one(raw, &buffer, &mut last_move);
    }
}

/// Append one raw pointer event, enriching moves against `last_move`.
fn ingest_one(raw: RawInput, buffer: &EventBuffer, last_move: &mut Option<MoveContinuity>) {
    match raw.kind {
        RawInputKind::PointerMove { x, y } => {
            let (distance, speed) = match last_move {
                Some(prev) => {
                    let distance = ((x - prev.x).powi(2) + (y - prev.y).powi(2)).sqrt();
                    let elapsed = (raw.timestamp - prev.at).num_milliseconds() as f64 / 1000.0;
                    let speed = if elapsed > 0.0 { distance / elapsed } else { 0.0 };
                    (distance, speed)
                }
                None => (0.0, 0.0),
            };
            buffer.append(InputEvent::PointerMove(PointerMoveEvent {
                timestamp: raw.timestamp,
                x,
                y,
                distance,
                speed,
            }));
            *last_move = Some(MoveContinuity {
                x,
                y,
                at: raw.timestamp,
            });
        }
        RawInputKind::PointerButton {
            x,
            y,
            button,
            pressed,
        } => {
            buffer.append(InputEvent::PointerClick(PointerClickEvent {
                timestamp: raw.timestamp,
                x,
                y,
                button,
                pressed,
            }));
        }
        RawInputKind::PointerScroll { x, y, dx, dy } => {
            buffer.append(InputEvent::PointerScroll(PointerScrollEvent {
                timestamp: raw.timestamp,
                x,
                y,
                dx,
                dy,
            }));
        }
        // Key events never arrive on a pointer hook channel.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_period_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "pulse-monitor-ptr-zero-{}.csv",
            std::process::id()
        ));
        let mut monitor = PointerMonitor::new(0, path, StopSignal::new());
        assert!(matches!(monitor.start(), Err(MonitorError::InvalidPeriod)));
    }
}
