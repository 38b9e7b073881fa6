//! Keyboard monitor: capture → buffer → periodic typing analysis → CSV sink.

use crate::analysis::{KeyboardEngine, KEYBOARD_HEADER};
use crate::buffer::EventBuffer;
use crate::capture::types::{InputEvent, KeyEvent, KeyPhase, RawInput, RawInputKind, PANIC_KEY};
use crate::capture::{Backend, CaptureKind};
use crate::lifecycle::{MonitorState, StateCell, StopSignal};
use crate::monitor::{run_analysis_loop, Monitor, MonitorError};
use crate::sink::CsvSink;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Monitors keystroke behavior for one session.
///
/// Constructed with an analysis period, a sink destination, and the shared
/// session [`StopSignal`]. Not reusable after stopping.
pub struct KeyboardMonitor {
    period_secs: u64,
    output: PathBuf,
    stop: StopSignal,
    state: Arc<StateCell>,
    buffer: Arc<EventBuffer>,
    injector: Option<Sender<RawInput>>,
    analysis: Option<JoinHandle<()>>,
}

impl KeyboardMonitor {
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

impl Monitor for KeyboardMonitor {
    fn start(&mut self) -> Result<(), MonitorError> {
        if self.state.get() != MonitorState::Idle {
            return Err(MonitorError::AlreadyStarted);
        }
        if self.period_secs == 0 {
            return Err(MonitorError::InvalidPeriod);
        }

        let sink = CsvSink::new(&self.output, KEYBOARD_HEADER);
        sink.ensure_initialized()?;

        let mut backend = Backend::new(CaptureKind::Keyboard);
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
                KeyboardEngine::new(),
                buffer,
                sink,
                period,
                stop,
                state,
                ingest,
                "keyboard",
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

/// Consume raw key events until the session stops, appending them to the
/// buffer. Releasing the panic key sets the stop signal and unregisters the
/// capture source, in that order, exactly once. Events already emitted when
/// the hook comes down are still appended before the thread exits, so the
/// final analysis drain sees every captured event.
fn ingest_loop(
    mut backend: Backend,
    rx: Receiver<RawInput>,
    buffer: Arc<EventBuffer>,
    stop: StopSignal,
) {
    loop {
        if stop.is_stop_requested() {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(raw) => {
                if ingest_one(raw, &buffer, &stop) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    backend.stop();
    for raw in rx.try_iter() {
        ingest_one(raw, &buffer, &stop);
    }
}

/// Append one raw key event. Returns true when the panic key was released,
/// after setting the session stop signal.
fn ingest_one(raw: RawInput, buffer: &EventBuffer, stop: &StopSignal) -> bool {
    match raw.kind {
        RawInputKind::KeyDown { key } => {
            buffer.append(InputEvent::Key(KeyEvent {
                timestamp: raw.timestamp,
                key,
                phase: KeyPhase::Down,
                held_secs: 0.0,
            }));
            false
        }
        RawInputKind::KeyUp { key } => {
            let held = buffer.append_key_up(&key, raw.timestamp);
            tracing::trace!(key = %key, held, "key released");
            if key == PANIC_KEY {
                tracing::info!("panic key released, requesting session stop");
                stop.request_stop();
                return true;
            }
            false
        }
        // Pointer events never arrive on a keyboard hook channel.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_output(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "pulse-monitor-kb-{}-{}.csv",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let mut monitor = KeyboardMonitor::new(0, temp_output("zero"), StopSignal::new());
        assert!(matches!(monitor.start(), Err(MonitorError::InvalidPeriod)));
        assert_eq!(monitor.state(), MonitorState::Idle);
    }

    #[test]
    fn test_monitor_is_not_reusable() {
        let path = temp_output("reuse");
        let _ = std::fs::remove_file(&path);
        let stop = StopSignal::new();
        let mut monitor = KeyboardMonitor::new(600, &path, stop.clone());

        monitor.start().unwrap();
        assert!(monitor.is_active());
        stop.request_stop();
        monitor.wait();
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(!monitor.is_active());

        assert!(matches!(monitor.start(), Err(MonitorError::AlreadyStarted)));
        let _ = std::fs::remove_file(&path);
    }
}
