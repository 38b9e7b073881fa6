//! Monitor instances: one capture source, one buffer, one analysis loop and
//! one sink per input modality, all coordinated by a shared [`StopSignal`].

pub mod keyboard;
pub mod pointer;

use crate::analysis::AnalysisEngine;
use crate::buffer::EventBuffer;
use crate::capture::CaptureError;
use crate::lifecycle::{MonitorState, StateCell, StopSignal};
use crate::sink::{CsvSink, SinkError};
use chrono::Utc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

pub use keyboard::KeyboardMonitor;
pub use pointer::PointerMonitor;

/// Errors surfaced when starting a monitor instance.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor already started; construct a fresh instance for a new session")]
    AlreadyStarted,
    #[error("analysis period must be greater than zero")]
    InvalidPeriod,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Uniform capability interface over every monitor variant.
pub trait Monitor {
    /// Register capture and start the ingest and analysis threads.
    ///
    /// Capture registration failure is fatal for the instance: the analysis
    /// timer is never started and the error is returned to the caller.
    fn start(&mut self) -> Result<(), MonitorError>;

    /// Request an orderly stop. Idempotent; shared with the whole session.
    fn request_stop(&self);

    fn is_active(&self) -> bool;

    fn state(&self) -> MonitorState;

    /// Block until the instance has performed its final flush and stopped.
    fn wait(&mut self);
}

/// Tagged variant over the monitor modalities.
pub enum AnyMonitor {
    Keyboard(KeyboardMonitor),
    Pointer(PointerMonitor),
}

impl AnyMonitor {
    pub fn modality(&self) -> &'static str {
        match self {
            AnyMonitor::Keyboard(_) => "keyboard",
            AnyMonitor::Pointer(_) => "pointer",
        }
    }
}

impl Monitor for AnyMonitor {
    fn start(&mut self) -> Result<(), MonitorError> {
        match self {
            AnyMonitor::Keyboard(m) => m.start(),
            AnyMonitor::Pointer(m) => m.start(),
        }
    }

    fn request_stop(&self) {
        match self {
            AnyMonitor::Keyboard(m) => m.request_stop(),
            AnyMonitor::Pointer(m) => m.request_stop(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            AnyMonitor::Keyboard(m) => m.is_active(),
            AnyMonitor::Pointer(m) => m.is_active(),
        }
    }

    fn state(&self) -> MonitorState {
        match self {
            AnyMonitor::Keyboard(m) => m.state(),
            AnyMonitor::Pointer(m) => m.state(),
        }
    }

    fn wait(&mut self) {
        match self {
            AnyMonitor::Keyboard(m) => m.wait(),
            AnyMonitor::Pointer(m) => m.wait(),
        }
    }
}

/// Periodic analysis driver shared by both modalities.
///
/// Runs one cycle per period tick and polls the stop signal at least once a
/// second between ticks. On stop it waits for the ingest thread to exit and
/// then performs exactly one final drain + analysis + append before
/// declaring the monitor stopped, even when the timer has not elapsed.
pub(crate) fn run_analysis_loop<E: AnalysisEngine>(
    mut engine: E,
    buffer: Arc<EventBuffer>,
    sink: CsvSink,
    period: Duration,
    stop: StopSignal,
    state: Arc<StateCell>,
    ingest: JoinHandle<()>,
    modality: &'static str,
) {
    let ticker = crossbeam_channel::tick(period);

    loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => run_cycle(&mut engine, &buffer, &sink, modality),
            default(Duration::from_secs(1)) => {}
        }
        if stop.is_stop_requested() {
            break;
        }
    }

    state.set(MonitorState::Stopping);
    // The final drain must see every append; an ingest thread still holding
    // an in-flight event would strand it in the buffer past the last cycle.
    let _ = ingest.join();
    run_cycle(&mut engine, &buffer, &sink, modality);
    state.set(MonitorState::Stopped);
    tracing::info!(modality, "monitor stopped");
}

/// One drain + analyze + append cycle. Empty batches emit nothing; a failed
/// append is logged and the record dropped, never retried.
fn run_cycle<E: AnalysisEngine>(
    engine: &mut E,
    buffer: &EventBuffer,
    sink: &CsvSink,
    modality: &'static str,
) {
    let batch = buffer.drain_and_reset(engine.retain_window(), Utc::now());
    if batch.is_empty() {
        tracing::debug!(modality, "empty cycle, no record emitted");
        return;
    }

    match engine.analyze(&batch) {
        Some(report) => match sink.append(&report) {
            Ok(()) => {
                tracing::info!(modality, events = batch.len(), "analysis record appended");
            }
            Err(e) => {
                tracing::error!(modality, "sink append failed, record dropped: {e}");
            }
        },
        None => tracing::debug!(modality, "nothing analyzable in batch"),
    }
}
