//! Session lifecycle primitives shared by every monitor instance.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one monitoring session.
///
/// Set-once-then-observed: any holder may request a stop (the panic key, a
/// Ctrl+C handler, the orchestrating caller) and the request is idempotent.
/// [`reset`](StopSignal::reset) is only valid once every observing monitor
/// has reached [`MonitorState::Stopped`]; the orchestrator enforces that by
/// waiting on its monitors first.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the session to stop. Idempotent.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm the signal for a fresh session.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Lifecycle of one monitor instance. Instances are not reusable: a session
/// ends in `Stopped` and a new session needs a fresh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Capturing,
    Stopping,
    Stopped,
}

/// Lock-free cell holding a [`MonitorState`], shared across the monitor's
/// ingest and analysis threads.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(MonitorState::Idle as u8))
    }

    pub fn set(&self, state: MonitorState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> MonitorState {
        match self.0.load(Ordering::SeqCst) {
            0 => MonitorState::Idle,
            1 => MonitorState::Capturing,
            2 => MonitorState::Stopping,
            _ => MonitorState::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_is_idempotent() {
        let signal = StopSignal::new();
        assert!(!signal.is_stop_requested());
        signal.request_stop();
        signal.request_stop();
        assert!(signal.is_stop_requested());
        signal.reset();
        assert!(!signal.is_stop_requested());
    }

    #[test]
    fn test_stop_signal_shared_across_clones() {
        let signal = StopSignal::new();
        let observer = signal.clone();
        signal.request_stop();
        assert!(observer.is_stop_requested());
    }

    #[test]
    fn test_state_cell_round_trips() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), MonitorState::Idle);
        for state in [
            MonitorState::Capturing,
            MonitorState::Stopping,
            MonitorState::Stopped,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }
}
