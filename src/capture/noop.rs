//! Non-Windows (noop) implementation of event capture.
//!
//! This exists so the crate (and binary) can compile on targets without a
//! supported input hook API. The backend never emits system events, but it
//! exposes an [`injector`](NoopBackend::injector) handle so synthetic events
//! can travel the exact same channel and ingest path as real ones. The
//! integration tests use it to drive a full monitor end to end.

use crate::capture::types::RawInput;
use crate::capture::{CaptureError, CaptureKind};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A backend that installs no hooks and emits no system events.
pub struct NoopBackend {
    _kind: CaptureKind,
    sender: Sender<RawInput>,
    receiver: Receiver<RawInput>,
    running: Arc<AtomicBool>,
}

impl NoopBackend {
    /// Create a new noop backend for the given input channel.
    pub fn new(kind: CaptureKind) -> Self {
        // Bounded so a stalled consumer can't grow memory without limit.
        let (sender, receiver) = bounded(10_000);
        Self {
            _kind: kind,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start capturing events.
    ///
    /// On unsupported targets this simply marks the backend as running.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop capturing events.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the backend is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for raw input events.
    pub fn receiver(&self) -> &Receiver<RawInput> {
        &self.receiver
    }

    /// A sender feeding the same channel the backend would emit on.
    pub fn injector(&self) -> Sender<RawInput> {
        self.sender.clone()
    }
}

/// There is no input-monitoring permission gate on unsupported targets.
pub fn check_permission() -> bool {
    true
}
