//! Event capture for pulse-monitor.
//!
//! Platform backends register OS-level input hooks and forward raw events
//! over a bounded channel. Callbacks stay non-blocking: they only convert
//! the OS payload and `try_send` it; all enrichment and buffering happens
//! on the monitor's ingest thread.

pub mod types;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod noop;

use thiserror::Error;

pub use types::{
    InputEvent, KeyEvent, KeyPhase, PointerButton, PointerClickEvent, PointerMoveEvent,
    PointerScrollEvent, RawInput, RawInputKind, PANIC_KEY,
};

#[cfg(target_os = "windows")]
pub use windows::{check_permission, WindowsBackend};

/// Platform-agnostic backend type alias
#[cfg(target_os = "windows")]
pub type Backend = WindowsBackend;

#[cfg(not(target_os = "windows"))]
pub use noop::{check_permission, NoopBackend};

/// Platform-agnostic backend type alias
#[cfg(not(target_os = "windows"))]
pub type Backend = NoopBackend;

/// Which input channel a backend should hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Keyboard,
    Pointer,
}

/// Errors that can occur during event capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture backend is already running")]
    AlreadyRunning,
    #[error("failed to install input hook")]
    HookInstallationFailed,
}
