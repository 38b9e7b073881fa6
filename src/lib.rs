//! pulse-monitor: background input-behavior monitor.
//!
//! Continuously observes raw keyboard and pointer activity and periodically
//! reduces the observed stream into compact behavioral statistics, persisted
//! as append-only CSV records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  monitor instance (per modality)             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐    ┌─────────────┐    ┌──────────┐            │
//! │  │  Capture  │───▶│ EventBuffer │───▶│ Analysis │──▶ CsvSink │
//! │  │ (OS hook) │    │ (one mutex) │    │ (ticker) │            │
//! │  └───────────┘    └─────────────┘    └──────────┘            │
//! │        │                                   │                 │
//! │        └──────────▶ StopSignal ◀───────────┘                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two timelines run concurrently per monitor: a low-latency capture path
//! appending events under the buffer's single mutex, and a coarse periodic
//! analysis path that drains the buffer each tick and computes one
//! statistics record from its private copy. A shared [`StopSignal`],
//! settable by the panic key, Ctrl+C, or the orchestrating caller,
//! triggers exactly one final drain-and-flush per monitor before it stops.
//!
//! # Example
//!
//! ```no_run
//! use pulse_monitor::{KeyboardMonitor, Monitor, StopSignal};
//!
//! let stop = StopSignal::new();
//! let mut monitor = KeyboardMonitor::new(120, "keyboard_performance.csv", stop.clone());
//! monitor.start().expect("failed to register capture");
//! // ... later, from any holder of the signal:
//! stop.request_stop();
//! monitor.wait();
//! ```

pub mod analysis;
pub mod buffer;
pub mod capture;
pub mod config;
pub mod lifecycle;
pub mod monitor;
pub mod sink;

// Re-export key types at crate root for convenience
pub use analysis::{
    AnalysisEngine, KeyboardEngine, KeyboardReport, PointerEngine, PointerReport, KEYBOARD_HEADER,
    POINTER_HEADER,
};
pub use buffer::EventBuffer;
pub use capture::{
    check_permission, Backend, CaptureError, CaptureKind, InputEvent, RawInput, RawInputKind,
    PANIC_KEY,
};
pub use config::{Config, SourceConfig};
pub use lifecycle::{MonitorState, StopSignal};
pub use monitor::{AnyMonitor, KeyboardMonitor, Monitor, MonitorError, PointerMonitor};
pub use sink::{CsvSink, SinkRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
