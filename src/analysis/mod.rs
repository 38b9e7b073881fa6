//! Periodic reduction of drained event batches into statistics records.

pub mod keyboard;
pub mod pointer;
pub mod stats;

use crate::capture::types::InputEvent;
use crate::sink::SinkRecord;
use chrono::Duration;

pub use keyboard::{KeyboardEngine, KeyboardReport, KEYBOARD_HEADER};
pub use pointer::{PointerEngine, PointerReport, POINTER_HEADER};

/// One analysis engine per modality: consumes a drained batch, produces at
/// most one record. Stateless between invocations.
pub trait AnalysisEngine: Send + 'static {
    type Report: SinkRecord;

    /// Reduce a drained batch to a statistics record. Returns `None` for a
    /// batch with nothing analyzable; no row is written for that cycle.
    fn analyze(&mut self, batch: &[InputEvent]) -> Option<Self::Report>;

    /// Trailing window the buffer keeps live across drains, if any.
    fn retain_window(&self) -> Option<Duration>;
}
