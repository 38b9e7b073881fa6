//! Thread-safe event buffer shared between the capture and analysis timelines.
//!
//! The buffer's single mutex is the only synchronization point between the
//! two: ingest holds it for one append (plus, for key releases, a bounded
//! backward scan), analysis holds it only for the drain swap and never while
//! computing statistics on the drained batch.

use crate::capture::types::{InputEvent, KeyEvent, KeyPhase};
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Append-only, periodically drained event queue.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Mutex<Vec<InputEvent>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. Never reorders: timestamps stay non-decreasing in
    /// the producer's emission order.
    pub fn append(&self, event: InputEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    /// Append a key release, resolving its hold duration under the lock.
    ///
    /// Scans most-recent-first and stops at the first event for the same key:
    /// a `Down` yields the elapsed hold time, an `Up` means the latest down
    /// is already matched and the duration stays 0. Returns the held seconds.
    pub fn append_key_up(&self, key: &str, timestamp: DateTime<Utc>) -> f64 {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());

        let mut held_secs = 0.0;
        for event in events.iter().rev() {
            if let InputEvent::Key(k) = event {
                if k.key == key {
                    if k.phase == KeyPhase::Down {
                        let held = (timestamp - k.timestamp).num_milliseconds() as f64 / 1000.0;
                        // Hold times are reported at millisecond precision.
                        held_secs = (held.max(0.0) * 1000.0).round() / 1000.0;
                    }
                    break;
                }
            }
        }

        events.push(InputEvent::Key(KeyEvent {
            timestamp,
            key: key.to_string(),
            phase: KeyPhase::Up,
            held_secs,
        }));
        held_secs
    }

    /// Atomically take the full buffered batch in original order.
    ///
    /// With `retain_window` set, the live buffer keeps the suffix of events
    /// whose timestamp is within the window of `now`; those events appear in
    /// the returned batch *and* again at the head of the next cycle's batch,
    /// so movement derivatives keep continuity across the drain boundary.
    /// Without it the live buffer is left empty.
    pub fn drain_and_reset(
        &self,
        retain_window: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Vec<InputEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let batch = std::mem::take(&mut *events);

        if let Some(window) = retain_window {
            let cutoff = now - window;
            *events = batch
                .iter()
                .filter(|e| e.timestamp() >= cutoff)
                .cloned()
                .collect();
        }

        batch
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
