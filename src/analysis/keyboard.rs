//! Keyboard analysis engine.
//!
//! Reduces one drained batch of key events to typing statistics: keypress
//! volume, the hold-duration (IKD) distribution, and correction/space rates.

use crate::analysis::stats::{median, median_abs_deviation, percentile, round_to};
use crate::analysis::AnalysisEngine;
use crate::capture::types::{InputEvent, KeyEvent};
use crate::sink::{SinkRecord, TIMESTAMP_FORMAT};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Column order of the keyboard sink file. Byte-stable across a session.
pub const KEYBOARD_HEADER: &[&str] = &[
    "start_time",
    "end_time",
    "duration_sec",
    "total_keypresses",
    "median_ikd",
    "p95_ikd",
    "mad",
    "auto_correction_rate",
    "space_rate",
    "backspace_count",
    "space_count",
];

/// One keyboard statistics record per analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_sec: f64,
    pub total_keypresses: u64,
    pub median_ikd: f64,
    pub p95_ikd: f64,
    pub mad: f64,
    pub auto_correction_rate: f64,
    pub space_rate: f64,
    pub backspace_count: u64,
    pub space_count: u64,
}

impl SinkRecord for KeyboardReport {
    fn csv_row(&self) -> Vec<String> {
        vec![
            self.start_time.format(TIMESTAMP_FORMAT).to_string(),
            self.end_time.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", self.duration_sec),
            self.total_keypresses.to_string(),
            format!("{:.4}", self.median_ikd),
            format!("{:.4}", self.p95_ikd),
            format!("{:.4}", self.mad),
            format!("{:.4}", self.auto_correction_rate),
            format!("{:.4}", self.space_rate),
            self.backspace_count.to_string(),
            self.space_count.to_string(),
        ]
    }
}

/// Stateless keyboard engine; all continuity lives in the events themselves.
#[derive(Debug, Default)]
pub struct KeyboardEngine;

impl KeyboardEngine {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisEngine for KeyboardEngine {
    type Report = KeyboardReport;

    fn analyze(&mut self, batch: &[InputEvent]) -> Option<KeyboardReport> {
        if batch.is_empty() {
            return None;
        }

        let start_time = batch.iter().map(InputEvent::timestamp).min()?;
        let end_time = batch.iter().map(InputEvent::timestamp).max()?;
        let duration_sec = (end_time - start_time).num_milliseconds() as f64 / 1000.0;

        let keys: Vec<&KeyEvent> = batch
            .iter()
            .filter_map(|e| match e {
                InputEvent::Key(k) => Some(k),
                _ => None,
            })
            .collect();

        let downs: Vec<&&KeyEvent> = keys.iter().filter(|k| k.is_down()).collect();
        let total_keypresses = downs.len() as u64;

        // Hold-duration distribution from release events; non-finite values
        // are excluded rather than poisoning the whole cycle.
        let durations: Vec<f64> = keys
            .iter()
            .filter(|k| !k.is_down())
            .map(|k| k.held_secs)
            .filter(|d| d.is_finite())
            .collect();

        let (median_ikd, p95_ikd, mad) = if durations.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let med = median(&durations);
            (
                med,
                percentile(&durations, 95.0),
                median_abs_deviation(&durations, med),
            )
        };

        let backspace_count = downs.iter().filter(|k| k.is_backspace()).count() as u64;
        let space_count = downs.iter().filter(|k| k.is_space()).count() as u64;

        let auto_correction_rate = if total_keypresses > 0 {
            backspace_count as f64 / total_keypresses as f64
        } else {
            0.0
        };
        let space_rate = if total_keypresses > 0 {
            space_count as f64 / total_keypresses as f64
        } else {
            0.0
        };

        Some(KeyboardReport {
            start_time,
            end_time,
            duration_sec: round_to(duration_sec, 2),
            total_keypresses,
            median_ikd: round_to(median_ikd, 4),
            p95_ikd: round_to(p95_ikd, 4),
            mad: round_to(mad, 4),
            auto_correction_rate: round_to(auto_correction_rate, 4),
            space_rate: round_to(space_rate, 4),
            backspace_count,
            space_count,
        })
    }

    fn retain_window(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::KeyPhase;
    use pretty_assertions::assert_eq;

    fn key(name: &str, phase: KeyPhase, offset_ms: i64, held_secs: f64) -> InputEvent {
        let base = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        InputEvent::Key(KeyEvent {
            timestamp: base + Duration::milliseconds(offset_ms),
            key: name.to_string(),
            phase,
            held_secs,
        })
    }

    #[test]
    fn test_empty_batch_produces_no_report() {
        assert!(KeyboardEngine::new().analyze(&[]).is_none());
    }

    #[test]
    fn test_ikd_distribution_metrics() {
        let mut batch = Vec::new();
        for (i, held) in [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
            let offset = i as i64 * 1000;
            batch.push(key("a", KeyPhase::Down, offset, 0.0));
            batch.push(key("a", KeyPhase::Up, offset + 100, *held));
        }

        let report = KeyboardEngine::new().analyze(&batch).unwrap();
        assert_eq!(report.total_keypresses, 5);
        assert_eq!(report.median_ikd, 3.0);
        assert_eq!(report.p95_ikd, 4.8);
        assert_eq!(report.mad, 1.0);
    }

    #[test]
    fn test_correction_and_space_rates() {
        let batch = vec![
            key("h", KeyPhase::Down, 0, 0.0),
            key("backspace", KeyPhase::Down, 100, 0.0),
            key(" ", KeyPhase::Down, 200, 0.0),
            key("space", KeyPhase::Down, 300, 0.0),
        ];

        let report = KeyboardEngine::new().analyze(&batch).unwrap();
        assert_eq!(report.total_keypresses, 4);
        assert_eq!(report.backspace_count, 1);
        assert_eq!(report.space_count, 2);
        assert_eq!(report.auto_correction_rate, 0.25);
        assert_eq!(report.space_rate, 0.5);
        // No releases in the batch.
        assert_eq!(report.median_ikd, 0.0);
        assert_eq!(report.p95_ikd, 0.0);
        assert_eq!(report.mad, 0.0);
    }

    #[test]
    fn test_batch_window_and_duration() {
        let batch = vec![
            key("a", KeyPhase::Down, 0, 0.0),
            key("a", KeyPhase::Up, 90_500, 0.1),
        ];
        let report = KeyboardEngine::new().analyze(&batch).unwrap();
        assert_eq!(report.duration_sec, 90.5);
        assert_eq!(report.end_time - report.start_time, Duration::milliseconds(90_500));
    }

    #[test]
    fn test_csv_row_matches_header_order() {
        let batch = vec![key("a", KeyPhase::Down, 0, 0.0)];
        let report = KeyboardEngine::new().analyze(&batch).unwrap();
        let row = report.csv_row();
        assert_eq!(row.len(), KEYBOARD_HEADER.len());
        assert_eq!(row[0], "2026-03-01 10:00:00");
        assert_eq!(row[3], "1");
        assert_eq!(row[4], "0.0000");
    }
}
