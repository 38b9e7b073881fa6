//! Pointer analysis engine.
//!
//! Reduces one drained batch of pointer events to movement statistics:
//! directional entropy, path efficiency, speed, acceleration variance, and
//! click/scroll volume. The engine asks the buffer to keep a short trailing
//! window live across drains so movement derivatives stay continuous at the
//! cycle boundary.

use crate::analysis::stats::{population_variance, round_to};
use crate::analysis::AnalysisEngine;
use crate::capture::types::{InputEvent, PointerMoveEvent};
use crate::sink::{SinkRecord, TIMESTAMP_FORMAT};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Trailing seconds of events the buffer keeps live across drains.
pub const DEFAULT_RETAIN_SECS: i64 = 5;

/// Number of direction buckets for the movement-entropy histogram.
const ENTROPY_BINS: usize = 8;

/// Column order of the pointer sink file. Byte-stable across a session.
pub const POINTER_HEADER: &[&str] = &[
    "start_time",
    "end_time",
    "duration_sec",
    "move_entropy",
    "effective_path_ratio",
    "avg_speed",
    "acceleration_variance",
    "total_distance",
    "click_count",
    "scroll_count",
];

/// One pointer statistics record per analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_sec: f64,
    pub move_entropy: f64,
    pub effective_path_ratio: f64,
    pub avg_speed: f64,
    pub acceleration_variance: f64,
    pub total_distance: f64,
    pub click_count: u64,
    pub scroll_count: u64,
}

impl SinkRecord for PointerReport {
    fn csv_row(&self) -> Vec<String> {
        vec![
            self.start_time.format(TIMESTAMP_FORMAT).to_string(),
            self.end_time.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", self.duration_sec),
            format!("{:.4}", self.move_entropy),
            format!("{:.4}", self.effective_path_ratio),
            format!("{:.2}", self.avg_speed),
            format!("{:.4}", self.acceleration_variance),
            format!("{:.2}", self.total_distance),
            self.click_count.to_string(),
            self.scroll_count.to_string(),
        ]
    }
}

/// Pointer engine. Stateless between cycles; cross-cycle continuity comes
/// from the buffer's retained trailing window.
#[derive(Debug)]
pub struct PointerEngine {
    retain: Duration,
}

impl Default for PointerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerEngine {
    pub fn new() -> Self {
        Self {
            retain: Duration::seconds(DEFAULT_RETAIN_SECS),
        }
    }
}

impl AnalysisEngine for PointerEngine {
    type Report = PointerReport;

    fn analyze(&mut self, batch: &[InputEvent]) -> Option<PointerReport> {
        if batch.is_empty() {
            return None;
        }

        let start_time = batch.iter().map(InputEvent::timestamp).min()?;
        let end_time = batch.iter().map(InputEvent::timestamp).max()?;
        let duration_sec = (end_time - start_time).num_milliseconds() as f64 / 1000.0;

        // Non-finite samples are dropped; one bad sample must not abort
        // the cycle.
        let moves: Vec<&PointerMoveEvent> = batch
            .iter()
            .filter_map(|e| match e {
                InputEvent::PointerMove(m) => Some(m),
                _ => None,
            })
            .filter(|m| {
                m.x.is_finite() && m.y.is_finite() && m.distance.is_finite() && m.speed.is_finite()
            })
            .collect();

        let click_count = batch
            .iter()
            .filter(|e| matches!(e, InputEvent::PointerClick(c) if c.pressed))
            .count() as u64;
        let scroll_count = batch
            .iter()
            .filter(|e| matches!(e, InputEvent::PointerScroll(_)))
            .count() as u64;

        // The batch's first move carries distance attributed to the previous
        // cycle (or none at all), so it never contributes here.
        let total_distance: f64 = moves.iter().skip(1).map(|m| m.distance).sum();

        Some(PointerReport {
            start_time,
            end_time,
            duration_sec: round_to(duration_sec, 2),
            move_entropy: round_to(move_entropy(&moves), 4),
            effective_path_ratio: round_to(effective_path_ratio(&moves, total_distance), 4),
            avg_speed: round_to(avg_speed(&moves, total_distance), 2),
            acceleration_variance: round_to(acceleration_variance(&moves), 4),
            total_distance: round_to(total_distance, 2),
            click_count,
            scroll_count,
        })
    }

    fn retain_window(&self) -> Option<Duration> {
        Some(self.retain)
    }
}

/// Shannon entropy (base 2) of the direction-angle histogram of consecutive
/// moves, bucketed into 8 equal bins spanning [-pi, pi].
fn move_entropy(moves: &[&PointerMoveEvent]) -> f64 {
    if moves.len() < 2 {
        return 0.0;
    }

    let mut counts = [0u64; ENTROPY_BINS];
    let mut total = 0u64;
    let bin_width = 2.0 * std::f64::consts::PI / ENTROPY_BINS as f64;

    for pair in moves.windows(2) {
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        if dx == 0.0 && dy == 0.0 {
            continue;
        }
        let angle = dy.atan2(dx);
        let mut bin = ((angle + std::f64::consts::PI) / bin_width) as usize;
        // atan2 returns pi inclusive; fold the top edge into the last bin.
        if bin >= ENTROPY_BINS {
            bin = ENTROPY_BINS - 1;
        }
        counts[bin] += 1;
        total += 1;
    }

    if total == 0 {
        return 0.0;
    }

    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Straight-line displacement over total path length; 1.0 is a direct move.
fn effective_path_ratio(moves: &[&PointerMoveEvent], total_distance: f64) -> f64 {
    if moves.len() < 2 || total_distance == 0.0 {
        return 0.0;
    }
    let first = moves[0];
    let last = moves[moves.len() - 1];
    let direct = ((last.x - first.x).powi(2) + (last.y - first.y).powi(2)).sqrt();
    direct / total_distance
}

/// Path length over the elapsed time between the first and last move.
fn avg_speed(moves: &[&PointerMoveEvent], total_distance: f64) -> f64 {
    if moves.len() < 2 {
        return 0.0;
    }
    let elapsed = (moves[moves.len() - 1].timestamp - moves[0].timestamp).num_milliseconds() as f64
        / 1000.0;
    if elapsed == 0.0 {
        return 0.0;
    }
    total_distance / elapsed
}

/// Population variance of acceleration samples: first differences of the
/// positive instantaneous speeds after the batch's first move, each divided
/// by its own pair's elapsed time.
fn acceleration_variance(moves: &[&PointerMoveEvent]) -> f64 {
    let samples: Vec<(DateTime<Utc>, f64)> = moves
        .iter()
        .skip(1)
        .filter(|m| m.speed > 0.0)
        .map(|m| (m.timestamp, m.speed))
        .collect();

    if samples.len() < 2 {
        return 0.0;
    }

    let mut accelerations = Vec::with_capacity(samples.len() - 1);
    for pair in samples.windows(2) {
        let dt = (pair[1].0 - pair[0].0).num_milliseconds() as f64 / 1000.0;
        if dt > 0.0 {
            accelerations.push((pair[1].1 - pair[0].1) / dt);
        }
    }

    if accelerations.len() < 2 {
        return 0.0;
    }
    population_variance(&accelerations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::{PointerButton, PointerClickEvent, PointerScrollEvent};
    use pretty_assertions::assert_eq;
    use std::f64::consts::PI;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Build move events from positions one second apart, computing the
    /// distance/speed fields the way capture ingest does.
    fn moves_from(positions: &[(f64, f64)]) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let mut prev: Option<(f64, f64)> = None;
        for (i, &(x, y)) in positions.iter().enumerate() {
            let (distance, speed) = match prev {
                Some((px, py)) => {
                    let d = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
                    (d, d / 1.0)
                }
                None => (0.0, 0.0),
            };
            events.push(InputEvent::PointerMove(PointerMoveEvent {
                timestamp: base() + Duration::seconds(i as i64),
                x,
                y,
                distance,
                speed,
            }));
            prev = Some((x, y));
        }
        events
    }

    #[test]
    fn test_empty_batch_produces_no_report() {
        assert!(PointerEngine::new().analyze(&[]).is_none());
    }

    #[test]
    fn test_uniform_directions_max_entropy() {
        // One step in the center of each of the 8 direction bins.
        let bin_width = PI / 4.0;
        let mut positions = vec![(0.0, 0.0)];
        for k in 0..8 {
            let angle = -PI + (k as f64 + 0.5) * bin_width;
            let (x, y) = *positions.last().unwrap();
            positions.push((x + 10.0 * angle.cos(), y + 10.0 * angle.sin()));
        }

        let report = PointerEngine::new().analyze(&moves_from(&positions)).unwrap();
        assert_eq!(report.move_entropy, 3.0);
    }

    #[test]
    fn test_single_direction_zero_entropy() {
        let positions: Vec<(f64, f64)> = (0..6).map(|i| (i as f64 * 10.0, 0.0)).collect();
        let report = PointerEngine::new().analyze(&moves_from(&positions)).unwrap();
        assert_eq!(report.move_entropy, 0.0);
    }

    #[test]
    fn test_straight_line_path_ratio_and_speed() {
        let positions: Vec<(f64, f64)> = (0..=10).map(|i| (i as f64, 0.0)).collect();
        let report = PointerEngine::new().analyze(&moves_from(&positions)).unwrap();
        assert_eq!(report.effective_path_ratio, 1.0);
        assert_eq!(report.total_distance, 10.0);
        // 10 px over 10 seconds.
        assert_eq!(report.avg_speed, 1.0);
    }

    #[test]
    fn test_round_trip_path_ratio_zero() {
        let positions = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        let report = PointerEngine::new().analyze(&moves_from(&positions)).unwrap();
        assert_eq!(report.effective_path_ratio, 0.0);
        assert_eq!(report.total_distance, 40.0);
    }

    #[test]
    fn test_constant_speed_zero_acceleration_variance() {
        let positions: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 0.0)).collect();
        let report = PointerEngine::new().analyze(&moves_from(&positions)).unwrap();
        assert_eq!(report.acceleration_variance, 0.0);
    }

    #[test]
    fn test_acceleration_variance_of_ramping_speeds() {
        // Speeds 1, 2, 4 px/s -> accelerations 1 and 2 -> variance 0.25.
        let positions = [(0.0, 0.0), (1.0, 0.0), (3.0, 0.0), (7.0, 0.0)];
        let report = PointerEngine::new().analyze(&moves_from(&positions)).unwrap();
        assert_eq!(report.acceleration_variance, 0.25);
    }

    #[test]
    fn test_click_and_scroll_counts() {
        let mut batch = moves_from(&[(0.0, 0.0), (5.0, 0.0)]);
        for pressed in [true, false, true] {
            batch.push(InputEvent::PointerClick(PointerClickEvent {
                timestamp: base() + Duration::seconds(3),
                x: 5.0,
                y: 0.0,
                button: PointerButton::Left,
                pressed,
            }));
        }
        batch.push(InputEvent::PointerScroll(PointerScrollEvent {
            timestamp: base() + Duration::seconds(4),
            x: 5.0,
            y: 0.0,
            dx: 0.0,
            dy: -2.0,
        }));

        let report = PointerEngine::new().analyze(&batch).unwrap();
        // Only pressed clicks count.
        assert_eq!(report.click_count, 2);
        assert_eq!(report.scroll_count, 1);
    }

    #[test]
    fn test_non_finite_moves_are_excluded() {
        let mut batch = moves_from(&[(0.0, 0.0), (3.0, 4.0)]);
        batch.push(InputEvent::PointerMove(PointerMoveEvent {
            timestamp: base() + Duration::seconds(9),
            x: f64::NAN,
            y: 0.0,
            distance: f64::NAN,
            speed: 0.0,
        }));

        let report = PointerEngine::new().analyze(&batch).unwrap();
        assert_eq!(report.total_distance, 5.0);
    }

    #[test]
    fn test_csv_row_matches_header_order() {
        let report = PointerEngine::new()
            .analyze(&moves_from(&[(0.0, 0.0), (10.0, 0.0)]))
            .unwrap();
        let row = report.csv_row();
        assert_eq!(row.len(), POINTER_HEADER.len());
        assert_eq!(row[0], "2026-03-01 10:00:00");
        assert_eq!(row[5], "10.00");
        assert_eq!(row[7], "10.00");
    }
}
