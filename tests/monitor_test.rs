//! End-to-end tests driving monitors through the real capture channel and
//! ingest path, using the backend's injector for synthetic events.

use pretty_assertions::assert_eq;
use pulse_monitor::{
    EventBuffer, InputEvent, KeyboardMonitor, Monitor, MonitorState, PointerMonitor, RawInput,
    RawInputKind, StopSignal,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn temp_output(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "pulse-monitor-test-{}-{}.csv",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    cond()
}

#[test]
fn panic_key_stops_session_with_one_final_row() {
    let path = temp_output("panic-key");
    let stop = StopSignal::new();
    // Period far beyond the test horizon: the only row must come from the
    // final flush, not a timer tick.
    let mut monitor = KeyboardMonitor::new(3600, &path, stop.clone());
    monitor.start().expect("failed to start keyboard monitor");

    let tx = monitor.injector().expect("injector available after start");
    for kind in [
        RawInputKind::KeyDown { key: "h".into() },
        RawInputKind::KeyUp { key: "h".into() },
        RawInputKind::KeyDown { key: "esc".into() },
        RawInputKind::KeyUp { key: "esc".into() },
    ] {
        tx.send(RawInput::now(kind)).unwrap();
    }

    assert!(
        wait_until(Duration::from_secs(5), || monitor.state()
            == MonitorState::Stopped),
        "monitor did not stop after panic key"
    );
    monitor.wait();

    assert!(stop.is_stop_requested());
    assert!(!monitor.is_active());

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    // Header plus exactly one record from the final flush.
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("start_time,end_time,duration_sec"));
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields.len(), 11);
    // Two key-down events were captured before the stop.
    assert_eq!(fields[3], "2");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn external_stop_flushes_pointer_monitor() {
    let path = temp_output("pointer-stop");
    let stop = StopSignal::new();
    let mut monitor = PointerMonitor::new(3600, &path, stop.clone());
    monitor.start().expect("failed to start pointer monitor");

    let tx = monitor.injector().expect("injector available after start");
    for i in 0..5 {
        tx.send(RawInput::now(RawInputKind::PointerMove {
            x: f64::from(i) * 10.0,
            y: 0.0,
        }))
        .unwrap();
    }
    tx.send(RawInput::now(RawInputKind::PointerScroll {
        x: 40.0,
        y: 0.0,
        dx: 0.0,
        dy: -1.0,
    }))
    .unwrap();

    // Let ingest drain the channel before requesting the stop.
    std::thread::sleep(Duration::from_millis(300));
    monitor.request_stop();

    assert!(
        wait_until(Duration::from_secs(5), || monitor.state()
            == MonitorState::Stopped),
        "monitor did not stop on external request"
    );
    monitor.wait();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields.len(), 10);
    // total_distance: four 10px steps after the first move.
    assert_eq!(fields[7], "40.00");
    assert_eq!(fields[9], "1");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn immediate_stop_loses_no_captured_events() {
    let path = temp_output("immediate-stop");
    let stop = StopSignal::new();
    let mut monitor = KeyboardMonitor::new(3600, &path, stop.clone());
    monitor.start().expect("failed to start keyboard monitor");

    let tx = monitor.injector().expect("injector available after start");
    const KEYS: u64 = 50;
    for i in 0..KEYS {
        tx.send(RawInput::now(RawInputKind::KeyDown {
            key: format!("k{i}"),
        }))
        .unwrap();
    }
    // Stop right behind the sends, with no settling delay: the final drain
    // must still see every event already handed to the capture channel.
    stop.request_stop();

    assert!(
        wait_until(Duration::from_secs(5), || monitor.state()
            == MonitorState::Stopped),
        "monitor did not stop on immediate request"
    );
    monitor.wait();

    let content = std::fs::read_to_string(&path).unwrap();
    let total: u64 = content
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(3).unwrap().parse::<u64>().unwrap())
        .sum();
    assert_eq!(total, KEYS);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn concurrent_appends_and_drains_lose_nothing() {
    use pulse_monitor::capture::types::{KeyEvent, KeyPhase};
    use std::collections::HashSet;

    let buffer = Arc::new(EventBuffer::new());
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 250;

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|t| {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    buffer.append(InputEvent::Key(KeyEvent {
                        timestamp: chrono::Utc::now(),
                        key: format!("{t}-{i}"),
                        phase: KeyPhase::Down,
                        held_secs: 0.0,
                    }));
                }
            })
        })
        .collect();

    // Drain concurrently with the producers.
    let mut seen: Vec<InputEvent> = Vec::new();
    for _ in 0..20 {
        seen.extend(buffer.drain_and_reset(None, chrono::Utc::now()));
        std::thread::sleep(Duration::from_millis(5));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    seen.extend(buffer.drain_and_reset(None, chrono::Utc::now()));

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);

    let mut ids = HashSet::new();
    for event in &seen {
        if let InputEvent::Key(k) = event {
            assert!(ids.insert(k.key.clone()), "duplicate event {}", k.key);
        }
    }
    assert_eq!(ids.len(), PRODUCERS * PER_PRODUCER);
}
