/*!
 * Integration tests for the tailer
 */

#![cfg(unix)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tempfile::tempdir;

use linetail::{ChannelListener, TailEvent, TailerBuilder};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

fn append_lines(path: &Path, prefix: &str, range: std::ops::Range<usize>) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    for i in range {
        writeln!(file, "{}{}", prefix, i).unwrap();
    }
    file.flush().unwrap();
}

/// Drain events until `count` lines arrive, returning every event seen.
fn collect_until_lines(rx: &Receiver<TailEvent>, count: usize) -> Vec<TailEvent> {
    let mut events = Vec::new();
    let mut lines = 0;
    while lines < count {
        let event = rx
            .recv_timeout(RECV_TIMEOUT)
            .expect("timed out waiting for tail events");
        if matches!(event, TailEvent::Line { .. }) {
            lines += 1;
        }
        events.push(event);
    }
    events
}

fn lines_of(events: &[TailEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            TailEvent::Line { line, .. } => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_append_only_tailing() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("app.log");
    append_lines(&target, "old", 0..100);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    let events = collect_until_lines(&rx, 100);
    let lines = lines_of(&events);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line, &format!("old{}", i));
    }

    // The file keeps growing while the tailer is running
    append_lines(&target, "old", 100..200);
    let more = lines_of(&collect_until_lines(&rx, 100));
    for (i, line) in more.iter().enumerate() {
        assert_eq!(line, &format!("old{}", i + 100));
    }

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_line_positions_advance_past_each_terminator() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("pos.log");
    std::fs::write(&target, b"ab\ncdef\n").unwrap();

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    let events = collect_until_lines(&rx, 2);
    let positions: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            TailEvent::Line { position, .. } => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(positions, vec![3, 8]);

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_rotation_by_rename_and_recreate() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("rotating.log");
    let backup = dir.path().join("rotating.log.1");
    append_lines(&target, "old", 0..100);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    let old = lines_of(&collect_until_lines(&rx, 100));
    assert_eq!(old.len(), 100);
    assert_eq!(old[99], "old99");

    // Rotate: rename the file away and write a fresh one at the path
    std::fs::rename(&target, &backup).unwrap();
    append_lines(&target, "new", 0..50);

    let events = collect_until_lines(&rx, 50);
    assert!(
        events.contains(&TailEvent::Rotated),
        "expected a rotation event, got {:?}",
        events
    );
    let new = lines_of(&events);
    for (i, line) in new.iter().enumerate() {
        assert_eq!(line, &format!("new{}", i));
    }

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_rotation_by_truncation() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("truncated.log");
    append_lines(&target, "old", 0..100);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    assert_eq!(lines_of(&collect_until_lines(&rx, 100)).len(), 100);

    // copytruncate-style rotation: same inode, size drops to zero
    let file = OpenOptions::new().write(true).open(&target).unwrap();
    file.set_len(0).unwrap();
    drop(file);
    append_lines(&target, "fresh", 0..3);

    let events = collect_until_lines(&rx, 3);
    assert!(events.contains(&TailEvent::Rotated));
    assert_eq!(lines_of(&events), vec!["fresh0", "fresh1", "fresh2"]);

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_waits_for_missing_file_to_appear() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("late.log");

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    assert_eq!(
        rx.recv_timeout(RECV_TIMEOUT).unwrap(),
        TailEvent::FileNotFound
    );

    append_lines(&target, "late", 0..1);
    let events = collect_until_lines(&rx, 1);
    assert_eq!(lines_of(&events), vec!["late0"]);

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_from_end_skips_existing_content() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("skip.log");
    append_lines(&target, "earlier", 0..10);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .from_end(true)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    // Give the tailer time to open and seek before appending
    thread::sleep(Duration::from_millis(200));
    append_lines(&target, "later", 0..2);

    let events = collect_until_lines(&rx, 2);
    assert_eq!(lines_of(&events), vec!["later0", "later1"]);

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_start_position_resumes_mid_file() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("resume.log");
    std::fs::write(&target, b"first\nsecond\n").unwrap();

    // Resume just past "first\n"
    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .start_position(6)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    let events = collect_until_lines(&rx, 1);
    assert_eq!(lines_of(&events), vec!["second"]);

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_stop_emits_stopped_event() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("stop.log");
    append_lines(&target, "line", 0..1);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    collect_until_lines(&rx, 1);
    handle.stop();
    worker.join().unwrap().unwrap();

    let mut saw_stopped = false;
    while let Ok(event) = rx.try_recv() {
        if event == TailEvent::Stopped {
            saw_stopped = true;
        }
    }
    assert!(saw_stopped);
}

#[test]
fn test_pause_and_resume() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("pause.log");
    append_lines(&target, "a", 0..1);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    collect_until_lines(&rx, 1);

    handle.pause();
    // Let the loop reach the pause gate before appending
    thread::sleep(Duration::from_millis(100));
    append_lines(&target, "b", 0..1);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    handle.resume();
    let events = collect_until_lines(&rx, 1);
    assert_eq!(lines_of(&events), vec!["b0"]);

    handle.stop();
    worker.join().unwrap().unwrap();
}

#[test]
fn test_reopen_mode_tails_across_passes() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("reopen.log");
    append_lines(&target, "x", 0..5);

    let (listener, rx) = ChannelListener::channel();
    let tailer = TailerBuilder::new(&target)
        .delay_ms(20)
        .reopen(true)
        .build(listener)
        .unwrap();
    let handle = tailer.handle();
    let worker = thread::spawn(move || tailer.run());

    assert_eq!(lines_of(&collect_until_lines(&rx, 5)).len(), 5);
    append_lines(&target, "x", 5..10);
    let more = lines_of(&collect_until_lines(&rx, 5));
    assert_eq!(more, vec!["x5", "x6", "x7", "x8", "x9"]);

    handle.stop();
    worker.join().unwrap().unwrap();
}
