//! Ingestion gate integration tests: type, size and count limits.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use common::{fake_png, sized_png, TestHarness};
use webpforge::config::Config;
use webpforge::ingest::{Candidate, SelectionInput};
use webpforge_common::{ItemStatus, Quality, Severity};

const MB: usize = 1024 * 1024;

#[test]
fn admits_up_to_the_count_limit_and_reports_the_rest() {
    let mut h = TestHarness::new();
    let max = h.session.config().limits.max_files;

    let batch: Vec<Candidate> = (0..max + 5).map(|i| fake_png(&format!("{i}.png"))).collect();
    let report = h.session.add_files(batch);

    assert_eq!(report.admitted_count(), max);
    assert_eq!(report.dropped_for_count, 5);
    assert!(!report.batch_rejected);
    assert_eq!(h.session.queue().len(), max);

    // Order is preserved: the last five are the ones dropped.
    let names: Vec<String> = h
        .session
        .queue()
        .items()
        .into_iter()
        .map(|item| item.source_name)
        .collect();
    assert_eq!(names.first().map(String::as_str), Some("0.png"));
    assert_eq!(names.last().map(String::as_str), Some("49.png"));

    let notes = h.drain_notifications();
    assert!(notes
        .iter()
        .any(|n| n.severity == Severity::Error && n.message.contains("5 dropped")));
    assert!(notes
        .iter()
        .any(|n| n.severity == Severity::Success && n.message == "Added 50 files"));
}

#[test]
fn full_queue_rejects_the_whole_batch() {
    let mut config = Config::default();
    config.limits.max_files = 2;
    let mut h = TestHarness::with_config(config);
    h.admit(&["a.png", "b.png"]);
    h.drain_notifications();

    let report = h.session.add_files(vec![fake_png("c.png"), fake_png("d.png")]);
    assert!(report.batch_rejected);
    assert!(report.admitted.is_empty());
    assert_eq!(report.dropped_for_count, 2);

    let notes = h.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert!(notes[0].message.starts_with("Queue is full"));
}

#[test]
fn file_at_the_size_limit_is_accepted() {
    let h = TestHarness::new();
    let limit = h.session.config().limits.max_file_size_mb as usize * MB;

    let report = h.session.add_files(vec![sized_png("exact.png", limit)]);
    assert_eq!(report.admitted_count(), 1);
    assert!(report.oversized.is_empty());
}

#[test]
fn file_over_the_size_limit_is_rejected_by_name() {
    let mut h = TestHarness::new();
    let over = (h.session.config().limits.max_file_size_mb as usize + 1) * MB;

    let report = h
        .session
        .add_files(vec![sized_png("huge.png", over), fake_png("small.png")]);
    assert_eq!(report.oversized, vec!["huge.png".to_string()]);
    assert_eq!(report.admitted_count(), 1);

    let notes = h.drain_notifications();
    assert!(notes
        .iter()
        .any(|n| n.severity == Severity::Error && n.message.contains("huge.png")));
    assert!(notes
        .iter()
        .any(|n| n.severity == Severity::Success && n.message == "Added 1 file"));
}

#[test]
fn non_images_are_dropped_quietly() {
    let mut h = TestHarness::new();

    let report = h.session.add_files(vec![
        Candidate::new("notes.txt", Some("text/plain".into()), b"hello".to_vec()),
        fake_png("a.png"),
    ]);
    assert_eq!(report.ignored, 1);
    assert_eq!(report.admitted_count(), 1);

    let notes = h.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Success);
}

#[test]
fn admitted_items_take_the_current_preference() {
    let h = TestHarness::new();
    h.session.set_default_quality(0.7).unwrap();

    let ids = h.admit(&["a.png"]);
    let item = h.session.queue().get(ids[0]).unwrap();
    assert_eq!(item.quality, Quality::new(0.7));
    assert_eq!(item.status, ItemStatus::Pending);
    assert!(item.result.is_none());
    assert!(h.session.queue().handles().is_live(item.source_handle));

    // Later preference changes leave admitted items alone.
    h.session.set_default_quality(0.2).unwrap();
    let item = h.session.queue().get(ids[0]).unwrap();
    assert_eq!(item.quality, Quality::new(0.7));
}

#[test]
fn ids_and_handles_are_unique() {
    let h = TestHarness::new();
    let ids = h.admit(&["a.png", "b.png", "a.png"]);

    let items = h.session.queue().items();
    assert_eq!(items.len(), 3);
    assert_ne!(ids[0], ids[2]);
    assert_ne!(items[0].source_handle, items[2].source_handle);
}

struct RecordingInput {
    clears: AtomicUsize,
    cleared: Notify,
}

impl SelectionInput for RecordingInput {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.cleared.notify_one();
    }
}

#[tokio::test(start_paused = true)]
async fn selection_is_cleared_after_the_reset_delay() {
    let h = TestHarness::new();
    let input = Arc::new(RecordingInput {
        clears: AtomicUsize::new(0),
        cleared: Notify::new(),
    });

    let start = tokio::time::Instant::now();
    let report = h
        .session
        .add_from_selection(input.clone(), vec![fake_png("a.png")]);
    assert_eq!(report.admitted_count(), 1);
    assert_eq!(input.clears.load(Ordering::SeqCst), 0);

    input.cleared.notified().await;
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(input.clears.load(Ordering::SeqCst), 1);
}
