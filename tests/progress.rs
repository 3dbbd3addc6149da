//! Progress and cancellation integration tests.

use std::sync::{Arc, Mutex};
use std::thread;

use motionbase::{
    CancellationToken, MotionSettings, ProgressCallback, ProgressInfo, RegenerateOptions,
    regenerate_all,
};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_cancel() {
    let token = CancellationToken::new();
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_default_trait() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_crosses_threads() {
    let token = CancellationToken::new();
    let remote = token.clone();
    thread::spawn(move || remote.cancel())
        .join()
        .expect("Thread panicked");
    assert!(token.is_cancelled());
}

// ── ProgressCallback ───────────────────────────────────────────────

#[derive(Default)]
struct Counter(Mutex<Vec<ProgressInfo>>);

impl ProgressCallback for Counter {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.lock().unwrap().push(info.clone());
    }
}

#[test]
fn empty_batch_reports_completion_once() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = MotionSettings::from_ini_str("[DEFAULT]\nrgb_multipliers = 1,1,1\n").unwrap();
    let counter = Arc::new(Counter::default());
    let options = RegenerateOptions::new(root.path()).with_progress(counter.clone());

    regenerate_all(&settings, &options).unwrap();

    let reports = counter.0.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].current, 0);
    assert_eq!(reports[0].total, Some(0));
    assert_eq!(reports[0].percentage, None);
    assert!(reports[0].current_item.is_none());
}
