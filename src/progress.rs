//! Batch progress and cooperative cancellation.
//!
//! Regenerating every annotation image of a project decodes one window per
//! labelled frame, which takes minutes on a large set. Callers observe the
//! batch through a [`ProgressCallback`] and stop it early with a
//! [`CancellationToken`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use motionbase::{
//!     MotionError, MotionSettings, ProgressCallback, ProgressInfo,
//!     RegenerateOptions, regenerate_all,
//! };
//!
//! struct Printer;
//!
//! impl ProgressCallback for Printer {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let (Some(item), Some(total)) = (&info.current_item, info.total) {
//!             println!("{item} ({}/{total})", info.current);
//!         }
//!     }
//! }
//!
//! let settings = MotionSettings::load("BehaveAI_settings.ini")?;
//! let options = RegenerateOptions::new(".").with_progress(Arc::new(Printer));
//! let summary = regenerate_all(&settings, &options)?;
//! println!("{} images rebuilt", summary.regenerated);
//! # Ok::<(), MotionError>(())
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Which stage of a batch a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Writing motion and static images.
    Regeneration,
}

/// One progress report.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub operation: OperationType,
    /// Items finished so far, skipped ones included.
    pub current: u64,
    pub total: Option<u64>,
    /// `current / total` in percent. `None` for an empty or unsized batch.
    pub percentage: Option<f32>,
    pub elapsed: Duration,
    /// Linear extrapolation from the average time per finished item.
    pub estimated_remaining: Option<Duration>,
    /// Base name of the item that triggered the report. `None` on the
    /// closing report.
    pub current_item: Option<String>,
}

/// Receives [`ProgressInfo`] reports.
///
/// Under the `rayon` feature items finish on worker threads, hence the
/// `Send + Sync` bound. A callback can only watch; stopping a batch goes
/// through [`CancellationToken`].
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// Callback used when none is attached.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Shared stop flag for a running batch.
///
/// Clones observe the same flag. Once set, the batch starts no further
/// items and returns [`MotionError::Cancelled`](crate::MotionError::Cancelled);
/// an item already being decoded runs to completion.
///
/// ```
/// use motionbase::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag for this token and every clone of it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Counts finished items and forwards a report for each one.
pub(crate) struct ProgressTracker {
    sink: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    done: u64,
    started: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        sink: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            sink,
            operation,
            total,
            done: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn advance(&mut self, item: &str) {
        self.done += 1;
        self.emit(Some(item.to_owned()));
    }

    /// Closing report, sent even when the batch was empty.
    pub(crate) fn finish(&mut self) {
        self.emit(None);
    }

    fn emit(&self, current_item: Option<String>) {
        let elapsed = self.started.elapsed();
        let sized_total = self.total.filter(|&total| total > 0);

        self.sink.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.done,
            total: self.total,
            percentage: sized_total.map(|total| self.done as f32 * 100.0 / total as f32),
            elapsed,
            estimated_remaining: self.remaining_after(elapsed),
            current_item,
        });
    }

    fn remaining_after(&self, elapsed: Duration) -> Option<Duration> {
        let total = self.total?;
        if self.done == 0 {
            return None;
        }
        let left = total.saturating_sub(self.done);
        Some(elapsed.mul_f64(left as f64 / self.done as f64))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{OperationType, ProgressCallback, ProgressInfo, ProgressTracker};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn reports_every_item_then_a_final_snapshot() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker =
            ProgressTracker::new(recorder.clone(), OperationType::Regeneration, Some(4));
        tracker.advance("hive_10");
        tracker.advance("hive_20");
        tracker.finish();

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].current_item.as_deref(), Some("hive_10"));
        assert_eq!(reports[1].percentage, Some(50.0));
        assert!(reports[1].estimated_remaining.is_some());
        assert!(reports[2].current_item.is_none());
    }

    #[test]
    fn nothing_is_estimated_before_the_first_item() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), OperationType::Regeneration, None);
        tracker.finish();

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports[0].percentage, None);
        assert_eq!(reports[0].estimated_remaining, None);
    }
}
