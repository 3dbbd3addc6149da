//! Parallel batch regeneration.
//!
//! Every work item opens its own clip, so items share no mutable decoding
//! state and can be spread across [`rayon`] worker threads directly. The
//! public entry point stays [`regenerate_all`](crate::regenerate_all); this
//! module contains only the internal fan-out.

use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::MotionError;
use crate::regenerate::WorkItem;

/// Run `process` over `items` on the rayon pool.
///
/// Results come back in item order. The first `Err` (cancellation) wins;
/// items already running on other workers finish but their results are
/// dropped.
pub(crate) fn process_in_parallel<R, F>(items: &[WorkItem], process: F) -> Result<Vec<R>, MotionError>
where
    R: Send,
    F: Fn(&WorkItem) -> Result<R, MotionError> + Sync + Send,
{
    log::debug!(
        "Regenerating {} items on {} threads",
        items.len(),
        ::rayon::current_num_threads()
    );
    items.par_iter().map(process).collect()
}
