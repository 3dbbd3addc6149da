//! Video stream metadata.
//!
//! [`VideoMetadata`] is read once when a [`VideoSource`](crate::VideoSource)
//! is opened and cached for the lifetime of the source.

use std::time::Duration;

use serde::Serialize;

/// Metadata for the decoded video stream.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Total number of frames. Taken from the container when it records a
    /// count, otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Container duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"mjpeg"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}
