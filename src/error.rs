//! Error types for the `motionbase` crate.
//!
//! [`MotionError`] is the single error type returned by every fallible
//! operation. Per-window data conditions (the video cannot be opened, the
//! target lies outside the video, too few frames) are ordinary values of
//! this type: a window that cannot be rebuilt comes back as an `Err`, never
//! as a panic. Configuration faults use the same type but are raised while
//! loading settings, before any window is processed.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `motionbase` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MotionError {
    /// The video file could not be opened or has no decodable stream.
    #[error("Failed to open video at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The window for the requested frame starts past the end of the video,
    /// or the video reports no frames at all.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The target frame of the window.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// Fewer than two frames could be sampled, so no difference was computed.
    #[error("Insufficient frames to compute diffs for frame {frame_number} (collected {collected})")]
    InsufficientFrames {
        /// The target frame of the window.
        frame_number: u64,
        /// How many frames the sampler actually collected.
        collected: usize,
    },

    /// The stream ended before a single frame of the window could be read.
    #[error("Could not collect frames for frame {frame_number} (start {start_frame})")]
    DecodeExhausted {
        /// The target frame of the window.
        frame_number: u64,
        /// The first frame the sampler tried to read.
        start_frame: u64,
    },

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding or decoding images.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A window parameter is outside its valid domain.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The settings file is not a well-formed key/value file.
    #[error("Failed to parse settings file {path}: {reason}")]
    ConfigParse {
        /// Settings file path.
        path: PathBuf,
        /// Parser message, naming the offending line.
        reason: String,
    },

    /// A required setting is missing.
    #[error("Missing configuration parameter: {key}")]
    MissingSetting {
        /// The missing key.
        key: String,
    },

    /// A setting has a value that cannot be converted to its type.
    #[error("Invalid value {value:?} for setting {key}: {reason}")]
    InvalidSetting {
        /// The offending key.
        key: String,
        /// The raw value from the file.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A label file name does not follow the `<video>_<frame>` convention.
    #[error("Invalid work item {name}: {reason}")]
    InvalidWorkItem {
        /// Base name of the label file.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },

    /// No video with a known extension exists for a work item.
    #[error("Video not found: {name} (looked in {})", .directory.display())]
    VideoNotFound {
        /// Video name without extension.
        name: String,
        /// Directory that was searched.
        directory: PathBuf,
    },

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl MotionError {
    /// Returns `true` for per-item data conditions a batch should log and
    /// skip, and `false` for configuration faults and cancellation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            MotionError::InvalidParameter { .. }
                | MotionError::ConfigParse { .. }
                | MotionError::MissingSetting { .. }
                | MotionError::InvalidSetting { .. }
                | MotionError::Cancelled
        )
    }
}

impl From<FfmpegError> for MotionError {
    fn from(error: FfmpegError) -> Self {
        MotionError::FfmpegError(error.to_string())
    }
}
