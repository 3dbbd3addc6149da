//! Base image generation.
//!
//! [`generate_base_images`] ties the pipeline together for one target frame:
//! sample the window, fold it through the [`TemporalDiffEngine`], and
//! composite the motion image. The last sampled frame becomes the static
//! image.
//!
//! A window that cannot be rebuilt is reported as an `Err` of the returned
//! [`WindowResult`]; the caller logs it and moves on.
//!
//! # Example
//!
//! ```no_run
//! use motionbase::{WindowParameters, generate_base_images_from_path};
//!
//! let params = WindowParameters::new().with_sample_count(5);
//! match generate_base_images_from_path("clips/hive_03.mp4", 240, &params) {
//!     Ok(images) => images.motion_image.save("motion.jpg")?,
//!     Err(error) => eprintln!("skipped: {error}"),
//! }
//! # Ok::<(), motionbase::MotionError>(())
//! ```

use std::path::Path;

use image::RgbImage;

use crate::{
    configuration::WindowParameters,
    error::MotionError,
    sampler::sample_window,
    source::{FrameSource, VideoSource},
    temporal::TemporalDiffEngine,
};

/// Outcome of one window reconstruction. `Err` means the images are absent.
pub type WindowResult = Result<BaseImages, MotionError>;

/// The static and motion images rebuilt for one target frame.
#[derive(Debug, Clone)]
pub struct BaseImages {
    /// Last sampled frame, as decoded (and rescaled).
    pub static_image: RgbImage,
    /// Composited motion image, same size as `static_image`.
    pub motion_image: RgbImage,
    /// Frame the window was computed for.
    pub target_frame: u64,
    /// First frame of the window after clamping.
    pub start_frame: u64,
    /// Index of the last sampled frame.
    pub last_frame: u64,
    /// Frames that contributed, including the seeding frame.
    pub frames_used: usize,
    /// Frames a complete window holds.
    pub frames_requested: usize,
    /// The unclamped window start was before frame 0.
    pub clamped: bool,
}

impl BaseImages {
    /// `true` when the images come from a shorter history than a full
    /// window: fewer frames were sampled, or the window was clamped at the
    /// start of the video. Degraded images are still usable but approximate
    /// what the interactive tool would have shown.
    pub fn is_degraded(&self) -> bool {
        self.clamped || self.frames_used < self.frames_requested
    }
}

/// Rebuild the static and motion images for `target_frame` from `source`.
///
/// Parameters are assumed valid (see [`WindowParameters::validate`]).
///
/// # Errors
///
/// - [`MotionError::FrameOutOfRange`] if the window starts past the end of
///   the video.
/// - [`MotionError::DecodeExhausted`] if no frame could be read.
/// - [`MotionError::InsufficientFrames`] if only one frame was read.
/// - Errors from seeking or from mismatched frame sizes.
pub fn generate_base_images<S>(
    source: &mut S,
    target_frame: u64,
    params: &WindowParameters,
) -> WindowResult
where
    S: FrameSource + ?Sized,
{
    let window = sample_window(source, target_frame, params)?;

    if window.frames.is_empty() {
        return Err(MotionError::DecodeExhausted {
            frame_number: target_frame,
            start_frame: window.start_frame,
        });
    }

    let mut engine = TemporalDiffEngine::new(params);
    for frame in &window.frames {
        engine.push(&frame.image)?;
    }

    let collected = window.frames.len();
    let final_diff = engine
        .finish()
        .ok_or(MotionError::InsufficientFrames {
            frame_number: target_frame,
            collected,
        })?;

    let motion_image =
        crate::compositor::composite(&final_diff.diffs, &final_diff.luminance, params);

    let last_frame = window
        .frames
        .last()
        .map_or(window.start_frame, |frame| frame.index);

    if window.is_partial() {
        log::debug!(
            "Partial window for frame {target_frame}: {collected}/{} frames",
            window.requested
        );
    }

    Ok(BaseImages {
        static_image: final_diff.raw_frame,
        motion_image,
        target_frame,
        start_frame: window.start_frame,
        last_frame,
        frames_used: final_diff.frames_processed,
        frames_requested: window.requested,
        clamped: window.clamped,
    })
}

/// Open `path` with a fresh [`VideoSource`] and rebuild the images for
/// `target_frame`. The source is closed before returning.
///
/// # Errors
///
/// [`MotionError::FileOpen`] / [`MotionError::NoVideoStream`] if the video
/// cannot be opened, plus everything [`generate_base_images`] returns.
pub fn generate_base_images_from_path<P: AsRef<Path>>(
    path: P,
    target_frame: u64,
    params: &WindowParameters,
) -> WindowResult {
    let mut source = VideoSource::open(path)?;
    generate_base_images(&mut source, target_frame, params)
}
