//! Temporal difference engine.
//!
//! The engine keeps three grayscale reference buffers, each standing for a
//! different lookback horizon. Every frame after the first is compared
//! against all three references *before* they are updated; the three
//! absolute differences form the [`DiffTriple`] for that frame.
//!
//! The first frame of a window only seeds the references, so a window needs
//! at least two frames to produce a result. Nothing survives between
//! windows: a fresh engine starts cold, which makes a rebuilt window an
//! approximation of the interactive tool's state whenever the real history
//! began before the window start.

use image::{GrayImage, RgbImage};

use crate::{
    configuration::{DecayStrategy, WindowParameters},
    conversion::{absolute_difference, add_weighted, to_luma},
    error::MotionError,
    source::Frame,
};

/// The three reference buffers.
///
/// Index 0 is the immediate horizon. For [`DecayStrategy::Exponential`]
/// indices 1 and 2 decay with `exp_a` and `exp_b`; for
/// [`DecayStrategy::Sequential`] they hold the previous and
/// previous-but-one frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTriple {
    buffers: [GrayImage; 3],
}

impl ReferenceTriple {
    fn seeded(gray: &GrayImage) -> Self {
        Self {
            buffers: [gray.clone(), gray.clone(), gray.clone()],
        }
    }

    /// Reference buffer `index` (0, 1 or 2).
    pub fn get(&self, index: usize) -> &GrayImage {
        &self.buffers[index]
    }

    /// All three buffers.
    pub fn buffers(&self) -> &[GrayImage; 3] {
        &self.buffers
    }

    fn differences(&self, gray: &GrayImage) -> DiffTriple {
        DiffTriple {
            diffs: [
                absolute_difference(&self.buffers[0], gray),
                absolute_difference(&self.buffers[1], gray),
                absolute_difference(&self.buffers[2], gray),
            ],
        }
    }

    fn update(&mut self, gray: &GrayImage, strategy: DecayStrategy, exp_a: f64, exp_b: f64) {
        match strategy {
            DecayStrategy::Exponential => {
                self.buffers[0] = gray.clone();
                self.buffers[1] = add_weighted(&self.buffers[1], exp_a, gray, 1.0 - exp_a, 0.0);
                self.buffers[2] = add_weighted(&self.buffers[2], exp_b, gray, 1.0 - exp_b, 0.0);
            }
            DecayStrategy::Sequential => {
                self.buffers.rotate_right(1);
                self.buffers[0] = gray.clone();
            }
        }
    }
}

/// Absolute differences between one frame and the three references.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffTriple {
    /// `diffs[j] = |ref[j] - gray|`, taken before the references update.
    pub diffs: [GrayImage; 3],
}

impl DiffTriple {
    /// Difference against reference `index`.
    pub fn get(&self, index: usize) -> &GrayImage {
        &self.diffs[index]
    }
}

/// State left by the last processed frame of a window.
#[derive(Debug, Clone)]
pub struct FinalDiff {
    /// References after the last update.
    pub references: ReferenceTriple,
    /// Differences computed for the last frame.
    pub diffs: DiffTriple,
    /// Luminance of the last frame.
    pub luminance: GrayImage,
    /// The last frame as decoded (the static image).
    pub raw_frame: RgbImage,
    /// Frames folded into the state, including the seeding frame.
    pub frames_processed: usize,
}

/// Incremental fold over the frames of one window.
///
/// ```
/// use image::{Rgb, RgbImage};
/// use motionbase::{TemporalDiffEngine, WindowParameters};
///
/// let mut engine = TemporalDiffEngine::new(&WindowParameters::new());
/// engine.push(&RgbImage::from_pixel(2, 2, Rgb([10, 10, 10])))?;
/// assert!(engine.finish().is_none());
/// # Ok::<(), motionbase::MotionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TemporalDiffEngine {
    strategy: DecayStrategy,
    exp_a: f64,
    exp_b: f64,
    references: Option<ReferenceTriple>,
    latest: Option<(DiffTriple, GrayImage, RgbImage)>,
    frames_processed: usize,
}

impl TemporalDiffEngine {
    /// Create an engine with no history.
    pub fn new(params: &WindowParameters) -> Self {
        Self {
            strategy: params.decay_strategy,
            exp_a: params.exp_a,
            exp_b: params.exp_b,
            references: None,
            latest: None,
            frames_processed: 0,
        }
    }

    /// Fold one frame into the state.
    ///
    /// The first frame seeds all three references. Every later frame yields
    /// a new [`DiffTriple`] and then updates the references.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::VideoDecodeError`] if the frame size differs
    /// from the frames already processed.
    pub fn push(&mut self, frame: &RgbImage) -> Result<(), MotionError> {
        let gray = to_luma(frame);

        let Some(references) = self.references.as_mut() else {
            self.references = Some(ReferenceTriple::seeded(&gray));
            self.frames_processed = 1;
            return Ok(());
        };

        if references.get(0).dimensions() != gray.dimensions() {
            return Err(MotionError::VideoDecodeError(format!(
                "Frame size changed mid-window from {:?} to {:?}",
                references.get(0).dimensions(),
                gray.dimensions()
            )));
        }

        let diffs = references.differences(&gray);
        references.update(&gray, self.strategy, self.exp_a, self.exp_b);

        self.latest = Some((diffs, gray, frame.clone()));
        self.frames_processed += 1;
        Ok(())
    }

    /// Current references, once the first frame has been pushed.
    pub fn references(&self) -> Option<&ReferenceTriple> {
        self.references.as_ref()
    }

    /// Frames pushed so far.
    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Finish the window. Returns `None` when no difference was ever
    /// computed (fewer than two frames).
    pub fn finish(self) -> Option<FinalDiff> {
        let references = self.references?;
        let (diffs, luminance, raw_frame) = self.latest?;
        Some(FinalDiff {
            references,
            diffs,
            luminance,
            raw_frame,
            frames_processed: self.frames_processed,
        })
    }
}

/// Fold a whole window of frames in order.
///
/// # Errors
///
/// - [`MotionError::InsufficientFrames`] if fewer than two frames were
///   given. `frame_number` is the index of the last frame, or 0 when there
///   were none.
/// - [`MotionError::VideoDecodeError`] if frame sizes differ.
pub fn compute_final_diff(
    frames: &[Frame],
    params: &WindowParameters,
) -> Result<FinalDiff, MotionError> {
    let mut engine = TemporalDiffEngine::new(params);
    for frame in frames {
        engine.push(&frame.image)?;
    }
    engine.finish().ok_or_else(|| MotionError::InsufficientFrames {
        frame_number: frames.last().map_or(0, |frame| frame.index),
        collected: frames.len(),
    })
}
