//! Window sampling.
//!
//! [`sample_window`] reads the run of frames that ends at a target frame:
//! `sample_count` frames, `stride_step` frames apart. The window start is
//! `target - (sample_count - 1) * stride_step`, clamped to frame 0.
//!
//! Decoding is sequential from the window start. Every decoded frame counts
//! towards the stride, so intermediate frames are decoded and dropped rather
//! than sought individually. Sampling stops when enough frames are held, the
//! stream ends, a decode fails, or the decode-attempt cap
//! ([`WindowParameters::decode_attempt_cap`]) is passed.
//!
//! A short window is not an error here: callers receive whatever could be
//! read and decide what to do with it.

use crate::{
    configuration::WindowParameters,
    error::MotionError,
    source::{Frame, FrameSource},
};

/// Frames collected for one window.
#[derive(Debug, Clone)]
pub struct SampledWindow {
    /// Frame the window was computed for.
    pub target_frame: u64,
    /// First frame read (after clamping).
    pub start_frame: u64,
    /// `true` when the unclamped start would have been before frame 0.
    pub clamped: bool,
    /// Sampled frames in decode order, already rescaled.
    pub frames: Vec<Frame>,
    /// How many frames a complete window holds.
    pub requested: usize,
    /// Frames decoded, including the ones dropped by the stride.
    pub decode_attempts: u64,
}

impl SampledWindow {
    /// `true` when fewer frames than requested were collected.
    pub fn is_partial(&self) -> bool {
        self.frames.len() < self.requested
    }
}

/// Compute the first frame of the window ending at `target_frame`.
///
/// Returns the clamped start and whether clamping happened.
pub fn window_start(target_frame: u64, params: &WindowParameters) -> (u64, bool) {
    let span = (params.sample_count.saturating_sub(1) as u64).saturating_mul(params.stride_step);
    match target_frame.checked_sub(span) {
        Some(start) => (start, false),
        None => (0, true),
    }
}

/// Sample the window ending at `target_frame` from `source`.
///
/// # Errors
///
/// - [`MotionError::FrameOutOfRange`] if the source reports no frames or the
///   window start lies past the last frame.
/// - Any error from [`FrameSource::seek`].
///
/// Decode failures after the seek end the window early instead of failing.
pub fn sample_window<S>(
    source: &mut S,
    target_frame: u64,
    params: &WindowParameters,
) -> Result<SampledWindow, MotionError>
where
    S: FrameSource + ?Sized,
{
    let total_frames = source.frame_count();
    let (start_frame, clamped) = window_start(target_frame, params);

    if total_frames == 0 || start_frame > total_frames - 1 {
        return Err(MotionError::FrameOutOfRange {
            frame_number: target_frame,
            total_frames,
        });
    }

    let stride = params.stride_step.max(1);
    let cap = params.decode_attempt_cap();
    let rescale = params.scale_factor != 1.0;

    source.seek(start_frame)?;

    let mut frames = Vec::with_capacity(params.sample_count);
    let mut decode_attempts: u64 = 0;
    let mut position = start_frame;

    while frames.len() < params.sample_count && position < total_frames {
        let frame = match source.read_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(error) => {
                log::warn!(
                    "Decode failed at frame {position} while sampling for {target_frame}: {error}"
                );
                break;
            }
        };

        if decode_attempts % stride == 0 {
            let frame = if rescale {
                let image = crate::conversion::resize_uniform(
                    &frame.image,
                    params.scale_factor,
                    params.resize_filter,
                );
                Frame::new(frame.index, image)
            } else {
                frame
            };
            frames.push(frame);
        }

        decode_attempts += 1;
        position += 1;
        if decode_attempts > cap {
            break;
        }
    }

    log::debug!(
        "Sampled {}/{} frames for target {target_frame} from start {start_frame} ({decode_attempts} decoded)",
        frames.len(),
        params.sample_count,
    );

    Ok(SampledWindow {
        target_frame,
        start_frame,
        clamped,
        frames,
        requested: params.sample_count,
        decode_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::window_start;
    use crate::configuration::WindowParameters;

    #[test]
    fn start_is_target_minus_span() {
        let params = WindowParameters::new().with_sample_count(4).with_stride_step(3);
        assert_eq!(window_start(20, &params), (11, false));
        assert_eq!(window_start(9, &params), (0, false));
    }

    #[test]
    fn start_clamps_at_zero() {
        let params = WindowParameters::new().with_sample_count(4).with_stride_step(3);
        assert_eq!(window_start(5, &params), (0, true));
    }

    #[test]
    fn single_sample_starts_at_target() {
        let params = WindowParameters::new().with_sample_count(1).with_stride_step(7);
        assert_eq!(window_start(42, &params), (42, false));
    }
}
