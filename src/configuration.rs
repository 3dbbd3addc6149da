//! Window reconstruction parameters.
//!
//! [`WindowParameters`] is the explicit value threaded through every window
//! computation: there is no global configuration object. Build one with the
//! `with_*` methods or derive it from a settings file via
//! [`MotionSettings::window_parameters`](crate::MotionSettings::window_parameters).
//!
//! # Example
//!
//! ```
//! use motionbase::{DecayStrategy, WindowParameters};
//!
//! let params = WindowParameters::new()
//!     .with_decay_strategy(DecayStrategy::Sequential)
//!     .with_sample_count(4)
//!     .with_stride_step(2)
//!     .with_motion_bias(-10);
//! assert!(params.validate().is_ok());
//! ```

use serde::Serialize;

use crate::error::MotionError;

/// Extra decode attempts allowed beyond a full window.
const DECODE_SLACK: u64 = 10;

/// Rule by which the three reference buffers are updated per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayStrategy {
    /// `ref[0]` is replaced, `ref[1]` and `ref[2]` decay towards the new
    /// frame with weights `exp_a` and `exp_b`.
    #[default]
    Exponential,
    /// References shift by one frame: `ref[2] <- ref[1] <- ref[0] <- gray`.
    Sequential,
}

impl DecayStrategy {
    /// Parse a strategy name (`exponential` or `sequential`, case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "exponential" => Some(DecayStrategy::Exponential),
            "sequential" => Some(DecayStrategy::Sequential),
            _ => None,
        }
    }

    /// Lower-case name as written in settings files.
    pub fn name(self) -> &'static str {
        match self {
            DecayStrategy::Exponential => "exponential",
            DecayStrategy::Sequential => "sequential",
        }
    }
}

/// Interpolation used when frames are rescaled by
/// [`scale_factor`](WindowParameters::scale_factor).
///
/// Label boxes drawn on the interactive tool's output must land on the same
/// pixels, so this is a fidelity knob rather than a quality one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    /// Output pixel `x` copies source pixel `floor(x / factor)`.
    Nearest,
    /// Two-tap linear interpolation at `(x + 0.5) / factor - 0.5`, with
    /// 11-bit fixed-point weights. This is the default.
    #[default]
    Bilinear,
}

/// Parameters of one window reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowParameters {
    /// Decoding interval between retained frames (`frame_skip + 1`).
    pub stride_step: u64,
    /// Number of frames sampled for the window.
    pub sample_count: usize,
    /// Uniform resize factor applied to every sampled frame. `1.0` keeps
    /// the source resolution.
    pub scale_factor: f64,
    /// Interpolation used when `scale_factor != 1.0`.
    pub resize_filter: ResizeFilter,
    /// Reference update rule.
    pub decay_strategy: DecayStrategy,
    /// Weight of the previous medium-horizon reference (exponential only).
    pub exp_a: f64,
    /// Weight of the previous slow-horizon reference (exponential only).
    pub exp_b: f64,
    /// Composite from chromatic tails instead of raw differences.
    pub chromatic_tail_only: bool,
    /// Weight of the luminance frame in every output channel.
    pub lum_weight: f64,
    /// Per-channel multipliers `[red, green, blue]`.
    pub rgb_multipliers: [f64; 3],
    /// Constant added to every blended pixel. Settings files store the
    /// motion threshold, which is negated into this bias.
    pub motion_bias: i32,
}

impl Default for WindowParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowParameters {
    /// Defaults: exponential decay with `exp_a = 0.5`, `exp_b = 0.8`,
    /// 4 samples at stride 1, no resize, luminance weight 0.7, unit
    /// multipliers and no bias.
    pub fn new() -> Self {
        Self {
            stride_step: 1,
            sample_count: 4,
            scale_factor: 1.0,
            resize_filter: ResizeFilter::Bilinear,
            decay_strategy: DecayStrategy::Exponential,
            exp_a: 0.5,
            exp_b: 0.8,
            chromatic_tail_only: false,
            lum_weight: 0.7,
            rgb_multipliers: [1.0, 1.0, 1.0],
            motion_bias: 0,
        }
    }

    /// Set the stride between retained frames.
    #[must_use]
    pub fn with_stride_step(mut self, stride_step: u64) -> Self {
        self.stride_step = stride_step;
        self
    }

    /// Set the number of sampled frames.
    #[must_use]
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the uniform resize factor.
    #[must_use]
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the resize interpolation.
    #[must_use]
    pub fn with_resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.resize_filter = filter;
        self
    }

    /// Set the reference update rule.
    #[must_use]
    pub fn with_decay_strategy(mut self, strategy: DecayStrategy) -> Self {
        self.decay_strategy = strategy;
        self
    }

    /// Set both exponential decay weights.
    #[must_use]
    pub fn with_decay_weights(mut self, exp_a: f64, exp_b: f64) -> Self {
        self.exp_a = exp_a;
        self.exp_b = exp_b;
        self
    }

    /// Switch chromatic-tail compositing on or off.
    #[must_use]
    pub fn with_chromatic_tail_only(mut self, enabled: bool) -> Self {
        self.chromatic_tail_only = enabled;
        self
    }

    /// Set the luminance weight.
    #[must_use]
    pub fn with_lum_weight(mut self, lum_weight: f64) -> Self {
        self.lum_weight = lum_weight;
        self
    }

    /// Set the `[red, green, blue]` multipliers.
    #[must_use]
    pub fn with_rgb_multipliers(mut self, multipliers: [f64; 3]) -> Self {
        self.rgb_multipliers = multipliers;
        self
    }

    /// Set the additive blend bias.
    #[must_use]
    pub fn with_motion_bias(mut self, bias: i32) -> Self {
        self.motion_bias = bias;
        self
    }

    /// Total frames decoded for a full window (`sample_count * stride_step`).
    /// Saturates at `u64::MAX`; [`validate`](Self::validate) rejects
    /// windows that large.
    pub fn frame_window(&self) -> u64 {
        (self.sample_count as u64).saturating_mul(self.stride_step)
    }

    /// Hard cap on decode attempts for one window.
    pub fn decode_attempt_cap(&self) -> u64 {
        self.frame_window().saturating_add(DECODE_SLACK)
    }

    fn checked_decode_span(&self) -> Option<u64> {
        (self.sample_count as u64)
            .checked_mul(self.stride_step)?
            .checked_add(DECODE_SLACK)
    }

    /// Check every parameter against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidParameter`] naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<(), MotionError> {
        if self.stride_step == 0 {
            return Err(MotionError::InvalidParameter {
                name: "stride_step",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sample_count == 0 {
            return Err(MotionError::InvalidParameter {
                name: "sample_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.checked_decode_span().is_none() {
            return Err(MotionError::InvalidParameter {
                name: "stride_step",
                reason: format!(
                    "a window of {} frames every {} frames does not fit in a frame index",
                    self.sample_count, self.stride_step
                ),
            });
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(MotionError::InvalidParameter {
                name: "scale_factor",
                reason: format!("must be a positive number, got {}", self.scale_factor),
            });
        }
        for (name, value) in [("exp_a", self.exp_a), ("exp_b", self.exp_b)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MotionError::InvalidParameter {
                    name,
                    reason: format!("must lie in [0, 1], got {value}"),
                });
            }
        }
        if !self.lum_weight.is_finite() || self.rgb_multipliers.iter().any(|m| !m.is_finite()) {
            return Err(MotionError::InvalidParameter {
                name: "rgb_multipliers",
                reason: "blend weights must be finite".to_string(),
            });
        }
        Ok(())
    }
}
