//! Settings file loading.
//!
//! The annotation tool keeps its motion settings in a flat INI file
//! (`BehaveAI_settings.ini`). [`MotionSettings::load`] reads the `[DEFAULT]`
//! section (or the first section when there is none), converts every value
//! to its real type, and fails fast on anything malformed so that no window
//! is ever processed with half-valid parameters.
//!
//! ```text
//! [DEFAULT]
//! scale_factor = 1.0
//! strategy = exponential
//! expA = 0.5
//! expB = 0.8
//! chromatic_tail_only = false
//! lum_weight = 0.7
//! rgb_multipliers = 4,4,4
//! frame_skip = 1
//! motion_threshold = 0
//! ```
//!
//! # Example
//!
//! ```no_run
//! use motionbase::MotionSettings;
//!
//! let settings = MotionSettings::load("BehaveAI_settings.ini")?;
//! let params = settings.window_parameters();
//! println!("{} frames at stride {}", params.sample_count, params.stride_step);
//! # Ok::<(), motionbase::MotionError>(())
//! ```

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use configparser::ini::Ini;
use serde::Serialize;

use crate::{
    configuration::{DecayStrategy, WindowParameters},
    error::MotionError,
};

/// Name of the settings file the tools read by default.
pub const DEFAULT_SETTINGS_FILE: &str = "BehaveAI_settings.ini";

/// Section name `Ini` files `[DEFAULT]` and header-less entries under.
const DEFAULT_SECTION: &str = "default";

/// Window size used by the sequential strategy and by gentle exponential
/// decay.
const BASE_WINDOW: usize = 4;

/// Decay-weight thresholds and the window size each one requires. A slower
/// decay keeps older frames relevant, so the rebuilt window must reach
/// further back.
const WINDOW_STEPS: [(f64, usize); 5] = [(0.2, 5), (0.5, 10), (0.7, 15), (0.8, 20), (0.9, 45)];

/// The section settings are read from, keys lower-cased.
#[derive(Debug, Clone, Default)]
pub(crate) struct IniSection {
    values: HashMap<String, String>,
}

impl IniSection {
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Parse INI text and return the `[DEFAULT]` section, or the first section
/// when the file has none.
///
/// Entries before any header belong to `[DEFAULT]`. Indented lines continue
/// the previous value. Keys without a value are dropped.
pub(crate) fn parse_settings_section(text: &str, path: &Path) -> Result<IniSection, MotionError> {
    let mut parser = Ini::new();
    parser.set_multiline(true);
    let sections = parser
        .read(text.to_string())
        .map_err(|reason| MotionError::ConfigParse {
            path: path.to_path_buf(),
            reason,
        })?;

    let Some(section) = sections
        .get(DEFAULT_SECTION)
        .or_else(|| sections.values().next())
    else {
        return Ok(IniSection::default());
    };
    let values = section
        .iter()
        .filter_map(|(key, value)| Some((key.to_ascii_lowercase(), value.clone()?)))
        .collect();
    Ok(IniSection { values })
}

/// Parse a number, naming the key in the error.
pub(crate) fn parse_number<T>(key: &str, value: &str) -> Result<T, MotionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|error| MotionError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
            reason: error.to_string(),
        })
}

/// Parse a comma-separated list of reals, ignoring empty items.
pub(crate) fn parse_real_list(key: &str, value: &str) -> Result<Vec<f64>, MotionError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_number::<f64>(key, item))
        .collect()
}

fn parse_flag(key: &str, value: &str) -> Result<bool, MotionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(MotionError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Typed motion settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionSettings {
    /// Uniform frame resize factor.
    pub scale_factor: f64,
    /// Medium-horizon decay weight.
    pub exp_a: f64,
    /// Slow-horizon decay weight.
    pub exp_b: f64,
    /// Reference update rule.
    pub strategy: DecayStrategy,
    /// Composite from chromatic tails.
    pub chromatic_tail_only: bool,
    /// Luminance weight in every output channel.
    pub lum_weight: f64,
    /// `[red, green, blue]` multipliers.
    pub rgb_multipliers: [f64; 3],
    /// Frames skipped between samples.
    pub frame_skip: u64,
    /// Threshold as written in the file; the blend uses its negation.
    pub motion_threshold: i32,
    /// Paint motion-label boxes onto static images.
    pub motion_blocks_static: bool,
    /// Paint static-label boxes onto motion images.
    pub static_blocks_motion: bool,
    /// Also regenerate motion images for frames labelled only as static.
    pub save_empty_frames: bool,
}

impl MotionSettings {
    /// Load and validate a settings file.
    ///
    /// # Errors
    ///
    /// - [`MotionError::IoError`] if the file cannot be read.
    /// - [`MotionError::ConfigParse`] if the file is not valid INI.
    /// - [`MotionError::MissingSetting`] if `rgb_multipliers` is absent.
    /// - [`MotionError::InvalidSetting`] for values of the wrong type.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MotionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::parse(&text, path)?;
        log::debug!("Loaded settings from {}: {settings:?}", path.display());
        Ok(settings)
    }

    /// Parse settings from INI text.
    ///
    /// # Errors
    ///
    /// Same as [`load`](MotionSettings::load), minus I/O.
    pub fn from_ini_str(text: &str) -> Result<Self, MotionError> {
        Self::parse(text, &PathBuf::from("<memory>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self, MotionError> {
        let section = parse_settings_section(text, path)?;
        let number = |key: &str, default: &str| -> Result<f64, MotionError> {
            parse_number(key, section.get(key).unwrap_or(default))
        };
        let flag = |key: &str| parse_flag(key, section.get(key).unwrap_or("false"));

        let strategy_name = section.get("strategy").unwrap_or("exponential");
        let strategy =
            DecayStrategy::from_name(strategy_name).ok_or_else(|| MotionError::InvalidSetting {
                key: "strategy".to_string(),
                value: strategy_name.to_string(),
                reason: "expected exponential or sequential".to_string(),
            })?;

        let multipliers_raw =
            section
                .get("rgb_multipliers")
                .ok_or_else(|| MotionError::MissingSetting {
                    key: "rgb_multipliers".to_string(),
                })?;
        let multipliers = parse_real_list("rgb_multipliers", multipliers_raw)?;
        let rgb_multipliers: [f64; 3] =
            multipliers
                .try_into()
                .map_err(|values: Vec<f64>| MotionError::InvalidSetting {
                    key: "rgb_multipliers".to_string(),
                    value: multipliers_raw.to_string(),
                    reason: format!("expected 3 values, got {}", values.len()),
                })?;

        let settings = Self {
            scale_factor: number("scale_factor", "1.0")?,
            exp_a: number("expA", "0.5")?,
            exp_b: number("expB", "0.8")?,
            strategy,
            chromatic_tail_only: flag("chromatic_tail_only")?,
            lum_weight: number("lum_weight", "0.7")?,
            rgb_multipliers,
            frame_skip: parse_number("frame_skip", section.get("frame_skip").unwrap_or("0"))?,
            motion_threshold: parse_number(
                "motion_threshold",
                section.get("motion_threshold").unwrap_or("0"),
            )?,
            motion_blocks_static: flag("motion_blocks_static")?,
            static_blocks_motion: flag("static_blocks_motion")?,
            save_empty_frames: flag("save_empty_frames")?,
        };

        settings
            .window_parameters()
            .validate()
            .map_err(|error| match error {
                MotionError::InvalidParameter { name, reason } => MotionError::InvalidSetting {
                    key: name.to_string(),
                    value: String::new(),
                    reason,
                },
                other => other,
            })?;

        Ok(settings)
    }

    /// Number of frames sampled per window.
    ///
    /// Four for the sequential strategy. For exponential decay the window
    /// grows with the slower of the two decay weights: 5 above 0.2, 10
    /// above 0.5, 15 above 0.7, 20 above 0.8 and 45 above 0.9.
    pub fn base_frame_window(&self) -> usize {
        if self.strategy != DecayStrategy::Exponential {
            return BASE_WINDOW;
        }
        let slowest = self.exp_a.max(self.exp_b);
        WINDOW_STEPS
            .iter()
            .filter(|(threshold, _)| slowest > *threshold)
            .map(|&(_, window)| window)
            .last()
            .unwrap_or(BASE_WINDOW)
    }

    /// Frames decoded for a full window.
    pub fn frame_window(&self) -> u64 {
        (self.base_frame_window() as u64).saturating_mul(self.frame_skip.saturating_add(1))
    }

    /// Additive blend bias (the negated motion threshold).
    pub fn motion_bias(&self) -> i32 {
        self.motion_threshold.saturating_neg()
    }

    /// Window parameters for the core pipeline.
    pub fn window_parameters(&self) -> WindowParameters {
        WindowParameters::new()
            .with_stride_step(self.frame_skip.saturating_add(1))
            .with_sample_count(self.base_frame_window())
            .with_scale_factor(self.scale_factor)
            .with_decay_strategy(self.strategy)
            .with_decay_weights(self.exp_a, self.exp_b)
            .with_chromatic_tail_only(self.chromatic_tail_only)
            .with_lum_weight(self.lum_weight)
            .with_rgb_multipliers(self.rgb_multipliers)
            .with_motion_bias(self.motion_bias())
    }
}
