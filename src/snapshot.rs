//! Settings snapshots and change detection.
//!
//! When a model is trained, a copy of the settings file is stored next to it
//! as `saved_settings.ini`. Before retraining, the current settings are
//! compared with that snapshot: if anything that shapes the motion image
//! changed, the annotation images are stale and must be regenerated.
//!
//! Only the keys listed in [`MotionSnapshot`] take part in the comparison.
//! Reading is lenient (missing keys take their defaults) because snapshots
//! may come from older versions of the tool.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::{
    error::MotionError,
    settings::{parse_number, parse_real_list, parse_settings_section},
};

/// File name of a settings snapshot.
pub const SAVED_SETTINGS_FILE: &str = "saved_settings.ini";

/// Absolute tolerance for numeric comparisons.
pub const SETTINGS_TOLERANCE: f64 = 1e-6;

/// The settings that determine the motion image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionSnapshot {
    pub frame_skip: i64,
    pub motion_threshold: i64,
    /// Trimmed, lower-cased.
    pub strategy: String,
    /// Kept as text, trimmed and lower-cased.
    pub chromatic_tail_only: String,
    #[serde(rename = "expA")]
    pub exp_a: f64,
    #[serde(rename = "expB")]
    pub exp_b: f64,
    pub lum_weight: f64,
    pub rgb_multipliers: Vec<f64>,
}

impl MotionSnapshot {
    /// Read the relevant keys from a settings file.
    ///
    /// # Errors
    ///
    /// - [`MotionError::IoError`] if the file cannot be read.
    /// - [`MotionError::ConfigParse`] if the file is not valid INI.
    /// - [`MotionError::InvalidSetting`] for non-numeric numbers.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MotionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Read the relevant keys from INI text.
    ///
    /// # Errors
    ///
    /// Same as [`load`](MotionSnapshot::load), minus I/O.
    pub fn from_ini_str(text: &str) -> Result<Self, MotionError> {
        Self::parse(text, Path::new("<memory>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self, MotionError> {
        let section = parse_settings_section(text, path)?;
        let value = |key: &str, default: &'static str| section.get(key).unwrap_or(default);
        let normalised = |key: &str, default: &'static str| value(key, default).trim().to_lowercase();

        Ok(Self {
            frame_skip: parse_number("frame_skip", value("frame_skip", "0"))?,
            motion_threshold: parse_number("motion_threshold", value("motion_threshold", "0"))?,
            strategy: normalised("strategy", "exponential"),
            chromatic_tail_only: normalised("chromatic_tail_only", "false"),
            exp_a: parse_number("expA", value("expA", "0.5"))?,
            exp_b: parse_number("expB", value("expB", "0.8"))?,
            lum_weight: parse_number("lum_weight", value("lum_weight", "0.7"))?,
            rgb_multipliers: parse_real_list(
                "rgb_multipliers",
                value("rgb_multipliers", "1.0,1.0,1.0"),
            )?,
        })
    }
}

/// `true` if any relevant setting differs between `a` and `b`.
///
/// Numbers are compared within [`SETTINGS_TOLERANCE`], multiplier lists
/// element-wise (a length mismatch is a difference). Text values are
/// compared numerically when both parse as numbers, otherwise
/// case-insensitively.
pub fn settings_differ(a: &MotionSnapshot, b: &MotionSnapshot) -> bool {
    let numbers_differ = |x: f64, y: f64| (x - y).abs() > SETTINGS_TOLERANCE;

    numbers_differ(a.frame_skip as f64, b.frame_skip as f64)
        || numbers_differ(a.motion_threshold as f64, b.motion_threshold as f64)
        || text_differs(&a.strategy, &b.strategy)
        || text_differs(&a.chromatic_tail_only, &b.chromatic_tail_only)
        || numbers_differ(a.exp_a, b.exp_a)
        || numbers_differ(a.exp_b, b.exp_b)
        || numbers_differ(a.lum_weight, b.lum_weight)
        || a.rgb_multipliers.len() != b.rgb_multipliers.len()
        || a
            .rgb_multipliers
            .iter()
            .zip(&b.rgb_multipliers)
            .any(|(&x, &y)| numbers_differ(x, y))
}

fn text_differs(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => (x - y).abs() > SETTINGS_TOLERANCE,
        _ => !a.eq_ignore_ascii_case(b),
    }
}

/// Newest `saved_settings.ini` anywhere under `root`, by modification
/// time. Hidden directories are not searched.
pub fn find_saved_settings<P: AsRef<Path>>(root: P) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == SAVED_SETTINGS_FILE)
        .map(DirEntry::into_path)
        .max_by_key(|path| modified(path))
}

/// Copy `config_path` into `model_dir` as `saved_settings.ini`, creating
/// the directory if needed. Returns the snapshot path.
///
/// # Errors
///
/// Returns [`MotionError::IoError`] if the config does not exist or the
/// copy fails.
pub fn save_settings_with_model<M, C>(model_dir: M, config_path: C) -> Result<PathBuf, MotionError>
where
    M: AsRef<Path>,
    C: AsRef<Path>,
{
    let config_path = config_path.as_ref();
    if !config_path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("settings file not found: {}", config_path.display()),
        )
        .into());
    }
    let model_dir = model_dir.as_ref();
    fs::create_dir_all(model_dir)?;
    let destination = model_dir.join(SAVED_SETTINGS_FILE);
    fs::copy(config_path, &destination)?;
    log::debug!(
        "Saved settings snapshot {} -> {}",
        config_path.display(),
        destination.display()
    );
    Ok(destination)
}

/// `true` if a trained motion model exists.
///
/// A model is a `train/weights/best.pt` file. Each of `model_dirs` is
/// checked first; otherwise any directory under `root` whose name contains
/// `motion` counts.
pub fn any_motion_model_exists<P: AsRef<Path>>(root: P, model_dirs: &[PathBuf]) -> bool {
    if model_dirs.iter().any(|dir| has_trained_weights(dir)) {
        return true;
    }
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0 && entry.file_type().is_dir())
        .filter(|entry| entry.file_name().to_string_lossy().contains("motion"))
        .any(|entry| has_trained_weights(entry.path()))
}

/// Outcome of a settings check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettingsCheck {
    /// A snapshot was found and differs from the current settings.
    Changed {
        snapshot: PathBuf,
        current: MotionSnapshot,
        saved: MotionSnapshot,
    },
    /// A snapshot was found and matches the current settings.
    Unchanged { snapshot: PathBuf },
    /// No snapshot exists. Counts as changed only if a model was already
    /// trained without one.
    NoSnapshot { model_exists: bool },
}

impl SettingsCheck {
    /// `true` when regeneration is due.
    pub fn is_changed(&self) -> bool {
        match self {
            Self::Changed { .. } => true,
            Self::Unchanged { .. } => false,
            Self::NoSnapshot { model_exists } => *model_exists,
        }
    }
}

/// Compare the current settings with the relevant snapshot.
///
/// The snapshot is `saved` when given; otherwise the newest
/// `saved_settings.ini` directly inside one of `model_dirs`; otherwise the
/// newest one anywhere under `root`.
///
/// # Errors
///
/// Returns an error if either settings file cannot be read or parsed.
pub fn check_settings(
    current: &Path,
    saved: Option<&Path>,
    model_dirs: &[PathBuf],
    root: &Path,
) -> Result<SettingsCheck, MotionError> {
    let current_snapshot = MotionSnapshot::load(current)?;

    let snapshot_path = saved
        .map(Path::to_path_buf)
        .or_else(|| {
            model_dirs
                .iter()
                .map(|dir| dir.join(SAVED_SETTINGS_FILE))
                .filter(|path| path.is_file())
                .max_by_key(|path| modified(path))
        })
        .or_else(|| find_saved_settings(root))
        .filter(|path| path.is_file());

    let Some(snapshot) = snapshot_path else {
        let model_exists = any_motion_model_exists(root, model_dirs);
        log::debug!("No settings snapshot found (model exists: {model_exists})");
        return Ok(SettingsCheck::NoSnapshot { model_exists });
    };

    let saved_snapshot = MotionSnapshot::load(&snapshot)?;
    if settings_differ(&current_snapshot, &saved_snapshot) {
        Ok(SettingsCheck::Changed {
            snapshot,
            current: current_snapshot,
            saved: saved_snapshot,
        })
    } else {
        Ok(SettingsCheck::Unchanged { snapshot })
    }
}

/// [`check_settings`] reduced to a yes/no answer.
///
/// # Errors
///
/// Same as [`check_settings`].
pub fn check_settings_changed(
    current: &Path,
    saved: Option<&Path>,
    model_dirs: &[PathBuf],
    root: &Path,
) -> Result<bool, MotionError> {
    check_settings(current, saved, model_dirs, root).map(|check| check.is_changed())
}

fn has_trained_weights(dir: &Path) -> bool {
    dir.join("train").join("weights").join("best.pt").is_file()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
