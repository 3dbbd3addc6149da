//! FFmpeg console verbosity.
//!
//! Decoding prints FFmpeg's own diagnostics to stderr, outside the `log`
//! facade. A batch over hundreds of clips repeats the same container
//! warnings for every window, so the CLI lowers FFmpeg's threshold through
//! [`set_ffmpeg_log_level`] without callers touching `ffmpeg-next`.
//!
//! ```no_run
//! use motionbase::FfmpegLogLevel;
//!
//! motionbase::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use ffmpeg_next::util::log::{self as ffmpeg_log, Level};

/// Threshold below which FFmpeg drops its messages, quietest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    /// FFmpeg's own default.
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

/// CLI name, our level and FFmpeg's level for every variant.
const LEVELS: [(&str, FfmpegLogLevel, Level); 9] = [
    ("quiet", FfmpegLogLevel::Quiet, Level::Quiet),
    ("panic", FfmpegLogLevel::Panic, Level::Panic),
    ("fatal", FfmpegLogLevel::Fatal, Level::Fatal),
    ("error", FfmpegLogLevel::Error, Level::Error),
    ("warning", FfmpegLogLevel::Warning, Level::Warning),
    ("info", FfmpegLogLevel::Info, Level::Info),
    ("verbose", FfmpegLogLevel::Verbose, Level::Verbose),
    ("debug", FfmpegLogLevel::Debug, Level::Debug),
    ("trace", FfmpegLogLevel::Trace, Level::Trace),
];

impl FfmpegLogLevel {
    /// Level for a `--log-level` value. Case-insensitive; `warn` is
    /// accepted for `warning`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = if name == "warn" { "warning" } else { name.as_str() };
        LEVELS
            .iter()
            .find(|(label, _, _)| *label == name)
            .map(|&(_, level, _)| level)
    }

    /// Lower-case name, as accepted by [`from_name`](Self::from_name).
    pub fn name(self) -> &'static str {
        LEVELS
            .iter()
            .find(|(_, level, _)| *level == self)
            .map_or("warning", |&(label, _, _)| label)
    }

    fn native(self) -> Level {
        LEVELS
            .iter()
            .find(|(_, level, _)| *level == self)
            .map_or(Level::Warning, |&(_, _, native)| native)
    }
}

/// Change FFmpeg's console threshold. Messages sent through the `log`
/// crate are unaffected.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_log::set_level(level.native());
}

/// FFmpeg's current threshold, or `None` if it is set to a value between
/// the named levels.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    let native = ffmpeg_log::get_level().ok()?;
    LEVELS
        .iter()
        .find(|(_, _, candidate)| *candidate == native)
        .map(|&(_, level, _)| level)
}
