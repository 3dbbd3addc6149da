//! # motionbase
//!
//! Rebuild the static and motion images behind labelled video frames.
//!
//! An annotation tool shows each video frame twice: as the decoded picture
//! (the *static* image) and as a false-colour *motion* image in which recent
//! movement shows up as coloured tails. The motion image depends on a short
//! history of frames folded through three decaying reference buffers, so it
//! cannot be recomputed from one frame alone. `motionbase` rebuilds it from
//! a window of frames ending at the labelled one, decoded with FFmpeg via
//! the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Rebuild One Frame
//!
//! ```no_run
//! use motionbase::{MotionSettings, generate_base_images_from_path};
//!
//! let settings = MotionSettings::load("BehaveAI_settings.ini").unwrap();
//! let images = generate_base_images_from_path(
//!     "clips/hive_03.mp4",
//!     240,
//!     &settings.window_parameters(),
//! ).unwrap();
//! images.motion_image.save("hive_03_240.jpg").unwrap();
//! ```
//!
//! ### Regenerate a Project
//!
//! ```no_run
//! use motionbase::{MotionSettings, RegenerateOptions, regenerate_all};
//!
//! let settings = MotionSettings::load("BehaveAI_settings.ini").unwrap();
//! let summary = regenerate_all(&settings, &RegenerateOptions::new(".")).unwrap();
//! for skipped in &summary.skipped {
//!     eprintln!("{}: {}", skipped.item.base_name, skipped.reason);
//! }
//! ```
//!
//! ### Synthetic Frames
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use motionbase::{MemorySource, WindowParameters, generate_base_images};
//!
//! let frames = (0..6u8)
//!     .map(|i| RgbImage::from_pixel(4, 4, Rgb([i * 40, i * 40, i * 40])))
//!     .collect();
//! let mut source = MemorySource::new(frames);
//! let images = generate_base_images(&mut source, 5, &WindowParameters::new())?;
//! assert_eq!(images.motion_image.dimensions(), (4, 4));
//! # Ok::<(), motionbase::MotionError>(())
//! ```
//!
//! ## Features
//!
//! - **Window sampling**: seek, decode, stride and rescale the frames
//!   ending at a target frame
//! - **Temporal differencing**: exponential or sequential reference decay
//! - **Compositing**: direct or chromatic-tail motion colouring
//! - **Masks**: grey exclusion boxes and cross-type label blocking
//! - **Batch regeneration**: rebuild every labelled frame of a project
//! - **Settings snapshots**: detect when the motion settings changed since
//!   the last trained model
//! - **Progress & cancellation** for long batches
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `regenerate_all` processes items across rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod compositor;
pub mod configuration;
pub mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod overlay;
pub mod progress;
#[cfg(feature = "rayon")]
mod rayon;
pub mod regenerate;
pub mod sampler;
pub mod settings;
pub mod snapshot;
pub mod source;
pub mod temporal;
mod utilities;
pub mod window;

pub use compositor::{chromatic_tails, composite};
pub use configuration::{DecayStrategy, ResizeFilter, WindowParameters};
pub use error::MotionError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use overlay::{
    MaskBox, apply_grey_boxes, parse_label_boxes, parse_mask_boxes, read_label_boxes,
    read_mask_file,
};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use regenerate::{
    AnnotationSet, RegenerateOptions, RegeneratedItem, RegenerationSummary, SkippedItem, Split,
    WorkItem, discover_work_items, find_video, parse_base_name, regenerate_all, regenerate_item,
    regenerate_item_from_source, write_jpeg,
};
pub use sampler::{SampledWindow, sample_window, window_start};
pub use settings::{DEFAULT_SETTINGS_FILE, MotionSettings};
pub use snapshot::{
    MotionSnapshot, SettingsCheck, any_motion_model_exists, check_settings,
    check_settings_changed, find_saved_settings, save_settings_with_model, settings_differ,
};
pub use source::{Frame, FrameSource, MemorySource, VideoSource};
pub use temporal::{DiffTriple, FinalDiff, ReferenceTriple, TemporalDiffEngine, compute_final_diff};
pub use window::{BaseImages, WindowResult, generate_base_images, generate_base_images_from_path};
