//! Batch regeneration of annotation images.
//!
//! A project directory holds labelled frames laid out like this:
//!
//! ```text
//! <root>/
//!   clips/hive_03.mp4
//!   annot_motion/labels/{train,val}/hive_03_240.txt
//!   annot_motion/masks/{train,val}/hive_03_240.mask.txt
//!   annot_motion/images/{train,val}/hive_03_240.jpg
//!   annot_static/...      (same layout)
//! ```
//!
//! Each label file name is `<video>_<frame>`, where `<frame>` is the last
//! frame of the motion window. When the motion settings change, every
//! labelled motion image is stale; [`regenerate_all`] rebuilds them from
//! the source clips, re-applies the annotator's grey masks, and writes them
//! back in place. Items that cannot be rebuilt are logged and skipped.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use image::{RgbImage, codecs::jpeg::JpegEncoder};

use crate::{
    configuration::WindowParameters,
    error::MotionError,
    overlay::{paint_boxes, read_label_boxes, read_mask_file},
    progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    settings::MotionSettings,
    source::{FrameSource, VideoSource},
    window::generate_base_images,
};

/// Extensions tried, in order, when looking up a clip.
pub const VIDEO_EXTENSIONS: [&str; 8] = [
    "mp4", "avi", "mov", "mkv", "MP4", "AVI", "MOV", "MKV",
];

/// Directory holding the source clips, relative to the project root.
pub const CLIPS_DIR: &str = "clips";

const JPEG_QUALITY: u8 = 95;

/// Dataset split a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    /// Both splits, in discovery order.
    pub const ALL: [Split; 2] = [Split::Train, Split::Val];

    /// Directory name of the split.
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl Display for Split {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Which annotation tree a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotationSet {
    /// `annot_motion`: labels drawn on motion images.
    Motion,
    /// `annot_static`: labels drawn on static images.
    Static,
}

impl AnnotationSet {
    /// Directory name under the project root.
    pub fn dir_name(self) -> &'static str {
        match self {
            AnnotationSet::Motion => "annot_motion",
            AnnotationSet::Static => "annot_static",
        }
    }

    fn label_path(self, root: &Path, split: Split, base_name: &str) -> PathBuf {
        self.tree(root, "labels", split).join(format!("{base_name}.txt"))
    }

    fn mask_path(self, root: &Path, split: Split, base_name: &str) -> PathBuf {
        self.tree(root, "masks", split).join(format!("{base_name}.mask.txt"))
    }

    fn image_path(self, root: &Path, split: Split, base_name: &str) -> PathBuf {
        self.tree(root, "images", split).join(format!("{base_name}.jpg"))
    }

    fn tree(self, root: &Path, kind: &str, split: Split) -> PathBuf {
        root.join(self.dir_name()).join(kind).join(split.as_str())
    }
}

/// One labelled frame to rebuild.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkItem {
    /// Label file stem, `<video>_<frame>`.
    pub base_name: String,
    pub split: Split,
    /// Tree the label was found in.
    pub origin: AnnotationSet,
}

/// Split a base name into its video name and target frame.
///
/// The trailing `_`-separated token must be an integer and the video name
/// must not be empty. Underscores inside the video name are kept.
///
/// ```
/// use motionbase::parse_base_name;
///
/// let (video, frame) = parse_base_name("hive_03_240")?;
/// assert_eq!((video.as_str(), frame), ("hive_03", 240));
/// # Ok::<(), motionbase::MotionError>(())
/// ```
///
/// # Errors
///
/// Returns [`MotionError::InvalidWorkItem`] otherwise.
pub fn parse_base_name(base_name: &str) -> Result<(String, u64), MotionError> {
    let invalid = |reason: &str| MotionError::InvalidWorkItem {
        name: base_name.to_string(),
        reason: reason.to_string(),
    };
    let (video, frame) = base_name
        .rsplit_once('_')
        .ok_or_else(|| invalid("expected <video>_<frame>"))?;
    let frame = frame
        .parse::<u64>()
        .map_err(|_| invalid("trailing token is not an integer"))?;
    if video.is_empty() {
        return Err(invalid("video name is empty"));
    }
    Ok((video.to_string(), frame))
}

/// Collect the labelled frames under `root`, sorted, one item per
/// `(base_name, split)`.
///
/// Motion labels are always scanned; static labels only when
/// `include_static` is set. Mask files (`*.mask.txt`) are ignored, as are
/// missing label directories.
///
/// # Errors
///
/// Returns [`MotionError::IoError`] if an existing label directory cannot
/// be listed.
pub fn discover_work_items<P: AsRef<Path>>(
    root: P,
    include_static: bool,
) -> Result<Vec<WorkItem>, MotionError> {
    let root = root.as_ref();
    let mut sets = vec![AnnotationSet::Motion];
    if include_static {
        sets.push(AnnotationSet::Static);
    }

    let mut items = Vec::new();
    for origin in sets {
        for split in Split::ALL {
            let directory = origin.tree(root, "labels", split);
            if !directory.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&directory)? {
                let path = entry?.path();
                let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                if !path.is_file() || file_name.ends_with(".mask.txt") {
                    continue;
                }
                let Some(base_name) = file_name.strip_suffix(".txt") else {
                    continue;
                };
                items.push(WorkItem {
                    base_name: base_name.to_string(),
                    split,
                    origin,
                });
            }
        }
    }

    // Motion sorts before static, so a frame labelled in both trees is
    // kept once, as a motion item.
    items.sort();
    items.dedup_by(|later, earlier| {
        later.base_name == earlier.base_name && later.split == earlier.split
    });
    log::debug!("Discovered {} labelled frames under {}", items.len(), root.display());
    Ok(items)
}

/// Find the clip called `video_name` in `clips_dir`, trying
/// [`VIDEO_EXTENSIONS`] in order.
///
/// # Errors
///
/// Returns [`MotionError::VideoNotFound`] if no candidate exists.
pub fn find_video<P: AsRef<Path>>(clips_dir: P, video_name: &str) -> Result<PathBuf, MotionError> {
    let clips_dir = clips_dir.as_ref();
    VIDEO_EXTENSIONS
        .iter()
        .map(|extension| clips_dir.join(format!("{video_name}.{extension}")))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| MotionError::VideoNotFound {
            name: video_name.to_string(),
            directory: clips_dir.to_path_buf(),
        })
}

/// Where and how [`regenerate_all`] works.
#[derive(Clone)]
pub struct RegenerateOptions {
    pub(crate) root: PathBuf,
    pub(crate) clips_dir: Option<PathBuf>,
    pub(crate) write_static: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for RegenerateOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RegenerateOptions")
            .field("root", &self.root)
            .field("clips_dir", &self.clips_dir)
            .field("write_static", &self.write_static)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl RegenerateOptions {
    /// Options for the project at `root`: clips from `<root>/clips`, motion
    /// images only, no progress callback, no cancellation.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            clips_dir: None,
            write_static: false,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Read clips from another directory.
    #[must_use]
    pub fn with_clips_dir<P: Into<PathBuf>>(mut self, clips_dir: P) -> Self {
        self.clips_dir = Some(clips_dir.into());
        self
    }

    /// Also rewrite the static images.
    #[must_use]
    pub fn with_write_static(mut self, write_static: bool) -> Self {
        self.write_static = write_static;
        self
    }

    /// Attach a progress callback, invoked after every item.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// Once cancelled, no further item is started and [`regenerate_all`]
    /// returns [`MotionError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory clips are looked up in.
    pub fn clips_dir(&self) -> PathBuf {
        self.clips_dir
            .clone()
            .unwrap_or_else(|| self.root.join(CLIPS_DIR))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Files written for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegeneratedItem {
    pub item: WorkItem,
    pub motion_path: Option<PathBuf>,
    pub static_path: Option<PathBuf>,
    /// Built from a shorter history than a full window.
    pub degraded: bool,
}

/// An item that could not be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub item: WorkItem,
    pub reason: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegenerationSummary {
    /// Items whose images were rebuilt.
    pub regenerated: usize,
    /// Rebuilt items whose window was shorter than requested.
    pub degraded: usize,
    pub skipped: Vec<SkippedItem>,
}

/// Rebuild the images of one item.
///
/// The motion image is written when the item came from the motion tree or
/// `save_empty_frames` is set. Motion mask boxes are painted first, then,
/// with `static_blocks_motion`, the static labels. With
/// [`RegenerateOptions::with_write_static`] the static image is written
/// the same way, blocked by the motion labels when `motion_blocks_static`
/// is set.
///
/// # Errors
///
/// Any error from parsing the base name, finding the clip, rebuilding the
/// window, reading masks, or writing the images.
pub fn regenerate_item(
    item: &WorkItem,
    settings: &MotionSettings,
    params: &WindowParameters,
    options: &RegenerateOptions,
) -> Result<RegeneratedItem, MotionError> {
    let (video_name, _) = parse_base_name(&item.base_name)?;
    let video_path = find_video(options.clips_dir(), &video_name)?;
    let mut source = VideoSource::open(&video_path)?;
    regenerate_item_from_source(item, &mut source, settings, params, options)
}

/// [`regenerate_item`] with the item's clip already open as `source`.
///
/// # Errors
///
/// Any error from parsing the base name, rebuilding the window, reading
/// masks, or writing the images.
pub fn regenerate_item_from_source<S>(
    item: &WorkItem,
    source: &mut S,
    settings: &MotionSettings,
    params: &WindowParameters,
    options: &RegenerateOptions,
) -> Result<RegeneratedItem, MotionError>
where
    S: FrameSource + ?Sized,
{
    let root = options.root();
    let (_, frame_number) = parse_base_name(&item.base_name)?;
    let images = generate_base_images(source, frame_number, params)?;
    let (width, height) = images.static_image.dimensions();
    let base = item.base_name.as_str();

    let mut result = RegeneratedItem {
        item: item.clone(),
        motion_path: None,
        static_path: None,
        degraded: images.is_degraded(),
    };

    if item.origin == AnnotationSet::Motion || settings.save_empty_frames {
        let mut motion = images.motion_image;
        paint_boxes(
            &mut motion,
            &read_mask_file(AnnotationSet::Motion.mask_path(root, item.split, base))?,
        );
        if settings.static_blocks_motion {
            let label = AnnotationSet::Static.label_path(root, item.split, base);
            paint_boxes(&mut motion, &read_label_boxes(label, width, height)?);
        }
        let path = AnnotationSet::Motion.image_path(root, item.split, base);
        write_jpeg(&motion, &path)?;
        log::info!("Regenerated motion: {}", path.display());
        result.motion_path = Some(path);
    }

    if options.write_static {
        let mut still = images.static_image;
        paint_boxes(
            &mut still,
            &read_mask_file(AnnotationSet::Static.mask_path(root, item.split, base))?,
        );
        if settings.motion_blocks_static {
            let label = AnnotationSet::Motion.label_path(root, item.split, base);
            paint_boxes(&mut still, &read_label_boxes(label, width, height)?);
        }
        let path = AnnotationSet::Static.image_path(root, item.split, base);
        write_jpeg(&still, &path)?;
        log::info!("Regenerated static: {}", path.display());
        result.static_path = Some(path);
    }

    Ok(result)
}

/// Rebuild every labelled frame under the project root.
///
/// Per-item failures are logged, collected in
/// [`RegenerationSummary::skipped`], and never stop the batch. With the
/// `rayon` feature items are processed in parallel, each opening its own
/// clip.
///
/// # Errors
///
/// - [`MotionError::IoError`] if the label directories cannot be listed.
/// - [`MotionError::Cancelled`] if the cancellation token fired.
pub fn regenerate_all(
    settings: &MotionSettings,
    options: &RegenerateOptions,
) -> Result<RegenerationSummary, MotionError> {
    let items = discover_work_items(options.root(), settings.save_empty_frames)?;
    let params = settings.window_parameters();
    params.validate()?;

    let tracker = Mutex::new(ProgressTracker::new(
        options.progress.clone(),
        OperationType::Regeneration,
        Some(items.len() as u64),
    ));

    let process = |item: &WorkItem| -> Result<Result<RegeneratedItem, SkippedItem>, MotionError> {
        if options.is_cancelled() {
            return Err(MotionError::Cancelled);
        }
        let outcome = regenerate_item(item, settings, &params, options).map_err(|error| {
            log::warn!("Skipping {}: {error}", item.base_name);
            SkippedItem {
                item: item.clone(),
                reason: error.to_string(),
            }
        });
        if let Ok(mut tracker) = tracker.lock() {
            tracker.advance(&item.base_name);
        }
        Ok(outcome)
    };

    #[cfg(feature = "rayon")]
    let outcomes = crate::rayon::process_in_parallel(&items, process)?;
    #[cfg(not(feature = "rayon"))]
    let outcomes = items.iter().map(process).collect::<Result<Vec<_>, _>>()?;

    if let Ok(mut tracker) = tracker.lock() {
        tracker.finish();
    }

    let mut summary = RegenerationSummary::default();
    for outcome in outcomes {
        match outcome {
            Ok(done) => {
                summary.regenerated += 1;
                summary.degraded += usize::from(done.degraded);
            }
            Err(skipped) => summary.skipped.push(skipped),
        }
    }
    log::info!(
        "Regeneration complete: {} rebuilt, {} skipped",
        summary.regenerated,
        summary.skipped.len()
    );
    Ok(summary)
}

/// Write `image` as a JPEG at quality 95, creating parent directories.
///
/// # Errors
///
/// Returns [`MotionError::IoError`] or [`MotionError::ImageError`] if the
/// file cannot be written.
pub fn write_jpeg(image: &RgbImage, path: &Path) -> Result<(), MotionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(writer, JPEG_QUALITY).encode_image(image)?;
    Ok(())
}
