//! Frame sources.
//!
//! A [`FrameSource`] is a sequential decode cursor over a video: it reports
//! the frame count, can be repositioned with [`seek`](FrameSource::seek), and
//! yields [`Frame`]s one at a time. Decoding is stateful, so a source must
//! never be shared between concurrent window computations; parallel callers
//! open one source per worker.
//!
//! Two implementations are provided:
//!
//! - [`VideoSource`] decodes a video file through FFmpeg.
//! - [`MemorySource`] replays frames held in memory (synthetic clips, tests).
//!
//! # Example
//!
//! ```no_run
//! use motionbase::{FrameSource, VideoSource};
//!
//! let mut source = VideoSource::open("clips/hive_03.mp4")?;
//! println!("{} frames", source.frame_count());
//! source.seek(120)?;
//! if let Some(frame) = source.read_next()? {
//!     assert_eq!(frame.index, 120);
//! }
//! # Ok::<(), motionbase::MotionError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{error::MotionError, metadata::VideoMetadata};

/// Consecutive demuxer read failures tolerated before a source gives up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 64;

/// A decoded frame and its absolute index in the source video.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based frame index in the source.
    pub index: u64,
    /// Decoded pixels, 8 bits per channel.
    pub image: RgbImage,
}

impl Frame {
    /// Wrap an image decoded at `index`.
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }
}

/// Sequential access to the frames of one video.
pub trait FrameSource {
    /// Total number of frames the source reports.
    fn frame_count(&self) -> u64;

    /// Position the cursor so the next [`read_next`](FrameSource::read_next)
    /// returns frame `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying decoder cannot be repositioned.
    fn seek(&mut self, index: u64) -> Result<(), MotionError>;

    /// Decode the next frame. `Ok(None)` signals the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if a frame cannot be decoded.
    fn read_next(&mut self) -> Result<Option<Frame>, MotionError>;
}

/// In-memory frame source.
///
/// Frames are numbered by their position in the vector.
///
/// ```
/// use image::{Rgb, RgbImage};
/// use motionbase::{FrameSource, MemorySource};
///
/// let frames = (0..3).map(|v| RgbImage::from_pixel(2, 2, Rgb([v, v, v]))).collect();
/// let mut source = MemorySource::new(frames);
/// source.seek(2)?;
/// assert_eq!(source.read_next()?.map(|f| f.index), Some(2));
/// assert!(source.read_next()?.is_none());
/// # Ok::<(), motionbase::MotionError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<RgbImage>,
    position: usize,
}

impl MemorySource {
    /// Build a source over `frames`.
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            position: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn seek(&mut self, index: u64) -> Result<(), MotionError> {
        self.position = usize::try_from(index)
            .unwrap_or(usize::MAX)
            .min(self.frames.len());
        Ok(())
    }

    fn read_next(&mut self) -> Result<Option<Frame>, MotionError> {
        let Some(image) = self.frames.get(self.position) else {
            return Ok(None);
        };
        let frame = Frame::new(self.position as u64, image.clone());
        self.position += 1;
        Ok(Some(frame))
    }
}

/// FFmpeg-backed frame source over a video file.
///
/// Frames are converted to RGB24 at the stream's native resolution. Seeking
/// jumps to the nearest preceding keyframe and decodes forward, dropping the
/// frames before the target, so the returned frames are exactly those a
/// sequential read from the target would produce.
pub struct VideoSource {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    start_time: i64,
    metadata: VideoMetadata,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    /// Decoded frames with a smaller index are dropped.
    skip_until: u64,
    /// Index of the most recently decoded frame.
    last_index: Option<u64>,
    /// No packet has been read since the file was opened.
    pristine: bool,
    eof_sent: bool,
    done: bool,
    file_path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("file_path", &self.file_path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("skip_until", &self.skip_until)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file and prepare a decoder for its best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::FileOpen`] if FFmpeg cannot open the file or
    /// build a decoder, and [`MotionError::NoVideoStream`] if the file holds
    /// no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MotionError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| MotionError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| MotionError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(MotionError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let start_time = match stream.start_time() {
            i64::MIN => 0,
            value => value,
        };

        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                MotionError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to read video codec parameters: {error}"),
                }
            })?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| MotionError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let recorded_frames = stream.frames();
        let frame_count = if recorded_frames > 0 {
            recorded_frames as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
            format: input_context.format().name().to_string(),
        };

        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| MotionError::FileOpen {
            path: file_path.clone(),
            reason: format!("Failed to create pixel converter: {error}"),
        })?;

        log::debug!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames [{}]",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            start_time,
            metadata,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            skip_until: 0,
            last_index: None,
            pristine: true,
            eof_sent: false,
            done: false,
            file_path,
        })
    }

    /// Cached stream metadata.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Index of the frame currently held in `decoded_frame`.
    fn decoded_frame_index(&self) -> u64 {
        let timestamp = self
            .decoded_frame
            .timestamp()
            .or_else(|| self.decoded_frame.pts());
        match timestamp {
            Some(pts) if self.metadata.frames_per_second > 0.0 => {
                crate::utilities::pts_to_frame_number(
                    pts,
                    self.start_time,
                    self.time_base,
                    self.metadata.frames_per_second,
                )
            }
            _ => self.last_index.map_or(self.skip_until, |index| index + 1),
        }
    }

    /// Convert the current `decoded_frame` to an RGB image.
    fn convert_decoded_frame(&mut self) -> Result<RgbImage, MotionError> {
        self.scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;

        let width = self.metadata.width;
        let height = self.metadata.height;
        let buffer = crate::utilities::frame_to_buffer(&self.rgb_frame, width, height, 3);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            MotionError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }
}

impl FrameSource for VideoSource {
    fn frame_count(&self) -> u64 {
        self.metadata.frame_count
    }

    fn seek(&mut self, index: u64) -> Result<(), MotionError> {
        if !(self.pristine && index == 0) {
            let timestamp = crate::utilities::frame_number_to_seek_timestamp(
                index,
                self.metadata.frames_per_second,
            );
            self.input_context.seek(timestamp, ..timestamp)?;
            self.decoder.flush();
        }

        self.skip_until = index;
        self.last_index = None;
        self.eof_sent = false;
        self.done = false;
        Ok(())
    }

    fn read_next(&mut self) -> Result<Option<Frame>, MotionError> {
        if self.done {
            return Ok(None);
        }

        let mut read_errors = 0;
        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let index = self.decoded_frame_index();
                self.last_index = Some(index);
                if index < self.skip_until {
                    continue;
                }
                let image = self.convert_decoded_frame()?;
                return Ok(Some(Frame::new(index, image)));
            }

            if self.eof_sent {
                self.done = true;
                return Ok(None);
            }

            let mut packet = Packet::empty();
            self.pristine = false;
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    read_errors = 0;
                    if packet.stream() == self.video_stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    read_errors += 1;
                    if read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        self.done = true;
                        return Err(MotionError::VideoDecodeError(format!(
                            "Repeated read failures in {}: {error}",
                            self.file_path.display()
                        )));
                    }
                }
            }
        }
    }
}
