//! Conversions between FFmpeg frames and timestamps and our frame numbers.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Packed RGB bytes of plane 0, with FFmpeg's row padding removed.
pub fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let row_bytes = width as usize * bytes_per_pixel;
    let rows = height as usize;
    let padded = video_frame.stride(0);
    let plane = video_frame.data(0);

    if padded == row_bytes {
        return plane[..row_bytes * rows].to_vec();
    }
    plane
        .chunks(padded)
        .take(rows)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

fn ticks_to_seconds(ticks: i64, time_base: Rational) -> f64 {
    ticks as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}

/// Frame number of a presentation timestamp, counted from the stream's
/// start time. Timestamps before the start map to frame 0.
pub fn pts_to_frame_number(
    pts: i64,
    start_time: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let frame = ticks_to_seconds(pts - start_time, time_base) * frames_per_second;
    frame.round().max(0.0) as u64
}

/// Container seek position for a frame, in microseconds (`AV_TIME_BASE`),
/// which is what a stream-less `seek` expects.
pub fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    if frames_per_second > 0.0 {
        (frame_number as f64 / frames_per_second * 1e6) as i64
    } else {
        0
    }
}
