//! Per-pixel image primitives.
//!
//! The motion pipeline is only reproducible if every primitive rounds the
//! same way the annotation tool did:
//!
//! - [`to_luma`] uses the 14-bit fixed-point BT.601 weights
//!   (`4899 R + 9617 G + 1868 B`), rounding half up.
//! - [`add_weighted`] evaluates `a * alpha + b * beta + gamma` in single
//!   precision and saturates with round-half-to-even.
//! - [`absolute_difference`] and [`saturating_subtract`] are exact.
//!
//! All binary operations require equally sized inputs and panic otherwise;
//! the temporal engine checks dimensions before calling them.

use image::{GrayImage, RgbImage};

use crate::configuration::ResizeFilter;

const LUMA_SHIFT: u32 = 14;
const LUMA_RED: u32 = 4899;
const LUMA_GREEN: u32 = 9617;
const LUMA_BLUE: u32 = 1868;

/// Fixed-point precision of the bilinear weights.
const RESIZE_BITS: u32 = 11;
const RESIZE_ONE: f32 = (1 << RESIZE_BITS) as f32;

/// Clamp a blended value to `[0, 255]`, rounding half to even.
#[inline]
pub fn saturate8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Convert an RGB image to single-channel luminance.
pub fn to_luma(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let data = image
        .as_raw()
        .chunks_exact(3)
        .map(|rgb| {
            let weighted = rgb[0] as u32 * LUMA_RED
                + rgb[1] as u32 * LUMA_GREEN
                + rgb[2] as u32 * LUMA_BLUE;
            ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
        })
        .collect();
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Per-pixel `|a - b|`.
pub fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_with(a, b, |x, y| x.abs_diff(y))
}

/// Per-pixel `max(a - b, 0)`.
pub fn saturating_subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_with(a, b, |x, y| x.saturating_sub(y))
}

/// Per-pixel `saturate8(a * alpha + b * beta + gamma)`.
///
/// The weights need not sum to one; `gamma` is a constant bias.
pub fn add_weighted(a: &GrayImage, alpha: f64, b: &GrayImage, beta: f64, gamma: f64) -> GrayImage {
    let (alpha, beta, gamma) = (alpha as f32, beta as f32, gamma as f32);
    zip_with(a, b, |x, y| {
        saturate8(x as f32 * alpha + y as f32 * beta + gamma)
    })
}

/// Output dimensions for a uniform rescale: each side is rounded to the
/// nearest integer (half to even) and never drops below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |side: u32| ((side as f64 * factor).round_ties_even().max(1.0)) as u32;
    (scale(width), scale(height))
}

/// Rescale an image by the same factor on both axes.
///
/// Sampling is separable: each output column and row picks its source taps
/// independently, and taps past the border are clamped to the edge pixel.
pub fn resize_uniform(image: &RgbImage, factor: f64, filter: ResizeFilter) -> RgbImage {
    let (width, height) = scaled_dimensions(image.width(), image.height(), factor);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    let inverse = 1.0 / factor;
    match filter {
        ResizeFilter::Nearest => {
            let columns: Vec<u32> = (0..width)
                .map(|x| nearest_tap(x, inverse, image.width()))
                .collect();
            let rows: Vec<u32> = (0..height)
                .map(|y| nearest_tap(y, inverse, image.height()))
                .collect();
            RgbImage::from_fn(width, height, |x, y| {
                *image.get_pixel(columns[x as usize], rows[y as usize])
            })
        }
        ResizeFilter::Bilinear => {
            let columns: Vec<LinearTap> = (0..width)
                .map(|x| LinearTap::new(x, inverse, image.width()))
                .collect();
            let rows: Vec<LinearTap> = (0..height)
                .map(|y| LinearTap::new(y, inverse, image.height()))
                .collect();
            RgbImage::from_fn(width, height, |x, y| {
                let (column, row) = (columns[x as usize], rows[y as usize]);
                let horizontal = |source_y: u32, channel: usize| -> i64 {
                    let left = image.get_pixel(column.first, source_y)[channel] as i64;
                    let right = image.get_pixel(column.second, source_y)[channel] as i64;
                    left * column.weights[0] + right * column.weights[1]
                };
                let mut pixel = image::Rgb([0u8; 3]);
                for channel in 0..3 {
                    let blended = horizontal(row.first, channel) * row.weights[0]
                        + horizontal(row.second, channel) * row.weights[1];
                    let rounded = (blended + (1 << (2 * RESIZE_BITS - 1))) >> (2 * RESIZE_BITS);
                    pixel[channel] = rounded.clamp(0, 255) as u8;
                }
                pixel
            })
        }
    }
}

fn nearest_tap(destination: u32, inverse: f64, source_len: u32) -> u32 {
    ((destination as f64 * inverse).floor() as u32).min(source_len - 1)
}

/// Two source pixels and their fixed-point weights for one output
/// coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinearTap {
    first: u32,
    second: u32,
    weights: [i64; 2],
}

impl LinearTap {
    fn new(destination: u32, inverse: f64, source_len: u32) -> Self {
        let position = ((destination as f64 + 0.5) * inverse - 0.5) as f32;
        let last = source_len - 1;
        let floor = position.floor();
        let (first, fraction) = if floor < 0.0 {
            (0, 0.0)
        } else if floor >= last as f32 {
            (last, 0.0)
        } else {
            (floor as u32, position - floor)
        };
        let weight = |value: f32| (value * RESIZE_ONE).round_ties_even() as i64;
        Self {
            first,
            second: (first + 1).min(last),
            weights: [weight(1.0 - fraction), weight(fraction)],
        }
    }
}

fn zip_with<F>(a: &GrayImage, b: &GrayImage, op: F) -> GrayImage
where
    F: Fn(u8, u8) -> u8,
{
    assert_eq!(
        a.dimensions(),
        b.dimensions(),
        "per-pixel operation on images of different sizes"
    );
    let (width, height) = a.dimensions();
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| op(x, y))
        .collect();
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}
