//! Exclusion boxes.
//!
//! Annotators hide regions of a frame (timestamps, reflections, other
//! animals) with grey rectangles. Two sources of rectangles exist:
//!
//! - mask files, one `x1 y1 x2 y2` rectangle per line in absolute pixels;
//! - label files in normalised `class xc yc w h` form, whose boxes are used
//!   to block one image type with the other type's labels.
//!
//! Missing files are not errors: a frame without a mask simply has no
//! boxes.

use std::{fs, io::ErrorKind, path::Path};

use image::{Rgb, RgbImage};

use crate::error::MotionError;

/// Fill colour for masked regions.
pub const MASK_GREY: Rgb<u8> = Rgb([128, 128, 128]);

/// An axis-aligned rectangle with inclusive corners, in pixels.
///
/// Corners may be given in any order and may extend past the image; they
/// are normalised and clipped when painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskBox {
    /// First corner, x.
    pub x1: i32,
    /// First corner, y.
    pub y1: i32,
    /// Opposite corner, x.
    pub x2: i32,
    /// Opposite corner, y.
    pub y2: i32,
}

impl MaskBox {
    /// Create a box from two corners.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Pixel bounds `(x_min, y_min, x_max, y_max)` inside a `width` x
    /// `height` image, or `None` when the box misses the image entirely.
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let (left, right) = (self.x1.min(self.x2), self.x1.max(self.x2));
        let (top, bottom) = (self.y1.min(self.y2), self.y1.max(self.y2));
        let max_x = i64::from(width) - 1;
        let max_y = i64::from(height) - 1;
        if i64::from(right) < 0 || i64::from(bottom) < 0 {
            return None;
        }
        if i64::from(left) > max_x || i64::from(top) > max_y {
            return None;
        }
        let clamp = |value: i32, max: i64| i64::from(value).clamp(0, max) as u32;
        Some((
            clamp(left, max_x),
            clamp(top, max_y),
            clamp(right, max_x),
            clamp(bottom, max_y),
        ))
    }
}

/// Parse mask text. Lines with exactly four integers become boxes; every
/// other line is ignored.
pub fn parse_mask_boxes(text: &str) -> Vec<MaskBox> {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 4 {
                return None;
            }
            let mut coords = [0i32; 4];
            for (slot, part) in coords.iter_mut().zip(&parts) {
                *slot = part.parse().ok()?;
            }
            Some(MaskBox::new(coords[0], coords[1], coords[2], coords[3]))
        })
        .collect()
}

/// Read a mask file. A missing file yields no boxes.
///
/// # Errors
///
/// Returns [`MotionError::IoError`] for read failures other than a missing
/// file.
pub fn read_mask_file<P: AsRef<Path>>(path: P) -> Result<Vec<MaskBox>, MotionError> {
    Ok(read_optional(path.as_ref())?
        .map(|text| parse_mask_boxes(&text))
        .unwrap_or_default())
}

/// Convert normalised label lines to absolute boxes for a `width` x
/// `height` image.
///
/// Each line is `class xc yc w h [...]`; corners are
/// `(xc - w/2) * width` etc., truncated towards zero. Lines with fewer than
/// five fields or non-numeric coordinates are skipped.
pub fn parse_label_boxes(text: &str, width: u32, height: u32) -> Vec<MaskBox> {
    let (width, height) = (f64::from(width), f64::from(height));
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            let mut values = [0f64; 4];
            for (slot, part) in values.iter_mut().zip(&parts[1..5]) {
                *slot = part.parse().ok()?;
            }
            let [xc, yc, w, h] = values;
            Some(MaskBox::new(
                ((xc - w / 2.0) * width) as i32,
                ((yc - h / 2.0) * height) as i32,
                ((xc + w / 2.0) * width) as i32,
                ((yc + h / 2.0) * height) as i32,
            ))
        })
        .collect()
}

/// Read a label file and convert it to absolute boxes. A missing file
/// yields no boxes.
///
/// # Errors
///
/// Returns [`MotionError::IoError`] for read failures other than a missing
/// file.
pub fn read_label_boxes<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
) -> Result<Vec<MaskBox>, MotionError> {
    Ok(read_optional(path.as_ref())?
        .map(|text| parse_label_boxes(&text, width, height))
        .unwrap_or_default())
}

/// Return a copy of `image` with every box filled in [`MASK_GREY`].
pub fn apply_grey_boxes(image: &RgbImage, boxes: &[MaskBox]) -> RgbImage {
    let mut result = image.clone();
    paint_boxes(&mut result, boxes);
    result
}

/// Fill every box in [`MASK_GREY`], in place.
pub fn paint_boxes(image: &mut RgbImage, boxes: &[MaskBox]) {
    let (width, height) = image.dimensions();
    for mask in boxes {
        let Some((left, top, right, bottom)) = mask.clip(width, height) else {
            continue;
        };
        for y in top..=bottom {
            for x in left..=right {
                image.put_pixel(x, y, MASK_GREY);
            }
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, MotionError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}
