//! Motion image compositing.
//!
//! Each output channel is a linear blend of the luminance frame and one
//! motion signal:
//!
//! ```text
//! channel = saturate8(luminance * lum_weight + signal * multiplier + motion_bias)
//! ```
//!
//! The signal/multiplier pairing is crossed and must stay that way for the
//! images to match existing labels:
//!
//! | output | signal index | multiplier index |
//! |--------|--------------|------------------|
//! | blue   | 0            | 2                |
//! | green  | 1            | 1                |
//! | red    | 2            | 0                |
//!
//! In direct mode the signals are the three differences. In chromatic-tail
//! mode they are `d0 - d1`, `d1 - d0` and `d2 - d1`, each floored at zero.

use image::{GrayImage, Rgb, RgbImage};

use crate::{
    configuration::WindowParameters,
    conversion::{add_weighted, saturating_subtract},
    temporal::DiffTriple,
};

/// Signal index feeding the blue channel.
pub const BLUE_SIGNAL: usize = 0;
/// Signal index feeding the green channel.
pub const GREEN_SIGNAL: usize = 1;
/// Signal index feeding the red channel.
pub const RED_SIGNAL: usize = 2;

/// Chromatic tails `[blue, green, red]` derived from a diff triple.
pub fn chromatic_tails(diffs: &DiffTriple) -> [GrayImage; 3] {
    [
        saturating_subtract(diffs.get(0), diffs.get(1)),
        saturating_subtract(diffs.get(1), diffs.get(0)),
        saturating_subtract(diffs.get(2), diffs.get(1)),
    ]
}

/// Build the motion image from the last frame's differences and luminance.
///
/// The result has the luminance frame's dimensions.
pub fn composite(diffs: &DiffTriple, luminance: &GrayImage, params: &WindowParameters) -> RgbImage {
    let tails;
    let signals: &[GrayImage; 3] = if params.chromatic_tail_only {
        tails = chromatic_tails(diffs);
        &tails
    } else {
        &diffs.diffs
    };

    let [red_multiplier, green_multiplier, blue_multiplier] = params.rgb_multipliers;
    let bias = f64::from(params.motion_bias);
    let blend = |signal: &GrayImage, multiplier: f64| {
        add_weighted(luminance, params.lum_weight, signal, multiplier, bias)
    };

    let blue = blend(&signals[BLUE_SIGNAL], blue_multiplier);
    let green = blend(&signals[GREEN_SIGNAL], green_multiplier);
    let red = blend(&signals[RED_SIGNAL], red_multiplier);

    RgbImage::from_fn(luminance.width(), luminance.height(), |x, y| {
        Rgb([red[(x, y)][0], green[(x, y)][0], blue[(x, y)][0]])
    })
}
