//! Compositor integration tests.
//!
//! The channel mapping is crossed (blue takes signal 0 with the third
//! multiplier, red takes signal 2 with the first). These tests pin it down
//! so existing labelled images stay comparable.

use image::{GrayImage, Luma};
use motionbase::{DiffTriple, WindowParameters, chromatic_tails, composite};

fn plane(value: u8) -> GrayImage {
    GrayImage::from_pixel(1, 1, Luma([value]))
}

fn diffs(d0: u8, d1: u8, d2: u8) -> DiffTriple {
    DiffTriple {
        diffs: [plane(d0), plane(d1), plane(d2)],
    }
}

#[test]
fn channel_mapping_is_crossed() {
    let params = WindowParameters::new()
        .with_lum_weight(0.0)
        .with_rgb_multipliers([1.0, 2.0, 3.0]);
    let image = composite(&diffs(10, 20, 30), &plane(0), &params);

    // blue = d0 * m[2], green = d1 * m[1], red = d2 * m[0]
    assert_eq!(image[(0, 0)].0, [30, 40, 30]);
}

#[test]
fn channel_mapping_distinguishes_every_signal() {
    let params = WindowParameters::new()
        .with_lum_weight(0.0)
        .with_rgb_multipliers([1.0, 1.0, 1.0]);
    let image = composite(&diffs(1, 2, 3), &plane(0), &params);
    let [red, green, blue] = image[(0, 0)].0;
    assert_eq!((red, green, blue), (3, 2, 1));
}

#[test]
fn luminance_and_bias_reach_every_channel() {
    let params = WindowParameters::new()
        .with_lum_weight(0.5)
        .with_rgb_multipliers([0.0, 0.0, 0.0])
        .with_motion_bias(10);
    let image = composite(&diffs(0, 0, 0), &plane(100), &params);
    assert_eq!(image[(0, 0)].0, [60, 60, 60]);
}

#[test]
fn blend_saturates() {
    let params = WindowParameters::new()
        .with_lum_weight(1.0)
        .with_rgb_multipliers([4.0, 4.0, 4.0])
        .with_motion_bias(-250);
    let bright = composite(&diffs(200, 200, 200), &plane(255), &params);
    assert_eq!(bright[(0, 0)].0, [255, 255, 255]);

    let dark = composite(&diffs(0, 0, 0), &plane(100), &params);
    assert_eq!(dark[(0, 0)].0, [0, 0, 0]);
}

#[test]
fn chromatic_tails_clamp_at_zero() {
    let tails = chromatic_tails(&diffs(50, 20, 10));
    assert_eq!(tails[0][(0, 0)][0], 30);
    assert_eq!(tails[1][(0, 0)][0], 0);
    assert_eq!(tails[2][(0, 0)][0], 0);
}

#[test]
fn chromatic_mode_composites_the_tails() {
    let params = WindowParameters::new()
        .with_lum_weight(0.0)
        .with_rgb_multipliers([1.0, 1.0, 1.0])
        .with_chromatic_tail_only(true);
    // Tails: [10 - 40 -> 0, 40 - 10 = 30, 90 - 40 = 50].
    let image = composite(&diffs(10, 40, 90), &plane(0), &params);
    assert_eq!(image[(0, 0)].0, [50, 30, 0]);
}

#[test]
fn output_has_luminance_dimensions() {
    let triple = DiffTriple {
        diffs: [GrayImage::new(5, 3), GrayImage::new(5, 3), GrayImage::new(5, 3)],
    };
    let image = composite(&triple, &GrayImage::new(5, 3), &WindowParameters::new());
    assert_eq!(image.dimensions(), (5, 3));
}
