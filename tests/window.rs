//! Window reconstruction integration tests.
//!
//! Most tests run on synthetic in-memory videos so the expected pixels can
//! be worked out by hand. Tests against a real clip skip when the fixture
//! is missing.

use std::path::Path;

use image::{Rgb, RgbImage};
use motionbase::{
    DecayStrategy, MemorySource, MotionError, WindowParameters, generate_base_images,
    generate_base_images_from_path, sample_window, window_start,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn grey(value: u8) -> RgbImage {
    RgbImage::from_pixel(4, 4, Rgb([value, value, value]))
}

/// Ten frames of grey 100, except frame 4 (160) and frame 5 (200).
fn stepped_video() -> MemorySource {
    let frames = (0..10)
        .map(|index| match index {
            4 => grey(160),
            5 => grey(200),
            _ => grey(100),
        })
        .collect();
    MemorySource::new(frames)
}

fn counting_video(len: u8) -> MemorySource {
    MemorySource::new((0..len).map(|value| grey(value * 10)).collect())
}

// ── Sampling ───────────────────────────────────────────────────────

#[test]
fn window_start_subtracts_the_strided_span() {
    let params = WindowParameters::new()
        .with_sample_count(4)
        .with_stride_step(2);
    assert_eq!(window_start(9, &params), (3, false));
    assert_eq!(window_start(6, &params), (0, false));
    assert_eq!(window_start(5, &params), (0, true));
}

#[test]
fn stride_keeps_every_nth_decoded_frame() {
    let params = WindowParameters::new()
        .with_sample_count(4)
        .with_stride_step(2);
    let mut source = counting_video(10);
    let window = sample_window(&mut source, 9, &params).unwrap();

    let indices: Vec<u64> = window.frames.iter().map(|frame| frame.index).collect();
    assert_eq!(indices, vec![3, 5, 7, 9]);
    assert_eq!(window.decode_attempts, 7);
    assert!(!window.is_partial());
}

#[test]
fn window_running_off_the_end_is_partial() {
    let params = WindowParameters::new()
        .with_sample_count(4)
        .with_stride_step(2);
    let mut source = counting_video(10);
    let window = sample_window(&mut source, 11, &params).unwrap();

    let indices: Vec<u64> = window.frames.iter().map(|frame| frame.index).collect();
    assert_eq!(indices, vec![5, 7, 9]);
    assert!(window.is_partial());
}

#[test]
fn start_past_the_end_is_out_of_range() {
    let mut source = counting_video(10);
    let result = sample_window(&mut source, 20, &WindowParameters::new());
    assert!(matches!(
        result,
        Err(MotionError::FrameOutOfRange {
            frame_number: 20,
            total_frames: 10
        })
    ));
}

#[test]
fn empty_video_is_out_of_range() {
    let mut source = MemorySource::new(Vec::new());
    let result = sample_window(&mut source, 0, &WindowParameters::new());
    assert!(matches!(result, Err(MotionError::FrameOutOfRange { .. })));
}

#[test]
fn sampled_frames_are_rescaled() {
    let params = WindowParameters::new().with_scale_factor(0.5);
    let mut source = counting_video(6);
    let window = sample_window(&mut source, 5, &params).unwrap();
    assert!(window.frames.iter().all(|frame| frame.image.dimensions() == (2, 2)));
}

// ── Base images ────────────────────────────────────────────────────

#[test]
fn direct_motion_image_matches_hand_computation() {
    // Window 2..=5. References after frame 4: [160, 130, 112].
    // Frame 5 (200) differences: [40, 70, 88]; luminance contributes 140.
    let params = WindowParameters::new().with_rgb_multipliers([0.5, 1.0, 2.0]);
    let mut source = stepped_video();
    let images = generate_base_images(&mut source, 5, &params).unwrap();

    assert_eq!(images.start_frame, 2);
    assert_eq!(images.last_frame, 5);
    assert_eq!(images.frames_used, 4);
    assert!(!images.is_degraded());

    assert_eq!(images.static_image[(0, 0)].0, [200, 200, 200]);
    // red = 140 + 88 * 0.5, green = 140 + 70 * 1.0, blue = 140 + 40 * 2.0
    for pixel in images.motion_image.pixels() {
        assert_eq!(pixel.0, [184, 210, 220]);
    }
}

#[test]
fn chromatic_tail_motion_image_matches_hand_computation() {
    // Tails from [40, 70, 88]: [0, 30, 18].
    let params = WindowParameters::new()
        .with_rgb_multipliers([0.5, 1.0, 2.0])
        .with_chromatic_tail_only(true);
    let mut source = stepped_video();
    let images = generate_base_images(&mut source, 5, &params).unwrap();
    assert_eq!(images.motion_image[(3, 3)].0, [149, 170, 140]);
}

#[test]
fn sequential_motion_image_matches_hand_computation() {
    // References before frame 5: [160, 100, 100]; differences [40, 100, 100].
    let params = WindowParameters::new().with_decay_strategy(DecayStrategy::Sequential);
    let mut source = stepped_video();
    let images = generate_base_images(&mut source, 5, &params).unwrap();
    assert_eq!(images.motion_image[(1, 2)].0, [240, 240, 180]);
}

#[test]
fn motion_bias_shifts_every_channel() {
    let params = WindowParameters::new().with_motion_bias(-30);
    let mut source = stepped_video();
    let images = generate_base_images(&mut source, 5, &params).unwrap();
    // Unbiased: red 228, green 210, blue 180.
    assert_eq!(images.motion_image[(0, 0)].0, [198, 180, 150]);
}

#[test]
fn still_video_has_no_motion() {
    let params = WindowParameters::new().with_lum_weight(1.0);
    let mut source = MemorySource::new(vec![grey(90); 8]);
    let images = generate_base_images(&mut source, 7, &params).unwrap();
    for pixel in images.motion_image.pixels() {
        assert_eq!(pixel.0, [90, 90, 90]);
    }
}

#[test]
fn single_changed_frame_lights_only_its_channel() {
    // Ten frames of grey 50, frame 5 at 150. Window 2..=5 holds three
    // identical frames, so every reference is 50 when frame 5 arrives and
    // all three differences are 100.
    let mut frames = vec![grey(50); 10];
    frames[5] = grey(150);
    let mut source = MemorySource::new(frames);
    let params = WindowParameters::new()
        .with_sample_count(4)
        .with_stride_step(1)
        .with_lum_weight(0.0)
        .with_rgb_multipliers([0.0, 0.0, 1.0]);

    let images = generate_base_images(&mut source, 5, &params).unwrap();
    assert_eq!(images.start_frame, 2);
    assert!(!images.is_degraded());
    for pixel in images.motion_image.pixels() {
        assert_eq!(pixel.0, [0, 0, 100]);
    }

    let before = generate_base_images(&mut source, 4, &params).unwrap();
    for pixel in before.motion_image.pixels() {
        assert_eq!(pixel.0, [0, 0, 0]);
    }
}

#[test]
fn channel_mapping_is_crossed_through_the_pipeline() {
    // 1x1 clip 0, 100, 200. After frame 1 the references are [100, 50, 20],
    // so frame 2 yields differences [100, 150, 180].
    let clip = || {
        MemorySource::new(
            [0u8, 100, 200]
                .into_iter()
                .map(|value| RgbImage::from_pixel(1, 1, Rgb([value, value, value])))
                .collect(),
        )
    };
    let motion = |multipliers: [f64; 3]| {
        let params = WindowParameters::new()
            .with_sample_count(3)
            .with_lum_weight(0.0)
            .with_rgb_multipliers(multipliers);
        generate_base_images(&mut clip(), 2, &params).unwrap().motion_image[(0, 0)].0
    };

    // Red takes the slowest difference with the first multiplier.
    assert_eq!(motion([1.0, 0.0, 0.0]), [180, 0, 0]);
    assert_eq!(motion([0.0, 1.0, 0.0]), [0, 150, 0]);
    // Blue takes the immediate difference with the last multiplier.
    assert_eq!(motion([0.0, 0.0, 1.0]), [0, 0, 100]);
}

#[test]
fn clamped_window_is_degraded() {
    let mut source = stepped_video();
    let images = generate_base_images(&mut source, 1, &WindowParameters::new()).unwrap();
    assert!(images.clamped);
    assert_eq!(images.start_frame, 0);
    assert_eq!(images.last_frame, 3);
    assert!(images.is_degraded());
}

#[test]
fn short_window_is_degraded_but_present() {
    let params = WindowParameters::new()
        .with_sample_count(4)
        .with_stride_step(2);
    let mut source = counting_video(10);
    let images = generate_base_images(&mut source, 11, &params).unwrap();
    assert_eq!(images.frames_used, 3);
    assert_eq!(images.last_frame, 9);
    assert!(images.is_degraded());
}

#[test]
fn single_sample_is_insufficient() {
    let params = WindowParameters::new().with_sample_count(1);
    let mut source = stepped_video();
    let result = generate_base_images(&mut source, 5, &params);
    assert!(matches!(
        result,
        Err(MotionError::InsufficientFrames {
            frame_number: 5,
            collected: 1
        })
    ));
}

#[test]
fn single_frame_video_is_insufficient() {
    let mut source = MemorySource::new(vec![grey(10)]);
    let result = generate_base_images(&mut source, 3, &WindowParameters::new());
    assert!(matches!(result, Err(MotionError::InsufficientFrames { .. })));
}

#[test]
fn rescaled_window_produces_smaller_images() {
    let params = WindowParameters::new().with_scale_factor(0.5);
    let mut source = stepped_video();
    let images = generate_base_images(&mut source, 5, &params).unwrap();
    assert_eq!(images.static_image.dimensions(), (2, 2));
    assert_eq!(images.motion_image.dimensions(), (2, 2));
}

#[test]
fn same_window_twice_is_identical() {
    let params = WindowParameters::new();
    let mut source = stepped_video();
    let first = generate_base_images(&mut source, 6, &params).unwrap();
    let second = generate_base_images(&mut source, 6, &params).unwrap();
    assert_eq!(first.motion_image, second.motion_image);
    assert_eq!(first.static_image, second.static_image);
}

// ── Real video ─────────────────────────────────────────────────────

#[test]
fn video_window_has_source_dimensions() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let images = generate_base_images_from_path(path, 30, &WindowParameters::new())
        .expect("Failed to rebuild window");
    assert_eq!(images.static_image.dimensions(), images.motion_image.dimensions());
    assert_eq!(images.start_frame, 27);
    assert!(images.frames_used >= 2);
}

#[test]
fn missing_video_fails_to_open() {
    let result =
        generate_base_images_from_path("no_such_clip.mp4", 10, &WindowParameters::new());
    assert!(matches!(result, Err(MotionError::FileOpen { .. })));
}
