//! Benchmarks for the temporal difference engine, compositing and window
//! reconstruction.
//!
//! Run with: cargo bench
//!
//! The video benchmark requires `tests/fixtures/sample_video.mp4`.

use std::{hint::black_box, path::Path};

use criterion::Criterion;
use ffmpeg_next::util::log::Level as LogLevel;
use image::{Rgb, RgbImage};
use motionbase::{
    DecayStrategy, Frame, MemorySource, WindowParameters, composite, compute_final_diff,
    generate_base_images, generate_base_images_from_path,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// A 640x480 gradient that shifts one pixel per frame.
fn moving_gradient(count: u32) -> Vec<RgbImage> {
    (0..count)
        .map(|offset| {
            RgbImage::from_fn(640, 480, |x, y| {
                let value = ((x + y + offset) % 256) as u8;
                Rgb([value, value / 2, 255 - value])
            })
        })
        .collect()
}

fn benchmark_temporal_engine(criterion: &mut Criterion) {
    let frames: Vec<Frame> = moving_gradient(20)
        .into_iter()
        .enumerate()
        .map(|(index, image)| Frame::new(index as u64, image))
        .collect();

    for strategy in [DecayStrategy::Exponential, DecayStrategy::Sequential] {
        let params = WindowParameters::new().with_decay_strategy(strategy);
        criterion.bench_function(
            &format!("temporal diff 20 frames 640x480 ({})", strategy.name()),
            |bencher| {
                bencher.iter(|| compute_final_diff(black_box(&frames), &params).unwrap());
            },
        );
    }
}

fn benchmark_compositing(criterion: &mut Criterion) {
    let frames: Vec<Frame> = moving_gradient(4)
        .into_iter()
        .enumerate()
        .map(|(index, image)| Frame::new(index as u64, image))
        .collect();
    let params = WindowParameters::new().with_rgb_multipliers([4.0, 4.0, 4.0]);
    let state = compute_final_diff(&frames, &params).unwrap();

    criterion.bench_function("composite direct 640x480", |bencher| {
        bencher.iter(|| composite(black_box(&state.diffs), &state.luminance, &params));
    });

    let tails = params.clone().with_chromatic_tail_only(true);
    criterion.bench_function("composite chromatic tails 640x480", |bencher| {
        bencher.iter(|| composite(black_box(&state.diffs), &state.luminance, &tails));
    });
}

fn benchmark_memory_window(criterion: &mut Criterion) {
    let video = moving_gradient(60);
    let params = WindowParameters::new()
        .with_sample_count(10)
        .with_stride_step(2)
        .with_scale_factor(0.5);

    criterion.bench_function("base images from memory (10 samples, stride 2, x0.5)", |bencher| {
        bencher.iter(|| {
            let mut source = MemorySource::new(video.clone());
            generate_base_images(&mut source, black_box(40), &params).unwrap()
        });
    });
}

fn benchmark_video_window(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let params = WindowParameters::new();
    criterion.bench_function("base images from video (mid-video seek)", |bencher| {
        bencher.iter(|| generate_base_images_from_path(SAMPLE_VIDEO, 75, &params).unwrap());
    });
}

criterion::criterion_group!(
    benches,
    benchmark_temporal_engine,
    benchmark_compositing,
    benchmark_memory_window,
    benchmark_video_window,
);
criterion::criterion_main!(benches);
