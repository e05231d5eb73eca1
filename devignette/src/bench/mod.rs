//! Benchmark entry points, compiled with the `bench` feature.
//! Run with: cargo bench -p devignette --features bench

pub mod correction;
pub mod estimation;

use crate::{Image, OpticalCenter, farthest_corner_distance};

/// Smoothly textured frame darkened by `1 - 0.4 r^2` toward the corners.
fn vignetted_frame(width: usize, height: usize, channels: usize) -> Image {
    let center = OpticalCenter::image_center(width, height);
    let scale = farthest_corner_distance(center, width, height);
    Image::from_fn(width, height, channels, |x, y, c| {
        let dx = (x as f32 - center.u0) / scale;
        let dy = (y as f32 - center.v0) / scale;
        let wave = (x as f32 * 0.05).sin() * (y as f32 * 0.07 + c as f32).cos();
        let texture = 150.0 + 40.0 * wave;
        (texture * (1.0 - 0.4 * (dx * dx + dy * dy))).round() as u8
    })
    .expect("benchmark frame dimensions are valid")
}
