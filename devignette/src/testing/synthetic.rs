//! Synthetic vignetted frames.
//!
//! Attenuation is `1 - strength * r^2`, with `r` the distance to the image
//! center divided by the farthest-corner distance, so `strength` is the
//! darkening at the far corner.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{OpticalCenter, RadialSampler, farthest_corner_distance};
use crate::image::Image;

/// Attenuation sampler for a `width x height` frame.
pub fn attenuation(
    width: usize,
    height: usize,
    strength: f32,
) -> impl Fn(usize, usize) -> f32 + Sync {
    let center = OpticalCenter::image_center(width, height);
    let sampler = RadialSampler::new(center, farthest_corner_distance(center, width, height));
    move |x, y| 1.0 - strength * sampler.radius_squared(x, y)
}

fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Uniform gray scene of brightness `base`, vignetted.
pub fn vignetted_gray(width: usize, height: usize, base: f32, strength: f32) -> Image {
    let gain = attenuation(width, height, strength);
    Image::from_fn(width, height, 1, |x, y, _| quantize(base * gain(x, y))).unwrap()
}

/// Uniform RGB scene with per-channel brightness and strength.
pub fn vignetted_rgb(width: usize, height: usize, base: [f32; 3], strength: [f32; 3]) -> Image {
    let gains: Vec<_> = strength
        .iter()
        .map(|&s| attenuation(width, height, s))
        .collect();
    Image::from_fn(width, height, 3, |x, y, c| {
        quantize(base[c] * gains[c](x, y))
    })
    .unwrap()
}

/// Gray scene of flat 16x16 patches with random brightness in `[110, 220]`, vignetted.
pub fn textured_vignetted_gray(width: usize, height: usize, strength: f32, seed: u64) -> Image {
    const PATCH: usize = 16;
    let columns = width.div_ceil(PATCH);
    let rows = height.div_ceil(PATCH);
    let mut rng = StdRng::seed_from_u64(seed);
    let patches: Vec<f32> = (0..columns * rows)
        .map(|_| rng.random_range(110.0..220.0))
        .collect();

    let gain = attenuation(width, height, strength);
    Image::from_fn(width, height, 1, |x, y, _| {
        let base = patches[(y / PATCH) * columns + x / PATCH];
        quantize(base * gain(x, y))
    })
    .unwrap()
}
