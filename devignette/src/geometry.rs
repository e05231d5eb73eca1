//! Radial geometry: optical center, radius normalization and per-pixel radii.

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Optical center `(u0, v0)` in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpticalCenter {
    pub u0: f32,
    pub v0: f32,
}

impl OpticalCenter {
    pub fn new(u0: f32, v0: f32) -> Self {
        Self { u0, v0 }
    }

    /// Geometric center of a `width x height` frame.
    pub fn image_center(width: usize, height: usize) -> Self {
        Self::new(width as f32 / 2.0, height as f32 / 2.0)
    }

    #[inline]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.u0, self.v0)
    }

    /// Maps the center into a frame resized by `ratio`, aligning pixel centers.
    pub fn scaled(self, ratio: f32) -> Self {
        Self::new(
            (self.u0 + 0.5) * ratio - 0.5,
            (self.v0 + 0.5) * ratio - 0.5,
        )
    }

    pub fn validate(self) -> Result<()> {
        if self.u0.is_finite() && self.v0.is_finite() {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "optical center must be finite, got ({}, {})",
                self.u0, self.v0
            )))
        }
    }
}

/// How the polynomial path normalizes pixel radii.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum RadiusNorm {
    /// Distance from the center to the farthest pixel corner; radii stay in `[0, 1]`.
    #[default]
    FarthestCorner,
    /// `sqrt(u0^2 + v0^2)`: the distance from the center to the frame origin.
    CenterNorm,
    /// Caller supplied scale in pixels.
    Fixed(f32),
}

impl RadiusNorm {
    /// Resolves the scale for a frame; zero, negative or non-finite scales are rejected.
    pub fn resolve(self, center: OpticalCenter, width: usize, height: usize) -> Result<f32> {
        let scale = match self {
            Self::FarthestCorner => farthest_corner_distance(center, width, height),
            Self::CenterNorm => center.as_vec2().length(),
            Self::Fixed(scale) => scale,
        };
        if scale.is_finite() && scale > 0.0 {
            Ok(scale)
        } else {
            Err(Error::invalid(format!(
                "radius scale must be positive, {self:?} gives {scale}"
            )))
        }
    }
}

/// Largest distance from `center` to any pixel of a `width x height` frame.
pub fn farthest_corner_distance(center: OpticalCenter, width: usize, height: usize) -> f32 {
    let c = center.as_vec2();
    let right = width.saturating_sub(1) as f32;
    let bottom = height.saturating_sub(1) as f32;
    [
        Vec2::ZERO,
        Vec2::new(right, 0.0),
        Vec2::new(0.0, bottom),
        Vec2::new(right, bottom),
    ]
    .into_iter()
    .map(|corner| corner.distance(c))
    .fold(0.0, f32::max)
}

/// Smallest distance from `center` to any pixel of a `width x height` frame.
///
/// Zero when the center lies inside the pixel grid.
pub fn nearest_frame_distance(center: OpticalCenter, width: usize, height: usize) -> f32 {
    let c = center.as_vec2();
    let far = Vec2::new(
        width.saturating_sub(1) as f32,
        height.saturating_sub(1) as f32,
    );
    c.clamp(Vec2::ZERO, far).distance(c)
}

/// Distance from `pixel` to `center`, divided by `scale` when `scale > 0`.
#[inline]
pub fn radius(pixel: Vec2, center: OpticalCenter, scale: f32) -> f32 {
    RadialSampler::new(center, scale).radius_at(pixel)
}

/// Per-pixel radius evaluation with the normalization resolved once.
#[derive(Debug, Clone, Copy)]
pub struct RadialSampler {
    center: Vec2,
    inv_scale: f32,
}

impl RadialSampler {
    pub fn new(center: OpticalCenter, scale: f32) -> Self {
        let inv_scale = if scale > 0.0 { scale.recip() } else { 1.0 };
        Self {
            center: center.as_vec2(),
            inv_scale,
        }
    }

    #[inline]
    pub fn radius_at(&self, pixel: Vec2) -> f32 {
        pixel.distance(self.center) * self.inv_scale
    }

    #[inline]
    pub fn radius(&self, x: usize, y: usize) -> f32 {
        self.radius_at(Vec2::new(x as f32, y as f32))
    }

    #[inline]
    pub fn radius_squared(&self, x: usize, y: usize) -> f32 {
        let r = (Vec2::new(x as f32, y as f32) - self.center) * self.inv_scale;
        r.length_squared()
    }
}

/// Squared normalized radius of every pixel of a frame, row-major.
///
/// Built once per frame geometry and shared by every objective evaluation.
#[derive(Debug, Clone)]
pub struct RadialGrid {
    width: usize,
    height: usize,
    radius_squared: Vec<f32>,
}

impl RadialGrid {
    pub fn new(width: usize, height: usize, center: OpticalCenter, scale: f32) -> Self {
        let sampler = RadialSampler::new(center, scale);
        let mut radius_squared = vec![0.0f32; width * height];
        if width > 0 {
            radius_squared
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, q) in row.iter_mut().enumerate() {
                        *q = sampler.radius_squared(x, y);
                    }
                });
        }
        Self {
            width,
            height,
            radius_squared,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn radius_squared(&self) -> &[f32] {
        &self.radius_squared
    }
}
