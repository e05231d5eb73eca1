//! Correction factors tabulated over the radii a frame covers.

use crate::error::{Error, Result};
use crate::geometry::{farthest_corner_distance, nearest_frame_distance};
use crate::model::{Falloff, FalloffModel};

/// Past this radius `f32` no longer resolves whole pixels.
const MAX_TABLE_RADIUS: f32 = 16_777_216.0;

/// Finest sampling a table uses, in entries per pixel of radius.
pub const MAX_STEPS_PER_PIXEL: usize = 16;

/// Identifies the frame geometry and model a [`CorrectionLut`] was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LutKey {
    center_bits: (u32, u32),
    width: usize,
    height: usize,
    fingerprint: u64,
    /// First radius covered, `floor` of the distance to the nearest pixel.
    min_radius: usize,
    /// Last radius covered, `ceil` of the farthest-corner distance.
    max_radius: usize,
    steps_per_pixel: usize,
}

impl LutKey {
    /// Fails when the center is too far from the frame to tabulate, or when a
    /// profile packs more than [`MAX_STEPS_PER_PIXEL`] rings into one pixel.
    pub fn new(model: &FalloffModel, width: usize, height: usize) -> Result<Self> {
        let center = model.center;
        center.validate()?;
        let far = farthest_corner_distance(center, width, height);
        if !(far <= MAX_TABLE_RADIUS) {
            return Err(Error::invalid(format!(
                "optical center ({}, {}) is too far from the {width}x{height} frame for a correction table",
                center.u0, center.v0
            )));
        }
        let near = nearest_frame_distance(center, width, height);

        Ok(Self {
            center_bits: (center.u0.to_bits(), center.v0.to_bits()),
            width,
            height,
            fingerprint: model.fingerprint(),
            min_radius: near.floor() as usize,
            max_radius: far.ceil() as usize,
            steps_per_pixel: steps_per_pixel(model)?,
        })
    }

    #[inline]
    pub fn min_radius(&self) -> usize {
        self.min_radius
    }

    #[inline]
    pub fn max_radius(&self) -> usize {
        self.max_radius
    }

    #[inline]
    pub fn steps_per_pixel(&self) -> usize {
        self.steps_per_pixel
    }

    /// Entries per curve; one spare so `floor(x) + 1` stays in range at the far corner.
    fn table_len(&self) -> usize {
        (self.max_radius - self.min_radius) * self.steps_per_pixel + 2
    }
}

/// A profile needs one entry per ring to keep its knots; polynomials are
/// smooth enough for whole pixels.
fn steps_per_pixel(model: &FalloffModel) -> Result<usize> {
    match &model.falloff {
        Falloff::Polynomial { .. } => Ok(1),
        Falloff::Profile { profile } => {
            let scale = profile.scale();
            if scale > MAX_STEPS_PER_PIXEL as f32 {
                return Err(Error::invalid(format!(
                    "profile has {scale} rings per pixel, at most {MAX_STEPS_PER_PIXEL} can be tabulated"
                )));
            }
            Ok((scale.ceil() as usize).max(1))
        }
    }
}

/// Immutable per-curve correction tables.
///
/// Entry `i` holds the correction at radius `min_radius + i / steps_per_pixel`
/// pixels; lookups blend the two entries around the queried radius.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionLut {
    key: LutKey,
    tables: Vec<Vec<f32>>,
}

impl CorrectionLut {
    pub fn build(model: &FalloffModel, width: usize, height: usize) -> Result<Self> {
        let key = LutKey::new(model, width, height)?;
        Ok(Self::tabulate(model, key))
    }

    pub(super) fn tabulate(model: &FalloffModel, key: LutKey) -> Self {
        let origin = key.min_radius as f32;
        let step = 1.0 / key.steps_per_pixel as f32;
        let len = key.table_len();
        let tables = (0..model.curve_count())
            .map(|curve| {
                (0..len)
                    .map(|i| model.correction(curve, origin + i as f32 * step))
                    .collect()
            })
            .collect();
        Self { key, tables }
    }

    #[inline]
    pub fn key(&self) -> &LutKey {
        &self.key
    }

    #[inline]
    pub fn curve_count(&self) -> usize {
        self.tables.len()
    }

    /// Correction factor of `curve` at pixel radius `radius`.
    ///
    /// Radii outside the tabulated range clamp to the first or last entry.
    #[inline]
    pub fn factor(&self, curve: usize, radius: f32) -> f32 {
        let table = &self.tables[curve];
        let last = table.len() - 1;
        let x = (radius - self.key.min_radius as f32) * self.key.steps_per_pixel as f32;
        if !(x > 0.0) {
            return table[0];
        }
        let n = x.floor() as usize;
        if n >= last {
            return table[last];
        }
        let f = x - n as f32;
        table[n] * (1.0 - f) + table[n + 1] * f
    }
}
