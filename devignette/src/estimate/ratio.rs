//! Ratio-based radial profiling.
//!
//! Neighbouring points on the same radial ray usually see the same scene
//! surface, so the ratio of their intensities is dominated by the lens
//! falloff between the two radii. The estimator collects these log ratios
//! per integer ring on a small gray copy of the frame, takes the median per
//! ring and integrates outward from the center. No parametric form is
//! assumed.

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::Estimator;
use crate::error::{Error, Result};
use crate::geometry::{OpticalCenter, farthest_corner_distance, nearest_frame_distance};
use crate::image::{Image, Plane};
use crate::model::{FalloffModel, RadialProfile};

/// Configuration for ratio profiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioConfig {
    /// Width of the working copy; larger frames are downsampled to it.
    /// Default: 75
    pub target_width: usize,
    /// A ring with fewer samples ends the profile.
    /// Default: 3
    pub min_ring_samples: usize,
    /// Fewest rings (ring 0 included) a usable profile may have.
    /// Default: 4
    pub min_rings: usize,
    /// Fraction of the maximum frame radius the profile has to reach.
    /// Default: 0.5
    pub min_coverage: f32,
    /// Darker samples are ignored (noise dominated).
    /// Default: 5
    pub min_intensity: f32,
    /// Brighter samples are ignored (possibly clipped).
    /// Default: 250
    pub max_intensity: f32,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            target_width: 75,
            min_ring_samples: 3,
            min_rings: 4,
            min_coverage: 0.5,
            min_intensity: 5.0,
            max_intensity: 250.0,
        }
    }
}

impl RatioConfig {
    /// Works on a larger copy for frames with fine radial detail.
    pub fn detailed() -> Self {
        Self {
            target_width: 200,
            min_ring_samples: 8,
            ..Default::default()
        }
    }

    /// Set the working width.
    pub fn with_target_width(mut self, width: usize) -> Self {
        assert!(width >= 8, "Target width must be at least 8 pixels");
        self.target_width = width;
        self
    }

    /// Set the minimum samples per ring.
    pub fn with_min_ring_samples(mut self, samples: usize) -> Self {
        assert!(samples >= 1, "Rings need at least one sample");
        self.min_ring_samples = samples;
        self
    }

    /// Set the minimum ring count.
    pub fn with_min_rings(mut self, rings: usize) -> Self {
        assert!(rings >= 2, "A profile needs at least 2 rings");
        self.min_rings = rings;
        self
    }

    /// Set the required radial coverage.
    pub fn with_min_coverage(mut self, coverage: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&coverage),
            "Coverage must be 0.0-1.0"
        );
        self.min_coverage = coverage;
        self
    }

    /// Set the usable intensity range.
    pub fn with_intensity_range(mut self, min: f32, max: f32) -> Self {
        assert!(
            min > 0.0 && min < max,
            "Intensity range must be positive and non-empty"
        );
        self.min_intensity = min;
        self.max_intensity = max;
        self
    }

    #[inline]
    fn usable(&self, value: f32) -> bool {
        value >= self.min_intensity && value <= self.max_intensity
    }
}

/// Non-parametric estimator producing a shared [`RadialProfile`].
#[derive(Debug, Clone, Default)]
pub struct RatioProfileEstimator {
    config: RatioConfig,
}

impl RatioProfileEstimator {
    pub fn new(config: RatioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatioConfig {
        &self.config
    }

    /// Pools ring samples over a calibration set taken with the same lens setup.
    ///
    /// All frames must share their dimensions.
    pub fn estimate_set(&self, images: &[Image], center: OpticalCenter) -> Result<FalloffModel> {
        let Some(first) = images.first() else {
            return Err(Error::invalid("calibration set is empty"));
        };
        if let Some(other) = images
            .iter()
            .find(|image| (image.width(), image.height()) != (first.width(), first.height()))
        {
            return Err(Error::invalid(format!(
                "calibration frames differ in size: {}x{} vs {}x{}",
                first.width(),
                first.height(),
                other.width(),
                other.height()
            )));
        }
        center.validate()?;

        let mut ratio = 1.0;
        let mut planes = Vec::with_capacity(images.len());
        for image in images {
            let (plane, r) = image
                .luminance_plane()
                .downsampled_to_width(self.config.target_width)?;
            ratio = r;
            planes.push(plane);
        }

        let log_gains = ring_log_gains(&planes, center.scaled(ratio), &self.config)?;
        let profile = RadialProfile::from_log_gains(&log_gains, ratio)?;

        tracing::info!(
            "Radial profile from {} frame(s) of {}x{}: {} rings on a {}x{} copy, edge gain {:.4}",
            images.len(),
            first.width(),
            first.height(),
            profile.ring_count(),
            planes[0].width(),
            planes[0].height(),
            profile.gains()[profile.ring_count() - 1]
        );

        Ok(FalloffModel::profile(center, profile))
    }
}

impl Estimator for RatioProfileEstimator {
    fn estimate(&self, image: &Image, center: OpticalCenter) -> Result<FalloffModel> {
        self.estimate_set(std::slice::from_ref(image), center)
    }
}

/// Log-gain per ring, ring 0 first and equal to 0.
///
/// Every pixel at radius `r >= 1` is paired with the bilinear sample one
/// unit closer to `center` along its ray; `ln I(r) - ln I(r - 1)` goes to
/// ring `round(r)`. The median of each ring is its increment over the
/// previous ring. The profile ends at the first ring with fewer than
/// `min_ring_samples` samples.
///
/// Fails with [`Error::ProfileUnavailable`] when the profile is shorter than
/// `min_rings` or reaches less than `min_coverage` of the largest radius.
pub fn ring_log_gains(
    planes: &[Plane],
    center: OpticalCenter,
    config: &RatioConfig,
) -> Result<Vec<f64>> {
    let Some(first) = planes.first() else {
        return Err(Error::invalid("no planes to profile"));
    };
    let (width, height) = (first.width(), first.height());
    if planes
        .iter()
        .any(|p| p.width() != width || p.height() != height)
    {
        return Err(Error::invalid("planes to profile differ in size"));
    }

    // Ring 1 collects radii in [1, 1.5); without it the profile ends at ring 0
    let nearest = nearest_frame_distance(center, width, height);
    if !(nearest < 1.5) {
        return Err(Error::profile_unavailable(format!(
            "optical center ({}, {}) is {nearest} px away from the {width}x{height} frame",
            center.u0, center.v0
        )));
    }

    let max_radius = farthest_corner_distance(center, width, height);
    let ring_count = max_radius.round() as usize + 1;
    let mut rings: Vec<Vec<f64>> = vec![Vec::new(); ring_count];
    for plane in planes {
        for row in collect_ratio_samples(plane, center, config) {
            for (ring, sample) in row {
                if let Some(bucket) = rings.get_mut(ring) {
                    bucket.push(sample);
                }
            }
        }
    }

    let mut log_gains = vec![0.0f64];
    for samples in rings.iter_mut().skip(1) {
        if samples.len() < config.min_ring_samples {
            break;
        }
        let increment = median(samples);
        let previous = log_gains[log_gains.len() - 1];
        log_gains.push(previous + increment);
    }

    let supported = log_gains.len();
    if supported < config.min_rings {
        return Err(Error::profile_unavailable(format!(
            "only {supported} rings supported, {} required",
            config.min_rings
        )));
    }
    let reach = (supported - 1) as f32;
    if reach < config.min_coverage * max_radius {
        return Err(Error::profile_unavailable(format!(
            "profile reaches radius {reach} of {max_radius:.1}, {:.0}% required",
            config.min_coverage * 100.0
        )));
    }

    tracing::debug!(
        "Ring ratios: {} rings, {} samples in ring 1",
        supported,
        rings.get(1).map_or(0, Vec::len)
    );

    Ok(log_gains)
}

/// `(ring, ln ratio)` pairs per row, rows in order.
fn collect_ratio_samples(
    plane: &Plane,
    center: OpticalCenter,
    config: &RatioConfig,
) -> Vec<Vec<(usize, f64)>> {
    let c = center.as_vec2();
    (0..plane.height())
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::new();
            for x in 0..plane.width() {
                let offset = Vec2::new(x as f32, y as f32) - c;
                let r = offset.length();
                if r < 1.0 {
                    continue;
                }
                let outer = plane.get(x, y);
                if !config.usable(outer) {
                    continue;
                }
                let inward = Vec2::new(x as f32, y as f32) - offset / r;
                let Some(inner) = plane.sample_bilinear(inward.x, inward.y) else {
                    continue;
                };
                if !config.usable(inner) {
                    continue;
                }
                let ring = r.round() as usize;
                row.push((ring, (outer as f64).ln() - (inner as f64).ln()));
            }
            row
        })
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    }
}
