//! Entropy-minimizing vignetting estimation.
//!
//! Vignetting spreads the intensities of uniformly lit regions across many
//! levels, so the log-intensity histogram of a vignetted frame has higher
//! entropy than the clean one. The estimator searches the correction
//! polynomial `p(r) = 1 + a r^2 + b r^4 + c r^6` that minimizes the entropy
//! of the corrected frame:
//!
//! 1. Start at the identity `(0, 0, 0)` with step `initial_step`.
//! 2. Score the six axis neighbours at `+-step` that pass [`check`].
//! 3. Move to the best strictly improving neighbour, or halve the step.
//! 4. Stop once the step drops below `min_step`.
//!
//! Every channel is searched independently and in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::Estimator;
use crate::error::Result;
use crate::geometry::{OpticalCenter, RadialGrid, RadiusNorm};
use crate::image::{Image, Plane};
use crate::model::{FalloffModel, PolynomialFalloff, check};

/// Number of histogram bins over the log-compressed intensity range.
pub const HISTOGRAM_BINS: usize = 256;

/// `255 * ln(1 + v) / 8` maps the 8-bit range onto roughly 177 bins and
/// leaves headroom for corrected values up to `e^8 - 1`.
const LOG_COMPRESSION: f32 = 255.0 / 8.0;

const SMOOTHING_KERNEL: [f32; 9] = [1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
const SMOOTHING_NORM: f32 = 25.0;

/// Rows accumulated into one partial histogram before the ordered reduction.
const ROWS_PER_CHUNK: usize = 16;

/// Configuration for the entropy search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyConfig {
    /// First coordinate step.
    /// Default: 8.0
    pub initial_step: f32,
    /// The search stops once the step falls below this value.
    /// Default: 1/256
    pub min_step: f32,
    /// Upper bound on search iterations per channel.
    /// Default: 10000
    pub max_iterations: usize,
    /// Normalization of pixel radii.
    /// Default: farthest corner
    pub radius_norm: RadiusNorm,
    /// Downsample channels wider than this before searching.
    /// Coefficients act on normalized radius, so they carry over unchanged.
    /// Default: None (full resolution)
    pub max_width: Option<usize>,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            initial_step: 8.0,
            min_step: 1.0 / 256.0,
            max_iterations: 10_000,
            radius_norm: RadiusNorm::FarthestCorner,
            max_width: None,
        }
    }
}

impl EntropyConfig {
    /// Searches a downsampled copy with a coarser final step.
    ///
    /// Suited to previews of large frames.
    pub fn fast() -> Self {
        Self {
            min_step: 1.0 / 64.0,
            max_width: Some(512),
            ..Default::default()
        }
    }

    /// Set the initial step.
    pub fn with_initial_step(mut self, step: f32) -> Self {
        assert!(
            step.is_finite() && step > 0.0,
            "Initial step must be positive"
        );
        self.initial_step = step;
        self
    }

    /// Set the minimum step.
    pub fn with_min_step(mut self, step: f32) -> Self {
        assert!(
            step.is_finite() && step > 0.0,
            "Minimum step must be positive"
        );
        self.min_step = step;
        self
    }

    /// Set the iteration limit.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        assert!(iterations > 0, "Iteration limit must be at least 1");
        self.max_iterations = iterations;
        self
    }

    /// Set the radius normalization.
    pub fn with_radius_norm(mut self, norm: RadiusNorm) -> Self {
        self.radius_norm = norm;
        self
    }

    /// Set the downsampling width used during the search.
    pub fn with_max_width(mut self, width: usize) -> Self {
        assert!(width >= 8, "Search width must be at least 8 pixels");
        self.max_width = Some(width);
        self
    }
}

/// Result of one channel search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub falloff: PolynomialFalloff,
    /// Objective at `falloff`.
    pub entropy: f32,
    /// Completed search iterations.
    pub iterations: usize,
    /// Objective evaluations, including the starting point.
    pub evaluations: usize,
}

/// Polynomial vignetting estimator driven by histogram entropy.
#[derive(Debug, Clone, Default)]
pub struct EntropyEstimator {
    config: EntropyConfig,
}

impl EntropyEstimator {
    pub fn new(config: EntropyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EntropyConfig {
        &self.config
    }

    /// Coordinate descent over `(a, b, c)` for one plane.
    ///
    /// `grid` must describe the same frame as `plane`. The returned falloff
    /// is the identity or a triple accepted by [`check`].
    pub fn search(&self, plane: &Plane, grid: &RadialGrid) -> SearchOutcome {
        let mut current = PolynomialFalloff::IDENTITY;
        let mut entropy = entropy_objective(plane, grid, current);
        let mut step = self.config.initial_step;
        let mut iterations = 0;
        let mut evaluations = 1;

        while step >= self.config.min_step {
            if iterations >= self.config.max_iterations {
                tracing::warn!(
                    "Entropy search hit the iteration limit ({}) at step {}",
                    self.config.max_iterations,
                    step
                );
                break;
            }
            iterations += 1;

            let candidates = current.neighbors(step);
            let mut scores: [Option<f32>; 6] = [None; 6];
            scores
                .par_iter_mut()
                .zip(candidates.par_iter())
                .for_each(|(score, candidate)| {
                    if check(candidate.a, candidate.b, candidate.c) {
                        *score = Some(entropy_objective(plane, grid, *candidate));
                    }
                });

            let mut winner: Option<(usize, f32)> = None;
            for (i, score) in scores.iter().enumerate() {
                let Some(score) = *score else { continue };
                evaluations += 1;
                if score < winner.map_or(entropy, |(_, best)| best) {
                    winner = Some((i, score));
                }
            }

            match winner {
                Some((i, score)) => {
                    current = candidates[i];
                    entropy = score;
                    tracing::debug!(
                        a = current.a,
                        b = current.b,
                        c = current.c,
                        entropy,
                        step,
                        "Entropy search moved"
                    );
                }
                None => step *= 0.5,
            }
        }

        SearchOutcome {
            falloff: current,
            entropy,
            iterations,
            evaluations,
        }
    }

    /// Planes to search and the radial grid they share.
    fn prepare(
        &self,
        image: &Image,
        center: OpticalCenter,
        scale: f32,
    ) -> Result<(Vec<Plane>, RadialGrid)> {
        let mut planes = (0..image.channels())
            .map(|c| image.channel_plane(c))
            .collect::<Result<Vec<_>>>()?;
        let mut ratio = 1.0;
        if let Some(max_width) = self.config.max_width {
            for plane in &mut planes {
                let (small, r) = plane.downsampled_to_width(max_width)?;
                *plane = small;
                ratio = r;
            }
        }

        let (width, height) = (planes[0].width(), planes[0].height());
        let grid = RadialGrid::new(width, height, center.scaled(ratio), scale * ratio);
        Ok((planes, grid))
    }
}

impl Estimator for EntropyEstimator {
    fn estimate(&self, image: &Image, center: OpticalCenter) -> Result<FalloffModel> {
        center.validate()?;
        let scale = self
            .config
            .radius_norm
            .resolve(center, image.width(), image.height())?;
        let (planes, grid) = self.prepare(image, center, scale)?;

        tracing::info!(
            "Estimating vignetting of {}x{} image ({} channels) by entropy on {}x{}",
            image.width(),
            image.height(),
            image.channels(),
            grid.width(),
            grid.height()
        );

        let outcomes: Vec<SearchOutcome> = planes
            .par_iter()
            .map(|plane| self.search(plane, &grid))
            .collect();

        for (channel, outcome) in outcomes.iter().enumerate() {
            tracing::info!(
                "Channel {}: a={:.4}, b={:.4}, c={:.4}, entropy={:.5} ({} iterations, {} evaluations)",
                channel,
                outcome.falloff.a,
                outcome.falloff.b,
                outcome.falloff.c,
                outcome.entropy,
                outcome.iterations,
                outcome.evaluations
            );
        }

        let channels = outcomes.into_iter().map(|o| o.falloff).collect();
        FalloffModel::polynomial(center, scale, channels)
    }
}

/// Entropy of the smoothed log-intensity histogram of `plane` corrected by `falloff`.
///
/// Returns `f32::INFINITY` when no corrected value falls inside the
/// histogram range. The value is independent of thread scheduling.
///
/// # Panics
/// Panics if `grid` and `plane` have different dimensions.
pub fn entropy_objective(plane: &Plane, grid: &RadialGrid, falloff: PolynomialFalloff) -> f32 {
    assert_eq!(
        (plane.width(), plane.height()),
        (grid.width(), grid.height()),
        "Radial grid must match plane dimensions"
    );

    let histogram = corrected_histogram(plane, grid, falloff);
    let smoothed = smooth_histogram(&histogram);
    histogram_entropy(&smoothed)
}

fn corrected_histogram(
    plane: &Plane,
    grid: &RadialGrid,
    falloff: PolynomialFalloff,
) -> [f32; HISTOGRAM_BINS] {
    let chunk = plane.width() * ROWS_PER_CHUNK;
    let partials: Vec<[f32; HISTOGRAM_BINS]> = plane
        .data()
        .par_chunks(chunk)
        .zip(grid.radius_squared().par_chunks(chunk))
        .map(|(values, radii)| {
            let mut histogram = [0.0f32; HISTOGRAM_BINS];
            for (&value, &q) in values.iter().zip(radii) {
                let corrected = value * falloff.correction_at_squared(q);
                accumulate(&mut histogram, LOG_COMPRESSION * corrected.ln_1p());
            }
            histogram
        })
        .collect();

    // Ordered reduction keeps the sum bit-identical across runs.
    let mut histogram = [0.0f32; HISTOGRAM_BINS];
    for partial in &partials {
        for (total, value) in histogram.iter_mut().zip(partial) {
            *total += value;
        }
    }
    histogram
}

/// Splits one sample between the bins around `position`.
#[inline]
fn accumulate(histogram: &mut [f32; HISTOGRAM_BINS], position: f32) {
    if !(position >= 0.0) {
        return;
    }
    let lower = position.floor();
    let fraction = position - lower;
    let lower = lower as usize;
    if lower < HISTOGRAM_BINS {
        histogram[lower] += 1.0 - fraction;
    }
    if fraction > 0.0 && lower + 1 < HISTOGRAM_BINS {
        histogram[lower + 1] += fraction;
    }
}

/// Triangular smoothing with a mirrored border that excludes the edge bin.
fn smooth_histogram(histogram: &[f32; HISTOGRAM_BINS]) -> [f32; HISTOGRAM_BINS] {
    let last = HISTOGRAM_BINS as isize - 1;
    let half = (SMOOTHING_KERNEL.len() / 2) as isize;
    let mut smoothed = [0.0f32; HISTOGRAM_BINS];
    for (i, out) in smoothed.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (k, weight) in SMOOTHING_KERNEL.iter().enumerate() {
            let mut j = i as isize + k as isize - half;
            if j < 0 {
                j = -j;
            } else if j > last {
                j = 2 * last - j;
            }
            sum += weight * histogram[j as usize];
        }
        *out = sum / SMOOTHING_NORM;
    }
    smoothed
}

fn histogram_entropy(histogram: &[f32; HISTOGRAM_BINS]) -> f32 {
    let total: f32 = histogram.iter().sum();
    if !(total > 0.0) {
        return f32::INFINITY;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0.0)
        .map(|&count| {
            let p = count / total;
            -p * p.ln()
        })
        .sum()
}
