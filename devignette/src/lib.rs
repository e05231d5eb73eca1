//! Devignette - vignetting estimation and removal.
//!
//! This library infers the radial brightness falloff of a lens from the
//! photographs themselves and removes it:
//! - Entropy-minimizing search over a constrained radial polynomial
//! - Ratio-based, non-parametric radial profiling on a downsampled frame
//! - Correction by direct evaluation or through a cached lookup table
//! - Synthetic rendering of an estimated falloff for inspection
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use devignette::{CorrectionEngine, EntropyEstimator, Estimator, Image, OpticalCenter};
//!
//! let image = Image::load("frame_001.jpg")?;
//! let center = OpticalCenter::image_center(image.width(), image.height());
//!
//! let model = EntropyEstimator::default().estimate(&image, center)?;
//! let corrected = CorrectionEngine::default().apply(&image, &model)?;
//! corrected.save("frame_001_corrected.png")?;
//! ```

mod correction;
mod error;
mod estimate;
mod geometry;
mod image;
mod model;
mod render;

#[cfg(feature = "bench")]
pub mod bench;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use geometry::{
    OpticalCenter, RadialGrid, RadialSampler, RadiusNorm, farthest_corner_distance,
    nearest_frame_distance, radius,
};
pub use image::{Image, ImageDimensions, Plane};

// ============================================================================
// Falloff models
// ============================================================================

pub use model::{Falloff, FalloffModel, PolynomialFalloff, RadialProfile, check};

// ============================================================================
// Estimation
// ============================================================================

pub use estimate::entropy::{
    EntropyConfig, EntropyEstimator, HISTOGRAM_BINS, SearchOutcome, entropy_objective,
};
pub use estimate::ratio::{RatioConfig, RatioProfileEstimator, ring_log_gains};
pub use estimate::{Estimator, Strategy, estimate_or_identity};

// ============================================================================
// Correction and rendering
// ============================================================================

pub use correction::lut::{CorrectionLut, LutKey, MAX_STEPS_PER_PIXEL};
pub use correction::{CorrectionConfig, CorrectionEngine, CorrectionMode, apply_direct};
pub use render::render;

/// Estimate a model with `strategy` and correct the same image with it.
///
/// The ratio strategy falls back to the identity model when no profile can be
/// derived, so the returned image is then an unchanged copy.
pub fn correct(
    image: &Image,
    center: OpticalCenter,
    strategy: &Strategy,
) -> Result<(FalloffModel, Image)> {
    let model = estimate_or_identity(strategy, image, center)?;
    let corrected = CorrectionEngine::default().apply(image, &model)?;
    Ok((model, corrected))
}
