//! Vignetting estimation strategies.
//!
//! Both strategies turn an image and its optical center into a
//! [`FalloffModel`], so correction and rendering never depend on how the
//! model was found.

pub mod entropy;
pub mod ratio;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::OpticalCenter;
use crate::image::Image;
use crate::model::FalloffModel;

use entropy::{EntropyConfig, EntropyEstimator};
use ratio::{RatioConfig, RatioProfileEstimator};

/// Something that can infer a falloff model from a single image.
pub trait Estimator {
    fn estimate(&self, image: &Image, center: OpticalCenter) -> Result<FalloffModel>;
}

/// Estimation strategy selected by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Strategy {
    /// Per-channel polynomial found by entropy minimization.
    Entropy(EntropyConfig),
    /// Shared radial profile from ring intensity ratios.
    Ratio(RatioConfig),
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Entropy(EntropyConfig::default())
    }
}

impl Strategy {
    pub fn entropy() -> Self {
        Self::Entropy(EntropyConfig::default())
    }

    pub fn ratio() -> Self {
        Self::Ratio(RatioConfig::default())
    }
}

impl Estimator for Strategy {
    fn estimate(&self, image: &Image, center: OpticalCenter) -> Result<FalloffModel> {
        match self {
            Self::Entropy(config) => EntropyEstimator::new(config.clone()).estimate(image, center),
            Self::Ratio(config) => {
                RatioProfileEstimator::new(config.clone()).estimate(image, center)
            }
        }
    }
}

/// Runs `estimator`, substituting the identity model when no profile exists.
///
/// Only [`Error::ProfileUnavailable`] triggers the fallback; invalid input is
/// still reported to the caller.
pub fn estimate_or_identity<E: Estimator + ?Sized>(
    estimator: &E,
    image: &Image,
    center: OpticalCenter,
) -> Result<FalloffModel> {
    match estimator.estimate(image, center) {
        Err(Error::ProfileUnavailable { reason }) => {
            tracing::warn!("No vignetting profile ({reason}), leaving image uncorrected");
            Ok(FalloffModel::identity(center))
        }
        other => other,
    }
}
