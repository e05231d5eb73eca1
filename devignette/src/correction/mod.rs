//! Vignetting removal.
//!
//! Every sample is multiplied by the model's correction factor at its pixel
//! radius, rounded and saturated to the 8-bit range. Factors come either
//! from the model directly or from a [`CorrectionLut`] that the engine keeps
//! between calls and rebuilds when the model or frame geometry changes.

pub mod lut;


use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::RadialSampler;
use crate::image::Image;
use crate::model::FalloffModel;

use lut::{CorrectionLut, LutKey};

/// How correction factors are obtained per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorrectionMode {
    /// Evaluate the model at every pixel.
    Direct,
    /// Interpolate a per-radius table built once per model and geometry.
    #[default]
    Lut,
}

/// Configuration for the correction engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Default: lookup table
    pub mode: CorrectionMode,
}

impl CorrectionConfig {
    pub fn direct() -> Self {
        Self {
            mode: CorrectionMode::Direct,
        }
    }

    pub fn lut() -> Self {
        Self {
            mode: CorrectionMode::Lut,
        }
    }

    pub fn with_mode(mut self, mode: CorrectionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Applies falloff models to images, caching the lookup table between calls.
///
/// The table is immutable once built and shared through an [`Arc`]; a key
/// mismatch replaces it instead of mutating it.
#[derive(Debug, Clone, Default)]
pub struct CorrectionEngine {
    config: CorrectionConfig,
    lut: Option<Arc<CorrectionLut>>,
}

impl CorrectionEngine {
    pub fn new(config: CorrectionConfig) -> Self {
        Self { config, lut: None }
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Starts from a table built elsewhere, e.g. by another engine.
    pub fn with_cache(mut self, lut: Arc<CorrectionLut>) -> Self {
        self.lut = Some(lut);
        self
    }

    /// The currently cached table, if any.
    pub fn cache_handle(&self) -> Option<Arc<CorrectionLut>> {
        self.lut.clone()
    }

    /// Drops the cached table.
    pub fn invalidate(&mut self) {
        self.lut = None;
    }

    /// Corrected copy of `image`.
    ///
    /// Fails if the model is invalid or its curves do not fit the image's
    /// channel count. In table mode it also fails when no table can cover the
    /// frame (see [`LutKey::new`]). Saturation is silent.
    pub fn apply(&mut self, image: &Image, model: &FalloffModel) -> Result<Image> {
        model.validate()?;
        model.ensure_channels(image.channels())?;
        if model.is_identity() {
            return Ok(image.clone());
        }

        match self.config.mode {
            CorrectionMode::Direct => Ok(correct_rows(image, model, |curve, r| {
                model.correction(curve, r)
            })),
            CorrectionMode::Lut => {
                let lut = self.lut_for(model, image.width(), image.height())?;
                Ok(correct_rows(image, model, |curve, r| lut.factor(curve, r)))
            }
        }
    }

    /// Corrects a sequence of frames with one model.
    ///
    /// Frames of equal size share a single table.
    pub fn apply_batch(&mut self, images: &[Image], model: &FalloffModel) -> Result<Vec<Image>> {
        images.iter().map(|image| self.apply(image, model)).collect()
    }

    fn lut_for(
        &mut self,
        model: &FalloffModel,
        width: usize,
        height: usize,
    ) -> Result<Arc<CorrectionLut>> {
        let key = LutKey::new(model, width, height)?;
        match &self.lut {
            Some(lut) if *lut.key() == key => Ok(Arc::clone(lut)),
            _ => {
                tracing::info!(
                    "Building correction table for {}x{} (radius {}..{}, {} per pixel, {} curves)",
                    width,
                    height,
                    key.min_radius(),
                    key.max_radius(),
                    key.steps_per_pixel(),
                    model.curve_count()
                );
                let lut = Arc::new(CorrectionLut::tabulate(model, key));
                self.lut = Some(Arc::clone(&lut));
                Ok(lut)
            }
        }
    }
}

/// Corrects `image` by evaluating `model` at every pixel, without caching.
pub fn apply_direct(image: &Image, model: &FalloffModel) -> Result<Image> {
    model.validate()?;
    model.ensure_channels(image.channels())?;
    Ok(correct_rows(image, model, |curve, r| model.correction(curve, r)))
}

/// Row-parallel correction with `factor(curve, radius_px)`.
fn correct_rows<F>(image: &Image, model: &FalloffModel, factor: F) -> Image
where
    F: Fn(usize, f32) -> f32 + Sync,
{
    let channels = image.channels();
    let row_len = image.dimensions().row_len();
    let sampler = RadialSampler::new(model.center, 0.0);
    let curves: Vec<usize> = (0..channels).map(|c| model.curve_index(c)).collect();

    let mut output = image.clone();
    output
        .data_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(channels).enumerate() {
                let r = sampler.radius(x, y);
                for (value, &curve) in pixel.iter_mut().zip(&curves) {
                    *value = (*value as f32 * factor(curve, r)).round().clamp(0.0, 255.0) as u8;
                }
            }
        });
    output
}
