//! Visualization of an estimated falloff.

use crate::error::{Error, Result};
use crate::geometry::{OpticalCenter, RadialSampler};
use crate::image::Image;
use crate::model::FalloffModel;

/// Renders the attenuation of `model` as an 8-bit map.
///
/// Brightness is `255 * gain(r)` with `r` measured in the model's pixel units
/// from the canvas center `(width / 2, height / 2)`, so the map shows the
/// falloff shape independently of where the optical center was. The map has
/// one channel per model curve.
pub fn render(width: usize, height: usize, model: &FalloffModel) -> Result<Image> {
    model.validate()?;
    let channels = model.curve_count();
    if channels != 1 && channels != 3 {
        return Err(Error::invalid(format!(
            "cannot render a model with {channels} curves"
        )));
    }

    let sampler = RadialSampler::new(OpticalCenter::image_center(width, height), 0.0);
    Image::from_fn(width, height, channels, |x, y, c| {
        let gain = model.gain(c, sampler.radius(x, y));
        (255.0 * gain).round().clamp(0.0, 255.0) as u8
    })
}
