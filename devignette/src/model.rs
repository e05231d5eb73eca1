//! Radial falloff models.
//!
//! Two representations share one view, `gain(radius)`, the multiplicative
//! attenuation the lens applied at a full-resolution pixel radius:
//!
//! - [`PolynomialFalloff`]: the correction polynomial
//!   `p(r) = 1 + a r^2 + b r^4 + c r^6` on normalized radius, with
//!   `gain(r) = 1 / p(r)`.
//! - [`RadialProfile`]: tabulated gains per integer ring, linearly
//!   interpolated and held constant past the last ring.

use std::hash::Hasher;
use std::path::Path;

use common::FileFormat;
use common::fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::OpticalCenter;

/// Feasibility predicate for a correction polynomial.
///
/// True iff `p(r) = 1 + a r^2 + b r^4 + c r^6` is non-decreasing on
/// `r in [0, 1]` (so it stays >= 1 and its reciprocal, the attenuation, never
/// brightens toward the edge). With `q = r^2`, the stationary points of
/// `p(q)` are the roots of `3c q^2 + 2b q + a`.
pub fn check(a: f32, b: f32, c: f32) -> bool {
    if c == 0.0 {
        if b == 0.0 {
            return a > 0.0;
        }
        if b > 0.0 {
            return a >= 0.0;
        }
        return (-a <= 2.0 * b) && (b < 0.0);
    }

    let discriminant = 4.0 * b * b - 12.0 * a * c;
    if discriminant <= 0.0 {
        return c > 0.0;
    }

    let root = discriminant.sqrt();
    let q_plus = (-2.0 * b + root) / (6.0 * c);
    let q_minus = (-2.0 * b - root) / (6.0 * c);

    if c > 0.0 {
        q_plus <= 0.0 || q_minus >= 1.0
    } else {
        q_plus >= 1.0 && q_minus <= 0.0
    }
}

/// Coefficients of the correction polynomial for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolynomialFalloff {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl PolynomialFalloff {
    /// No correction. The search starts here.
    pub const IDENTITY: Self = Self {
        a: 0.0,
        b: 0.0,
        c: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32) -> Self {
        Self { a, b, c }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Identity, or a triple accepted by [`check`].
    pub fn is_feasible(&self) -> bool {
        self.is_identity() || check(self.a, self.b, self.c)
    }

    /// Correction factor at squared normalized radius `q`.
    #[inline]
    pub fn correction_at_squared(&self, q: f32) -> f32 {
        1.0 + q * (self.a + q * (self.b + q * self.c))
    }

    #[inline]
    pub fn correction(&self, r: f32) -> f32 {
        self.correction_at_squared(r * r)
    }

    /// Attenuation at normalized radius `r`.
    #[inline]
    pub fn gain(&self, r: f32) -> f32 {
        self.correction(r).recip()
    }

    /// The six axis-aligned neighbours at distance `step`, in search order.
    pub fn neighbors(&self, step: f32) -> [Self; 6] {
        let Self { a, b, c } = *self;
        [
            Self::new(a + step, b, c),
            Self::new(a - step, b, c),
            Self::new(a, b + step, c),
            Self::new(a, b - step, c),
            Self::new(a, b, c + step),
            Self::new(a, b, c - step),
        ]
    }
}

/// Gains per integer radius ring, ring 0 first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialProfile {
    gains: Vec<f32>,
    /// Rings per full-resolution pixel.
    scale: f32,
}

impl RadialProfile {
    pub fn new(gains: Vec<f32>, scale: f32) -> Result<Self> {
        let profile = Self { gains, scale };
        profile.validate()?;
        Ok(profile)
    }

    /// Exponentiates log-gains and divides by the first entry, so ring 0 is 1.
    pub fn from_log_gains(log_gains: &[f64], scale: f32) -> Result<Self> {
        let first = log_gains
            .first()
            .ok_or_else(|| Error::invalid("profile needs at least one ring"))?;
        let anchor = first.exp();
        let gains = log_gains
            .iter()
            .map(|&g| (g.exp() / anchor) as f32)
            .collect();
        Self::new(gains, scale)
    }

    fn validate(&self) -> Result<()> {
        if self.gains.is_empty() {
            return Err(Error::invalid("profile needs at least one ring"));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::invalid(format!(
                "profile scale must be positive, got {}",
                self.scale
            )));
        }
        if let Some((ring, g)) = self
            .gains
            .iter()
            .enumerate()
            .find(|(_, g)| !(g.is_finite() && **g > 0.0))
        {
            return Err(Error::invalid(format!(
                "profile gain at ring {ring} must be positive, got {g}"
            )));
        }
        Ok(())
    }

    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn ring_count(&self) -> usize {
        self.gains.len()
    }

    /// Gain at fractional ring position `x`.
    ///
    /// Linear between neighbouring rings; at or past the last ring the last
    /// value is returned unchanged.
    pub fn at_ring(&self, x: f32) -> f32 {
        let last = self.gains.len() - 1;
        if !(x > 0.0) {
            return self.gains[0];
        }
        // `as` saturates, so huge radii land on the last ring.
        let n = x.floor() as usize;
        if n >= last {
            return self.gains[last];
        }
        let f = x - n as f32;
        self.gains[n] * (1.0 - f) + self.gains[n + 1] * f
    }

    /// Gain at a full-resolution pixel radius.
    #[inline]
    pub fn gain(&self, radius_px: f32) -> f32 {
        self.at_ring(radius_px * self.scale)
    }
}

/// The falloff representation inside a [`FalloffModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Falloff {
    /// One polynomial per channel (1 entry is shared by all channels).
    Polynomial {
        /// Pixels per unit of normalized radius.
        radius_scale: f32,
        channels: Vec<PolynomialFalloff>,
    },
    /// One profile shared by all channels.
    Profile { profile: RadialProfile },
}

/// Estimated vignetting of one camera setup, replayable without re-estimating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalloffModel {
    pub center: OpticalCenter,
    pub falloff: Falloff,
}

impl FalloffModel {
    pub fn polynomial(
        center: OpticalCenter,
        radius_scale: f32,
        channels: Vec<PolynomialFalloff>,
    ) -> Result<Self> {
        let model = Self {
            center,
            falloff: Falloff::Polynomial {
                radius_scale,
                channels,
            },
        };
        model.validate()?;
        Ok(model)
    }

    pub fn profile(center: OpticalCenter, profile: RadialProfile) -> Self {
        Self {
            center,
            falloff: Falloff::Profile { profile },
        }
    }

    /// Model that leaves every pixel unchanged.
    pub fn identity(center: OpticalCenter) -> Self {
        Self {
            center,
            falloff: Falloff::Polynomial {
                radius_scale: 1.0,
                channels: vec![PolynomialFalloff::IDENTITY],
            },
        }
    }

    pub fn is_identity(&self) -> bool {
        match &self.falloff {
            Falloff::Polynomial { channels, .. } => channels.iter().all(|p| p.is_identity()),
            Falloff::Profile { profile } => profile.gains().iter().all(|&g| g == 1.0),
        }
    }

    /// Number of distinct per-channel curves; 1 when shared by all channels.
    pub fn curve_count(&self) -> usize {
        match &self.falloff {
            Falloff::Polynomial { channels, .. } => channels.len(),
            Falloff::Profile { .. } => 1,
        }
    }

    /// Index of the curve used for image channel `channel`.
    #[inline]
    pub fn curve_index(&self, channel: usize) -> usize {
        if self.curve_count() == 1 { 0 } else { channel }
    }

    /// Rejects images whose channel count the model cannot serve.
    pub fn ensure_channels(&self, channels: usize) -> Result<()> {
        let curves = self.curve_count();
        if curves == 1 || curves == channels {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "model has {curves} channel curves, image has {channels} channels"
            )))
        }
    }

    /// Attenuation of curve `curve` at a full-resolution pixel radius.
    pub fn gain(&self, curve: usize, radius_px: f32) -> f32 {
        match &self.falloff {
            Falloff::Polynomial {
                radius_scale,
                channels,
            } => channels[curve].gain(radius_px / radius_scale),
            Falloff::Profile { profile } => profile.gain(radius_px),
        }
    }

    /// Correction factor (inverse attenuation) of curve `curve`.
    pub fn correction(&self, curve: usize, radius_px: f32) -> f32 {
        match &self.falloff {
            Falloff::Polynomial {
                radius_scale,
                channels,
            } => channels[curve].correction(radius_px / radius_scale),
            Falloff::Profile { profile } => profile.gain(radius_px).recip(),
        }
    }

    /// Stable fingerprint of center and curves, used to key lookup tables.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::new();
        hasher.write_f32s(&[self.center.u0, self.center.v0]);
        match &self.falloff {
            Falloff::Polynomial {
                radius_scale,
                channels,
            } => {
                hasher.write_u8(0);
                hasher.write_f32s(&[*radius_scale]);
                for p in channels {
                    hasher.write_f32s(&[p.a, p.b, p.c]);
                }
            }
            Falloff::Profile { profile } => {
                hasher.write_u8(1);
                hasher.write_f32s(&[profile.scale()]);
                hasher.write_f32s(profile.gains());
            }
        }
        hasher.finish()
    }

    /// Checks the invariants a deserialized record might violate.
    pub fn validate(&self) -> Result<()> {
        self.center.validate()?;
        match &self.falloff {
            Falloff::Polynomial {
                radius_scale,
                channels,
            } => {
                if !(radius_scale.is_finite() && *radius_scale > 0.0) {
                    return Err(Error::invalid(format!(
                        "radius scale must be positive, got {radius_scale}"
                    )));
                }
                if channels.len() != 1 && channels.len() != 3 {
                    return Err(Error::invalid(format!(
                        "expected 1 or 3 channel polynomials, got {}",
                        channels.len()
                    )));
                }
                if let Some(p) = channels.iter().find(|p| !p.is_feasible()) {
                    return Err(Error::invalid(format!(
                        "infeasible polynomial ({}, {}, {})",
                        p.a, p.b, p.c
                    )));
                }
                Ok(())
            }
            Falloff::Profile { profile } => profile.validate(),
        }
    }

    pub fn to_record(&self, format: FileFormat) -> Result<String> {
        Ok(common::serialize(self, format)?)
    }

    pub fn from_record(record: &str, format: FileFormat) -> Result<Self> {
        let model: Self = common::deserialize(record, format)?;
        model.validate()?;
        Ok(model)
    }

    /// Writes the model as YAML or JSON, chosen by the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let record = self.to_record(record_format(path)?)?;
        std::fs::write(path, record).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = record_format(path)?;
        let record = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_record(&record, format)
    }
}

fn record_format(path: &Path) -> Result<FileFormat> {
    FileFormat::from_path(path).map_err(|source| Error::ModelFormat {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests;
