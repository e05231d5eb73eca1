//! 8-bit interleaved images and transient floating-point planes.

mod io;


use rayon::prelude::*;

use crate::error::{Error, Result};

/// Image dimensions: width, height, and number of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
    /// Number of channels (1 for grayscale, 3 for RGB)
    pub channels: usize,
}

impl ImageDimensions {
    /// Number of samples per row (width * channels).
    pub fn row_len(&self) -> usize {
        self.width * self.channels
    }

    /// Total number of samples (width * height * channels).
    pub fn sample_count(&self) -> usize {
        self.row_len() * self.height
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!(
                "image must not be empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(Error::invalid(format!(
                "expected 1 or 3 channels, got {}",
                self.channels
            )));
        }
        Ok(())
    }
}

/// Interleaved 8-bit image with 1 (gray) or 3 (RGB) channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    dimensions: ImageDimensions,
    data: Vec<u8>,
}

impl Image {
    /// Wraps interleaved samples.
    ///
    /// Rejects empty frames, channel counts other than 1 or 3, and buffers
    /// whose length does not match the dimensions.
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let dimensions = ImageDimensions {
            width,
            height,
            channels,
        };
        dimensions.validate()?;
        if data.len() != dimensions.sample_count() {
            return Err(Error::invalid(format!(
                "buffer holds {} samples, {}x{}x{} needs {}",
                data.len(),
                width,
                height,
                channels,
                dimensions.sample_count()
            )));
        }
        Ok(Self { dimensions, data })
    }

    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> Result<Self> {
        let dimensions = ImageDimensions {
            width,
            height,
            channels,
        };
        dimensions.validate()?;
        Ok(Self {
            dimensions,
            data: vec![value; dimensions.sample_count()],
        })
    }

    /// Builds an image sample by sample; `f(x, y, channel)`.
    pub fn from_fn<F>(width: usize, height: usize, channels: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize, usize) -> u8 + Sync,
    {
        let mut image = Self::filled(width, height, channels, 0)?;
        let row_len = image.dimensions.row_len();
        image
            .data
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for (i, v) in row.iter_mut().enumerate() {
                    *v = f(i / channels, y, i % channels);
                }
            });
        Ok(image)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.dimensions.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.dimensions.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.dimensions.channels
    }

    #[inline]
    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> u8 {
        debug_assert!(x < self.width() && y < self.height() && channel < self.channels());
        self.data[(y * self.width() + x) * self.channels() + channel]
    }

    /// One channel as an f32 plane.
    pub fn channel_plane(&self, channel: usize) -> Result<Plane> {
        if channel >= self.channels() {
            return Err(Error::invalid(format!(
                "channel {} out of range for a {}-channel image",
                channel,
                self.channels()
            )));
        }
        let channels = self.channels();
        let data = self
            .data
            .iter()
            .skip(channel)
            .step_by(channels)
            .map(|&v| v as f32)
            .collect();
        Ok(Plane::from_parts(self.width(), self.height(), data))
    }

    /// Luma plane using Rec.601 weights on RGB input; gray input is copied.
    pub fn luminance_plane(&self) -> Plane {
        if self.channels() == 1 {
            let data = self.data.iter().map(|&v| v as f32).collect();
            return Plane::from_parts(self.width(), self.height(), data);
        }
        let data = self
            .data
            .chunks_exact(3)
            .map(|px| 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
            .collect();
        Plane::from_parts(self.width(), self.height(), data)
    }
}

/// Single-channel f32 buffer used while estimating.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "plane must not be empty, got {width}x{height}"
            )));
        }
        if data.len() != width * height {
            return Err(Error::invalid(format!(
                "plane buffer holds {} values, {}x{} needs {}",
                data.len(),
                width,
                height,
                width * height
            )));
        }
        Ok(Self::from_parts(width, height, data))
    }

    pub(crate) fn from_parts(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
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
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Bilinear sample; `None` outside `[0, width-1] x [0, height-1]`.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> Option<f32> {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        if !(0.0..=max_x).contains(&x) || !(0.0..=max_y).contains(&y) {
            return None;
        }
        Some(self.sample_clamped(x, y))
    }

    fn sample_clamped(&self, x: f32, y: f32) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let top = self.get(x0, y0) * (1.0 - fx) + self.get(x1, y0) * fx;
        let bottom = self.get(x0, y1) * (1.0 - fx) + self.get(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Bilinear resize with pixel-center alignment.
    pub fn resized(&self, width: usize, height: usize) -> Result<Plane> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "resize target must not be empty, got {width}x{height}"
            )));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let scale_x = self.width as f32 / width as f32;
        let scale_y = self.height as f32 / height as f32;
        let mut data = vec![0.0f32; width * height];
        data.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            let src_y = (y as f32 + 0.5) * scale_y - 0.5;
            for (x, v) in row.iter_mut().enumerate() {
                let src_x = (x as f32 + 0.5) * scale_x - 0.5;
                *v = self.sample_clamped(src_x, src_y);
            }
        });
        Ok(Plane::from_parts(width, height, data))
    }

    /// Shrinks the plane so its width is at most `max_width`.
    ///
    /// Returns the plane and the applied ratio (`1.0` when already small
    /// enough; frames are never upsampled).
    pub fn downsampled_to_width(&self, max_width: usize) -> Result<(Plane, f32)> {
        if max_width == 0 {
            return Err(Error::invalid("downsample width must be positive"));
        }
        if self.width <= max_width {
            return Ok((self.clone(), 1.0));
        }
        let ratio = max_width as f32 / self.width as f32;
        let height = ((self.height as f32 * ratio).round() as usize).max(1);
        Ok((self.resized(max_width, height)?, ratio))
    }
}
