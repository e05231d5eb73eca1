//! Bridge to the `image` crate for decoding and encoding.

use std::path::Path;

use image_lib::{DynamicImage, GrayImage, RgbImage};

use super::Image;
use crate::error::{Error, Result};

impl Image {
    /// Decode an image file. Color inputs become RGB, everything else gray.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image_lib::open(path).map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dynamic(&decoded)
    }

    /// Encode to a file; the format follows the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.to_dynamic()?
            .save(path)
            .map_err(|source| Error::Image {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if image.color().has_color() {
            Self::new(width, height, 3, image.to_rgb8().into_raw())
        } else {
            Self::new(width, height, 1, image.to_luma8().into_raw())
        }
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let (width, height) = (self.width() as u32, self.height() as u32);
        let data = self.data().to_vec();
        let converted = match self.channels() {
            1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
            _ => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        };
        converted.ok_or_else(|| Error::invalid("sample buffer does not fit the image size"))
    }
}
