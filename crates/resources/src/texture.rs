//! Bitmap texture loading.
//!
//! Textures are decoded with the `image` crate and expanded to row-major
//! RGBA `f32` pixels in [0, 1], the layout the sampled-image upload path
//! consumes. Source channels fill the RGBA slots in order; slots the file
//! does not provide default to opaque black (color 0, alpha 1).

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::ResourceResult;

/// Channels per pixel in the expanded representation.
pub const CHANNELS: usize = 4;

/// A decoded texture: row-major RGBA `f32` pixels.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
}

impl Texture {
    /// Loads and decodes a texture from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn load(path: &Path) -> ResourceResult<Self> {
        let image = image::open(path)?;
        let texture = Self::from_image(&image);
        debug!(
            "Loaded texture from {:?}: {}x{}",
            path, texture.width, texture.height
        );
        Ok(texture)
    }

    /// Expands a decoded image to RGBA `f32`.
    ///
    /// Sample values are normalized by their type's maximum, so 8-bit,
    /// 16-bit and float images all land in [0, 1].
    pub fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();

        let pixels = match image {
            DynamicImage::ImageLuma8(buffer) => expand_to_rgba(buffer.as_raw(), 1, u8::MAX as f32),
            DynamicImage::ImageLumaA8(buffer) => expand_to_rgba(buffer.as_raw(), 2, u8::MAX as f32),
            DynamicImage::ImageRgb8(buffer) => expand_to_rgba(buffer.as_raw(), 3, u8::MAX as f32),
            DynamicImage::ImageRgba8(buffer) => expand_to_rgba(buffer.as_raw(), 4, u8::MAX as f32),
            DynamicImage::ImageLuma16(buffer) => {
                expand_to_rgba(buffer.as_raw(), 1, u16::MAX as f32)
            }
            DynamicImage::ImageLumaA16(buffer) => {
                expand_to_rgba(buffer.as_raw(), 2, u16::MAX as f32)
            }
            DynamicImage::ImageRgb16(buffer) => expand_to_rgba(buffer.as_raw(), 3, u16::MAX as f32),
            DynamicImage::ImageRgba16(buffer) => {
                expand_to_rgba(buffer.as_raw(), 4, u16::MAX as f32)
            }
            DynamicImage::ImageRgb32F(buffer) => expand_to_rgba(buffer.as_raw(), 3, 1.0),
            DynamicImage::ImageRgba32F(buffer) => expand_to_rgba(buffer.as_raw(), 4, 1.0),
            // DynamicImage is non-exhaustive; normalize anything else to 8-bit RGBA first
            other => expand_to_rgba(other.to_rgba8().as_raw(), 4, u8::MAX as f32),
        };

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Creates a single-color texture.
    ///
    /// Used as the built-in default when a drawable has no texture file.
    pub fn solid(width: u32, height: u32, color: [f32; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(pixel_count * CHANNELS);
        for _ in 0..pixel_count {
            pixels.extend_from_slice(&color);
        }

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Returns the texture width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the texture height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel data: `width * height * 4` floats, row-major.
    #[inline]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }
}

/// Expands `channels`-per-pixel samples to RGBA floats.
///
/// Each pixel starts as opaque black `[0, 0, 0, 1]`; the source channels
/// overwrite the leading slots after normalization by `scale`.
fn expand_to_rgba<S>(samples: &[S], channels: usize, scale: f32) -> Vec<f32>
where
    S: Copy + Into<f32>,
{
    let mut pixels = Vec::with_capacity(samples.len() / channels * CHANNELS);

    for chunk in samples.chunks_exact(channels) {
        let mut rgba = [0.0, 0.0, 0.0, 1.0];
        for (slot, &sample) in rgba.iter_mut().zip(chunk) {
            *slot = sample.into() / scale;
        }
        pixels.extend_from_slice(&rgba);
    }

    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage, RgbaImage};

    #[test]
    fn test_solid_fill() {
        let texture = Texture::solid(2, 2, [0.2, 0.4, 0.6, 1.0]);

        assert_eq!(texture.width(), 2);
        assert_eq!(texture.height(), 2);
        assert_eq!(texture.pixels().len(), 2 * 2 * CHANNELS);
        assert_eq!(&texture.pixels()[0..4], &[0.2, 0.4, 0.6, 1.0]);
        assert_eq!(&texture.pixels()[12..16], &[0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn test_grayscale_expansion() {
        let gray = GrayImage::from_raw(2, 1, vec![255, 0]).unwrap();
        let texture = Texture::from_image(&DynamicImage::ImageLuma8(gray));

        // Single channel fills the red slot, the rest is opaque black
        assert_eq!(&texture.pixels()[0..4], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(&texture.pixels()[4..8], &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rgb_gets_opaque_alpha() {
        let rgb = RgbImage::from_raw(1, 1, vec![255, 0, 255]).unwrap();
        let texture = Texture::from_image(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(texture.pixels(), &[1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rgba_is_normalized() {
        let rgba = RgbaImage::from_raw(1, 1, vec![51, 102, 153, 204]).unwrap();
        let texture = Texture::from_image(&DynamicImage::ImageRgba8(rgba));

        assert_eq!(texture.pixels(), &[0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn test_row_major_order() {
        // 1x2 image: top pixel then bottom pixel
        let gray = GrayImage::from_raw(1, 2, vec![255, 0]).unwrap();
        let texture = Texture::from_image(&DynamicImage::ImageLuma8(gray));

        assert_eq!(texture.width(), 1);
        assert_eq!(texture.height(), 2);
        assert_eq!(&texture.pixels()[0..4], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(&texture.pixels()[4..8], &[0.0, 0.0, 0.0, 1.0]);
    }
}
