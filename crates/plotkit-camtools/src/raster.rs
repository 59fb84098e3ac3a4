//! Raster source
//!
//! Decodes an input image into a binary foreground grid. The image is
//! converted to 8-bit grayscale, downscaled to a working resolution,
//! optionally inverted, and thresholded once; the resulting grid is
//! never mutated afterwards.

use crate::error::{ConvertError, ConvertResult};
use crate::settings::ConversionSettings;
use image::DynamicImage;
use std::path::Path;

/// Long-edge working resolution in pixels. Input images are downscaled
/// to this size before thresholding so run detection cost is bounded by
/// the drawing size, not the source resolution.
const WORKING_RESOLUTION: u32 = 100;

/// A width x height grid of boolean foreground values.
#[derive(Debug, Clone)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl RasterImage {
    /// Decode an image file into a foreground grid.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        settings: &ConversionSettings,
    ) -> ConvertResult<Self> {
        let img = image::open(path.as_ref())
            .map_err(|e| ConvertError::ImageLoad(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(Self::from_image(&img, settings))
    }

    /// Build a foreground grid from a decoded image.
    pub fn from_image(img: &DynamicImage, settings: &ConversionSettings) -> Self {
        let mut gray = img.to_luma8();

        let (w, h) = (gray.width(), gray.height());
        if w.max(h) > WORKING_RESOLUTION {
            let (tw, th) = if w >= h {
                let th = ((h as f32 / w as f32) * WORKING_RESOLUTION as f32).round() as u32;
                (WORKING_RESOLUTION, th.max(1))
            } else {
                let tw = ((w as f32 / h as f32) * WORKING_RESOLUTION as f32).round() as u32;
                (tw.max(1), WORKING_RESOLUTION)
            };
            gray = image::imageops::resize(&gray, tw, th, image::imageops::FilterType::Lanczos3);
        }

        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let mut pixels = Vec::with_capacity(width * height);

        for y in 0..gray.height() {
            for x in 0..gray.width() {
                let mut value = gray.get_pixel(x, y).0[0];
                if settings.invert_image {
                    value = 255 - value;
                }
                pixels.push(value < settings.threshold);
            }
        }

        tracing::debug!(width, height, "raster source prepared");

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Build a grid directly from rows of booleans. Rows must all have
    /// the same length.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == width), "ragged rows");
        let pixels = rows.into_iter().flatten().collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Grid width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the pixel at (x, y) is foreground. Out-of-bounds
    /// coordinates are background.
    pub fn is_foreground(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[y * self.width + x]
    }

    /// Number of foreground pixels in the grid.
    pub fn foreground_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_threshold_split() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([10])); // dark -> foreground
        img.put_pixel(1, 0, Luma([250])); // light -> background
        let raster =
            RasterImage::from_image(&DynamicImage::ImageLuma8(img), &ConversionSettings::default());
        assert!(raster.is_foreground(0, 0));
        assert!(!raster.is_foreground(1, 0));
    }

    #[test]
    fn test_invert_flag() {
        let mut img = GrayImage::new(1, 1);
        img.put_pixel(0, 0, Luma([250]));
        let settings = ConversionSettings {
            invert_image: true,
            ..Default::default()
        };
        let raster = RasterImage::from_image(&DynamicImage::ImageLuma8(img), &settings);
        assert!(raster.is_foreground(0, 0));
    }

    #[test]
    fn test_downscale_to_working_resolution() {
        let img = GrayImage::new(400, 200);
        let raster =
            RasterImage::from_image(&DynamicImage::ImageLuma8(img), &ConversionSettings::default());
        assert_eq!(raster.width(), 100);
        assert_eq!(raster.height(), 50);
    }

    #[test]
    fn test_out_of_bounds_is_background() {
        let raster = RasterImage::from_rows(vec![vec![true]]);
        assert!(raster.is_foreground(0, 0));
        assert!(!raster.is_foreground(1, 0));
        assert!(!raster.is_foreground(0, 1));
    }
}
