//! Conversion parameters
//!
//! A [`ConversionSettings`] value is immutable for the duration of one
//! conversion run and shared by the raster source, the mode generators,
//! and the toolpath assembler.

use crate::modes::ConversionMode;
use serde::{Deserialize, Serialize};

/// Parameters for one image or SVG conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Conversion strategy for raster input.
    pub mode: ConversionMode,
    /// Target drawing width in millimeters.
    pub target_width_mm: f32,
    /// Target drawing height in millimeters.
    pub target_height_mm: f32,
    /// Foreground threshold (0-255); pixels darker than this draw.
    pub threshold: u8,
    /// Spacing between scan lines in millimeters.
    pub line_spacing: f32,
    /// Drawing feed rate in mm/min.
    pub feed_rate: f32,
    /// Travel (pen up) speed in mm/min.
    pub travel_speed: f32,
    /// Pen actuator position when raised.
    pub pen_up_z: f32,
    /// Pen actuator position when lowered.
    pub pen_down_z: f32,
    /// Invert the image before thresholding.
    pub invert_image: bool,
    /// Collapse immediately repeated identical commands.
    pub optimize_path: bool,
    /// Maximum distance (mm) between consecutive points chained into
    /// one path by the vector-tracing mode.
    pub trace_resolution: f32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            mode: ConversionMode::RasterHorizontal,
            target_width_mm: 50.0,
            target_height_mm: 50.0,
            threshold: 128,
            line_spacing: 1.0,
            feed_rate: 800.0,
            travel_speed: 1500.0,
            pen_up_z: 5.0,
            pen_down_z: -1.0,
            invert_image: false,
            optimize_path: true,
            trace_resolution: 2.0,
        }
    }
}

impl ConversionSettings {
    /// Validate the settings before a conversion run.
    pub fn validate(&self) -> Result<(), String> {
        if self.target_width_mm <= 0.0 || self.target_height_mm <= 0.0 {
            return Err("target dimensions must be positive".to_string());
        }
        if self.line_spacing <= 0.0 {
            return Err("line spacing must be positive".to_string());
        }
        if self.feed_rate <= 0.0 || self.travel_speed <= 0.0 {
            return Err("feed rates must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        assert!(ConversionSettings::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let settings = ConversionSettings {
            target_width_mm: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_roundtrip_json() {
        let settings = ConversionSettings {
            mode: ConversionMode::Spiral,
            threshold: 64,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: ConversionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mode, ConversionMode::Spiral);
        assert_eq!(back.threshold, 64);
    }
}
