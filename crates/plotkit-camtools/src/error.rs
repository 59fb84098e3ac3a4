//! Error types for the CAM tools crate.
//!
//! Conversion failures split into hard input errors (undecodable
//! image/SVG, conversion aborts) and soft parse errors, which are
//! recovered with documented fallback defaults and never abort a run.

use std::io;
use thiserror::Error;

/// Errors that can occur during toolpath conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The input image could not be decoded.
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// The SVG document could not be read or contained no usable data.
    #[error("SVG input error: {0}")]
    SvgInput(String),

    /// Invalid conversion parameters were provided.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// I/O error while reading input files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<image::ImageError> for ConvertError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad(err.to_string())
    }
}

/// Result type alias for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::ImageLoad("truncated file".to_string());
        assert_eq!(err.to_string(), "Failed to load image: truncated file");

        let err = ConvertError::InvalidParameters("target width must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid parameters: target width must be positive"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ConvertError = io_err.into();
        assert!(matches!(err, ConvertError::Io(_)));
    }
}
