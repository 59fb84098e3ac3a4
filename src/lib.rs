//! # PlotKit
//!
//! Toolpath generation and command streaming for pen plotters, covering
//! both Cartesian gantries and two-link SCARA drawing arms.
//!
//! ## Architecture
//!
//! PlotKit is organized as a workspace with multiple crates:
//!
//! 1. **plotkit-core** - Core types: toolpath commands, errors
//! 2. **plotkit-camtools** - Image and SVG to toolpath conversion,
//!    SCARA kinematics, statistics
//! 3. **plotkit-communication** - Serial transport and the ack-paced
//!    command streamer
//! 4. **plotkit** - Command-line binary that integrates the crates

pub use plotkit_camtools::{
    convert_image_file, convert_svg_text, ConversionMode, ConversionOutput, ConversionSettings,
    MachineProfile, ScaraConfig, ToolpathStats,
};
pub use plotkit_communication::{
    list_ports, CommandStreamer, SerialTransport, StreamState, StreamerConfig,
};
pub use plotkit_core::{Error, Point, Result, ToolpathCommand};

use std::io::Write;
use std::path::Path;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Version string with the build date, shown by `plotkit --version`.
pub fn long_version() -> String {
    format!("{VERSION} (built {BUILD_DATE})")
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    // Rendered toolpath lines may go to stdout, so logs go to stderr.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Write rendered wire lines to a file, one per line.
pub fn write_lines<P: AsRef<Path>>(path: P, lines: &[String]) -> Result<()> {
    let mut file = std::fs::File::create(path.as_ref())?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(())
}

/// Read a wire-line job from a file.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.gcode");
        let lines = vec!["G21".to_string(), "G90".to_string(), "; done".to_string()];

        write_lines(&path, &lines).unwrap();
        assert_eq!(read_lines(&path).unwrap(), lines);
    }

    #[test]
    fn test_read_lines_missing_file_is_io_error() {
        let err = read_lines("/nonexistent/job.gcode").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_long_version_carries_build_date() {
        let version = long_version();
        assert!(version.starts_with(VERSION));
        assert!(version.contains(BUILD_DATE));
    }
}
