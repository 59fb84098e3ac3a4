//! # PlotKit CAM Tools
//!
//! This crate converts raster images and a constrained SVG subset into
//! pen-plotter toolpaths.
//!
//! ## Pipeline
//!
//! - **Raster source**: decode an image into a binary foreground grid
//!   using a luminance threshold ([`raster`]).
//! - **Mode generators**: one conversion strategy per
//!   [`ConversionMode`] variant, all with the same `generate` contract
//!   ([`modes`]).
//! - **Vector extractor**: constrained SVG subset parser ([`svg`]).
//! - **Kinematics**: two-link planar SCARA inverse/forward kinematics
//!   ([`kinematics`]).
//! - **Toolpath assembler**: prologue/epilogue wrapping, statistics,
//!   path de-duplication, and wire-line rendering for Cartesian and
//!   SCARA machines ([`toolpath`]).

pub mod error;
pub mod kinematics;
pub mod modes;
pub mod raster;
pub mod settings;
pub mod svg;
pub mod toolpath;

pub use error::{ConvertError, ConvertResult};
pub use kinematics::{forward_kinematics, inverse_kinematics, JointAngles, ScaraConfig};
pub use modes::ConversionMode;
pub use raster::RasterImage;
pub use settings::ConversionSettings;
pub use svg::{parse_svg, SvgDocument, SvgPrimitive};
pub use toolpath::{
    convert_image_file, convert_svg_text, ConversionOutput, MachineProfile, StatsConfig,
    ToolpathStats,
};
