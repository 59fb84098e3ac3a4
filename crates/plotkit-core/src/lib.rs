//! # PlotKit Core
//!
//! Core types, traits, and utilities for PlotKit.
//! Provides the toolpath command model shared by the conversion tools
//! and the streaming layer, plus the common error taxonomy.

pub mod error;
pub mod toolpath;

pub use error::{Error, Result};
pub use toolpath::{Point, ToolpathCommand};
