//! Toolpath command model
//!
//! A toolpath is an ordered sequence of [`ToolpathCommand`] values
//! describing pen motion in millimeters. The sequence invariant is that
//! every `Draw` sits inside a `PenDown`..`PenUp` bracket; the mode
//! generators and the vector extractor are responsible for upholding it
//! and the assembler's statistics replay depends on it.

use serde::{Deserialize, Serialize};

/// A 2D point in machine coordinates (millimeters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate in millimeters.
    pub x: f32,
    /// Y coordinate in millimeters.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One low-level motion or actuator command in a toolpath.
///
/// Coordinates are planar source coordinates in millimeters; the
/// renderer maps them to machine space (Cartesian X/Y or SCARA joint
/// angles) when the toolpath is turned into wire lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolpathCommand {
    /// Rapid move with the pen raised.
    Travel {
        /// Target X in millimeters.
        x: f32,
        /// Target Y in millimeters.
        y: f32,
    },
    /// Drawing move with the pen lowered.
    Draw {
        /// Target X in millimeters.
        x: f32,
        /// Target Y in millimeters.
        y: f32,
    },
    /// Raise the pen actuator.
    PenUp,
    /// Lower the pen actuator.
    PenDown,
    /// Hold position for the given number of seconds (stipple dots).
    Dwell {
        /// Dwell time in seconds.
        seconds: f32,
    },
    /// Pass-through directive emitted verbatim on the wire (setup and
    /// teardown codes, comments, arcs the command model does not
    /// represent).
    Raw(String),
}

impl ToolpathCommand {
    /// Target point of a motion command, if this command moves the pen.
    pub fn target(&self) -> Option<Point> {
        match self {
            Self::Travel { x, y } | Self::Draw { x, y } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_command_target() {
        assert_eq!(
            ToolpathCommand::Travel { x: 1.0, y: 2.0 }.target(),
            Some(Point::new(1.0, 2.0))
        );
        assert_eq!(ToolpathCommand::PenUp.target(), None);
        assert_eq!(ToolpathCommand::Raw("G21".into()).target(), None);
    }
}
