//! Two-link planar (SCARA) kinematics
//!
//! Maps a Cartesian target point to the two joint angles of a
//! two-link drawing arm. The inverse solution always takes the
//! elbow-up branch; the mirrored solution is never produced. Angles
//! are reported in degrees.

use serde::{Deserialize, Serialize};

/// Geometry of a two-link drawing arm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaraConfig {
    /// Length of the first arm, shoulder to elbow, in millimeters.
    pub arm1_length: f64,
    /// Length of the second arm, elbow to pen, in millimeters.
    pub arm2_length: f64,
    /// X offset of the shoulder joint from the work origin.
    pub offset_x: f64,
    /// Y offset of the shoulder joint from the work origin.
    pub offset_y: f64,
}

impl Default for ScaraConfig {
    fn default() -> Self {
        Self {
            arm1_length: 240.0,
            arm2_length: 245.0,
            offset_x: 0.0,
            offset_y: 100.0,
        }
    }
}

impl ScaraConfig {
    /// Maximum reachable distance from the shoulder joint.
    pub fn max_reach(&self) -> f64 {
        self.arm1_length + self.arm2_length
    }

    /// Minimum reachable distance from the shoulder joint.
    pub fn min_reach(&self) -> f64 {
        (self.arm1_length - self.arm2_length).abs()
    }
}

/// A joint-space solution, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngles {
    /// Shoulder joint angle in degrees.
    pub shoulder_deg: f64,
    /// Elbow joint angle in degrees.
    pub elbow_deg: f64,
}

/// Compute joint angles that place the pen at `(x, y)`.
///
/// Returns `None` when the target lies outside the annulus
/// `[|L1 - L2|, L1 + L2]` around the shoulder; callers must skip or
/// substitute such points rather than emit a command.
pub fn inverse_kinematics(x: f64, y: f64, config: &ScaraConfig) -> Option<JointAngles> {
    let dx = x - config.offset_x;
    let dy = y - config.offset_y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance > config.max_reach() || distance < config.min_reach() {
        return None;
    }

    // Law of cosines, clamped to absorb floating error at the
    // workspace boundary.
    let cos_elbow = (dx * dx + dy * dy
        - config.arm1_length * config.arm1_length
        - config.arm2_length * config.arm2_length)
        / (2.0 * config.arm1_length * config.arm2_length);
    let cos_elbow = cos_elbow.clamp(-1.0, 1.0);

    // Elbow-up branch.
    let elbow = -cos_elbow.acos();

    let k1 = config.arm1_length + config.arm2_length * elbow.cos();
    let k2 = config.arm2_length * elbow.sin();
    let shoulder = dy.atan2(dx) - k2.atan2(k1);

    Some(JointAngles {
        shoulder_deg: shoulder.to_degrees(),
        elbow_deg: elbow.to_degrees(),
    })
}

/// Pen position for the given joint angles. Exact inverse of
/// [`inverse_kinematics`] for any reachable target, within floating
/// tolerance.
pub fn forward_kinematics(angles: &JointAngles, config: &ScaraConfig) -> (f64, f64) {
    let a1 = angles.shoulder_deg.to_radians();
    let a2 = angles.elbow_deg.to_radians();

    let x = config.arm1_length * a1.cos() + config.arm2_length * (a1 + a2).cos() + config.offset_x;
    let y = config.arm1_length * a1.sin() + config.arm2_length * (a1 + a2).sin() + config.offset_y;
    (x, y)
}

/// Whether `(x, y)` lies inside the arm's workspace.
pub fn is_reachable(x: f64, y: f64, config: &ScaraConfig) -> bool {
    inverse_kinematics(x, y, config).is_some()
}
