//! Toolpath assembler
//!
//! Wraps generated commands in a setup prologue and teardown epilogue,
//! de-duplicates redundant commands, replays the sequence to produce
//! statistics, and renders wire lines for either a Cartesian machine or
//! a two-link SCARA arm.

use crate::error::{ConvertError, ConvertResult};
use crate::kinematics::{inverse_kinematics, ScaraConfig};
use crate::raster::RasterImage;
use crate::settings::ConversionSettings;
use crate::svg::{parse_svg, primitives_to_toolpath, SvgOffsets};
use plotkit_core::{Point, ToolpathCommand};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target machine geometry for wire-line rendering.
#[derive(Debug, Clone)]
pub enum MachineProfile {
    /// Standard X/Y gantry; coordinates pass through unchanged.
    Cartesian,
    /// Two-link arm; coordinates are mapped to joint angles.
    Scara(ScaraConfig),
}

impl MachineProfile {
    fn svg_offsets(&self) -> SvgOffsets {
        match self {
            Self::Cartesian => SvgOffsets::default(),
            Self::Scara(config) => SvgOffsets {
                x: config.offset_x as f32,
                y: config.offset_y as f32,
            },
        }
    }
}

/// Time-model constants for the duration estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Seconds charged per pen raise or lower.
    pub pen_move_s: f32,
    /// Seconds of acceleration allowance charged per motion command.
    pub accel_allowance_s: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            pen_move_s: 0.3,
            accel_allowance_s: 0.05,
        }
    }
}

/// Aggregate statistics computed by replaying a toolpath.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolpathStats {
    /// Total pen-up distance in millimeters.
    pub travel_distance_mm: f32,
    /// Total pen-down distance in millimeters.
    pub draw_distance_mm: f32,
    /// Number of travel moves.
    pub travel_moves: usize,
    /// Number of drawing moves.
    pub draw_moves: usize,
    /// Number of pen raises plus lowers.
    pub pen_transitions: usize,
    /// Total dwell time in seconds.
    pub dwell_seconds: f32,
    /// Estimated job duration in seconds.
    pub estimated_seconds: f32,
}

impl ToolpathStats {
    /// Replay a command sequence from the origin and accumulate
    /// distances, counts, and a duration estimate. `Raw` entries carry
    /// no position, so arcs rendered as raw lines contribute nothing
    /// here.
    pub fn from_commands(
        commands: &[ToolpathCommand],
        settings: &ConversionSettings,
        config: &StatsConfig,
    ) -> Self {
        let mut stats = Self::default();
        let mut position = Point::default();

        for command in commands {
            match command {
                ToolpathCommand::Travel { .. } => {
                    let target = command.target().unwrap_or_default();
                    stats.travel_distance_mm += position.distance_to(&target);
                    stats.travel_moves += 1;
                    position = target;
                }
                ToolpathCommand::Draw { .. } => {
                    let target = command.target().unwrap_or_default();
                    stats.draw_distance_mm += position.distance_to(&target);
                    stats.draw_moves += 1;
                    position = target;
                }
                ToolpathCommand::PenUp | ToolpathCommand::PenDown => {
                    stats.pen_transitions += 1;
                }
                ToolpathCommand::Dwell { seconds } => {
                    stats.dwell_seconds += seconds;
                }
                ToolpathCommand::Raw(_) => {}
            }
        }

        let motion_moves = stats.travel_moves + stats.draw_moves;
        stats.estimated_seconds = stats.draw_distance_mm / settings.feed_rate * 60.0
            + stats.travel_distance_mm / settings.travel_speed * 60.0
            + stats.pen_transitions as f32 * config.pen_move_s
            + motion_moves as f32 * config.accel_allowance_s
            + stats.dwell_seconds;

        stats
    }
}

/// Wrap a command body in the standard setup and teardown sequence:
/// unlock, millimeter units, absolute positioning, feed-per-minute
/// mode, then pen up and a move home on both ends.
pub fn assemble(body: Vec<ToolpathCommand>, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let mut out = Vec::with_capacity(body.len() + 12);

    out.push(ToolpathCommand::Raw(format!(
        "; plotkit toolpath, {} mode",
        settings.mode
    )));
    out.push(ToolpathCommand::Raw("$X".to_string()));
    out.push(ToolpathCommand::Raw("G21".to_string()));
    out.push(ToolpathCommand::Raw("G90".to_string()));
    out.push(ToolpathCommand::Raw("G94".to_string()));
    out.push(ToolpathCommand::PenUp);
    out.push(ToolpathCommand::Travel { x: 0.0, y: 0.0 });

    let body = if settings.optimize_path {
        dedup_commands(body)
    } else {
        body
    };
    out.extend(body);

    out.push(ToolpathCommand::PenUp);
    out.push(ToolpathCommand::Travel { x: 0.0, y: 0.0 });
    out.push(ToolpathCommand::Raw("; end of toolpath".to_string()));

    out
}

/// Collapse immediately repeated identical commands. Consecutive
/// `PenUp PenUp` or two travels to the same point transmit nothing
/// useful; anything non-adjacent is left alone.
fn dedup_commands(commands: Vec<ToolpathCommand>) -> Vec<ToolpathCommand> {
    let mut out: Vec<ToolpathCommand> = Vec::with_capacity(commands.len());
    for command in commands {
        if out.last() == Some(&command) {
            continue;
        }
        out.push(command);
    }
    out
}

/// Render a toolpath to wire lines for the given machine.
///
/// Returns the lines and the number of motion targets skipped because
/// they were outside a SCARA arm's reach. Cartesian rendering never
/// skips.
pub fn render_lines(
    commands: &[ToolpathCommand],
    settings: &ConversionSettings,
    profile: &MachineProfile,
) -> (Vec<String>, usize) {
    let mut lines = Vec::with_capacity(commands.len());
    let mut skipped = 0usize;

    for command in commands {
        match command {
            ToolpathCommand::Travel { x, y } => match profile {
                MachineProfile::Cartesian => {
                    lines.push(format!("G0 X{x:.2} Y{y:.2}"));
                }
                MachineProfile::Scara(config) => {
                    match inverse_kinematics(*x as f64, *y as f64, config) {
                        Some(angles) => lines.push(format!(
                            "G0 A{:.3} B{:.3}",
                            angles.shoulder_deg, angles.elbow_deg
                        )),
                        None => {
                            skipped += 1;
                            tracing::warn!(x, y, "target outside arm reach, skipping");
                        }
                    }
                }
            },
            ToolpathCommand::Draw { x, y } => match profile {
                MachineProfile::Cartesian => {
                    lines.push(format!("G1 X{x:.2} Y{y:.2} F{:.0}", settings.feed_rate));
                }
                MachineProfile::Scara(config) => {
                    match inverse_kinematics(*x as f64, *y as f64, config) {
                        Some(angles) => lines.push(format!(
                            "G1 A{:.3} B{:.3} F{:.0}",
                            angles.shoulder_deg, angles.elbow_deg, settings.feed_rate
                        )),
                        None => {
                            skipped += 1;
                            tracing::warn!(x, y, "target outside arm reach, skipping");
                        }
                    }
                }
            },
            ToolpathCommand::PenUp => {
                lines.push(format!("G0 Z{:.2}", settings.pen_up_z));
            }
            ToolpathCommand::PenDown => {
                lines.push(format!("G0 Z{:.2}", settings.pen_down_z));
            }
            ToolpathCommand::Dwell { seconds } => {
                lines.push(format!("G4 P{seconds:.1}"));
            }
            ToolpathCommand::Raw(text) => {
                lines.push(text.clone());
            }
        }
    }

    (lines, skipped)
}

/// Result of one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The assembled command sequence.
    pub commands: Vec<ToolpathCommand>,
    /// Rendered wire lines ready for streaming.
    pub lines: Vec<String>,
    /// Replay statistics for the assembled sequence.
    pub stats: ToolpathStats,
    /// Motion targets dropped because the arm cannot reach them.
    pub skipped_unreachable: usize,
}

impl ConversionOutput {
    /// One-line human-readable summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "{} commands ({} draws, {} travels), {:.1} mm drawn, {:.1} mm travel, est {:.0} s",
            self.commands.len(),
            self.stats.draw_moves,
            self.stats.travel_moves,
            self.stats.draw_distance_mm,
            self.stats.travel_distance_mm,
            self.stats.estimated_seconds
        )
    }
}

/// Convert an image file to a toolpath using the configured mode.
pub fn convert_image_file<P: AsRef<Path>>(
    path: P,
    settings: &ConversionSettings,
    profile: &MachineProfile,
) -> ConvertResult<ConversionOutput> {
    settings
        .validate()
        .map_err(ConvertError::InvalidParameters)?;

    let image = RasterImage::from_file(path, settings)?;
    tracing::info!(
        mode = %settings.mode,
        foreground = image.foreground_count(),
        "converting raster image"
    );

    let body = settings.mode.generate(&image, settings);
    finish(body, settings, profile)
}

/// Convert SVG text to a toolpath.
pub fn convert_svg_text(
    content: &str,
    settings: &ConversionSettings,
    profile: &MachineProfile,
) -> ConvertResult<ConversionOutput> {
    settings
        .validate()
        .map_err(ConvertError::InvalidParameters)?;

    let doc = parse_svg(content);
    if doc.primitives.is_empty() {
        return Err(ConvertError::SvgInput(
            "no drawable primitives found".to_string(),
        ));
    }
    tracing::info!(primitives = doc.primitives.len(), "converting svg document");

    let body = primitives_to_toolpath(&doc, settings, profile.svg_offsets());
    finish(body, settings, profile)
}

fn finish(
    body: Vec<ToolpathCommand>,
    settings: &ConversionSettings,
    profile: &MachineProfile,
) -> ConvertResult<ConversionOutput> {
    let commands = assemble(body, settings);
    let stats = ToolpathStats::from_commands(&commands, settings, &StatsConfig::default());
    let (lines, skipped_unreachable) = render_lines(&commands, settings, profile);

    if skipped_unreachable > 0 {
        tracing::warn!(skipped_unreachable, "toolpath has unreachable targets");
    }

    Ok(ConversionOutput {
        commands,
        lines,
        stats,
        skipped_unreachable,
    })
}
