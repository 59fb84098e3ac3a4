//! Mode generators
//!
//! One conversion strategy per [`ConversionMode`] variant, all sharing
//! the contract `generate(&RasterImage, &ConversionSettings) ->
//! Vec<ToolpathCommand>`. Pixel coordinates scale to millimeters
//! independently per axis (`target_width / image_width`,
//! `target_height / image_height`); aspect ratio is not forced.
//!
//! Every drawn segment is emitted as a bracket: `Travel` to the start,
//! `PenDown`, one or more `Draw`, `PenUp`. A single isolated foreground
//! pixel produces a zero-length draw; that is intentional.

use crate::raster::RasterImage;
use crate::settings::ConversionSettings;
use plotkit_core::ToolpathCommand;
use serde::{Deserialize, Serialize};

/// Hard cap on contour length, guards against pathological shapes
/// sending the boundary trace into a loop.
const CONTOUR_POINT_CAP: usize = 1000;

/// Contours with this many points or fewer are discarded as noise.
const CONTOUR_MIN_POINTS: usize = 3;

/// Stipple sampling stride in pixels (both axes).
const STIPPLE_STRIDE: usize = 2;

/// Dwell time for one stipple dot in seconds.
const STIPPLE_DWELL_S: f32 = 0.1;

/// Angular step of the spiral sweep in degrees.
const SPIRAL_ANGLE_STEP_DEG: usize = 5;

/// Raster-to-toolpath conversion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Boustrophedon scan along horizontal lines.
    RasterHorizontal,
    /// Boustrophedon scan along vertical lines.
    RasterVertical,
    /// Scan along anti-diagonals for a shading effect.
    RasterDiagonal,
    /// Horizontal and vertical passes concatenated.
    Crosshatch,
    /// 4-neighborhood boundary trace of foreground regions.
    ContourFollowing,
    /// Stationary dots on a sparse sample grid.
    Stippling,
    /// Polar sweep from the image center outward, dashed arcs.
    Spiral,
    /// Coarse vectorization chaining nearby foreground pixels.
    VectorTracing,
}

impl std::fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RasterHorizontal => write!(f, "horizontal raster"),
            Self::RasterVertical => write!(f, "vertical raster"),
            Self::RasterDiagonal => write!(f, "diagonal raster"),
            Self::Crosshatch => write!(f, "crosshatch"),
            Self::ContourFollowing => write!(f, "contour following"),
            Self::Stippling => write!(f, "stippling"),
            Self::Spiral => write!(f, "spiral"),
            Self::VectorTracing => write!(f, "vector tracing"),
        }
    }
}

impl ConversionMode {
    /// Generate toolpath commands for this strategy.
    pub fn generate(
        &self,
        image: &RasterImage,
        settings: &ConversionSettings,
    ) -> Vec<ToolpathCommand> {
        match self {
            Self::RasterHorizontal => horizontal_raster(image, settings),
            Self::RasterVertical => vertical_raster(image, settings),
            Self::RasterDiagonal => diagonal_raster(image, settings),
            Self::Crosshatch => crosshatch(image, settings),
            Self::ContourFollowing => contour_following(image, settings),
            Self::Stippling => stippling(image, settings),
            Self::Spiral => spiral(image, settings),
            Self::VectorTracing => vector_tracing(image, settings),
        }
    }
}

/// Per-axis pixel-to-millimeter scale factors.
fn scales(image: &RasterImage, settings: &ConversionSettings) -> (f32, f32) {
    (
        settings.target_width_mm / image.width().max(1) as f32,
        settings.target_height_mm / image.height().max(1) as f32,
    )
}

/// Emit one Travel/PenDown/Draw/PenUp bracket for a straight segment.
fn emit_segment(out: &mut Vec<ToolpathCommand>, start: (f32, f32), end: (f32, f32)) {
    out.push(ToolpathCommand::Travel {
        x: start.0,
        y: start.1,
    });
    out.push(ToolpathCommand::PenDown);
    out.push(ToolpathCommand::Draw { x: end.0, y: end.1 });
    out.push(ToolpathCommand::PenUp);
}

/// Split a sorted-or-reversed list of pixel indices into maximal
/// contiguous runs. A run ends when the next index differs from the
/// current one by more than 1.
fn emit_runs(indices: &[usize], mut segment: impl FnMut(usize, usize)) {
    let mut start: Option<usize> = None;

    for (i, &idx) in indices.iter().enumerate() {
        let start_idx = *start.get_or_insert(idx);

        let is_last = i == indices.len() - 1;
        let has_gap = !is_last && indices[i + 1].abs_diff(idx) > 1;

        if is_last || has_gap {
            segment(start_idx, idx);
            start = None;
        }
    }
}

fn horizontal_raster(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);
    let step = ((settings.line_spacing / scale_y).round() as usize).max(1);

    let mut out = Vec::new();
    let mut y = 0;
    let mut line = 0usize;

    while y < image.height() {
        let left_to_right = line % 2 == 0;

        let mut columns: Vec<usize> = (0..image.width())
            .filter(|&x| image.is_foreground(x, y))
            .collect();
        if !left_to_right {
            columns.reverse();
        }

        let y_mm = y as f32 * scale_y;
        emit_runs(&columns, |start, end| {
            emit_segment(
                &mut out,
                (start as f32 * scale_x, y_mm),
                (end as f32 * scale_x, y_mm),
            );
        });

        y += step;
        line += 1;
    }

    out
}

fn vertical_raster(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);
    let step = ((settings.line_spacing / scale_x).round() as usize).max(1);

    let mut out = Vec::new();
    let mut x = 0;
    let mut line = 0usize;

    while x < image.width() {
        let top_to_bottom = line % 2 == 0;

        let mut rows: Vec<usize> = (0..image.height())
            .filter(|&y| image.is_foreground(x, y))
            .collect();
        if !top_to_bottom {
            rows.reverse();
        }

        let x_mm = x as f32 * scale_x;
        emit_runs(&rows, |start, end| {
            emit_segment(
                &mut out,
                (x_mm, start as f32 * scale_y),
                (x_mm, end as f32 * scale_y),
            );
        });

        x += step;
        line += 1;
    }

    out
}

fn diagonal_raster(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);
    let spacing = ((settings.line_spacing / scale_x.min(scale_y)) as usize).max(2);

    let mut out = Vec::new();

    // Anti-diagonals of constant x + y.
    let mut diagonal = 0;
    while diagonal < image.width() + image.height() {
        let mut points: Vec<(usize, usize)> = Vec::new();
        for x in 0..image.width() {
            if let Some(y) = diagonal.checked_sub(x) {
                if y < image.height() && image.is_foreground(x, y) {
                    points.push((x, y));
                }
            }
        }

        let mut start: Option<(usize, usize)> = None;
        for (i, &(x, y)) in points.iter().enumerate() {
            let (sx, sy) = *start.get_or_insert((x, y));

            let is_last = i == points.len() - 1;
            let has_gap = !is_last && {
                let (nx, ny) = points[i + 1];
                nx.abs_diff(x) > 1 || ny.abs_diff(y) > 1
            };

            if is_last || has_gap {
                emit_segment(
                    &mut out,
                    (sx as f32 * scale_x, sy as f32 * scale_y),
                    (x as f32 * scale_x, y as f32 * scale_y),
                );
                start = None;
            }
        }

        diagonal += spacing;
    }

    out
}

/// Two full passes over the same image; overlapping strokes are not
/// merged or de-duplicated.
fn crosshatch(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let mut out = horizontal_raster(image, settings);
    out.extend(vertical_raster(image, settings));
    out
}

fn contour_following(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);
    let mut visited = vec![false; image.width() * image.height()];
    let mut out = Vec::new();

    for y in 0..image.height() {
        for x in 0..image.width() {
            if image.is_foreground(x, y) && !visited[y * image.width() + x] {
                let contour = trace_contour(image, x, y, &mut visited);
                if contour.len() > CONTOUR_MIN_POINTS {
                    let first = contour[0];
                    out.push(ToolpathCommand::Travel {
                        x: first.0 as f32 * scale_x,
                        y: first.1 as f32 * scale_y,
                    });
                    out.push(ToolpathCommand::PenDown);
                    for &(px, py) in &contour[1..] {
                        out.push(ToolpathCommand::Draw {
                            x: px as f32 * scale_x,
                            y: py as f32 * scale_y,
                        });
                    }
                    // Close the contour.
                    out.push(ToolpathCommand::Draw {
                        x: first.0 as f32 * scale_x,
                        y: first.1 as f32 * scale_y,
                    });
                    out.push(ToolpathCommand::PenUp);
                }
            }
        }
    }

    out
}

/// Follow the first unvisited foreground neighbor in priority order
/// up, right, down, left until none remains or the point cap is hit.
fn trace_contour(
    image: &RasterImage,
    start_x: usize,
    start_y: usize,
    visited: &mut [bool],
) -> Vec<(usize, usize)> {
    const NEIGHBORS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

    let mut contour = Vec::new();
    let (mut x, mut y) = (start_x, start_y);

    loop {
        contour.push((x, y));
        visited[y * image.width() + x] = true;

        if contour.len() >= CONTOUR_POINT_CAP {
            break;
        }

        let mut advanced = false;
        for (dx, dy) in NEIGHBORS {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            let (nx, ny) = (nx as usize, ny as usize);
            if image.is_foreground(nx, ny) && !visited[ny * image.width() + nx] {
                x = nx;
                y = ny;
                advanced = true;
                break;
            }
        }

        if !advanced {
            break;
        }
    }

    contour
}

fn stippling(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);
    let mut out = Vec::new();

    for y in (0..image.height()).step_by(STIPPLE_STRIDE) {
        for x in (0..image.width()).step_by(STIPPLE_STRIDE) {
            if image.is_foreground(x, y) {
                out.push(ToolpathCommand::Travel {
                    x: x as f32 * scale_x,
                    y: y as f32 * scale_y,
                });
                out.push(ToolpathCommand::PenDown);
                out.push(ToolpathCommand::Dwell {
                    seconds: STIPPLE_DWELL_S,
                });
                out.push(ToolpathCommand::PenUp);
            }
        }
    }

    out
}

/// Polar sweep over the image, radius growing one pixel per ring. The
/// pen drops exactly when a sampled point enters foreground and lifts
/// on the reverse transition, producing dashed arcs that follow spiral
/// order rather than raster order.
fn spiral(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);
    let center_x = image.width() / 2;
    let center_y = image.height() / 2;
    let max_radius = center_x.min(center_y);

    let mut out = Vec::new();
    let mut pen_down = false;

    for r in 1..max_radius {
        for angle in (0..360).step_by(SPIRAL_ANGLE_STEP_DEG) {
            let rad = (angle as f32).to_radians();
            let x = center_x as f32 + r as f32 * rad.cos();
            let y = center_y as f32 + r as f32 * rad.sin();
            if x < 0.0 || y < 0.0 {
                continue;
            }
            let (px, py) = (x as usize, y as usize);
            if px >= image.width() || py >= image.height() {
                continue;
            }

            let foreground = image.is_foreground(px, py);
            let x_mm = px as f32 * scale_x;
            let y_mm = py as f32 * scale_y;

            if foreground && !pen_down {
                out.push(ToolpathCommand::Travel { x: x_mm, y: y_mm });
                out.push(ToolpathCommand::PenDown);
                pen_down = true;
            } else if !foreground && pen_down {
                out.push(ToolpathCommand::PenUp);
                pen_down = false;
            }

            if foreground {
                out.push(ToolpathCommand::Draw { x: x_mm, y: y_mm });
            }
        }
    }

    if pen_down {
        out.push(ToolpathCommand::PenUp);
    }

    out
}

/// Coarse vectorization: all foreground pixels in raster order, chained
/// into polylines while consecutive points lie within the trace
/// resolution of each other. A gap starts a new path.
fn vector_tracing(image: &RasterImage, settings: &ConversionSettings) -> Vec<ToolpathCommand> {
    let (scale_x, scale_y) = scales(image, settings);

    let points: Vec<(f32, f32)> = (0..image.height())
        .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
        .filter(|&(x, y)| image.is_foreground(x, y))
        .map(|(x, y)| (x as f32 * scale_x, y as f32 * scale_y))
        .collect();

    let mut out = Vec::new();
    let mut path_open = false;
    let mut previous: Option<(f32, f32)> = None;

    for point in points {
        let chained = previous.is_some_and(|(px, py)| {
            let dx = point.0 - px;
            let dy = point.1 - py;
            (dx * dx + dy * dy).sqrt() <= settings.trace_resolution
        });

        if !chained {
            if path_open {
                out.push(ToolpathCommand::PenUp);
            }
            out.push(ToolpathCommand::Travel {
                x: point.0,
                y: point.1,
            });
            out.push(ToolpathCommand::PenDown);
            path_open = true;
        }
        out.push(ToolpathCommand::Draw {
            x: point.0,
            y: point.1,
        });
        previous = Some(point);
    }

    if path_open {
        out.push(ToolpathCommand::PenUp);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> RasterImage {
        RasterImage::from_rows(
            rows.iter()
                .map(|r| r.chars().map(|c| c == '#').collect())
                .collect(),
        )
    }

    fn unit_scale_settings(mode: ConversionMode, size: f32) -> ConversionSettings {
        ConversionSettings {
            mode,
            target_width_mm: size,
            target_height_mm: size,
            line_spacing: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_emit_runs_detects_gaps() {
        let mut segments = Vec::new();
        emit_runs(&[2, 3, 4, 7, 8, 11], |s, e| segments.push((s, e)));
        assert_eq!(segments, vec![(2, 4), (7, 8), (11, 11)]);
    }

    #[test]
    fn test_emit_runs_reversed_direction() {
        let mut segments = Vec::new();
        emit_runs(&[8, 7, 4, 3, 2], |s, e| segments.push((s, e)));
        assert_eq!(segments, vec![(8, 7), (4, 2)]);
    }

    #[test]
    fn test_horizontal_single_run() {
        // 10x10 grid, one run on row 4 at columns 2-7, 1 mm per pixel.
        // Row 4 is an even scan line, so the pass runs left to right.
        let mut rows = vec![vec![false; 10]; 10];
        for x in 2..=7 {
            rows[4][x] = true;
        }
        let image = RasterImage::from_rows(rows);
        let settings = unit_scale_settings(ConversionMode::RasterHorizontal, 10.0);

        let commands = ConversionMode::RasterHorizontal.generate(&image, &settings);
        assert_eq!(
            commands,
            vec![
                ToolpathCommand::Travel { x: 2.0, y: 4.0 },
                ToolpathCommand::PenDown,
                ToolpathCommand::Draw { x: 7.0, y: 4.0 },
                ToolpathCommand::PenUp,
            ]
        );
    }

    #[test]
    fn test_horizontal_odd_line_scans_right_to_left() {
        // The same run moved to row 5, an odd scan line, so the pass
        // runs right to left and the bracket is reversed.
        let mut rows = vec![vec![false; 10]; 10];
        for x in 2..=7 {
            rows[5][x] = true;
        }
        let image = RasterImage::from_rows(rows);
        let settings = unit_scale_settings(ConversionMode::RasterHorizontal, 10.0);

        let commands = ConversionMode::RasterHorizontal.generate(&image, &settings);
        assert_eq!(
            commands,
            vec![
                ToolpathCommand::Travel { x: 7.0, y: 5.0 },
                ToolpathCommand::PenDown,
                ToolpathCommand::Draw { x: 2.0, y: 5.0 },
                ToolpathCommand::PenUp,
            ]
        );
    }

    #[test]
    fn test_isolated_pixel_zero_length_draw() {
        let image = grid(&["...", ".#.", "..."]);
        let settings = unit_scale_settings(ConversionMode::RasterHorizontal, 3.0);
        let commands = ConversionMode::RasterHorizontal.generate(&image, &settings);
        assert_eq!(
            commands,
            vec![
                ToolpathCommand::Travel { x: 1.0, y: 1.0 },
                ToolpathCommand::PenDown,
                ToolpathCommand::Draw { x: 1.0, y: 1.0 },
                ToolpathCommand::PenUp,
            ]
        );
    }

    #[test]
    fn test_crosshatch_concatenates_passes() {
        let image = grid(&["##", "##"]);
        let settings = unit_scale_settings(ConversionMode::Crosshatch, 2.0);
        let horizontal = ConversionMode::RasterHorizontal.generate(&image, &settings);
        let vertical = ConversionMode::RasterVertical.generate(&image, &settings);
        let cross = ConversionMode::Crosshatch.generate(&image, &settings);
        assert_eq!(cross.len(), horizontal.len() + vertical.len());
        assert_eq!(&cross[..horizontal.len()], horizontal.as_slice());
    }

    #[test]
    fn test_contour_discards_noise() {
        // Three isolated pixels: contours of 1 point each, all noise.
        let image = grid(&["#.#", "...", "#.."]);
        let settings = unit_scale_settings(ConversionMode::ContourFollowing, 3.0);
        let commands = ConversionMode::ContourFollowing.generate(&image, &settings);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_contour_closes_loop() {
        let image = grid(&["###", "#.#", "###"]);
        let settings = unit_scale_settings(ConversionMode::ContourFollowing, 3.0);
        let commands = ConversionMode::ContourFollowing.generate(&image, &settings);

        // The trace visits all 8 boundary pixels and closes on the
        // first point.
        assert_eq!(commands[0], ToolpathCommand::Travel { x: 0.0, y: 0.0 });
        assert_eq!(commands[1], ToolpathCommand::PenDown);
        assert_eq!(
            commands[commands.len() - 2],
            ToolpathCommand::Draw { x: 0.0, y: 0.0 }
        );
        assert_eq!(*commands.last().unwrap(), ToolpathCommand::PenUp);
    }

    #[test]
    fn test_stippling_dots() {
        let image = grid(&["#.#.", "....", "#...", "...."]);
        let settings = unit_scale_settings(ConversionMode::Stippling, 4.0);
        let commands = ConversionMode::Stippling.generate(&image, &settings);

        // Three samples on the stride-2 grid are foreground.
        let dwells = commands
            .iter()
            .filter(|c| matches!(c, ToolpathCommand::Dwell { .. }))
            .count();
        assert_eq!(dwells, 3);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, ToolpathCommand::Draw { .. })));
    }

    #[test]
    fn test_vector_tracing_splits_on_gap() {
        // Two clusters far enough apart to break the chain.
        let mut rows = vec![vec![false; 20]; 1];
        rows[0][0] = true;
        rows[0][1] = true;
        rows[0][15] = true;
        let image = RasterImage::from_rows(rows);
        let settings = ConversionSettings {
            target_width_mm: 20.0,
            target_height_mm: 1.0,
            trace_resolution: 2.0,
            ..Default::default()
        };
        let commands = ConversionMode::VectorTracing.generate(&image, &settings);

        let travels = commands
            .iter()
            .filter(|c| matches!(c, ToolpathCommand::Travel { .. }))
            .count();
        assert_eq!(travels, 2);
    }

    #[test]
    fn test_all_modes_keep_draw_inside_brackets() {
        let image = grid(&[
            "########",
            "#......#",
            "#.####.#",
            "#.####.#",
            "#.####.#",
            "#.####.#",
            "#......#",
            "########",
        ]);

        for mode in [
            ConversionMode::RasterHorizontal,
            ConversionMode::RasterVertical,
            ConversionMode::RasterDiagonal,
            ConversionMode::Crosshatch,
            ConversionMode::ContourFollowing,
            ConversionMode::Stippling,
            ConversionMode::Spiral,
            ConversionMode::VectorTracing,
        ] {
            let settings = unit_scale_settings(mode, 8.0);
            let commands = mode.generate(&image, &settings);

            let mut pen_down = false;
            for cmd in &commands {
                match cmd {
                    ToolpathCommand::PenDown => pen_down = true,
                    ToolpathCommand::PenUp => pen_down = false,
                    ToolpathCommand::Draw { .. } => {
                        assert!(pen_down, "{mode}: Draw outside a pen-down bracket")
                    }
                    ToolpathCommand::Travel { .. } => {
                        assert!(!pen_down, "{mode}: Travel while pen is down")
                    }
                    _ => {}
                }
            }
            assert!(!pen_down, "{mode}: pen left down at end of toolpath");
        }
    }
}
