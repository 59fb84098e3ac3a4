//! Vector extractor
//!
//! Parses a constrained SVG subset into geometric primitives:
//! `path` data restricted to absolute/relative moveto, lineto, and
//! close, plus `line`, `rect`, and `circle` elements. Elements and
//! path commands outside the subset are silently ignored; that is a
//! known limitation of the subset, not a defect.
//!
//! Attribute scraping is regex based and order sensitive, matching the
//! attribute order emitted by common drawing tools. Malformed numeric
//! attributes skip the affected element without aborting the parse.

use crate::settings::ConversionSettings;
use plotkit_core::ToolpathCommand;
use regex::Regex;
use std::sync::OnceLock;

/// One command of a constrained SVG path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Moveto; lifts the pen.
    MoveTo {
        /// Target X in SVG units.
        x: f32,
        /// Target Y in SVG units.
        y: f32,
        /// Whether the coordinates are relative to the current point.
        relative: bool,
    },
    /// Lineto; draws.
    LineTo {
        /// Target X in SVG units.
        x: f32,
        /// Target Y in SVG units.
        y: f32,
        /// Whether the coordinates are relative to the current point.
        relative: bool,
    },
    /// Close the subpath; lifts the pen.
    Close,
}

/// A geometric primitive extracted from an SVG document.
#[derive(Debug, Clone, PartialEq)]
pub enum SvgPrimitive {
    /// A polyline path of moveto/lineto/close commands.
    Path(Vec<PathCommand>),
    /// A straight line segment.
    Line {
        /// Start X in SVG units.
        x1: f32,
        /// Start Y in SVG units.
        y1: f32,
        /// End X in SVG units.
        x2: f32,
        /// End Y in SVG units.
        y2: f32,
    },
    /// An axis-aligned rectangle.
    Rect {
        /// Top-left X in SVG units.
        x: f32,
        /// Top-left Y in SVG units.
        y: f32,
        /// Width in SVG units.
        width: f32,
        /// Height in SVG units.
        height: f32,
    },
    /// A circle, emitted as a single full-circle arc on the wire.
    Circle {
        /// Center X in SVG units.
        cx: f32,
        /// Center Y in SVG units.
        cy: f32,
        /// Radius in SVG units.
        r: f32,
    },
}

/// An extracted SVG document: source dimensions and primitives.
#[derive(Debug, Clone)]
pub struct SvgDocument {
    /// Source width in SVG units.
    pub width: f32,
    /// Source height in SVG units.
    pub height: f32,
    /// Primitives in document order.
    pub primitives: Vec<SvgPrimitive>,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Parse an SVG document into dimensions and primitives.
///
/// The `viewBox` attribute establishes source units when present;
/// otherwise `width`/`height` are used, and 100x100 is the fallback
/// when neither parses.
pub fn parse_svg(content: &str) -> SvgDocument {
    let (width, height) = extract_dimensions(content);
    let mut primitives = Vec::new();

    extract_paths(content, &mut primitives);
    extract_lines(content, &mut primitives);
    extract_rects(content, &mut primitives);
    extract_circles(content, &mut primitives);

    tracing::debug!(
        width,
        height,
        primitives = primitives.len(),
        "svg document extracted"
    );

    SvgDocument {
        width,
        height,
        primitives,
    }
}

fn extract_dimensions(content: &str) -> (f32, f32) {
    static VIEWBOX: OnceLock<Regex> = OnceLock::new();
    let viewbox = regex(&VIEWBOX, r#"viewBox=["']([^"']*)["']"#);

    if let Some(caps) = viewbox.captures(content) {
        let values: Vec<&str> = caps[1].split_whitespace().collect();
        if values.len() >= 4 {
            if let (Ok(w), Ok(h)) = (values[2].parse::<f32>(), values[3].parse::<f32>()) {
                if w > 0.0 && h > 0.0 {
                    return (w, h);
                }
            }
        }
    }

    static WIDTH: OnceLock<Regex> = OnceLock::new();
    static HEIGHT: OnceLock<Regex> = OnceLock::new();
    let width_attr = regex(&WIDTH, r#"width=["']([^"']*)["']"#);
    let height_attr = regex(&HEIGHT, r#"height=["']([^"']*)["']"#);

    let parse_dimension = |re: &Regex| -> Option<f32> {
        let raw = re.captures(content)?.get(1)?.as_str().to_string();
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        digits.parse::<f32>().ok().filter(|v| *v > 0.0)
    };

    match (parse_dimension(width_attr), parse_dimension(height_attr)) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            tracing::warn!("svg dimensions missing or unparseable, falling back to 100x100");
            (100.0, 100.0)
        }
    }
}

fn extract_paths(content: &str, primitives: &mut Vec<SvgPrimitive>) {
    static PATH: OnceLock<Regex> = OnceLock::new();
    let path = regex(&PATH, r#"<path[^>]*\bd=["']([^"']*)["']"#);

    for caps in path.captures_iter(content) {
        let commands = parse_path_data(&caps[1]);
        if !commands.is_empty() {
            primitives.push(SvgPrimitive::Path(commands));
        }
    }
}

/// Tokenize path data and keep the M/L/Z subset. Tokens that are not a
/// supported command, or coordinate pairs that fail to parse, are
/// skipped.
fn parse_path_data(data: &str) -> Vec<PathCommand> {
    let normalized = data.replace(',', " ");
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut commands = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            cmd @ ("M" | "m" | "L" | "l") => {
                if i + 2 < tokens.len() {
                    if let (Ok(x), Ok(y)) =
                        (tokens[i + 1].parse::<f32>(), tokens[i + 2].parse::<f32>())
                    {
                        let relative = cmd.chars().next().is_some_and(|c| c.is_lowercase());
                        commands.push(if cmd.eq_ignore_ascii_case("M") {
                            PathCommand::MoveTo { x, y, relative }
                        } else {
                            PathCommand::LineTo { x, y, relative }
                        });
                        i += 2;
                    }
                }
            }
            "Z" | "z" => commands.push(PathCommand::Close),
            _ => {}
        }
        i += 1;
    }

    commands
}

fn extract_lines(content: &str, primitives: &mut Vec<SvgPrimitive>) {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line = regex(
        &LINE,
        r#"<line[^>]*x1=["']([^"']*)["'][^>]*y1=["']([^"']*)["'][^>]*x2=["']([^"']*)["'][^>]*y2=["']([^"']*)["']"#,
    );

    for caps in line.captures_iter(content) {
        if let (Ok(x1), Ok(y1), Ok(x2), Ok(y2)) = (
            caps[1].parse(),
            caps[2].parse(),
            caps[3].parse(),
            caps[4].parse(),
        ) {
            primitives.push(SvgPrimitive::Line { x1, y1, x2, y2 });
        }
    }
}

fn extract_rects(content: &str, primitives: &mut Vec<SvgPrimitive>) {
    static RECT: OnceLock<Regex> = OnceLock::new();
    let rect = regex(
        &RECT,
        r#"<rect[^>]*\bx=["']([^"']*)["'][^>]*\by=["']([^"']*)["'][^>]*width=["']([^"']*)["'][^>]*height=["']([^"']*)["']"#,
    );

    for caps in rect.captures_iter(content) {
        if let (Ok(x), Ok(y), Ok(width), Ok(height)) = (
            caps[1].parse(),
            caps[2].parse(),
            caps[3].parse(),
            caps[4].parse(),
        ) {
            primitives.push(SvgPrimitive::Rect {
                x,
                y,
                width,
                height,
            });
        }
    }
}

fn extract_circles(content: &str, primitives: &mut Vec<SvgPrimitive>) {
    static CIRCLE: OnceLock<Regex> = OnceLock::new();
    let circle = regex(
        &CIRCLE,
        r#"<circle[^>]*cx=["']([^"']*)["'][^>]*cy=["']([^"']*)["'][^>]*\br=["']([^"']*)["']"#,
    );

    for caps in circle.captures_iter(content) {
        if let (Ok(cx), Ok(cy), Ok(r)) = (caps[1].parse(), caps[2].parse(), caps[3].parse()) {
            primitives.push(SvgPrimitive::Circle { cx, cy, r });
        }
    }
}

/// Offsets applied after scaling, zero for Cartesian machines and the
/// shoulder offset when SCARA mode is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgOffsets {
    /// X offset in millimeters.
    pub x: f32,
    /// Y offset in millimeters.
    pub y: f32,
}

/// Convert extracted primitives to toolpath commands.
///
/// The scale is uniform, `min(target_w / svg_w, target_h / svg_h)`, so
/// aspect ratio is preserved. SVG's Y axis points down while the
/// machine's points up, so every Y is flipped against the scaled
/// document height.
pub fn primitives_to_toolpath(
    doc: &SvgDocument,
    settings: &ConversionSettings,
    offsets: SvgOffsets,
) -> Vec<ToolpathCommand> {
    let scale = (settings.target_width_mm / doc.width).min(settings.target_height_mm / doc.height);
    let svg_height_mm = doc.height * scale;

    let transform = |x: f32, y: f32| -> (f32, f32) {
        (x * scale + offsets.x, svg_height_mm - y * scale + offsets.y)
    };

    let mut out = Vec::new();

    for primitive in &doc.primitives {
        match primitive {
            SvgPrimitive::Path(commands) => {
                path_to_toolpath(commands, scale, &transform, &mut out);
            }
            SvgPrimitive::Line { x1, y1, x2, y2 } => {
                let start = transform(*x1, *y1);
                let end = transform(*x2, *y2);
                out.push(ToolpathCommand::Travel {
                    x: start.0,
                    y: start.1,
                });
                out.push(ToolpathCommand::PenDown);
                out.push(ToolpathCommand::Draw { x: end.0, y: end.1 });
                out.push(ToolpathCommand::PenUp);
            }
            SvgPrimitive::Rect {
                x,
                y,
                width,
                height,
            } => {
                let (mx, my) = transform(*x, *y);
                let w = width * scale;
                let h = height * scale;
                out.push(ToolpathCommand::Travel { x: mx, y: my });
                out.push(ToolpathCommand::PenDown);
                out.push(ToolpathCommand::Draw { x: mx + w, y: my });
                out.push(ToolpathCommand::Draw {
                    x: mx + w,
                    y: my - h,
                });
                out.push(ToolpathCommand::Draw { x: mx, y: my - h });
                out.push(ToolpathCommand::Draw { x: mx, y: my });
                out.push(ToolpathCommand::PenUp);
            }
            SvgPrimitive::Circle { cx, cy, r } => {
                let (mx, my) = transform(*cx, *cy);
                let radius = r * scale;
                // Full-circle clockwise arc starting at the 3 o'clock
                // point; the command model has no arc variant, so the
                // wire line passes through verbatim.
                out.push(ToolpathCommand::Travel {
                    x: mx + radius,
                    y: my,
                });
                out.push(ToolpathCommand::PenDown);
                out.push(ToolpathCommand::Raw(format!(
                    "G2 X{:.3} Y{:.3} I{:.3} J{:.3}",
                    mx + radius,
                    my,
                    -radius,
                    0.0
                )));
                out.push(ToolpathCommand::PenUp);
            }
        }
    }

    out
}

fn path_to_toolpath(
    commands: &[PathCommand],
    scale: f32,
    transform: &impl Fn(f32, f32) -> (f32, f32),
    out: &mut Vec<ToolpathCommand>,
) {
    // Current point in scaled SVG units, before the Y flip; relative
    // coordinates accumulate here.
    let mut cur_x = 0.0f32;
    let mut cur_y = 0.0f32;
    let mut pen_down = false;

    for cmd in commands {
        match *cmd {
            PathCommand::MoveTo { x, y, relative } => {
                let (sx, sy) = if relative {
                    (cur_x + x * scale, cur_y + y * scale)
                } else {
                    (x * scale, y * scale)
                };
                if pen_down {
                    out.push(ToolpathCommand::PenUp);
                    pen_down = false;
                }
                let (mx, my) = transform(sx / scale, sy / scale);
                out.push(ToolpathCommand::Travel { x: mx, y: my });
                cur_x = sx;
                cur_y = sy;
            }
            PathCommand::LineTo { x, y, relative } => {
                let (sx, sy) = if relative {
                    (cur_x + x * scale, cur_y + y * scale)
                } else {
                    (x * scale, y * scale)
                };
                if !pen_down {
                    out.push(ToolpathCommand::PenDown);
                    pen_down = true;
                }
                let (mx, my) = transform(sx / scale, sy / scale);
                out.push(ToolpathCommand::Draw { x: mx, y: my });
                cur_x = sx;
                cur_y = sy;
            }
            PathCommand::Close => {
                if pen_down {
                    out.push(ToolpathCommand::PenUp);
                    pen_down = false;
                }
            }
        }
    }

    if pen_down {
        out.push(ToolpathCommand::PenUp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewbox_preferred_over_width_height() {
        let doc = parse_svg(r#"<svg viewBox="0 0 200 100" width="50" height="50"></svg>"#);
        assert_eq!(doc.width, 200.0);
        assert_eq!(doc.height, 100.0);
    }

    #[test]
    fn test_width_height_with_units() {
        let doc = parse_svg(r#"<svg width="210mm" height="297mm"></svg>"#);
        assert_eq!(doc.width, 210.0);
        assert_eq!(doc.height, 297.0);
    }

    #[test]
    fn test_dimension_fallback() {
        let doc = parse_svg("<svg></svg>");
        assert_eq!((doc.width, doc.height), (100.0, 100.0));
    }

    #[test]
    fn test_path_data_subset() {
        let commands = parse_path_data("M 10 20 L 30,40 l 5 5 Z");
        assert_eq!(
            commands,
            vec![
                PathCommand::MoveTo {
                    x: 10.0,
                    y: 20.0,
                    relative: false
                },
                PathCommand::LineTo {
                    x: 30.0,
                    y: 40.0,
                    relative: false
                },
                PathCommand::LineTo {
                    x: 5.0,
                    y: 5.0,
                    relative: true
                },
                PathCommand::Close,
            ]
        );
    }

    #[test]
    fn test_unsupported_path_commands_ignored() {
        // Curves are outside the subset; only the moveto survives.
        let commands = parse_path_data("M 0 0 C 1 1 2 2 3 3");
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_extract_elements() {
        let doc = parse_svg(
            r#"<svg viewBox="0 0 100 100">
                <line x1="0" y1="0" x2="10" y2="10"/>
                <rect x="10" y="10" width="30" height="20"/>
                <circle cx="50" cy="50" r="25"/>
            </svg>"#,
        );
        assert_eq!(doc.primitives.len(), 3);
        assert!(matches!(doc.primitives[0], SvgPrimitive::Line { .. }));
        assert!(matches!(doc.primitives[1], SvgPrimitive::Rect { .. }));
        assert!(matches!(doc.primitives[2], SvgPrimitive::Circle { .. }));
    }

    #[test]
    fn test_malformed_element_skipped() {
        let doc = parse_svg(
            r#"<svg viewBox="0 0 100 100">
                <line x1="abc" y1="0" x2="10" y2="10"/>
                <line x1="0" y1="0" x2="5" y2="5"/>
            </svg>"#,
        );
        assert_eq!(doc.primitives.len(), 1);
    }

    #[test]
    fn test_y_axis_flip() {
        let doc = parse_svg(
            r#"<svg viewBox="0 0 100 100"><path d="M 0 0 L 10 0"/></svg>"#,
        );
        let settings = ConversionSettings {
            target_width_mm: 100.0,
            target_height_mm: 100.0,
            ..Default::default()
        };
        let commands = primitives_to_toolpath(&doc, &settings, SvgOffsets::default());

        // SVG y=0 is the top of the document, so it lands at machine
        // y = 100.
        assert_eq!(commands[0], ToolpathCommand::Travel { x: 0.0, y: 100.0 });
        assert_eq!(commands[2], ToolpathCommand::Draw { x: 10.0, y: 100.0 });
    }

    #[test]
    fn test_circle_emits_full_arc() {
        let doc = parse_svg(r#"<svg viewBox="0 0 100 100"><circle cx="50" cy="50" r="10"/></svg>"#);
        let settings = ConversionSettings {
            target_width_mm: 100.0,
            target_height_mm: 100.0,
            ..Default::default()
        };
        let commands = primitives_to_toolpath(&doc, &settings, SvgOffsets::default());
        assert!(commands
            .iter()
            .any(|c| matches!(c, ToolpathCommand::Raw(line) if line.starts_with("G2 "))));
    }
}
