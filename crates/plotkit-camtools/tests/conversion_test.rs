use plotkit_camtools::toolpath::{convert_svg_text, render_lines, MachineProfile};
use plotkit_camtools::{ConversionMode, ConversionSettings, RasterImage, ScaraConfig};
use plotkit_core::ToolpathCommand;

fn letter_h_grid() -> RasterImage {
    // 5x5 grid drawing an H: two verticals and a crossbar.
    let rows = vec![
        vec![true, false, false, false, true],
        vec![true, false, false, false, true],
        vec![true, true, true, true, true],
        vec![true, false, false, false, true],
        vec![true, false, false, false, true],
    ];
    RasterImage::from_rows(rows)
}

fn settings(mode: ConversionMode) -> ConversionSettings {
    ConversionSettings {
        mode,
        target_width_mm: 50.0,
        target_height_mm: 50.0,
        ..Default::default()
    }
}

#[test]
fn test_every_mode_produces_motion_for_nonempty_image() {
    let image = letter_h_grid();
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
        let commands = mode.generate(&image, &settings(mode));
        assert!(
            commands.iter().any(|c| c.target().is_some()),
            "{mode} produced no motion"
        );
    }
}

#[test]
fn test_every_mode_brackets_draws_with_pen_state() {
    let image = letter_h_grid();
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
        let commands = mode.generate(&image, &settings(mode));
        let mut pen_down = false;
        for command in &commands {
            match command {
                ToolpathCommand::PenDown => pen_down = true,
                ToolpathCommand::PenUp => pen_down = false,
                ToolpathCommand::Draw { .. } => {
                    assert!(pen_down, "{mode} drew with the pen up");
                }
                ToolpathCommand::Travel { .. } => {
                    assert!(!pen_down, "{mode} traveled with the pen down");
                }
                _ => {}
            }
        }
        assert!(!pen_down, "{mode} ended with the pen down");
    }
}

#[test]
fn test_motion_stays_inside_target_bounds() {
    let image = letter_h_grid();
    let settings = settings(ConversionMode::RasterHorizontal);
    for mode in [
        ConversionMode::RasterHorizontal,
        ConversionMode::RasterVertical,
        ConversionMode::Crosshatch,
        ConversionMode::Stippling,
        ConversionMode::VectorTracing,
    ] {
        let commands = mode.generate(&image, &settings);
        for point in commands.iter().filter_map(|c| c.target()) {
            assert!(
                point.x >= -0.01 && point.x <= settings.target_width_mm + 0.01,
                "{mode} x out of bounds: {}",
                point.x
            );
            assert!(
                point.y >= -0.01 && point.y <= settings.target_height_mm + 0.01,
                "{mode} y out of bounds: {}",
                point.y
            );
        }
    }
}

#[test]
fn test_svg_rect_draw_length_matches_perimeter() {
    let svg =
        r#"<svg viewBox="0 0 100 100"><rect x="10" y="10" width="30" height="20"/></svg>"#;
    let settings = ConversionSettings {
        target_width_mm: 100.0,
        target_height_mm: 100.0,
        ..Default::default()
    };
    let output = convert_svg_text(svg, &settings, &MachineProfile::Cartesian).unwrap();

    assert!(
        (output.stats.draw_distance_mm - 100.0).abs() < 1e-3,
        "rect perimeter was {}",
        output.stats.draw_distance_mm
    );
}

#[test]
fn test_svg_scale_is_uniform_for_nonsquare_target() {
    // 200x100 document into a 50x50 target: scale is limited by width,
    // so a full-width line draws 50 mm, not 100.
    let svg = r#"<svg viewBox="0 0 200 100"><line x1="0" y1="50" x2="200" y2="50"/></svg>"#;
    let settings = ConversionSettings {
        target_width_mm: 50.0,
        target_height_mm: 50.0,
        ..Default::default()
    };
    let output = convert_svg_text(svg, &settings, &MachineProfile::Cartesian).unwrap();
    assert!(
        (output.stats.draw_distance_mm - 50.0).abs() < 1e-3,
        "line length was {}",
        output.stats.draw_distance_mm
    );
}

#[test]
fn test_scara_profile_offsets_svg_into_reach() {
    // With the default arm the region around the origin is inside the
    // annulus hole; the shoulder offset pushes the drawing into reach.
    let svg = r#"<svg viewBox="0 0 100 100"><rect x="20" y="20" width="60" height="60"/></svg>"#;
    let settings = ConversionSettings {
        target_width_mm: 100.0,
        target_height_mm: 100.0,
        ..Default::default()
    };
    let profile = MachineProfile::Scara(ScaraConfig::default());
    let output = convert_svg_text(svg, &settings, &profile).unwrap();

    assert_eq!(output.skipped_unreachable, 0);
    assert!(output.lines.iter().any(|l| l.starts_with("G1 A")));
}

#[test]
fn test_rendered_lines_cover_setup_and_teardown() {
    let svg = r#"<svg viewBox="0 0 100 100"><line x1="0" y1="0" x2="50" y2="50"/></svg>"#;
    let output =
        convert_svg_text(svg, &ConversionSettings::default(), &MachineProfile::Cartesian).unwrap();

    assert!(output.lines.contains(&"G21".to_string()));
    assert!(output.lines.contains(&"G90".to_string()));
    assert!(output.lines.contains(&"$X".to_string()));
    assert_eq!(
        output.lines.last().map(String::as_str),
        Some("; end of toolpath")
    );
}

#[test]
fn test_raster_conversion_estimates_nonzero_duration() {
    let image = letter_h_grid();
    let settings = settings(ConversionMode::RasterHorizontal);
    let body = settings.mode.generate(&image, &settings);
    let commands = plotkit_camtools::toolpath::assemble(body, &settings);
    let stats = plotkit_camtools::ToolpathStats::from_commands(
        &commands,
        &settings,
        &plotkit_camtools::StatsConfig::default(),
    );

    assert!(stats.draw_distance_mm > 0.0);
    assert!(stats.estimated_seconds > 0.0);
}

#[test]
fn test_cartesian_rendering_never_skips() {
    let commands = vec![
        ToolpathCommand::Travel { x: 9999.0, y: 9999.0 },
        ToolpathCommand::Draw { x: -9999.0, y: 0.0 },
    ];
    let (lines, skipped) = render_lines(
        &commands,
        &ConversionSettings::default(),
        &MachineProfile::Cartesian,
    );
    assert_eq!(lines.len(), 2);
    assert_eq!(skipped, 0);
}
