use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use plotkit::{
    convert_image_file, convert_svg_text, init_logging, list_ports, read_lines, write_lines,
    CommandStreamer, ConversionMode, ConversionOutput, ConversionSettings, MachineProfile,
    ScaraConfig, SerialTransport, StreamState, StreamerConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "plotkit",
    version = plotkit::VERSION,
    long_version = plotkit::long_version(),
    about = "Pen plotter toolpath generator and streamer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a raster image to a plotter toolpath
    ConvertImage {
        /// Input image file (PNG, JPEG, BMP, ...)
        input: PathBuf,
        /// Output file for the rendered toolpath
        #[arg(short, long)]
        output: PathBuf,
        /// Conversion mode
        #[arg(short, long, default_value = "raster_horizontal")]
        mode: String,
        /// Foreground threshold (0-255)
        #[arg(long, default_value_t = 128)]
        threshold: u8,
        /// Invert the image before thresholding
        #[arg(long)]
        invert: bool,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Convert an SVG drawing to a plotter toolpath
    ConvertSvg {
        /// Input SVG file
        input: PathBuf,
        /// Output file for the rendered toolpath
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Stream a toolpath file to a connected plotter
    Send {
        /// Toolpath file to stream
        input: PathBuf,
        /// Serial port, for example /dev/ttyUSB0 or /dev/rfcomm0
        #[arg(short, long)]
        port: String,
        /// Baud rate
        #[arg(short, long, default_value_t = 115_200)]
        baud: u32,
    },
    /// List serial ports that look like plotter controllers
    Ports,
}

#[derive(Args)]
struct TargetArgs {
    /// Target drawing width in millimeters
    #[arg(long, default_value_t = 50.0)]
    width: f32,
    /// Target drawing height in millimeters
    #[arg(long, default_value_t = 50.0)]
    height: f32,
    /// Drawing feed rate in mm/min
    #[arg(long, default_value_t = 800.0)]
    feed: f32,
    /// Spacing between scan lines in millimeters
    #[arg(long, default_value_t = 1.0)]
    spacing: f32,
}

#[derive(Args)]
struct MachineArgs {
    /// Render for a two-link SCARA arm instead of a Cartesian gantry
    #[arg(long)]
    scara: bool,
    /// First arm length in millimeters (SCARA only)
    #[arg(long, default_value_t = 240.0)]
    arm1: f64,
    /// Second arm length in millimeters (SCARA only)
    #[arg(long, default_value_t = 245.0)]
    arm2: f64,
    /// Shoulder Y offset from the work origin (SCARA only)
    #[arg(long, default_value_t = 100.0)]
    shoulder_y: f64,
}

impl MachineArgs {
    fn profile(&self) -> MachineProfile {
        if self.scara {
            MachineProfile::Scara(ScaraConfig {
                arm1_length: self.arm1,
                arm2_length: self.arm2,
                offset_x: 0.0,
                offset_y: self.shoulder_y,
            })
        } else {
            MachineProfile::Cartesian
        }
    }
}

fn parse_mode(mode: &str) -> anyhow::Result<ConversionMode> {
    match mode {
        "raster_horizontal" => Ok(ConversionMode::RasterHorizontal),
        "raster_vertical" => Ok(ConversionMode::RasterVertical),
        "raster_diagonal" => Ok(ConversionMode::RasterDiagonal),
        "crosshatch" => Ok(ConversionMode::Crosshatch),
        "contour" => Ok(ConversionMode::ContourFollowing),
        "stippling" => Ok(ConversionMode::Stippling),
        "spiral" => Ok(ConversionMode::Spiral),
        "vector" => Ok(ConversionMode::VectorTracing),
        other => bail!(
            "unknown mode '{other}', expected one of raster_horizontal, raster_vertical, \
             raster_diagonal, crosshatch, contour, stippling, spiral, vector"
        ),
    }
}

fn settings_from(target: &TargetArgs, mode: ConversionMode) -> ConversionSettings {
    ConversionSettings {
        mode,
        target_width_mm: target.width,
        target_height_mm: target.height,
        feed_rate: target.feed,
        line_spacing: target.spacing,
        ..Default::default()
    }
}

fn report(output: &ConversionOutput) -> anyhow::Result<()> {
    tracing::info!(skipped = output.skipped_unreachable, "{}", output.summary());
    println!("{}", serde_json::to_string_pretty(&output.stats)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::ConvertImage {
            input,
            output,
            mode,
            threshold,
            invert,
            target,
            machine,
        } => {
            let mut settings = settings_from(&target, parse_mode(&mode)?);
            settings.threshold = threshold;
            settings.invert_image = invert;

            let result = convert_image_file(&input, &settings, &machine.profile())
                .with_context(|| format!("converting {}", input.display()))?;
            write_lines(&output, &result.lines)?;
            report(&result)?;
        }
        Command::ConvertSvg {
            input,
            output,
            target,
            machine,
        } => {
            let settings = settings_from(&target, ConversionMode::VectorTracing);
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            let result = convert_svg_text(&content, &settings, &machine.profile())
                .with_context(|| format!("converting {}", input.display()))?;
            write_lines(&output, &result.lines)?;
            report(&result)?;
        }
        Command::Send { input, port, baud } => {
            let lines = read_lines(&input)?;
            if lines.is_empty() {
                bail!("{} is empty", input.display());
            }

            let transport = SerialTransport::new(&port, baud);
            let mut streamer =
                CommandStreamer::new(Box::new(transport), StreamerConfig::default());
            streamer.connect().context("opening serial port")?;
            streamer.start(lines)?;

            let state = streamer.run().await;
            let progress = streamer.progress();
            tracing::info!(
                ?state,
                processed = progress.processed,
                errors = progress.errors,
                timeouts = progress.timeouts,
                "streaming finished"
            );
            if state != StreamState::Completed {
                bail!("streaming ended in state {state:?}");
            }
        }
        Command::Ports => {
            let ports = list_ports()?;
            if ports.is_empty() {
                println!("no plotter ports found");
            }
            for port in ports {
                println!("{}\t{}", port.port_name, port.description);
            }
        }
    }

    Ok(())
}
