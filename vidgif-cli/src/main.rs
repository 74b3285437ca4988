use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use vidgif_core::progress::COMPLETED;
use vidgif_core::settings::{BITRATE_RANGE, FPS_RANGE};
use vidgif_core::{
    AppVariant, Conversion, ConversionSettings, FfmpegEngine, MediaFormat, Session, SettingsStore,
    StatusSink, check_ffmpeg, status_channel,
};

#[derive(Parser, Debug)]
#[command(name = "vidgif")]
#[command(about = "Convert MP4/WEBM/MOV/AVI videos to GIF and GIFs back to video")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one file
    Convert {
        /// Input video or GIF
        input: PathBuf,

        /// Output folder (defaults to the input's folder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format for GIF input
        #[arg(long, value_enum)]
        to: Option<MediaFormat>,

        /// Which application flavour to run as
        #[arg(long, value_enum, default_value = "full")]
        variant: AppVariant,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Show the effective settings as JSON, optionally saving them
    Settings {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Write the resulting settings to this file
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },

    /// List the supported conversions
    Formats {
        #[arg(long, value_enum, default_value = "full")]
        variant: AppVariant,
    },
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Load settings from a JSON file
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// GIF to video bitrate in kbps (100-1000)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(100..=1000))]
    bitrate: Option<u32>,

    /// Frame rate for one conversion pair, e.g. "mp4-to-gif=24" (1-60). Repeatable.
    #[arg(long, value_name = "PAIR=FPS", value_parser = parse_fps)]
    fps: Vec<(Conversion, u32)>,
}

fn parse_fps(s: &str) -> Result<(Conversion, u32), String> {
    let (pair, fps) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PAIR=FPS, got '{}'", s))?;
    let conversion = Conversion::from_name(pair.trim()).ok_or_else(|| {
        let names: Vec<String> = Conversion::ALL.iter().map(Conversion::name).collect();
        format!("unknown pair '{}', expected one of: {}", pair, names.join(", "))
    })?;
    let fps: u32 = fps
        .trim()
        .parse()
        .map_err(|_| format!("invalid frame rate '{}'", fps))?;
    if !FPS_RANGE.contains(&fps) {
        return Err(format!(
            "frame rate must be between {} and {}",
            FPS_RANGE.start(),
            FPS_RANGE.end()
        ));
    }
    Ok((conversion, fps))
}

/// Run the settings "dialog": all edits land together or not at all
fn apply_settings(
    store: &mut SettingsStore,
    args: &SettingsArgs,
    gif_target: Option<MediaFormat>,
) -> Result<()> {
    let mut draft = store.edit();

    if let Some(path) = &args.settings {
        draft = draft.all(ConversionSettings::load(path)?);
    }
    if let Some(bitrate) = args.bitrate {
        draft = draft.bitrate(bitrate);
    }
    for &(conversion, fps) in &args.fps {
        draft = draft.fps(conversion, fps);
    }
    if let Some(target) = gif_target {
        if !target.is_video() {
            anyhow::bail!("GIF input can only be exported as mp4, webm, mov, or avi");
        }
        draft = draft.gif_target(target);
    }

    store.commit(draft);
    Ok(())
}

/// Status line on the terminal. The spinner appears with the first message.
#[derive(Default)]
struct ConsoleStatus {
    bar: Option<ProgressBar>,
}

impl ConsoleStatus {
    fn spinner() -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Only the completion message outlives the spinner line; errors are
/// reported once, by the command's result.
fn keeps_in_scrollback(text: &str) -> bool {
    text == COMPLETED
}

impl StatusSink for ConsoleStatus {
    fn set_text(&mut self, text: &str) {
        if self.bar.is_none() && text.is_empty() {
            return;
        }
        let bar = self.bar.get_or_insert_with(Self::spinner);
        if keeps_in_scrollback(text) {
            bar.println(text);
        }
        bar.set_message(text.to_string());
    }
}

fn convert(
    input: PathBuf,
    output: Option<PathBuf>,
    to: Option<MediaFormat>,
    variant: AppVariant,
    settings: &SettingsArgs,
) -> Result<()> {
    // The output folder follows the input's folder unless chosen explicitly
    let output_dir = match output {
        Some(dir) => dir,
        None => input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let (status, display) = status_channel(ConsoleStatus::default());
    let mut session = Session::new(FfmpegEngine, variant, status);
    apply_settings(session.settings_mut(), settings, to)?;

    log::info!("{}", session.variant().title());
    log::info!("Input: {:?}", input);
    log::info!("Output folder: {:?}", output_dir);

    // Nothing touches the disk or ffmpeg until the selection is known to be good
    let job = match session.prepare(&input, &output_dir) {
        Ok(job) => job,
        Err(e) if e.is_input_error() => anyhow::bail!("Input Error: {}", e),
        Err(e) => return Err(e.into()),
    };

    require_ffmpeg();
    std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    let handle = session.start(job)?;

    // The display runs on this thread until the job's threads let go of it
    drop(session);
    display.run().finish();

    let written = handle.wait()?;
    println!("📁 Output saved to: {:?}", written);
    Ok(())
}

/// Exit with install hints when there is no usable ffmpeg
fn require_ffmpeg() {
    match check_ffmpeg() {
        Ok(version) => log::info!("FFmpeg version {} detected", version),
        Err(e) => {
            eprintln!("Error: FFmpeg not found!");
            eprintln!("Please install FFmpeg to use this tool.");
            eprintln!();
            eprintln!("Installation instructions:");
            eprintln!("  Ubuntu/Debian: sudo apt install ffmpeg");
            eprintln!("  macOS:         brew install ffmpeg");
            eprintln!("  Windows:       Download from https://ffmpeg.org/download.html");
            eprintln!();
            eprintln!("Details: {}", e);
            std::process::exit(1);
        }
    }
}

fn show_settings(settings: &SettingsArgs, write: Option<PathBuf>) -> Result<()> {
    let mut store = SettingsStore::default();
    apply_settings(&mut store, settings, None)?;
    let current = store.current();

    println!("{}", serde_json::to_string_pretty(&current)?);
    println!(
        "\nRanges: bitrate {}-{} kbps, frame rate {}-{} fps",
        BITRATE_RANGE.start(),
        BITRATE_RANGE.end(),
        FPS_RANGE.start(),
        FPS_RANGE.end()
    );

    if let Some(path) = write {
        current.save(&path)?;
        println!("Saved to {:?}", path);
    }
    Ok(())
}

fn list_formats(variant: AppVariant) {
    let settings = ConversionSettings::default();
    println!("\n{} conversions:", variant.title());
    println!("{:-<50}", "");
    for conversion in Conversion::ALL {
        if variant.supports(conversion.source()) && variant.supports(conversion.target()) {
            println!(
                "{:<15} - {} (default {} fps)",
                conversion.name(),
                conversion.label(),
                settings.fps(conversion)
            );
        }
    }
    println!("\nUsage: vidgif convert clip.mp4 -o out/");
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Command::Formats { variant } => {
            list_formats(variant);
            Ok(())
        }
        Command::Settings { settings, write } => show_settings(&settings, write),
        Command::Convert {
            input,
            output,
            to,
            variant,
            settings,
        } => convert(input, output, to, variant, &settings),
    }
}
