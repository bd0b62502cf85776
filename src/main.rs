use anyhow::{anyhow, Context, Result};
use cascii_play::{AppConfig, PlaybackOptions, Player, Progress, ProgressPhase, TerminalRenderer, ThreadSleeper};
use clap::Parser;
use dialoguer::{FuzzySelect, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Mutex;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(version, about = "Play a video as glyph art in the terminal, with its audio.")]
struct Args {
    /// Input video file
    input: Option<PathBuf>,

    /// Frame width in pixels (the glyph frame is one column narrower)
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels (the glyph frame is one row shorter)
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second to extract and play
    #[arg(long)]
    fps: Option<u32>,

    /// Use default quality preset
    #[arg(long, default_value_t = false, conflicts_with_all = &["small", "large"])]
    default: bool,

    /// Use the small preset
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "large"])]
    small: bool,

    /// Use the large preset
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "small"])]
    large: bool,

    /// Start time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    start: Option<String>,

    /// End time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    end: Option<String>,

    /// Directory to extract frames and audio into
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Keep extracted frames and audio after playback
    #[arg(long, default_value_t = false)]
    keep_frames: bool,

    /// Play without sound
    #[arg(long, default_value_t = false)]
    mute: bool,

    /// Extract and convert, but do not play
    #[arg(long, default_value_t = false)]
    convert_only: bool,

    /// Print run details when finished
    #[arg(long, default_value_t = false)]
    log_details: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = Args::parse();
    let is_interactive = !(args.default || args.small || args.large);

    // --- Interactive Prompts ---
    if args.input.is_none() {
        if !is_interactive {
            return Err(anyhow!("Input file must be provided when using a preset."));
        }
        let files = find_video_files();
        if files.is_empty() {
            return Err(anyhow!("No video files found in current directory."));
        }
        let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Choose a video")
            .default(0)
            .items(&files)
            .interact()?;
        args.input = Some(PathBuf::from(&files[selection]));
    }
    let input_path = args.input.clone().context("no input selected")?;

    let cfg = AppConfig::discover()?;
    let active_preset_name = if args.small {
        "small"
    } else if args.large {
        "large"
    } else {
        cfg.default_preset.as_str()
    };
    let active = *cfg.preset(active_preset_name)?;

    if is_interactive {
        if args.width.is_none() {
            args.width = Some(Input::new().with_prompt("Width").default(active.width).interact()?);
        }
        if args.height.is_none() {
            args.height = Some(Input::new().with_prompt("Height").default(active.height).interact()?);
        }
        if args.fps.is_none() {
            args.fps = Some(
                Input::new()
                    .with_prompt("Frames per second (FPS)")
                    .default(active.fps)
                    .interact()?,
            );
        }
    }

    let mut options = PlaybackOptions::new(
        args.width.unwrap_or(active.width),
        args.height.unwrap_or(active.height),
        args.fps.unwrap_or(active.fps),
    )
    .with_clip(args.start.clone(), args.end.clone())
    .with_keep_frames(args.keep_frames || args.convert_only)
    .with_mute(args.mute);
    if let Some(dir) = args.work_dir.clone() {
        options = options.with_work_dir(dir);
    }

    // --- Execution ---
    let player = Player::from_config(&cfg);
    let progress_bar: Mutex<Option<ProgressBar>> = Mutex::new(None);
    let session = player.prepare(&input_path, &options, |progress: Progress| {
        report_progress(&progress_bar, progress)
    })?;
    if let Some(pb) = progress_bar.lock().ok().and_then(|mut guard| guard.take()) {
        pb.finish_and_clear();
    }

    let failed = session.report().failures.len();
    if failed > 0 {
        eprintln!("Warning: {} of {} frames could not be converted and will play blank", failed, session.frame_count());
    }

    let summary = if args.convert_only {
        println!("Converted {} frames into {}", session.frame_count(), session.work_dir().display());
        None
    } else {
        let result = player.play(&session, &mut TerminalRenderer::stdout(), &mut ThreadSleeper);
        if let Err(e) = session.cleanup() {
            log::warn!("{}", e);
        }
        Some(result?)
    };

    if args.log_details {
        println!("\n--- Playback Details ---");
        println!("Version: {}", env!("CARGO_PKG_VERSION"));
        println!("Frames: {}", session.frame_count());
        println!("Blank frames: {}", session.report().store.blank_indices().len());
        println!("Size: {}x{}", options.width, options.height);
        println!("FPS: {}", options.fps);
        if let Some(summary) = summary {
            println!("Elapsed: {:.2?}", summary.elapsed);
        }
    }

    Ok(())
}

fn report_progress(bar: &Mutex<Option<ProgressBar>>, progress: Progress) {
    match progress.phase {
        ProgressPhase::ExtractingFrames | ProgressPhase::ExtractingAudio => println!("{}", progress.message),
        ProgressPhase::ConvertingFrames => {
            let Ok(mut guard) = bar.lock() else { return };
            if guard.is_none() {
                // Initialize progress bar on first callback
                let pb = ProgressBar::new(progress.total as u64);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                {
                    pb.set_style(style.progress_chars("#>-"));
                }
                *guard = Some(pb);
            }
            if let Some(ref pb) = *guard {
                pb.set_position(bar_position(pb.position(), progress.completed));
            }
        }
        ProgressPhase::Complete => log::info!("{}", progress.message),
    }
}

/// Frames finish out of order, so a late callback may carry a smaller count
/// than one already shown; the bar only moves forward.
fn bar_position(current: u64, completed: usize) -> u64 {
    current.max(completed as u64)
}

fn find_video_files() -> Vec<String> {
    WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    matches!(ext.to_str(), Some("mp4" | "mkv" | "mov" | "avi" | "webm"))
                })
        })
        .map(|e| e.path().to_string_lossy().into_owned())
        .collect()
}
