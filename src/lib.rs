//! # cascii-play - terminal glyph-art video player
//!
//! `cascii-play` turns a video into luminance glyph art and plays it in the
//! terminal, in step with the video's own soundtrack.
//!
//! ## How it works
//!
//! 1. ffmpeg extracts numbered frames (`1.bmp`, `2.bmp`, ...) at the target
//!    size and frame rate into a work directory.
//! 2. Every frame is converted to text in parallel, while the audio track is
//!    extracted on a separate thread.
//! 3. Once both are done, the screen is cleared, audio starts, and the
//!    frames are drawn one per interval.
//!
//! ## Example
//!
//! ```no_run
//! use cascii_play::{PlaybackOptions, Player};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let player = Player::new();
//! let options = PlaybackOptions::new(480, 360, 30);
//! let summary = player.run(Path::new("movie.mp4"), &options)?;
//! println!("{} frames played", summary.frames_emitted);
//! # Ok(())
//! # }
//! ```
//!
//! The converter is usable on its own:
//!
//! ```
//! use cascii_play::{compute_glyph, convert_frame, RawFrame};
//!
//! let raw = RawFrame::filled(1, 3, 3, [255, 255, 255]);
//! assert_eq!(convert_frame(&raw, 3, 3).as_str(), "\n%%\n%%");
//! assert_eq!(compute_glyph(0, 0, 0), ' ');
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod extract;
pub mod frame;
pub mod glyph;
pub mod pipeline;
pub mod playback;
pub mod render;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

pub use audio::{AudioPlayer, FfplayAudio, SilentAudio};
pub use config::{AppConfig, Preset};
pub use error::PlayerError;
pub use extract::{ExtractOptions, FfmpegConfig};
pub use frame::{convert_frame, FrameError, GlyphFrame, RawFrame};
pub use glyph::{compute_glyph, GLYPH_RAMP};
pub use pipeline::{ConversionPipeline, ConversionReport, DirectoryFrameSource, FrameSource, MemoryFrameSource};
pub use playback::{PlaybackClock, PlaybackScheduler, PlaybackState, PlaybackSummary, Sleeper, ThreadSleeper};
pub use render::{Renderer, TerminalRenderer};
pub use store::{FrameStore, StoreError};

/// Represents the current phase of preparing a video for playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Extracting frames from video using ffmpeg
    ExtractingFrames,
    /// Extracting audio from video
    ExtractingAudio,
    /// Converting extracted frames to glyph art
    ConvertingFrames,
    /// Everything is ready to play
    Complete,
}

/// Progress information for the preparation phases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if unknown/indeterminate)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

impl Progress {
    /// Create a new progress update for extracting frames
    pub fn extracting_frames() -> Self {
        Self {
            phase: ProgressPhase::ExtractingFrames,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Extracting frames from video...".to_string(),
        }
    }

    /// Create a new progress update for extracting audio
    pub fn extracting_audio() -> Self {
        Self {
            phase: ProgressPhase::ExtractingAudio,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Extracting audio from video...".to_string(),
        }
    }

    /// Create a new progress update for frame conversion
    pub fn converting_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::ConvertingFrames,
            completed,
            total,
            percentage,
            message: format!("Converting frame {} of {}", completed, total),
        }
    }

    /// Create a completion progress update
    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Ready to play {} frames", total_frames),
        }
    }
}

/// Options for one playback run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Frame width in pixels; the glyph frame is one column narrower
    pub width: u32,
    /// Frame height in pixels; the glyph frame is one row shorter
    pub height: u32,
    pub fps: u32,
    /// Start time (e.g., "00:01:23.456" or "83.456")
    pub start: Option<String>,
    /// End time (e.g., "00:01:23.456" or "83.456")
    pub end: Option<String>,
    /// Where frames and audio are extracted to. Defaults to a directory
    /// under the system temp dir named after the input.
    pub work_dir: Option<PathBuf>,
    /// Keep extracted frames and audio after playback
    pub keep_frames: bool,
    /// Skip audio extraction and playback
    pub mute: bool,
}

impl PlaybackOptions {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            start: None,
            end: None,
            work_dir: None,
            keep_frames: false,
            mute: false,
        }
    }

    pub fn from_preset(preset: &Preset) -> Self {
        Self::new(preset.width, preset.height, preset.fps)
    }

    pub fn with_clip(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    pub fn with_keep_frames(mut self, keep_frames: bool) -> Self {
        self.keep_frames = keep_frames;
        self
    }

    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    fn validate(&self) -> Result<(), PlayerError> {
        if self.fps == 0 {
            return Err(PlayerError::InvalidOptions("fps must be at least 1".to_string()));
        }
        if self.width < 2 || self.height < 2 {
            return Err(PlayerError::InvalidOptions(format!(
                "frame size must be at least 2x2, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            width: self.width,
            height: self.height,
            fps: self.fps,
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    fn resolve_work_dir(&self, input: &Path) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("video");
            std::env::temp_dir().join(format!("cascii-play-{}", stem))
        })
    }
}

/// A video that has been extracted and converted, ready to play.
#[derive(Debug)]
pub struct PreparedSession {
    work_dir: PathBuf,
    report: ConversionReport,
    audio: Option<PathBuf>,
    fps: u32,
    keep_frames: bool,
}

impl PreparedSession {
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn report(&self) -> &ConversionReport {
        &self.report
    }

    pub fn frame_count(&self) -> usize {
        self.report.frame_count()
    }

    /// Extracted audio track, `None` for muted runs.
    pub fn audio_path(&self) -> Option<&Path> {
        self.audio.as_deref()
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Remove the extracted files unless they were asked to be kept.
    pub fn cleanup(&self) -> Result<(), PlayerError> {
        if self.keep_frames {
            return Ok(());
        }
        let removed = extract::clean_work_dir(&self.work_dir)?;
        log::debug!("removed {} extracted files from {}", removed, self.work_dir.display());
        Ok(())
    }
}

/// Extracts, converts and plays videos.
#[derive(Debug, Clone)]
pub struct Player {
    ffmpeg: FfmpegConfig,
    frame_overhead_ms: u64,
}

impl Player {
    /// Create a player with the built-in configuration
    pub fn new() -> Self {
        Self::from_config(&AppConfig::default())
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_config(),
            frame_overhead_ms: config.frame_overhead_ms,
        }
    }

    /// Extract frames and audio from `input` and convert every frame.
    ///
    /// Frame extraction runs first. Conversion and audio extraction then run
    /// concurrently and are both awaited; if either fails the session is not
    /// created and the extracted files are removed, unless
    /// [`PlaybackOptions::keep_frames`] is set. Single frames that fail to
    /// convert are stored blank.
    pub fn prepare<F>(&self, input: &Path, options: &PlaybackOptions, progress_callback: F) -> Result<PreparedSession, PlayerError>
    where
        F: Fn(Progress) + Send + Sync,
    {
        options.validate()?;
        if !input.is_file() {
            return Err(PlayerError::Extraction(format!(
                "input {} does not exist",
                input.display()
            )));
        }

        let work_dir = options.resolve_work_dir(input);
        extract::prepare_work_dir(&work_dir)?;

        let (report, audio) = match self.extract_and_convert(input, options, &work_dir, &progress_callback) {
            Ok(prepared) => prepared,
            Err(e) => {
                if !options.keep_frames {
                    if let Err(clean_err) = extract::clean_work_dir(&work_dir) {
                        log::warn!("{}", clean_err);
                    }
                }
                return Err(e);
            }
        };

        progress_callback(Progress::complete(report.frame_count()));
        Ok(PreparedSession {
            work_dir,
            report,
            audio,
            fps: options.fps,
            keep_frames: options.keep_frames,
        })
    }

    fn extract_and_convert<F>(
        &self,
        input: &Path,
        options: &PlaybackOptions,
        work_dir: &Path,
        progress_callback: &F,
    ) -> Result<(ConversionReport, Option<PathBuf>), PlayerError>
    where
        F: Fn(Progress) + Send + Sync,
    {
        let extract_opts = options.extract_options();

        progress_callback(Progress::extracting_frames());
        extract::extract_frames(input, work_dir, &extract_opts, &self.ffmpeg)?;
        let source = DirectoryFrameSource::open(work_dir)?;

        let pipeline = ConversionPipeline::new(options.width, options.height);
        let (report, audio) = thread::scope(|s| {
            let audio_task = s.spawn(|| -> Result<Option<PathBuf>, PlayerError> {
                if options.mute {
                    return Ok(None);
                }
                progress_callback(Progress::extracting_audio());
                extract::extract_audio(input, work_dir, &extract_opts, &self.ffmpeg).map(Some)
            });
            let report = pipeline.convert(&source, progress_callback);
            let audio = audio_task
                .join()
                .unwrap_or_else(|_| Err(PlayerError::Audio("audio extraction thread panicked".to_string())));
            (report, audio)
        });
        Ok((report?, audio?))
    }

    /// Play a prepared session to `renderer`, pacing with `sleeper`.
    pub fn play<R, S>(&self, session: &PreparedSession, renderer: &mut R, sleeper: &mut S) -> Result<PlaybackSummary, PlayerError>
    where
        R: Renderer + ?Sized,
        S: Sleeper + ?Sized,
    {
        let mut scheduler = PlaybackScheduler::new(session.frame_count(), session.fps, self.frame_overhead_ms)?;
        let mut audio: Box<dyn AudioPlayer> = match session.audio_path() {
            Some(path) => Box::new(FfplayAudio::new(self.ffmpeg.ffplay.clone(), path)),
            None => Box::new(SilentAudio),
        };
        scheduler.play(&session.report.store, renderer, audio.as_mut(), sleeper)
    }

    /// Extract, convert and play `input` on stdout.
    pub fn run(&self, input: &Path, options: &PlaybackOptions) -> Result<PlaybackSummary, PlayerError> {
        let session = self.prepare(input, options, |_| {})?;
        let result = self.play(&session, &mut TerminalRenderer::stdout(), &mut ThreadSleeper);
        if let Err(e) = session.cleanup() {
            log::warn!("{}", e);
        }
        result
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Play `source` at `width` x `height` pixels and `fps` frames per second
/// with the built-in configuration.
pub fn run(source: &Path, width: u32, height: u32, fps: u32) -> ExitCode {
    match Player::new().run(source, &PlaybackOptions::new(width, height, fps)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentages() {
        let p = Progress::converting_frames(25, 100);
        assert_eq!(p.phase, ProgressPhase::ConvertingFrames);
        assert_eq!(p.percentage, 25.0);
        assert_eq!(Progress::converting_frames(0, 0).percentage, 0.0);
        assert_eq!(Progress::complete(7).completed, 7);
        assert_eq!(Progress::extracting_frames().phase, ProgressPhase::ExtractingFrames);
        assert_eq!(Progress::extracting_audio().phase, ProgressPhase::ExtractingAudio);
    }

    #[test]
    fn test_options_validation() {
        assert!(PlaybackOptions::new(480, 360, 30).validate().is_ok());
        assert!(PlaybackOptions::new(480, 360, 0).validate().is_err());
        assert!(PlaybackOptions::new(1, 360, 30).validate().is_err());
    }

    #[test]
    fn test_default_work_dir_is_named_after_input() {
        let opts = PlaybackOptions::new(480, 360, 30);
        let dir = opts.resolve_work_dir(Path::new("/videos/bad_apple.mp4"));
        assert!(dir.ends_with("cascii-play-bad_apple"));

        let opts = opts.with_work_dir(PathBuf::from("gen"));
        assert_eq!(opts.resolve_work_dir(Path::new("x.mp4")), PathBuf::from("gen"));
    }

    #[test]
    fn test_missing_input_fails_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let opts = PlaybackOptions::new(8, 6, 10).with_work_dir(dir.path().join("gen"));
        let err = Player::new()
            .prepare(&dir.path().join("missing.mp4"), &opts, |_| {})
            .unwrap_err();
        assert!(matches!(err, PlayerError::Extraction(_)));
        assert!(!dir.path().join("gen").exists());
    }

    #[test]
    fn test_play_muted_session() {
        let store_report = ConversionPipeline::new(3, 3)
            .convert(
                &MemoryFrameSource::new(vec![
                    RawFrame::filled(1, 3, 3, [255, 255, 255]),
                    RawFrame::filled(2, 3, 3, [0, 0, 0]),
                ]),
                |_| {},
            )
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let session = PreparedSession {
            work_dir: dir.path().to_path_buf(),
            report: store_report,
            audio: None,
            fps: 30,
            keep_frames: false,
        };

        let mut renderer = TerminalRenderer::new(Vec::new());
        let summary = Player::new()
            .play(&session, &mut renderer, &mut |_: std::time::Duration| {})
            .unwrap();
        assert_eq!(summary.frames_emitted, 2);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "\x1b[2J\x1b[0;0H\n%%\n%%\x1b[0;0H\n  \n  ");
    }

    /// Stand-in for ffmpeg: frame extraction copies `seed` to 1..=3.bmp next
    /// to the output pattern, audio extraction (`-vn`) exits with status 3.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, seed: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg.sh");
        let body = format!(
            "#!/bin/sh\n\
             for arg in \"$@\"; do\n\
             \x20 if [ \"$arg\" = \"-vn\" ]; then exit 3; fi\n\
             \x20 last=\"$arg\"\n\
             done\n\
             out=$(dirname \"$last\")\n\
             for i in 1 2 3; do cp \"{}\" \"$out/$i.bmp\"; done\n",
            seed.display()
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    fn fake_player(dir: &Path) -> (Player, PathBuf) {
        let seed = dir.join("seed.bmp");
        image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]))
            .save(&seed)
            .unwrap();
        let input = dir.join("clip.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        let config = AppConfig {
            ffmpeg: fake_ffmpeg(dir, &seed).to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        (Player::from_config(&config), input)
    }

    #[cfg(unix)]
    #[test]
    fn test_audio_failure_fails_prepare_after_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let (player, input) = fake_player(dir.path());
        let work = dir.path().join("gen");
        let opts = PlaybackOptions::new(4, 4, 10).with_work_dir(work.clone());

        let phases = std::sync::Mutex::new(Vec::new());
        let err = player
            .prepare(&input, &opts, |p| phases.lock().unwrap().push(p.phase))
            .unwrap_err();
        assert!(matches!(err, PlayerError::Audio(_)));

        // Conversion still ran to the end before the audio error surfaced
        let phases = phases.into_inner().unwrap();
        assert!(phases.contains(&ProgressPhase::ConvertingFrames));
        assert!(!phases.contains(&ProgressPhase::Complete));

        // Nothing extracted is left behind
        assert_eq!(extract::count_frames(&work), 0);
        assert!(work.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_prepare_keeps_frames_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let (player, input) = fake_player(dir.path());
        let work = dir.path().join("gen");
        let opts = PlaybackOptions::new(4, 4, 10)
            .with_work_dir(work.clone())
            .with_keep_frames(true);

        let err = player.prepare(&input, &opts, |_| {}).unwrap_err();
        assert!(matches!(err, PlayerError::Audio(_)));
        assert_eq!(extract::count_frames(&work), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_muted_prepare_converts_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (player, input) = fake_player(dir.path());
        let opts = PlaybackOptions::new(4, 4, 10)
            .with_work_dir(dir.path().join("gen"))
            .with_mute(true);

        let session = player.prepare(&input, &opts, |_| {}).unwrap();
        assert_eq!(session.frame_count(), 3);
        assert!(session.report().failures.is_empty());
        assert!(session.audio_path().is_none());
        assert_eq!(session.report().store.get(3).unwrap().as_str(), "\n%%%\n%%%\n%%%");

        session.cleanup().unwrap();
        assert_eq!(extract::count_frames(session.work_dir()), 0);
    }
}
