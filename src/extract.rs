//! Frame and audio extraction with ffmpeg.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command as ProcCommand;

use walkdir::WalkDir;

use crate::error::PlayerError;

/// File name of the extracted audio track inside the work directory.
pub const AUDIO_FILE_NAME: &str = "audio.wav";

/// Extension of the extracted frame images.
pub const FRAME_EXTENSION: &str = "bmp";

/// Names (or paths) of the external ffmpeg tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegConfig {
    pub ffmpeg: String,
    pub ffplay: String,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffplay: "ffplay".to_string(),
        }
    }
}

/// What to extract from the source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Start time (e.g., "00:01:23.456" or "83.456")
    pub start: Option<String>,
    /// End time (e.g., "00:01:23.456" or "83.456")
    pub end: Option<String>,
}

/// Remove frames and audio left in `work_dir` by an earlier run, creating
/// the directory if needed.
///
/// Only numbered frame images and the audio track are deleted; anything
/// else in the directory is left alone.
pub fn prepare_work_dir(work_dir: &Path) -> Result<(), PlayerError> {
    fs::create_dir_all(work_dir).map_err(|source| PlayerError::Io {
        context: format!("creating work directory {}", work_dir.display()),
        source,
    })?;
    let removed = clean_work_dir(work_dir)?;
    if removed > 0 {
        log::info!("removed {} stale files from {}", removed, work_dir.display());
    }
    Ok(())
}

/// Delete extracted frames and audio from `work_dir`. Returns how many
/// files were removed.
pub fn clean_work_dir(work_dir: &Path) -> Result<usize, PlayerError> {
    let mut removed = 0;
    for path in extracted_files(work_dir) {
        fs::remove_file(&path).map_err(|source| PlayerError::Io {
            context: format!("removing {}", path.display()),
            source,
        })?;
        removed += 1;
    }
    Ok(removed)
}

fn extracted_files(work_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(work_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && (is_frame_file(p) || p.file_name().is_some_and(|n| n == AUDIO_FILE_NAME)))
        .collect()
}

fn is_frame_file(path: &Path) -> bool {
    frame_number(path, FRAME_EXTENSION).is_some()
}

/// Frame number encoded in a `<digits>.<extension>` file name.
///
/// Only plain ASCII digits are accepted (no sign, no whitespace) and frame
/// numbering starts at 1.
pub(crate) fn frame_number(path: &Path, extension: &str) -> Option<usize> {
    if path.extension().and_then(|e| e.to_str()) != Some(extension) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Number of extracted frame images in `work_dir`.
pub fn count_frames(work_dir: &Path) -> usize {
    extracted_files(work_dir).iter().filter(|p| is_frame_file(p)).count()
}

/// Extract numbered frames (`1.bmp`, `2.bmp`, ...) scaled to the target size.
pub fn extract_frames(input: &Path, work_dir: &Path, opts: &ExtractOptions, ffmpeg: &FfmpegConfig) -> Result<usize, PlayerError> {
    let args = frame_args(input, work_dir, opts);
    log::debug!("{} {}", ffmpeg.ffmpeg, args.join(" "));

    let status = ProcCommand::new(&ffmpeg.ffmpeg)
        .args(&args)
        .status()
        .map_err(|e| PlayerError::Extraction(spawn_failure(&ffmpeg.ffmpeg, &e)))?;
    if !status.success() {
        return Err(PlayerError::Extraction(format!(
            "ffmpeg exited with {} while extracting frames from {}",
            status,
            input.display()
        )));
    }

    let frames = count_frames(work_dir);
    if frames == 0 {
        return Err(PlayerError::Extraction(format!(
            "ffmpeg produced no frames for {}",
            input.display()
        )));
    }
    log::info!("extracted {} frames into {}", frames, work_dir.display());
    Ok(frames)
}

/// Extract the audio track as WAV. Returns its path.
pub fn extract_audio(input: &Path, work_dir: &Path, opts: &ExtractOptions, ffmpeg: &FfmpegConfig) -> Result<PathBuf, PlayerError> {
    let out_audio = work_dir.join(AUDIO_FILE_NAME);
    let args = audio_args(input, &out_audio, opts);
    log::debug!("{} {}", ffmpeg.ffmpeg, args.join(" "));

    let status = ProcCommand::new(&ffmpeg.ffmpeg)
        .args(&args)
        .status()
        .map_err(|e| PlayerError::Audio(spawn_failure(&ffmpeg.ffmpeg, &e)))?;
    if !status.success() || !out_audio.is_file() {
        return Err(PlayerError::Audio(format!(
            "ffmpeg exited with {} while extracting audio from {}",
            status,
            input.display()
        )));
    }
    log::info!("extracted audio to {}", out_audio.display());
    Ok(out_audio)
}

fn spawn_failure(program: &str, err: &std::io::Error) -> String {
    if err.kind() == ErrorKind::NotFound {
        format!("{} not found; install ffmpeg and make sure it is on PATH", program)
    } else {
        format!("running {}: {}", program, err)
    }
}

pub(crate) fn frame_args(input: &Path, work_dir: &Path, opts: &ExtractOptions) -> Vec<String> {
    let out_pattern = work_dir.join(format!("%d.{}", FRAME_EXTENSION));
    let mut args: Vec<String> = vec!["-loglevel".into(), "error".into(), "-y".into()];
    args.extend(input_args(input, opts));
    args.push("-r".into());
    args.push(opts.fps.to_string());
    args.push("-vf".into());
    args.push(format!("scale={}:{}", opts.width, opts.height));
    args.push(out_pattern.to_string_lossy().into_owned());
    args
}

pub(crate) fn audio_args(input: &Path, out_audio: &Path, opts: &ExtractOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["-loglevel".into(), "error".into(), "-y".into()];
    args.extend(input_args(input, opts));
    // Audio only, no video
    args.push("-vn".into());
    args.push(out_audio.to_string_lossy().into_owned());
    args
}

/// `[-ss start] -i input [-t duration]` for the requested clip.
fn input_args(input: &Path, opts: &ExtractOptions) -> Vec<String> {
    let start = opts.start.as_deref().filter(|s| !s.is_empty() && *s != "0");
    let end = opts.end.as_deref().filter(|e| !e.is_empty());

    let mut args = Vec::new();
    if let Some(s) = start {
        args.push("-ss".into());
        args.push(s.to_string());
    }
    args.push("-i".into());
    args.push(input.to_string_lossy().into_owned());

    match (start, end) {
        (Some(s), Some(e)) => {
            let duration = parse_timestamp(e) - parse_timestamp(s);
            if duration > 0.0 {
                args.push("-t".into());
                args.push(duration.to_string());
            }
        }
        (None, Some(e)) => {
            args.push("-t".into());
            args.push(e.to_string());
        }
        _ => {}
    }
    args
}

/// Seconds in a `[[hh:]mm:]ss[.fff]` timestamp; unparsable parts count as 0.
pub fn parse_timestamp(s: &str) -> f64 {
    s.split(':').rev().enumerate().fold(0.0, |acc, (i, v)| {
        acc + v.trim().parse::<f64>().unwrap_or(0.0) * 60f64.powi(i as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(start: Option<&str>, end: Option<&str>) -> ExtractOptions {
        ExtractOptions {
            width: 480,
            height: 360,
            fps: 30,
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("83.5"), 83.5);
        assert_eq!(parse_timestamp("01:23.5"), 83.5);
        assert_eq!(parse_timestamp("01:00:05"), 3605.0);
        assert_eq!(parse_timestamp("junk"), 0.0);
    }

    #[test]
    fn test_frame_args_full_video() {
        let args = frame_args(Path::new("movie.mp4"), Path::new("work"), &opts(None, None));
        let out = Path::new("work").join("%d.bmp").to_string_lossy().into_owned();
        assert_eq!(
            args,
            vec!["-loglevel", "error", "-y", "-i", "movie.mp4", "-r", "30", "-vf", "scale=480:360", out.as_str()]
        );
    }

    #[test]
    fn test_clip_with_start_and_end_uses_duration() {
        let args = frame_args(Path::new("movie.mp4"), Path::new("work"), &opts(Some("00:10"), Some("00:25")));
        let joined = args.join(" ");
        assert!(joined.contains("-ss 00:10 -i movie.mp4 -t 15 "));
    }

    #[test]
    fn test_clip_with_zero_start_uses_end_as_duration() {
        let args = audio_args(Path::new("movie.mp4"), Path::new("audio.wav"), &opts(Some("0"), Some("12")));
        assert_eq!(
            args,
            vec!["-loglevel", "error", "-y", "-i", "movie.mp4", "-t", "12", "-vn", "audio.wav"]
        );
    }

    #[test]
    fn test_end_before_start_is_ignored() {
        let args = audio_args(Path::new("m.mp4"), Path::new("a.wav"), &opts(Some("30"), Some("10")));
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_prepare_work_dir_only_removes_extracted_files() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("gen");
        fs::create_dir_all(&work).unwrap();
        for name in ["1.bmp", "2.bmp", "10.bmp", "audio.wav", "keep.txt", "poster.bmp"] {
            fs::write(work.join(name), b"x").unwrap();
        }
        assert_eq!(count_frames(&work), 3);

        prepare_work_dir(&work).unwrap();
        assert_eq!(count_frames(&work), 0);
        assert!(!work.join("audio.wav").exists());
        assert!(work.join("keep.txt").exists());
        assert!(work.join("poster.bmp").exists());
    }

    #[test]
    fn test_frame_number_accepts_plain_digits_only() {
        assert_eq!(frame_number(Path::new("w/12.bmp"), "bmp"), Some(12));
        assert_eq!(frame_number(Path::new("w/007.bmp"), "bmp"), Some(7));
        assert_eq!(frame_number(Path::new("w/+5.bmp"), "bmp"), None);
        assert_eq!(frame_number(Path::new("w/0.bmp"), "bmp"), None);
        assert_eq!(frame_number(Path::new("w/.bmp"), "bmp"), None);
        assert_eq!(frame_number(Path::new("w/5.png"), "bmp"), None);
        assert!(!is_frame_file(Path::new("w/+5.bmp")));
    }

    #[test]
    fn test_prepare_work_dir_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("a").join("b");
        prepare_work_dir(&work).unwrap();
        assert!(work.is_dir());
    }

    #[test]
    fn test_missing_ffmpeg_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = FfmpegConfig {
            ffmpeg: "cascii-play-no-such-ffmpeg".to_string(),
            ffplay: "ffplay".to_string(),
        };
        let err = extract_frames(Path::new("movie.mp4"), dir.path(), &opts(None, None), &ffmpeg).unwrap_err();
        assert!(matches!(err, PlayerError::Extraction(ref msg) if msg.contains("not found")));
        let err = extract_audio(Path::new("movie.mp4"), dir.path(), &opts(None, None), &ffmpeg).unwrap_err();
        assert!(matches!(err, PlayerError::Audio(_)));
    }
}
