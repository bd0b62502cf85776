//! Parallel conversion of every frame index into a [`FrameStore`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::PlayerError;
use crate::extract::frame_number;
use crate::frame::{convert_frame, FrameError, GlyphFrame, RawFrame};
use crate::store::FrameStore;
use crate::Progress;

/// Where the pipeline reads raw frames from.
///
/// Indices are 1-based and dense: a source with `frame_count() == n` is
/// asked for every index in `1..=n` exactly once.
pub trait FrameSource: Sync {
    fn frame_count(&self) -> usize;

    fn read_frame(&self, index: usize) -> Result<RawFrame, FrameError>;
}

/// Numbered image files (`1.bmp`, `2.bmp`, ...) in one directory, as
/// written by the ffmpeg frame extraction.
#[derive(Debug, Clone)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
    extension: String,
    frame_count: usize,
}

impl DirectoryFrameSource {
    /// Scan `dir` for numbered `.bmp` frames.
    pub fn open(dir: &Path) -> Result<Self, PlayerError> {
        Self::with_extension(dir, "bmp")
    }

    /// Scan `dir` for numbered frames with the given extension.
    ///
    /// The frame count is the highest number found, so a gap in the
    /// sequence shows up as a missing (blank) frame rather than silently
    /// shortening the video.
    pub fn with_extension(dir: &Path, extension: &str) -> Result<Self, PlayerError> {
        if !dir.is_dir() {
            return Err(PlayerError::FrameSource {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut found = 0usize;
        let mut highest = 0usize;
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| PlayerError::FrameSource {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            if let Some(n) = frame_number(entry.path(), extension) {
                found += 1;
                highest = highest.max(n);
            }
        }

        if highest == 0 {
            return Err(PlayerError::FrameSource {
                path: dir.to_path_buf(),
                reason: format!("no numbered .{} frames", extension),
            });
        }
        if found != highest {
            log::warn!(
                "{}: found {} frames but numbering goes up to {}; gaps will play blank",
                dir.display(),
                found,
                highest
            );
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
            frame_count: highest,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding frame `index`.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", index, self.extension))
    }
}

impl FrameSource for DirectoryFrameSource {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn read_frame(&self, index: usize) -> Result<RawFrame, FrameError> {
        let path = self.frame_path(index);
        if !path.is_file() {
            return Err(FrameError::Missing { index, path });
        }
        let img = image::open(&path)
            .map_err(|source| FrameError::Decode {
                index,
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        Ok(RawFrame::from_rgb_image(index, &img))
    }
}

/// Frames already held in memory, in playback order.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    frames: Vec<RawFrame>,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self { frames }
    }
}

impl FrameSource for MemoryFrameSource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&self, index: usize) -> Result<RawFrame, FrameError> {
        index
            .checked_sub(1)
            .and_then(|i| self.frames.get(i))
            .cloned()
            .ok_or(FrameError::OutOfRange {
                index,
                count: self.frames.len(),
            })
    }
}

/// Outcome of converting a whole source.
#[derive(Debug)]
pub struct ConversionReport {
    /// Complete store: one entry per index, blank where conversion failed.
    pub store: FrameStore,
    /// Frames that were replaced by blanks, ordered by index.
    pub failures: Vec<FrameError>,
}

impl ConversionReport {
    pub fn frame_count(&self) -> usize {
        self.store.capacity()
    }

    pub fn converted(&self) -> usize {
        self.frame_count() - self.failures.len()
    }
}

/// Converts every frame of a source at a fixed target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionPipeline {
    width: u32,
    height: u32,
}

impl ConversionPipeline {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Convert a single index, mapping any failure to a blank frame.
    fn convert_index<S: FrameSource>(&self, source: &S, index: usize) -> (GlyphFrame, Option<FrameError>) {
        match source.read_frame(index) {
            Ok(raw) => (convert_frame(&raw, self.width, self.height), None),
            Err(e) => {
                log::warn!("{}; playing it blank", e);
                (GlyphFrame::blank(), Some(e))
            }
        }
    }

    /// Convert every frame of `source` in parallel.
    ///
    /// Each index is converted exactly once and written into its own store
    /// slot. Frames that fail are stored blank and listed in the report.
    pub fn convert<S, F>(&self, source: &S, progress_callback: F) -> Result<ConversionReport, PlayerError>
    where
        S: FrameSource,
        F: Fn(Progress) + Send + Sync,
    {
        let total = source.frame_count();
        let store = FrameStore::with_capacity(total);
        let completed = AtomicUsize::new(0);

        progress_callback(Progress::converting_frames(0, total));
        log::info!("converting {} frames at {}x{}", total, self.width, self.height);

        let outcomes: Vec<Option<FrameError>> = (1..=total)
            .into_par_iter()
            .map(|index| -> Result<Option<FrameError>, PlayerError> {
                let (frame, failure) = self.convert_index(source, index);
                store.insert(index, frame)?;

                let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress_callback(Progress::converting_frames(current, total));
                Ok(failure)
            })
            .collect::<Result<_, _>>()?;

        let failures: Vec<FrameError> = outcomes.into_iter().flatten().collect();
        if !store.is_complete() {
            return Err(PlayerError::NotReady(format!(
                "{} of {} frames stored after conversion",
                store.len(),
                total
            )));
        }
        if !failures.is_empty() {
            log::warn!("{} of {} frames failed to convert", failures.len(), total);
        }

        Ok(ConversionReport { store, failures })
    }
}
