//! Fixed-interval playback of converted frames.
//!
//! Playback is a single thread walking frame indices `1..=N`. Every tick
//! moves the cursor home, draws the frame, and sleeps for one interval.
//! There is no catch-up: a slow frame delays everything after it.

use std::time::{Duration, Instant};

use crate::audio::AudioPlayer;
use crate::error::PlayerError;
use crate::frame::GlyphFrame;
use crate::render::Renderer;
use crate::store::FrameStore;

/// Milliseconds shaved off each interval to cover the cost of drawing.
pub const DEFAULT_FRAME_OVERHEAD_MS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Waiting for frames and audio.
    Idle,
    Running,
    /// Every frame has been emitted.
    Done,
}

/// Current frame index and the fixed delay between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    index: usize,
    frame_count: usize,
    interval: Duration,
}

impl PlaybackClock {
    /// Clock for `frame_count` frames at `fps`.
    ///
    /// The interval is `1000 / fps` whole milliseconds minus the overhead.
    pub fn new(frame_count: usize, fps: u32, overhead_ms: u64) -> Result<Self, PlayerError> {
        if fps == 0 {
            return Err(PlayerError::InvalidOptions("fps must be at least 1".to_string()));
        }
        let interval_ms = (1000 / fps as u64).saturating_sub(overhead_ms);
        Ok(Self {
            index: 1,
            frame_count,
            interval: Duration::from_millis(interval_ms),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_exhausted(&self) -> bool {
        self.index > self.frame_count
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

/// Blocks the playback thread between frames.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<F: FnMut(Duration)> Sleeper for F {
    fn sleep(&mut self, duration: Duration) {
        self(duration)
    }
}

/// What happened during a finished playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames_emitted: usize,
    pub blank_frames: usize,
    pub elapsed: Duration,
}

/// Drives a [`Renderer`] through every stored frame at a fixed rate.
#[derive(Debug)]
pub struct PlaybackScheduler {
    clock: PlaybackClock,
    state: PlaybackState,
}

impl PlaybackScheduler {
    pub fn new(frame_count: usize, fps: u32, overhead_ms: u64) -> Result<Self, PlayerError> {
        Ok(Self {
            clock: PlaybackClock::new(frame_count, fps, overhead_ms)?,
            state: PlaybackState::Idle,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Play every frame of `store`, starting `audio` right after the screen
    /// is cleared.
    ///
    /// Refuses to start unless the store holds an entry for every index.
    /// Every tick hands the renderer exactly one frame; missing entries are
    /// passed as blank frames, which draw nothing.
    pub fn play<R, A, S>(&mut self, store: &FrameStore, renderer: &mut R, audio: &mut A, sleeper: &mut S) -> Result<PlaybackSummary, PlayerError>
    where
        R: Renderer + ?Sized,
        A: AudioPlayer + ?Sized,
        S: Sleeper + ?Sized,
    {
        if self.state != PlaybackState::Idle {
            return Err(PlayerError::NotReady(format!("playback already {:?}", self.state)));
        }
        if store.capacity() != self.clock.frame_count {
            return Err(PlayerError::NotReady(format!(
                "store has {} slots, expected {}",
                store.capacity(),
                self.clock.frame_count
            )));
        }
        if !store.is_complete() {
            return Err(PlayerError::NotReady(format!(
                "only {} of {} frames converted",
                store.len(),
                store.capacity()
            )));
        }

        renderer.clear()?;
        audio.start()?;
        self.state = PlaybackState::Running;
        log::info!(
            "playing {} frames every {:?}",
            self.clock.frame_count,
            self.clock.interval
        );

        let nothing = GlyphFrame::blank();
        let started = Instant::now();
        let mut emitted = 0;
        let mut blank = 0;
        while !self.clock.is_exhausted() {
            renderer.move_to_origin()?;
            let frame = store.get(self.clock.index()).unwrap_or(&nothing);
            if frame.is_blank() {
                blank += 1;
            }
            renderer.write_frame(frame)?;
            emitted += 1;
            self.clock.advance();
            sleeper.sleep(self.clock.interval);
        }

        self.state = PlaybackState::Done;
        Ok(PlaybackSummary {
            frames_emitted: emitted,
            blank_frames: blank,
            elapsed: started.elapsed(),
        })
    }
}
