//! Starting audio playback alongside the frames.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcCommand, Stdio};

use crate::error::PlayerError;

/// Fire-and-forget audio playback.
///
/// `start` returns as soon as playback has been launched; the player never
/// waits on or queries the audio afterwards.
pub trait AudioPlayer {
    fn start(&mut self) -> Result<(), PlayerError>;
}

/// Plays an audio file through `ffplay` in a child process.
///
/// The child is killed when the player is dropped, so leaving playback
/// early does not leave the soundtrack running.
#[derive(Debug)]
pub struct FfplayAudio {
    ffplay: String,
    path: PathBuf,
    child: Option<Child>,
}

impl FfplayAudio {
    pub fn new(ffplay: impl Into<String>, path: &Path) -> Self {
        Self {
            ffplay: ffplay.into(),
            path: path.to_path_buf(),
            child: None,
        }
    }
}

impl AudioPlayer for FfplayAudio {
    fn start(&mut self) -> Result<(), PlayerError> {
        if !self.path.is_file() {
            return Err(PlayerError::Audio(format!("{} does not exist", self.path.display())));
        }
        let child = ProcCommand::new(&self.ffplay)
            .args(["-nodisp", "-autoexit", "-loglevel", "quiet"])
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PlayerError::Audio(format!("{} not found", self.ffplay)),
                _ => PlayerError::Audio(format!("starting {}: {}", self.ffplay, e)),
            })?;
        log::info!("playing {} (pid {})", self.path.display(), child.id());
        self.child = Some(child);
        Ok(())
    }
}

impl Drop for FfplayAudio {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Audio player that plays nothing, for muted runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioPlayer for SilentAudio {
    fn start(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }
}
