//! Write-once storage for converted frames.

use std::sync::OnceLock;

use thiserror::Error;

use crate::frame::GlyphFrame;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("frame {index} is outside 1..={capacity}")]
    OutOfRange { index: usize, capacity: usize },
    #[error("frame {0} was already stored")]
    AlreadyStored(usize),
}

/// Fixed-size arena holding one slot per frame index `1..=N`.
///
/// Each slot is written at most once. Writes to different slots may happen
/// concurrently from any number of threads; once conversion has finished the
/// store is only read.
#[derive(Debug)]
pub struct FrameStore {
    slots: Vec<OnceLock<GlyphFrame>>,
}

impl FrameStore {
    /// Create an empty store with `frame_count` slots.
    pub fn with_capacity(frame_count: usize) -> Self {
        Self {
            slots: (0..frame_count).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Number of frame slots (N).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every index in `1..=N` holds a frame (possibly blank).
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.get().is_some())
    }

    /// Store the frame for a 1-based `index`.
    pub fn insert(&self, index: usize, frame: GlyphFrame) -> Result<(), StoreError> {
        self.slot(index)?
            .set(frame)
            .map_err(|_| StoreError::AlreadyStored(index))
    }

    /// Frame at a 1-based `index`, if it was stored.
    pub fn get(&self, index: usize) -> Option<&GlyphFrame> {
        self.slot(index).ok().and_then(OnceLock::get)
    }

    /// Indices whose frame is missing or blank.
    pub fn blank_indices(&self) -> Vec<usize> {
        (1..=self.capacity())
            .filter(|&i| self.get(i).map_or(true, GlyphFrame::is_blank))
            .collect()
    }

    fn slot(&self, index: usize) -> Result<&OnceLock<GlyphFrame>, StoreError> {
        index
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .ok_or(StoreError::OutOfRange {
                index,
                capacity: self.capacity(),
            })
    }
}
