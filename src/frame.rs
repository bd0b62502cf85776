//! Raw frames, glyph frames and the conversion between them.

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;

use crate::glyph::compute_glyph;

/// Why a single frame could not be converted.
///
/// These never abort a run; the pipeline records them and draws a blank
/// frame for the affected index instead.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame {index}: cannot decode {}: {source}", path.display())]
    Decode {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame {index}: {} is missing", path.display())]
    Missing { index: usize, path: PathBuf },
    #[error("frame {index} is outside 1..={count}")]
    OutOfRange { index: usize, count: usize },
    #[error("frame {index}: expected {expected} samples, got {actual}")]
    BadLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

impl FrameError {
    /// Frame index the error belongs to.
    pub fn index(&self) -> usize {
        match self {
            FrameError::Decode { index, .. }
            | FrameError::Missing { index, .. }
            | FrameError::OutOfRange { index, .. }
            | FrameError::BadLength { index, .. } => *index,
        }
    }
}

/// A decoded video frame: row-major RGB samples with a 1-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    index: usize,
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl RawFrame {
    /// Build a frame from row-major samples.
    ///
    /// A short sample buffer is accepted; pixels past its end read as
    /// missing and the converter skips the rows they fall in.
    pub fn new(index: usize, width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        if pixels.len() > expected {
            return Err(FrameError::BadLength {
                index,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            index,
            width,
            height,
            pixels,
        })
    }

    /// Frame filled with a single color, mostly useful for fixtures.
    pub fn filled(index: usize, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            index,
            width,
            height,
            pixels: vec![rgb; width as usize * height as usize],
        }
    }

    pub fn from_rgb_image(index: usize, img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.pixels().map(|px| px.0).collect();
        Self {
            index,
            width,
            height,
            pixels,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sample at `(x, y)`, or `None` when it lies outside the grid.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// One converted frame of glyph art.
///
/// Stored as a single text blob where every row is preceded by a newline,
/// the exact byte sequence written to the terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphFrame {
    text: String,
}

impl GlyphFrame {
    /// Placeholder for a frame that could not be converted.
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_text(text: String) -> Self {
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// Rows of the frame, without the leading newline.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        let body = self.text.strip_prefix('\n').unwrap_or(&self.text);
        (!self.text.is_empty()).then(|| body.split('\n')).into_iter().flatten()
    }
}

/// Convert a raw frame to glyph art at the given target size.
///
/// The last row and the last column of the target area are trimmed, so a
/// `width` x `height` target yields `height - 1` rows of `width - 1` glyphs.
/// A row containing an unreadable sample is emitted empty instead of
/// failing the whole frame.
pub fn convert_frame(raw: &RawFrame, width: u32, height: u32) -> GlyphFrame {
    let cols = width.saturating_sub(1);
    let rows = height.saturating_sub(1);
    if cols == 0 || rows == 0 {
        return GlyphFrame::blank();
    }

    let mut out = String::with_capacity((cols as usize + 1) * rows as usize);
    let mut row = String::with_capacity(cols as usize);
    for y in 0..rows {
        out.push('\n');
        row.clear();
        let complete = (0..cols).all(|x| match raw.pixel(x, y) {
            Some([r, g, b]) => {
                row.push(compute_glyph(r, g, b));
                true
            }
            None => false,
        });
        if complete {
            out.push_str(&row);
        } else {
            log::debug!("frame {}: row {} has unreadable samples, skipped", raw.index(), y);
        }
    }
    GlyphFrame::from_text(out)
}
