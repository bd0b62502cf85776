//! Terminal output.

use std::io::{self, Write};

use crate::frame::GlyphFrame;

const CLEAR_SCREEN: &str = "\x1b[2J";
const CURSOR_TO_ORIGIN: &str = "\x1b[0;0H";

/// Sink for glyph frames during playback.
pub trait Renderer {
    /// Clear the whole screen once before playback starts.
    fn clear(&mut self) -> io::Result<()>;

    /// Put the cursor back at the top left corner.
    fn move_to_origin(&mut self) -> io::Result<()>;

    /// Draw one frame at the cursor position.
    fn write_frame(&mut self, frame: &GlyphFrame) -> io::Result<()>;
}

/// Renders to a terminal with ANSI escape sequences.
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn clear(&mut self) -> io::Result<()> {
        self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        self.out.flush()
    }

    fn move_to_origin(&mut self) -> io::Result<()> {
        self.out.write_all(CURSOR_TO_ORIGIN.as_bytes())
    }

    fn write_frame(&mut self, frame: &GlyphFrame) -> io::Result<()> {
        if !frame.is_blank() {
            self.out.write_all(frame.as_str().as_bytes())?;
        }
        self.out.flush()
    }
}
