//! Output seams.
//!
//! The runner hands every frame to a [`FrameSink`] and the current readout
//! to a [`TextSink`].  Both are called from the runner task, once per tick,
//! after the frame is complete.

use magplane_render::RenderFrame;
use magplane_types::Readout;

pub trait FrameSink: Send {
    fn present(&mut self, frame: &RenderFrame);
}

pub trait TextSink: Send {
    fn show(&mut self, readout: &Readout);
}

/// Discards everything.  Used for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &RenderFrame) {}
}

impl TextSink for NullSink {
    fn show(&mut self, _readout: &Readout) {}
}
