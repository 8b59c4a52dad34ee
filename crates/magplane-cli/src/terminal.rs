//! Terminal sinks for headless runs.

use std::io::Write;

use colored::Colorize;
use magplane_render::RenderFrame;
use magplane_runtime::{FrameSink, TextSink};
use magplane_types::Readout;
use tracing::warn;

/// Prints the readout every `every` frames.
pub struct ReadoutPrinter {
    every: u32,
    seen: u64,
}

impl ReadoutPrinter {
    pub fn new(every: u32) -> Self {
        Self { every, seen: 0 }
    }

    fn due(&mut self) -> bool {
        let due = self.every > 0 && self.seen % u64::from(self.every) == 0;
        self.seen += 1;
        due
    }
}

impl TextSink for ReadoutPrinter {
    fn show(&mut self, readout: &Readout) {
        if !self.due() {
            return;
        }
        let delta = match readout.delta {
            Some(d) if d > 0.0 => readout.delta_text().green(),
            Some(_) => readout.delta_text().normal(),
            None => readout.delta_text().dimmed(),
        };
        println!("  {}   {}", readout.magnitude_text().bold(), delta);
    }
}

/// Writes each frame as a JSON line.
pub struct JsonFrameWriter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonFrameWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> FrameSink for JsonFrameWriter<W> {
    fn present(&mut self, frame: &RenderFrame) {
        let written = serde_json::to_writer(&mut self.out, frame)
            .map_err(|e| e.to_string())
            .and_then(|()| writeln!(self.out).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!(tick = frame.tick, error = %e, "failed to write frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readout_printer_throttles() {
        let mut p = ReadoutPrinter::new(3);
        let due: Vec<bool> = (0..7).map(|_| p.due()).collect();
        assert_eq!(due, vec![true, false, false, true, false, false, true]);

        let mut silent = ReadoutPrinter::new(0);
        assert!(!silent.due());
    }

    #[test]
    fn json_writer_emits_one_line_per_frame() {
        let mut w = JsonFrameWriter::new(Vec::new());
        w.present(&RenderFrame {
            tick: 4,
            ..RenderFrame::default()
        });
        w.present(&RenderFrame::default());
        let text = String::from_utf8(w.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["tick"], 4);
    }
}
