use super::{RenderError, VideoSink};
use crate::env::Frame;

/// Keeps frames in memory. Handy for inspection and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub fps: u32,
    pub frames: Vec<Frame>,
    finished: bool,
}

impl MemorySink {
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            frames: Vec::new(),
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl VideoSink for MemorySink {
    fn push_frame(&mut self, frame: &Frame) -> Result<(), RenderError> {
        if self.finished {
            return Err(RenderError::Finished);
        }
        if let Some(first) = self.frames.first() {
            let ((width, height), (got_w, got_h)) = (first.dimensions(), frame.dimensions());
            if (width, height) != (got_w, got_h) {
                return Err(RenderError::FrameSize {
                    width,
                    height,
                    got_w,
                    got_h,
                });
            }
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if self.frames.is_empty() {
            return Err(RenderError::Empty);
        }
        self.finished = true;
        Ok(())
    }
}
