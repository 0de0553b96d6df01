//! Frame sinks for rendered trajectories.

mod errors;
mod memory;
mod y4m;

pub use errors::RenderError;
pub use memory::MemorySink;
pub use y4m::Y4mWriter;

use crate::env::Frame;

/// Receives an ordered stream of frames and turns it into a video.
///
/// A sink that errors, or is dropped before [`VideoSink::finish`] returns
/// `Ok`, must not leave output that looks complete.
pub trait VideoSink {
    fn push_frame(&mut self, frame: &Frame) -> Result<(), RenderError>;
    fn finish(&mut self) -> Result<(), RenderError>;
}
