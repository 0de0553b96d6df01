use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot open video destination {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("video write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("frame is {got_w}x{got_h}, stream was opened at {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        got_w: u32,
        got_h: u32,
    },

    #[error("no frames were written")]
    Empty,

    #[error("sink already finished")]
    Finished,
}
