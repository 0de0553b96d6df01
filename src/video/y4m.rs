use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{RenderError, VideoSink};
use crate::env::Frame;

/// Writes an uncompressed YUV4MPEG2 (4:4:4, full range) stream.
///
/// Frames go to `<path>.partial`; the file only appears under its real name
/// once [`VideoSink::finish`] succeeds. Dropping an unfinished writer deletes
/// the partial file.
#[derive(Debug)]
pub struct Y4mWriter {
    path: PathBuf,
    partial: PathBuf,
    fps: u32,
    out: Option<BufWriter<File>>,
    size: Option<(u32, u32)>,
    frames: usize,
}

impl Y4mWriter {
    pub fn create(path: impl AsRef<Path>, fps: u32) -> Result<Self, RenderError> {
        let path = path.as_ref().to_path_buf();
        let mut partial = OsString::from(path.as_os_str());
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let file = File::create(&partial).map_err(|source| RenderError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            partial,
            fps: fps.max(1),
            out: Some(BufWriter::new(file)),
            size: None,
            frames: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    fn discard(&mut self) {
        self.out = None;
        if let Err(err) = fs::remove_file(&self.partial) {
            tracing::warn!(path = %self.partial.display(), %err, "could not remove partial video");
        }
    }
}

impl VideoSink for Y4mWriter {
    fn push_frame(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let out = self.out.as_mut().ok_or(RenderError::Finished)?;
        let (got_w, got_h) = frame.dimensions();
        match self.size {
            None => {
                writeln!(
                    out,
                    "YUV4MPEG2 W{got_w} H{got_h} F{}:1 Ip A1:1 C444 XCOLORRANGE=FULL",
                    self.fps
                )?;
                self.size = Some((got_w, got_h));
            }
            Some((width, height)) if (width, height) != (got_w, got_h) => {
                return Err(RenderError::FrameSize {
                    width,
                    height,
                    got_w,
                    got_h,
                });
            }
            Some(_) => {}
        }

        let (y, u, v) = to_yuv444(frame);
        out.write_all(b"FRAME\n")?;
        out.write_all(&y)?;
        out.write_all(&u)?;
        out.write_all(&v)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if self.frames == 0 && self.out.is_some() {
            self.discard();
            return Err(RenderError::Empty);
        }
        let writer = self.out.take().ok_or(RenderError::Finished)?;
        if let Err(err) = writer.into_inner().map_err(|e| e.into_error()) {
            self.discard();
            return Err(err.into());
        }
        fs::rename(&self.partial, &self.path).inspect_err(|_| self.discard())?;
        tracing::debug!(path = %self.path.display(), frames = self.frames, "video written");
        Ok(())
    }
}

impl Drop for Y4mWriter {
    fn drop(&mut self) {
        if self.out.is_some() {
            self.discard();
        }
    }
}

// BT.601 full-range RGB -> YCbCr.
fn to_yuv444(frame: &Frame) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let n = frame.width() as usize * frame.height() as usize;
    let (mut y, mut u, mut v) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for px in frame.pixels() {
        let [r, g, b] = px.0.map(f64::from);
        y.push((0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8);
        u.push((128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b).round().clamp(0.0, 255.0) as u8);
        v.push((128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b).round().clamp(0.0, 255.0) as u8);
    }
    (y, u, v)
}
