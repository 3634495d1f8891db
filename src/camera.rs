//! Frame sources
//!
//! The detection loop pulls JPEG frames through the `FrameSource` trait. The
//! default source replays a directory of JPEG files, which keeps the pipeline
//! runnable without camera hardware; `V4l2Source` captures MJPG from a local
//! device when the `camera-v4l2` feature is enabled.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;

use crate::{Error, Result};

/// One captured frame, encoded as JPEG
#[derive(Debug, Clone)]
pub struct JpegFrame {
    bytes: Vec<u8>,
}

impl JpegFrame {
    /// Wrap raw JPEG bytes
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw JPEG bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame size in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the frame holds no data
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as the `data:image/jpeg;base64,...` URL the backend expects
    #[must_use]
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:image/jpeg;base64,{encoded}")
    }
}

/// Produces the frames fed to the detection backend
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` when the source is exhausted
    async fn next_frame(&mut self) -> Result<Option<JpegFrame>>;
}

/// Replays the JPEG files of a directory in name order
pub struct FileSource {
    files: Vec<PathBuf>,
    index: usize,
    looping: bool,
}

impl FileSource {
    /// Scan `dir` for JPEG files
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read or holds no JPEG files
    pub fn new(dir: &Path, looping: bool) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::Camera(format!(
                "no JPEG files in {}",
                dir.display()
            )));
        }

        tracing::info!(dir = %dir.display(), frames = files.len(), looping, "file frame source ready");
        Ok(Self {
            files,
            index: 0,
            looping,
        })
    }
}

#[async_trait]
impl FrameSource for FileSource {
    async fn next_frame(&mut self) -> Result<Option<JpegFrame>> {
        if self.index >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.index = 0;
        }
        let path = &self.files[self.index];
        self.index += 1;
        let bytes = tokio::fs::read(path).await?;
        Ok(Some(JpegFrame::new(bytes)))
    }
}

/// MJPG capture from a local V4L2 device
#[cfg(feature = "camera-v4l2")]
pub struct V4l2Source {
    stream: v4l::io::mmap::Stream<'static>,
}

#[cfg(feature = "camera-v4l2")]
impl V4l2Source {
    /// Open the device and negotiate MJPG capture
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or does not provide MJPG
    pub fn open(device: &str, width: u32, height: u32, fps: u32) -> Result<Self> {
        use v4l::video::Capture;

        let dev = v4l::Device::with_path(device)
            .map_err(|e| Error::Camera(format!("open {device}: {e}")))?;

        let mut format = dev
            .format()
            .map_err(|e| Error::Camera(format!("read format: {e}")))?;
        format.width = width;
        format.height = height;
        format.fourcc = v4l::FourCC::new(b"MJPG");
        let actual = dev
            .set_format(&format)
            .map_err(|e| Error::Camera(format!("set format: {e}")))?;
        if actual.fourcc != v4l::FourCC::new(b"MJPG") {
            return Err(Error::Camera(format!(
                "{device} does not provide MJPG frames (got {})",
                actual.fourcc
            )));
        }

        if let Ok(mut params) = dev.params() {
            params.interval.numerator = 1;
            params.interval.denominator = fps;
            // Best effort; drivers may pin their own rate
            let _ = dev.set_params(&params);
        }

        tracing::info!(
            device,
            width = actual.width,
            height = actual.height,
            fps,
            "v4l2 frame source ready"
        );

        // The mmap stream borrows the device for its whole life; leak the
        // device so both live until process exit.
        let dev: &'static v4l::Device = Box::leak(Box::new(dev));
        let stream = v4l::io::mmap::Stream::with_buffers(dev, v4l::buffer::Type::VideoCapture, 4)
            .map_err(|e| Error::Camera(format!("start stream: {e}")))?;

        Ok(Self { stream })
    }
}

#[cfg(feature = "camera-v4l2")]
#[async_trait]
impl FrameSource for V4l2Source {
    async fn next_frame(&mut self) -> Result<Option<JpegFrame>> {
        use v4l::io::traits::CaptureStream;

        let (data, _meta) = self
            .stream
            .next()
            .map_err(|e| Error::Camera(format!("capture: {e}")))?;
        Ok(Some(JpegFrame::new(data.to_vec())))
    }
}
