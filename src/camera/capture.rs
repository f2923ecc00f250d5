use anyhow::{bail, Context, Result};
use log::info;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};

use crate::config::{CameraConfig, VideoSource};
use crate::pose::FrameSize;

/// OpenCV capture from a device or a video file
pub struct OpenCvCamera {
    capture: VideoCapture,
    source: VideoSource,
    width: u32,
    height: u32,
}

impl OpenCvCamera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        Self::open_source(config.source(), config.width, config.height)
    }

    /// Open `source`, requesting a capture size for devices
    pub fn open_source(source: VideoSource, width: Option<u32>, height: Option<u32>) -> Result<Self> {
        let mut capture = match &source {
            VideoSource::Device(index) => {
                VideoCapture::new(*index, VideoCaptureAPIs::CAP_ANY as i32)
            }
            VideoSource::File(path) => VideoCapture::from_file(
                &path.to_string_lossy(),
                VideoCaptureAPIs::CAP_ANY as i32,
            ),
        }
        .with_context(|| format!("Unable to open {}", source))?;

        if !capture.is_opened()? {
            bail!("Unable to open {}", source);
        }

        if let VideoSource::Device(_) = source {
            if let Some(w) = width {
                capture.set(videoio::CAP_PROP_FRAME_WIDTH, w as f64)?;
            }
            if let Some(h) = height {
                capture.set(videoio::CAP_PROP_FRAME_HEIGHT, h as f64)?;
            }
        }

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        info!("{} opened: {}x{} @ {:.1} fps", source, actual_width, actual_height, fps);

        Ok(Self {
            capture,
            source,
            width: actual_width,
            height: actual_height,
        })
    }

    pub fn source(&self) -> &VideoSource {
        &self.source
    }

    /// Size reported by the backend at open time
    pub fn resolution(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Next BGR frame, or `None` at end-of-stream
    pub fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// Seek a file back to its first frame. Devices can not rewind.
    pub fn rewind(&mut self) -> Result<bool> {
        if let VideoSource::File(_) = self.source {
            return Ok(self.capture.set(videoio::CAP_PROP_POS_FRAMES, 0.0)?);
        }
        Ok(false)
    }

    pub fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        Ok(())
    }
}

/// Device indices below `max` that open, with their default size
pub fn probe(max: i32) -> Vec<(i32, FrameSize)> {
    let mut found = Vec::new();
    for index in 0..max {
        if let Ok(camera) = OpenCvCamera::open_source(VideoSource::Device(index), None, None) {
            found.push((index, camera.resolution()));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Size, CV_8UC3};
    use opencv::videoio::VideoWriter;
    use std::path::PathBuf;

    fn write_clip(name: &str, frames: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pose2osc-{}-{}.avi", name, std::process::id()));
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap();
        let mut writer = VideoWriter::new_with_backend(
            &path.to_string_lossy(),
            videoio::CAP_OPENCV_MJPEG,
            fourcc,
            10.0,
            Size::new(64, 48),
            true,
        )
        .unwrap();
        assert!(writer.is_opened().unwrap());

        for i in 0..frames {
            let shade = (i * 40) as f64;
            let frame = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::new(shade, 0.0, 0.0, 0.0)).unwrap();
            writer.write(&frame).unwrap();
        }
        writer.release().unwrap();
        path
    }

    #[test]
    fn test_open_missing_file_fails() {
        let source = VideoSource::File(PathBuf::from("nope-does-not-exist.mp4"));
        let err = OpenCvCamera::open_source(source, None, None).err().unwrap();
        assert!(err.to_string().contains("Unable to open file"));
    }

    #[test]
    fn test_file_ends_then_rewinds() {
        let path = write_clip("rewind", 5);
        let mut camera = OpenCvCamera::open_source(VideoSource::File(path.clone()), None, None).unwrap();

        let mut read = 0;
        while let Some(frame) = camera.read_frame().unwrap() {
            assert_eq!((frame.cols(), frame.rows()), (64, 48));
            read += 1;
            assert!(read <= 5);
        }
        assert!(read > 0);
        assert!(camera.read_frame().unwrap().is_none());

        assert!(camera.rewind().unwrap());
        assert!(camera.read_frame().unwrap().is_some());

        camera.release().unwrap();
        let _ = std::fs::remove_file(path);
    }
}
