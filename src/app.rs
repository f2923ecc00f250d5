//! The capture → infer → decode → send loop.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::camera::OpenCvCamera;
use crate::config::Config;
use crate::fps::FpsMeter;
use crate::osc::{OscSender, CONFIDENCE_FLOOR};
use crate::pose::{FrameSize, PoseDetector};
use crate::render::MinifbRenderer;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    EndOfStream,
    WindowClosed,
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub reason: StopReason,
    pub frames: u64,
    pub send_failures: u64,
}

/// What to do when the source runs out of frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfStream {
    Restart,
    Stop,
}

/// Decide between restarting and stopping at end-of-stream.
///
/// `rewind` is only called when looping is on and the source produced at
/// least one frame since the last rewind; a file that yields nothing after
/// a rewind would otherwise spin forever.
pub fn on_end_of_stream<F>(loop_playback: bool, frames_since_rewind: u64, rewind: F) -> Result<EndOfStream>
where
    F: FnOnce() -> Result<bool>,
{
    if loop_playback && frames_since_rewind > 0 && rewind()? {
        return Ok(EndOfStream::Restart);
    }
    Ok(EndOfStream::Stop)
}

/// Preview window size for a captured frame, `None` when the frame is empty
pub fn preview_size(frame: FrameSize) -> Option<(usize, usize)> {
    if frame.is_empty() {
        return None;
    }
    Some((frame.width as usize, frame.height as usize))
}

/// Run until `shutdown` is set, the source ends or the preview is closed
pub fn run(config: &Config, shutdown: &AtomicBool) -> Result<RunSummary> {
    let sender = OscSender::new(&config.osc.target, config.osc.address_style)
        .context("failed to create OSC socket")?;
    info!("OSC target {} ({:?} addresses)", sender.target(), sender.style());

    let mut detector = PoseDetector::new(&config.model)?;

    let mut camera = OpenCvCamera::open(&config.camera).context("failed to open video source")?;

    // Some backends report 0x0 until the first read, so the window is sized
    // from the first frame.
    let mut renderer: Option<MinifbRenderer> = None;
    if config.preview.enabled {
        info!("Start grabbing, press ESC in the preview window to stop");
    }

    let mut fps = FpsMeter::new();
    let mut fps_log_timer = Instant::now();
    let mut frames = 0u64;
    let mut frames_since_rewind = 0u64;
    let mut send_failures = 0u64;

    let reason = loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("interrupt received, finishing");
            break StopReason::Interrupted;
        }

        let frame = match camera.read_frame()? {
            Some(frame) => frame,
            None => {
                match on_end_of_stream(config.camera.loop_playback, frames_since_rewind, || camera.rewind())? {
                    EndOfStream::Restart => {
                        info!("end of {}, restarting", camera.source());
                        frames_since_rewind = 0;
                        continue;
                    }
                    EndOfStream::Stop => {
                        info!("end of stream");
                        break StopReason::EndOfStream;
                    }
                }
            }
        };
        frames += 1;
        frames_since_rewind += 1;

        let frame_size = FrameSize::new(frame.cols() as u32, frame.rows() as u32);
        let pose = detector.detect(&frame)?;

        let stats = sender.publish(frame_size, &pose);
        if stats.failed > 0 {
            send_failures += stats.failed as u64;
        }

        for (index, kp) in pose.iter() {
            debug!(
                "{:<14} px=({:.1}, {:.1}) confidence={:.3}",
                index.label(),
                kp.x,
                kp.y,
                kp.confidence
            );
        }

        let average_fps = fps.tick();

        if config.preview.enabled && renderer.is_none() {
            if let Some((width, height)) = preview_size(frame_size) {
                renderer = Some(MinifbRenderer::new(&config.preview.title, width, height)?);
            }
        }

        if let Some(r) = renderer.as_mut() {
            r.draw_frame(&frame)?;
            r.draw_pose(&pose, CONFIDENCE_FLOOR);
            r.show_fps(average_fps);
            r.update()?;
            if !r.is_open() {
                break StopReason::WindowClosed;
            }
        }

        if fps_log_timer.elapsed().as_secs_f32() >= 1.0 {
            info!(
                "FPS {:.2} | frame {}x{} | avg confidence {:.2} | sent {}",
                average_fps,
                frame_size.width,
                frame_size.height,
                pose.average_confidence(),
                stats.sent
            );
            fps_log_timer = Instant::now();
        }
    };

    drop(sender);
    info!("OSC socket closed");

    camera.release()?;
    info!("Closed {}", camera.source());

    if send_failures > 0 {
        warn!("{} OSC messages failed to send", send_failures);
    }

    Ok(RunSummary {
        reason,
        frames,
        send_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_end_of_stream_loops_after_frames() {
        let rewound = Cell::new(false);
        let action = on_end_of_stream(true, 120, || {
            rewound.set(true);
            Ok(true)
        })
        .unwrap();
        assert_eq!(action, EndOfStream::Restart);
        assert!(rewound.get());
    }

    #[test]
    fn test_end_of_stream_without_loop_stops() {
        let rewound = Cell::new(false);
        let action = on_end_of_stream(false, 120, || {
            rewound.set(true);
            Ok(true)
        })
        .unwrap();
        assert_eq!(action, EndOfStream::Stop);
        assert!(!rewound.get());
    }

    #[test]
    fn test_end_of_stream_no_frames_since_rewind_stops() {
        let rewound = Cell::new(false);
        let action = on_end_of_stream(true, 0, || {
            rewound.set(true);
            Ok(true)
        })
        .unwrap();
        assert_eq!(action, EndOfStream::Stop);
        assert!(!rewound.get());
    }

    #[test]
    fn test_end_of_stream_failed_seek_stops() {
        let action = on_end_of_stream(true, 10, || Ok(false)).unwrap();
        assert_eq!(action, EndOfStream::Stop);
    }

    #[test]
    fn test_end_of_stream_seek_error_propagates() {
        let result = on_end_of_stream(true, 10, || anyhow::bail!("seek failed"));
        assert!(result.is_err());
    }

    #[test]
    fn test_preview_size_from_frame() {
        assert_eq!(preview_size(FrameSize::new(640, 480)), Some((640, 480)));
        assert_eq!(preview_size(FrameSize::new(0, 0)), None);
        assert_eq!(preview_size(FrameSize::new(640, 0)), None);
    }
}
