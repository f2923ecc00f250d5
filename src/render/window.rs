use anyhow::{ensure, Result};
use minifb::{Key, Window, WindowOptions};
use opencv::core::{Mat, CV_8UC3};
use opencv::prelude::*;

use crate::pose::Pose;
use crate::render::canvas::Canvas;

/// Preview window backed by minifb
pub struct MinifbRenderer {
    window: Window,
    title: String,
    canvas: Canvas,
}

impl MinifbRenderer {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            title: title.to_string(),
            canvas: Canvas::new(width, height),
        })
    }

    /// False once the window is closed or ESC is held
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    pub fn draw_frame(&mut self, frame: &Mat) -> Result<()> {
        ensure!(frame.typ() == CV_8UC3, "preview expects an 8-bit BGR frame");
        let continuous;
        let frame = if frame.is_continuous() {
            frame
        } else {
            continuous = frame.try_clone()?;
            &continuous
        };
        let (width, height) = (frame.cols() as usize, frame.rows() as usize);
        self.canvas.blit_bgr(frame.data_bytes()?, width, height, width * 3);
        Ok(())
    }

    pub fn draw_pose(&mut self, pose: &Pose, floor: f32) {
        self.canvas.draw_pose(pose, floor);
    }

    pub fn show_fps(&mut self, fps: f32) {
        self.window.set_title(&format!("{} - FPS {:.2}", self.title, fps));
    }

    pub fn update(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(self.canvas.pixels(), self.canvas.width(), self.canvas.height())?;
        Ok(())
    }
}
