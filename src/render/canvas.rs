use crate::pose::Pose;
use crate::render::skeleton::{visible_segments, POSE_COLOR};

const JOINT_RADIUS: i32 = 4;

/// 0RGB pixel buffer the preview window presents
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Out-of-bounds writes are dropped.
    pub fn put(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Copy packed 8-bit BGR rows (`stride` bytes each). Oversized sources are
    /// cropped, undersized ones leave black borders.
    pub fn blit_bgr(&mut self, bgr: &[u8], width: usize, height: usize, stride: usize) {
        self.pixels.fill(0);
        for y in 0..self.height.min(height) {
            let row = &bgr[y * stride..];
            for x in 0..self.width.min(width) {
                let b = row[x * 3] as u32;
                let g = row[x * 3 + 1] as u32;
                let r = row[x * 3 + 2] as u32;
                self.pixels[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }
    }

    /// Integer Bresenham from (x0, y0) to (x1, y1), both ends inclusive
    pub fn line(&mut self, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let step_x = (x1 - x0).signum();
        let step_y = (y1 - y0).signum();
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);

        loop {
            self.put(x, y, color);
            if (x, y) == (x1, y1) {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x += step_x;
            }
            if doubled <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    pub fn disc(&mut self, (cx, cy): (i32, i32), radius: i32, color: u32) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in (-radius..=radius).filter(|dx| dx * dx + dy * dy <= r2) {
                self.put(cx + dx, cy + dy, color);
            }
        }
    }

    /// Joints above `floor` as discs, limbs between them as 2px lines
    pub fn draw_pose(&mut self, pose: &Pose, floor: f32) {
        for kp in pose.keypoints.iter().filter(|kp| kp.is_above(floor)) {
            self.disc(kp.to_pixel(), JOINT_RADIUS, POSE_COLOR);
        }
        for (start, end) in visible_segments(pose, floor) {
            let ((x0, y0), (x1, y1)) = (start.to_pixel(), end.to_pixel());
            self.line((x0, y0), (x1, y1), POSE_COLOR);
            self.line((x0 + 1, y0), (x1 + 1, y1), POSE_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};

    #[test]
    fn test_put_ignores_out_of_bounds() {
        let mut canvas = Canvas::new(4, 4);
        canvas.put(-1, 0, 1);
        canvas.put(4, 0, 1);
        canvas.put(0, 4, 1);
        assert!(canvas.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_line_is_inclusive_both_ends() {
        let mut canvas = Canvas::new(10, 10);
        canvas.line((1, 1), (8, 5), 7);
        assert_eq!(canvas.get(1, 1), Some(7));
        assert_eq!(canvas.get(8, 5), Some(7));
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = Canvas::new(5, 5);
        canvas.line((2, 4), (2, 0), 9);
        for y in 0..5 {
            assert_eq!(canvas.get(2, y), Some(9));
        }
        assert_eq!(canvas.pixels().iter().filter(|p| **p == 9).count(), 5);
    }

    #[test]
    fn test_disc_radius() {
        let mut canvas = Canvas::new(20, 20);
        canvas.disc((10, 10), 4, 3);
        assert_eq!(canvas.get(14, 10), Some(3));
        assert_eq!(canvas.get(10, 6), Some(3));
        assert_eq!(canvas.get(14, 14), Some(0));
    }

    #[test]
    fn test_blit_bgr_packs_rgb_and_crops() {
        // 3x1 source: blue, green, red
        let bgr = [255, 0, 0, 0, 255, 0, 0, 0, 255];
        let mut canvas = Canvas::new(2, 2);
        canvas.blit_bgr(&bgr, 3, 1, 9);
        assert_eq!(canvas.get(0, 0), Some(0x0000FF));
        assert_eq!(canvas.get(1, 0), Some(0x00FF00));
        assert_eq!(canvas.get(0, 1), Some(0));
    }

    #[test]
    fn test_draw_pose_skips_low_confidence_joint() {
        let mut keypoints = [Keypoint::new(0.0, 0.0, -5.0); KeypointIndex::COUNT];
        keypoints[KeypointIndex::Nose as usize] = Keypoint::new(10.0, 10.0, 1.0);
        keypoints[KeypointIndex::LeftHip as usize] = Keypoint::new(30.0, 30.0, -2.0);
        let mut canvas = Canvas::new(40, 40);
        canvas.draw_pose(&Pose::new(keypoints), -1.0);

        assert_eq!(canvas.get(10, 10), Some(POSE_COLOR));
        assert_eq!(canvas.get(30, 30), Some(0));
        assert_eq!(canvas.get(0, 0), Some(0));
    }
}
