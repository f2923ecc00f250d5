//! PoseNet single-pose decoding.
//!
//! The model emits a coarse `[rows, cols, 17]` heatmap and a
//! `[rows, cols, 34]` offset map (17 y-offsets followed by 17 x-offsets, in
//! source-frame pixels). Each joint is placed at its strongest heatmap cell,
//! scaled onto the frame and refined by that cell's offset.

use anyhow::{ensure, Result};
use ndarray::ArrayView3;

use super::keypoint::{FrameSize, Keypoint, KeypointIndex, Pose};

/// Channels in the offset tensor: y offsets then x offsets.
pub const OFFSET_CHANNELS: usize = KeypointIndex::COUNT * 2;

/// Grid cell with the highest activation for one joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GridPeak {
    pub row: usize,
    pub col: usize,
    pub score: f32,
}

/// Argmax over the heatmap grid for `joint`.
///
/// Scans rows then columns starting at (0, 0); a cell only wins when its
/// score is strictly greater, so ties resolve to the first cell scanned.
///
/// The grid must be non-empty and `joint` below the channel count; callers
/// go through [`decode_pose`], which checks both.
pub(crate) fn find_peak(heatmaps: &ArrayView3<f32>, joint: usize) -> GridPeak {
    let (rows, cols, _) = heatmaps.dim();
    let mut peak = GridPeak {
        row: 0,
        col: 0,
        score: heatmaps[[0, 0, joint]],
    };
    for row in 0..rows {
        for col in 0..cols {
            let score = heatmaps[[row, col, joint]];
            if score > peak.score {
                peak = GridPeak { row, col, score };
            }
        }
    }
    peak
}

/// Decode one pose from batch-stripped heatmap and offset tensors.
pub fn decode_pose(
    heatmaps: ArrayView3<f32>,
    offsets: ArrayView3<f32>,
    frame: FrameSize,
) -> Result<Pose> {
    let (rows, cols, joints) = heatmaps.dim();
    let (offset_rows, offset_cols, offset_channels) = offsets.dim();

    ensure!(!frame.is_empty(), "frame has zero size: {}x{}", frame.width, frame.height);
    ensure!(
        joints == KeypointIndex::COUNT,
        "heatmap has {} channels, expected {}",
        joints,
        KeypointIndex::COUNT
    );
    ensure!(
        offset_channels == OFFSET_CHANNELS,
        "offset map has {} channels, expected {}",
        offset_channels,
        OFFSET_CHANNELS
    );
    ensure!(
        rows == offset_rows && cols == offset_cols,
        "heatmap grid {}x{} does not match offset grid {}x{}",
        rows,
        cols,
        offset_rows,
        offset_cols
    );
    ensure!(rows >= 2 && cols >= 2, "grid {}x{} is too small to scale", rows, cols);

    // Cell (rows-1, cols-1) lands on the far frame edge.
    let scale_y = frame.height as f32 / (rows - 1) as f32;
    let scale_x = frame.width as f32 / (cols - 1) as f32;

    let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
    for (joint, keypoint) in keypoints.iter_mut().enumerate() {
        let peak = find_peak(&heatmaps, joint);
        let dy = offsets[[peak.row, peak.col, joint]];
        let dx = offsets[[peak.row, peak.col, joint + KeypointIndex::COUNT]];
        *keypoint = Keypoint::new(
            peak.col as f32 * scale_x + dx,
            peak.row as f32 * scale_y + dy,
            peak.score,
        );
    }

    Ok(Pose::new(keypoints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    const GRID: usize = 9;

    fn empty_tensors() -> (Array3<f32>, Array3<f32>) {
        (
            Array3::from_elem((GRID, GRID, KeypointIndex::COUNT), -5.0),
            Array3::zeros((GRID, GRID, OFFSET_CHANNELS)),
        )
    }

    #[test]
    fn test_find_peak_picks_maximum() {
        let (mut heatmaps, _) = empty_tensors();
        heatmaps[[4, 7, 3]] = 2.5;
        heatmaps[[1, 1, 3]] = 1.0;

        let peak = find_peak(&heatmaps.view(), 3);
        assert_eq!((peak.row, peak.col), (4, 7));
        assert_eq!(peak.score, 2.5);
    }

    #[test]
    fn test_find_peak_tie_keeps_first_scanned() {
        let (mut heatmaps, _) = empty_tensors();
        heatmaps[[2, 5, 0]] = 1.0;
        heatmaps[[6, 1, 0]] = 1.0;

        let peak = find_peak(&heatmaps.view(), 0);
        assert_eq!((peak.row, peak.col), (2, 5));
    }

    #[test]
    fn test_find_peak_uniform_grid_is_origin() {
        let (heatmaps, _) = empty_tensors();
        let peak = find_peak(&heatmaps.view(), 16);
        assert_eq!((peak.row, peak.col), (0, 0));
        assert_eq!(peak.score, -5.0);
    }

    #[test]
    fn test_decode_scales_grid_and_adds_offsets() {
        let (mut heatmaps, mut offsets) = empty_tensors();
        let joint = KeypointIndex::LeftWrist as usize;
        heatmaps[[4, 2, joint]] = 0.8;
        offsets[[4, 2, joint]] = 3.0;
        offsets[[4, 2, joint + KeypointIndex::COUNT]] = -2.0;

        let pose = decode_pose(heatmaps.view(), offsets.view(), FrameSize::new(640, 480)).unwrap();
        let kp = pose.get(KeypointIndex::LeftWrist);

        // 4 * 480 / 8 + 3, 2 * 640 / 8 - 2
        assert_relative_eq!(kp.y, 243.0);
        assert_relative_eq!(kp.x, 158.0);
        assert_relative_eq!(kp.confidence, 0.8);
    }

    #[test]
    fn test_decode_last_cell_reaches_frame_edge() {
        let (mut heatmaps, offsets) = empty_tensors();
        heatmaps[[GRID - 1, GRID - 1, 0]] = 1.0;

        let pose = decode_pose(heatmaps.view(), offsets.view(), FrameSize::new(640, 480)).unwrap();
        let nose = pose.get(KeypointIndex::Nose);
        assert_relative_eq!(nose.x, 640.0);
        assert_relative_eq!(nose.y, 480.0);
    }

    #[test]
    fn test_decode_uses_winning_cell_offsets_only() {
        let (mut heatmaps, mut offsets) = empty_tensors();
        heatmaps[[1, 1, 5]] = 4.0;
        offsets[[0, 0, 5]] = 100.0;
        offsets[[1, 1, 5]] = 1.5;

        let pose = decode_pose(heatmaps.view(), offsets.view(), FrameSize::new(800, 800)).unwrap();
        assert_relative_eq!(pose.get(KeypointIndex::LeftShoulder).y, 101.5);
    }

    #[test]
    fn test_decode_every_joint_is_independent() {
        let (mut heatmaps, offsets) = empty_tensors();
        for joint in 0..KeypointIndex::COUNT {
            heatmaps[[joint % GRID, (joint * 2) % GRID, joint]] = joint as f32;
        }

        let pose = decode_pose(heatmaps.view(), offsets.view(), FrameSize::new(800, 800)).unwrap();
        for (index, kp) in pose.iter() {
            let joint = index as usize;
            assert_relative_eq!(kp.y, (joint % GRID) as f32 * 100.0);
            assert_relative_eq!(kp.x, ((joint * 2) % GRID) as f32 * 100.0);
        }
    }

    #[test]
    fn test_decode_non_square_grid_scales_each_axis() {
        let mut heatmaps = Array3::from_elem((5, 9, KeypointIndex::COUNT), -5.0);
        let offsets = Array3::zeros((5, 9, OFFSET_CHANNELS));
        heatmaps[[4, 8, 0]] = 1.0;
        heatmaps[[2, 3, 1]] = 1.0;

        let pose = decode_pose(heatmaps.view(), offsets.view(), FrameSize::new(640, 480)).unwrap();
        let nose = pose.get(KeypointIndex::Nose);
        assert_relative_eq!(nose.x, 640.0);
        assert_relative_eq!(nose.y, 480.0);

        // 3 * 640 / 8, 2 * 480 / 4
        let eye = pose.get(KeypointIndex::LeftEye);
        assert_relative_eq!(eye.x, 240.0);
        assert_relative_eq!(eye.y, 240.0);
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        let frame = FrameSize::new(640, 480);
        let heatmaps = Array3::<f32>::zeros((9, 9, 17));

        let wrong_channels = Array3::<f32>::zeros((9, 9, 17));
        assert!(decode_pose(heatmaps.view(), wrong_channels.view(), frame).is_err());

        let wrong_grid = Array3::<f32>::zeros((8, 9, 34));
        assert!(decode_pose(heatmaps.view(), wrong_grid.view(), frame).is_err());

        let tiny_heat = Array3::<f32>::zeros((1, 1, 17));
        let tiny_off = Array3::<f32>::zeros((1, 1, 34));
        assert!(decode_pose(tiny_heat.view(), tiny_off.view(), frame).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_frame() {
        let (heatmaps, offsets) = empty_tensors();
        assert!(decode_pose(heatmaps.view(), offsets.view(), FrameSize::new(0, 0)).is_err());
    }
}
