use anyhow::{ensure, Result};
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_8UC3},
    imgproc,
    prelude::*,
};

/// Map an 8-bit channel value into the [-1.0, 1.0] range PoseNet expects.
pub fn normalize_channel(value: u8) -> f32 {
    (value as f32 - 127.5) / 127.5
}

/// Convert a BGR frame into a PoseNet input tensor
///
/// - nearest-neighbour resize to `size`x`size`
/// - BGR -> RGB
/// - [1, size, size, 3] f32 tensor in [-1.0, 1.0]
pub fn preprocess_for_posenet(frame: &Mat, size: i32) -> Result<Array4<f32>> {
    ensure!(frame.typ() == CV_8UC3, "expected an 8-bit BGR frame, got type {}", frame.typ());

    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(size, size),
        0.0,
        0.0,
        imgproc::INTER_NEAREST,
    )?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, 3));

    if rgb.is_continuous() {
        let bytes = rgb.data_bytes()?;
        for (dst, src) in tensor.iter_mut().zip(bytes.iter()) {
            *dst = normalize_channel(*src);
        }
    } else {
        for y in 0..size {
            for x in 0..size {
                let pixel = rgb.at_2d::<opencv::core::Vec3b>(y, x)?;
                for c in 0..3 {
                    tensor[[0, y as usize, x as usize, c]] = normalize_channel(pixel[c]);
                }
            }
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    #[test]
    fn test_normalize_channel_range() {
        assert_eq!(normalize_channel(0), -1.0);
        assert_eq!(normalize_channel(255), 1.0);
        assert!(normalize_channel(127).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_shape_and_channel_order() {
        // Solid BGR (255, 0, 0) = pure blue
        let frame = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::new(255.0, 0.0, 0.0, 0.0)).unwrap();
        let tensor = preprocess_for_posenet(&frame, 17).unwrap();

        assert_eq!(tensor.shape(), &[1, 17, 17, 3]);
        // RGB order after conversion: blue lands in the last channel
        assert_eq!(tensor[[0, 8, 8, 0]], -1.0);
        assert_eq!(tensor[[0, 8, 8, 2]], 1.0);
    }
}
