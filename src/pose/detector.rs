use anyhow::{ensure, Context, Result};
use log::{debug, info};
use ndarray::{ArrayViewD, Axis, Ix3};
use opencv::core::Mat;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::decode::decode_pose;
use super::keypoint::{FrameSize, Pose};
use super::preprocess::preprocess_for_posenet;
use crate::config::ModelConfig;

/// Single-person PoseNet (MobileNet v1) detector
pub struct PoseDetector {
    session: Session,
    input_name: String,
    heatmap_output: String,
    offset_output: String,
    input_size: i32,
}

impl PoseDetector {
    /// Load the ONNX model and resolve its tensor names
    ///
    /// Unset names fall back to the first input, the first output (heatmaps)
    /// and the second output (offsets).
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.threads)?
            .commit_from_file(&config.path)
            .with_context(|| format!("Failed to load ONNX model {}", config.path.display()))?;

        let input_name = match &config.input_name {
            Some(name) => name.clone(),
            None => session.inputs.first().map(|i| i.name.clone()).context("model has no inputs")?,
        };
        let heatmap_output = match &config.heatmap_output {
            Some(name) => name.clone(),
            None => session.outputs.first().map(|o| o.name.clone()).context("model has no heatmap output")?,
        };
        let offset_output = match &config.offset_output {
            Some(name) => name.clone(),
            None => session.outputs.get(1).map(|o| o.name.clone()).context("model has no offset output")?,
        };

        info!(
            "model {} loaded: input '{}' ({}x{}), heatmaps '{}', offsets '{}'",
            config.path.display(),
            input_name,
            config.input_size,
            config.input_size,
            heatmap_output,
            offset_output
        );

        Ok(Self {
            session,
            input_name,
            heatmap_output,
            offset_output,
            input_size: config.input_size,
        })
    }

    /// Run the model on a BGR frame and decode the pose in frame pixels
    pub fn detect(&mut self, frame: &Mat) -> Result<Pose> {
        let frame_size = FrameSize::new(frame.cols() as u32, frame.rows() as u32);
        let input = preprocess_for_posenet(frame, self.input_size)?;
        let input_tensor = Tensor::from_array(input)?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        // [1, rows, cols, 17]
        let heatmaps: ArrayViewD<f32> = outputs[self.heatmap_output.as_str()]
            .try_extract_array()
            .context("Failed to extract heatmap tensor")?;
        // [1, rows, cols, 34]
        let offsets: ArrayViewD<f32> = outputs[self.offset_output.as_str()]
            .try_extract_array()
            .context("Failed to extract offset tensor")?;

        debug!("heatmaps {:?}, offsets {:?}", heatmaps.shape(), offsets.shape());

        let heatmaps = strip_batch(heatmaps).context("unexpected heatmap shape")?;
        let offsets = strip_batch(offsets).context("unexpected offset shape")?;

        decode_pose(heatmaps, offsets, frame_size)
    }
}

fn strip_batch(tensor: ArrayViewD<f32>) -> Result<ndarray::ArrayView3<f32>> {
    ensure!(
        tensor.ndim() == 4 && tensor.shape()[0] >= 1,
        "expected [1, rows, cols, channels], got {:?}",
        tensor.shape()
    );
    Ok(tensor.index_axis_move(Axis(0), 0).into_dimensionality::<Ix3>()?)
}
