pub mod decode;
#[cfg(feature = "desktop")]
pub mod detector;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod preprocess;

pub use decode::decode_pose;
#[cfg(feature = "desktop")]
pub use detector::PoseDetector;
pub use keypoint::{FrameSize, Keypoint, KeypointIndex, Pose};
#[cfg(feature = "desktop")]
pub use preprocess::preprocess_for_posenet;
