use crate::pose::{Keypoint, KeypointIndex, Pose};

/// Limb edges (start, end). The face is drawn as points only.
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 12] = [
    // upper body
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    // hips and legs
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    (KeypointIndex::RightKnee, KeypointIndex::RightHip),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
];

/// Joint and limb color (RGB), cyan
pub const POSE_COLOR: u32 = 0x00FFFF;

/// Segments whose both ends are above `floor`
pub fn visible_segments(pose: &Pose, floor: f32) -> impl Iterator<Item = (&Keypoint, &Keypoint)> {
    SKELETON_CONNECTIONS.iter().filter_map(move |(a, b)| {
        let start = pose.get(*a);
        let end = pose.get(*b);
        (start.is_above(floor) && end.is_above(floor)).then_some((start, end))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_segments_visible_for_confident_pose() {
        let pose = Pose::new([Keypoint::new(1.0, 1.0, 0.5); KeypointIndex::COUNT]);
        assert_eq!(visible_segments(&pose, -1.0).count(), SKELETON_CONNECTIONS.len());
    }

    #[test]
    fn test_segment_hidden_when_one_end_at_floor() {
        let mut keypoints = [Keypoint::new(1.0, 1.0, 0.5); KeypointIndex::COUNT];
        // the floor itself is not above the floor
        keypoints[KeypointIndex::LeftWrist as usize].confidence = -1.0;
        let pose = Pose::new(keypoints);
        assert_eq!(visible_segments(&pose, -1.0).count(), SKELETON_CONNECTIONS.len() - 1);
    }

    #[test]
    fn test_face_has_no_segments() {
        let face = [
            KeypointIndex::Nose,
            KeypointIndex::LeftEye,
            KeypointIndex::RightEye,
            KeypointIndex::LeftEar,
            KeypointIndex::RightEar,
        ];
        assert!(SKELETON_CONNECTIONS
            .iter()
            .all(|(a, b)| !face.contains(a) && !face.contains(b)));
    }
}
