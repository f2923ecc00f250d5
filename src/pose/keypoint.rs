/// PoseNet / COCO 17 keypoint indices, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Upper-case label used in logs ("LEFT_WRIST").
    pub fn label(self) -> &'static str {
        match self {
            Self::Nose => "NOSE",
            Self::LeftEye => "LEFT_EYE",
            Self::RightEye => "RIGHT_EYE",
            Self::LeftEar => "LEFT_EAR",
            Self::RightEar => "RIGHT_EAR",
            Self::LeftShoulder => "LEFT_SHOULDER",
            Self::RightShoulder => "RIGHT_SHOULDER",
            Self::LeftElbow => "LEFT_ELBOW",
            Self::RightElbow => "RIGHT_ELBOW",
            Self::LeftWrist => "LEFT_WRIST",
            Self::RightWrist => "RIGHT_WRIST",
            Self::LeftHip => "LEFT_HIP",
            Self::RightHip => "RIGHT_HIP",
            Self::LeftKnee => "LEFT_KNEE",
            Self::RightKnee => "RIGHT_KNEE",
            Self::LeftAnkle => "LEFT_ANKLE",
            Self::RightAnkle => "RIGHT_ANKLE",
        }
    }

    /// Kinect-style joint name used by the named OSC address style.
    pub fn osc_name(self) -> &'static str {
        match self {
            Self::Nose => "head",
            Self::LeftEye => "eye_l",
            Self::RightEye => "eye_r",
            Self::LeftEar => "ear_l",
            Self::RightEar => "ear_r",
            Self::LeftShoulder => "shoulder_l",
            Self::RightShoulder => "shoulder_r",
            Self::LeftElbow => "elbow_l",
            Self::RightElbow => "elbow_r",
            Self::LeftWrist => "wrist_l",
            Self::RightWrist => "wrist_r",
            Self::LeftHip => "hip_l",
            Self::RightHip => "hip_r",
            Self::LeftKnee => "knee_l",
            Self::RightKnee => "knee_r",
            Self::LeftAnkle => "ankle_l",
            Self::RightAnkle => "ankle_r",
        }
    }
}

/// Dimensions of the source frame a pose was decoded against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// height / width
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Single keypoint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    /// X in source-frame pixels
    pub x: f32,
    /// Y in source-frame pixels
    pub y: f32,
    /// Raw heatmap activation. This is a logit, so it can be negative.
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn is_above(&self, floor: f32) -> bool {
        self.confidence > floor
    }

    /// Integer pixel position for drawing.
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

/// Single-person pose of 17 keypoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeypointIndex, &Keypoint)> {
        KeypointIndex::ALL.into_iter().zip(self.keypoints.iter())
    }

    pub fn average_confidence(&self) -> f32 {
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / KeypointIndex::COUNT as f32
    }
}
