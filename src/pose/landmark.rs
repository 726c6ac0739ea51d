use serde::{Deserialize, Serialize};

/// MediaPipe Pose 33-landmark indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    const ALL: [LandmarkIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One tracked joint as reported by the pose estimator.
///
/// x/y are normalized image coordinates, z is the estimator's relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

fn default_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn xy(x: f32, y: f32) -> Self {
        Self::new(x, y, 0.0, 1.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Landmarks for one video frame, positionally indexed by joint.
///
/// A `None` slot means the estimator did not report that joint this frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    slots: Vec<Option<Landmark>>,
}

impl LandmarkSet {
    pub fn new(slots: Vec<Option<Landmark>>) -> Self {
        Self { slots }
    }

    /// Every slot present
    pub fn from_landmarks(landmarks: impl IntoIterator<Item = Landmark>) -> Self {
        Self {
            slots: landmarks.into_iter().map(Some).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn joint(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.get(index as usize)
    }

    /// Number of slots, present or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn slots(&self) -> &[Option<Landmark>] {
        &self.slots
    }

    /// Drop a joint, as if the estimator had lost track of it
    pub fn remove(&mut self, index: usize) -> Option<Landmark> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Same set moved by (dx, dy) in image space
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|s| s.map(|lm| Landmark::new(lm.x + dx, lm.y + dy, lm.z, lm.visibility)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(23), Some(LandmarkIndex::LeftHip));
        assert_eq!(LandmarkIndex::from_index(24), Some(LandmarkIndex::RightHip));
        assert_eq!(LandmarkIndex::from_index(32), Some(LandmarkIndex::RightFootIndex));
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_landmark_index_discriminants_match_position() {
        for i in 0..LandmarkIndex::COUNT {
            assert_eq!(LandmarkIndex::from_index(i).map(|l| l as usize), Some(i));
        }
    }

    #[test]
    fn test_set_remove_and_present_count() {
        let mut set = LandmarkSet::from_landmarks((0..33).map(|i| Landmark::xy(i as f32, 0.0)));
        assert_eq!(set.present_count(), 33);

        let removed = set.remove(LandmarkIndex::LeftHip as usize);
        assert_eq!(removed, Some(Landmark::xy(23.0, 0.0)));
        assert_eq!(set.len(), 33);
        assert_eq!(set.present_count(), 32);
        assert!(set.joint(LandmarkIndex::LeftHip).is_none());
    }

    #[test]
    fn test_translated_keeps_z_and_visibility() {
        let set = LandmarkSet::from_landmarks([Landmark::new(0.5, 0.5, -0.2, 0.7)]);
        let moved = set.translated(0.1, -0.1);
        let lm = moved.get(0).unwrap();
        assert!((lm.x - 0.6).abs() < 1e-6);
        assert!((lm.y - 0.4).abs() < 1e-6);
        assert_eq!(lm.z, -0.2);
        assert_eq!(lm.visibility, 0.7);
    }

    #[test]
    fn test_deserialize_with_missing_slot() {
        let json = r#"[{"x":0.1,"y":0.2},null,{"x":0.3,"y":0.4,"z":0.5,"visibility":0.9}]"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.present_count(), 2);
        assert_eq!(set.get(0).unwrap().visibility, 1.0);
        assert!(set.get(1).is_none());
        assert_eq!(set.get(2).unwrap().z, 0.5);
    }
}
