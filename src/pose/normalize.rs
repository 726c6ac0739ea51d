use crate::config::LandmarkConfig;
use crate::error::{Error, Result};
use crate::window::FeatureVector;

use super::landmark::{LandmarkIndex, LandmarkSet};

/// Landmark set → body-centered feature vector.
///
/// Origin is the midpoint of the two reference landmarks (hips by default).
/// Output is landmark-index order, `x, y` (or `x, y, z`) per landmark; the
/// classifier was trained on exactly this layout.
#[derive(Debug, Clone)]
pub struct Normalizer {
    landmark_count: usize,
    left_reference: usize,
    right_reference: usize,
    include_z: bool,
    min_reference_visibility: f32,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            landmark_count: LandmarkIndex::COUNT,
            left_reference: LandmarkIndex::LeftHip as usize,
            right_reference: LandmarkIndex::RightHip as usize,
            include_z: false,
            min_reference_visibility: 0.0,
        }
    }

    pub fn from_config(config: &LandmarkConfig) -> Self {
        Self {
            landmark_count: config.count,
            left_reference: config.left_reference,
            right_reference: config.right_reference,
            include_z: config.include_z,
            min_reference_visibility: config.min_reference_visibility,
        }
    }

    pub fn with_z(mut self, include_z: bool) -> Self {
        self.include_z = include_z;
        self
    }

    pub fn with_min_reference_visibility(mut self, threshold: f32) -> Self {
        self.min_reference_visibility = threshold;
        self
    }

    /// Scalars per landmark
    pub fn stride(&self) -> usize {
        if self.include_z { 3 } else { 2 }
    }

    /// F
    pub fn feature_len(&self) -> usize {
        self.landmark_count * self.stride()
    }

    pub fn normalize(&self, set: &LandmarkSet) -> Result<FeatureVector> {
        let present = set.present_count();

        if set.len() > self.landmark_count {
            return Err(Error::DimensionMismatch {
                expected: self.landmark_count,
                actual: set.len(),
            });
        }

        let (hip_x, hip_y) = self.origin(set, present)?;

        let mut values = Vec::with_capacity(self.feature_len());
        for index in 0..self.landmark_count {
            let lm = match set.get(index) {
                Some(lm) if lm.is_finite() => lm,
                _ => {
                    return Err(Error::IncompleteLandmarks {
                        expected: self.landmark_count,
                        present,
                        missing: Some(index),
                    })
                }
            };
            values.push(lm.x - hip_x);
            values.push(lm.y - hip_y);
            if self.include_z {
                values.push(lm.z);
            }
        }

        Ok(FeatureVector::new(values))
    }

    /// Reference midpoint, checked before the full scan so a lost hip is
    /// reported as the missing index
    fn origin(&self, set: &LandmarkSet, present: usize) -> Result<(f32, f32)> {
        let reference = |index: usize| {
            set.get(index)
                .filter(|lm| lm.is_finite() && lm.visibility >= self.min_reference_visibility)
                .ok_or(Error::IncompleteLandmarks {
                    expected: self.landmark_count,
                    present,
                    missing: Some(index),
                })
        };
        let left = reference(self.left_reference)?;
        let right = reference(self.right_reference)?;
        Ok(((left.x + right.x) / 2.0, (left.y + right.y) / 2.0))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
