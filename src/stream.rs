//! JSON-lines wire format.
//!
//! Input, one frame per line, either an object
//! `{"timestamp_ms": 1712, "landmarks": [{"x":..,"y":..}, null, ...]}`
//! or just the landmark array. `null` marks a landmark the estimator lost.
//!
//! Output, one record per avatar tick.

use serde::{Deserialize, Serialize};

use crate::avatar::{self, Appearance, AvatarParams, AvatarState};
use crate::classifier::ActionLabel;
use crate::pipeline::Tick;
use crate::pose::LandmarkSet;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum FrameLine {
    Record {
        #[serde(default)]
        timestamp_ms: Option<u64>,
        landmarks: LandmarkSet,
    },
    Bare(LandmarkSet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub timestamp_ms: Option<u64>,
    pub landmarks: LandmarkSet,
}

/// `Ok(None)` for blank lines
pub fn parse_frame(line: &str) -> serde_json::Result<Option<FrameRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let record = match serde_json::from_str::<FrameLine>(line)? {
        FrameLine::Record {
            timestamp_ms,
            landmarks,
        } => FrameRecord {
            timestamp_ms,
            landmarks,
        },
        FrameLine::Bare(landmarks) => FrameRecord {
            timestamp_ms: None,
            landmarks,
        },
    };
    Ok(Some(record))
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarRecord {
    pub tick: u64,
    pub label: ActionLabel,
    #[serde(flatten)]
    pub state: AvatarState,
    pub appearance: Appearance,
}

impl AvatarRecord {
    pub fn new(params: &AvatarParams, tick: &Tick) -> Self {
        Self {
            tick: tick.index,
            label: tick.label,
            state: tick.state,
            appearance: avatar::appearance(params, &tick.state),
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::PoseTag;

    #[test]
    fn test_parse_record() {
        let line = r#"{"timestamp_ms": 40, "landmarks": [{"x": 0.5, "y": 0.25}, null, {"x": 1, "y": 2, "z": -0.1, "visibility": 0.3}]}"#;
        let record = parse_frame(line).unwrap().unwrap();
        assert_eq!(record.timestamp_ms, Some(40));
        assert_eq!(record.landmarks.len(), 3);
        assert_eq!(record.landmarks.present_count(), 2);

        let first = record.landmarks.get(0).unwrap();
        assert_eq!((first.x, first.y, first.z, first.visibility), (0.5, 0.25, 0.0, 1.0));
        assert!(record.landmarks.get(1).is_none());
        assert_eq!(record.landmarks.get(2).unwrap().visibility, 0.3);
    }

    #[test]
    fn test_parse_bare_array() {
        let record = parse_frame(r#"[{"x": 0.1, "y": 0.2}]"#).unwrap().unwrap();
        assert_eq!(record.timestamp_ms, None);
        assert_eq!(record.landmarks.len(), 1);
    }

    #[test]
    fn test_parse_blank_and_garbage() {
        assert!(parse_frame("   ").unwrap().is_none());
        assert!(parse_frame("{not json").is_err());
        assert!(parse_frame(r#"{"timestamp_ms": 1}"#).is_err());
    }

    #[test]
    fn test_avatar_record_line() {
        let params = AvatarParams::new();
        let tick = Tick {
            index: 7,
            label: ActionLabel::Crouch,
            state: AvatarState {
                pose: PoseTag::Crouch,
                ..params.initial_state()
            },
        };
        let value: serde_json::Value =
            serde_json::from_str(&AvatarRecord::new(&params, &tick).to_line().unwrap()).unwrap();

        assert_eq!(value["tick"], 7);
        assert_eq!(value["label"], "crouch");
        assert_eq!(value["x"], 150.0);
        assert_eq!(value["y"], 200.0);
        assert_eq!(value["jumping"], false);
        assert_eq!(value["pose"], "crouch");
        assert_eq!(value["appearance"]["height"], 30.0);
        assert_eq!(value["appearance"]["color"], "#3b82f6");
    }
}
