use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Closed set of actions the model can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionLabel {
    Block,
    Crouch,
    #[default]
    Idle,
    Jump,
    JumpLeft,
    JumpRight,
    Kick,
    Left,
    Punch,
    Right,
}

impl ActionLabel {
    /// Training order of the shipped model's output layer
    pub const ALL: [ActionLabel; 10] = [
        Self::Block,
        Self::Crouch,
        Self::Idle,
        Self::Jump,
        Self::JumpLeft,
        Self::JumpRight,
        Self::Kick,
        Self::Left,
        Self::Punch,
        Self::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Crouch => "crouch",
            Self::Idle => "idle",
            Self::Jump => "jump",
            Self::JumpLeft => "jump_left",
            Self::JumpRight => "jump_right",
            Self::Kick => "kick",
            Self::Left => "left",
            Self::Punch => "punch",
            Self::Right => "right",
        }
    }

    pub fn moves_left(&self) -> bool {
        matches!(self, Self::Left | Self::JumpLeft)
    }

    pub fn moves_right(&self) -> bool {
        matches!(self, Self::Right | Self::JumpRight)
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Self::Jump | Self::JumpLeft | Self::JumpRight)
    }
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s.trim())
            .ok_or_else(|| Error::Config(format!("unknown action label: {}", s)))
    }
}

/// Model output index → label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    labels: Vec<ActionLabel>,
}

impl LabelSet {
    pub fn new(labels: Vec<ActionLabel>) -> Self {
        Self { labels }
    }

    pub fn get(&self, index: usize) -> Option<ActionLabel> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[ActionLabel] {
        &self.labels
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(ActionLabel::ALL.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let set = LabelSet::default();
        assert_eq!(set.len(), 10);
        assert_eq!(set.get(0), Some(ActionLabel::Block));
        assert_eq!(set.get(4), Some(ActionLabel::JumpLeft));
        assert_eq!(set.get(9), Some(ActionLabel::Right));
        assert_eq!(set.get(10), None);
    }

    #[test]
    fn test_round_trip_names() {
        for label in ActionLabel::ALL {
            assert_eq!(label.as_str().parse::<ActionLabel>().unwrap(), label);
        }
        assert!("dance".parse::<ActionLabel>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for label in ActionLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label));
        }
    }

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ActionLabel::default(), ActionLabel::Idle);
    }

    #[test]
    fn test_motion_predicates() {
        assert!(ActionLabel::JumpLeft.moves_left());
        assert!(ActionLabel::JumpLeft.is_jump());
        assert!(!ActionLabel::JumpLeft.moves_right());
        assert!(ActionLabel::Right.moves_right());
        assert!(!ActionLabel::Crouch.is_jump());
        assert!(!ActionLabel::Idle.moves_left());
    }
}
