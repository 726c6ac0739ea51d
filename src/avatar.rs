//! Fixed-step avatar physics.
//!
//! `step` is the whole state machine: one call per tick, no clock, no I/O.
//! Screen coordinates, y grows downward, `ground_y` is the resting line.

use serde::Serialize;

use crate::classifier::ActionLabel;
use crate::config::AvatarConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarParams {
    /// Stage width; x is clamped to `[0, scene_width - width]`
    pub scene_width: f32,
    /// Avatar box width
    pub width: f32,
    /// Standing height (render only)
    pub height: f32,
    /// Height while crouching (render only)
    pub crouch_height: f32,
    /// Resting y; the avatar never goes below it
    pub ground_y: f32,
    /// x at session start
    pub start_x: f32,
    /// Horizontal move per tick for left/right labels
    pub move_step: f32,
    /// vy set on takeoff (negative = up)
    pub jump_velocity: f32,
    /// Added to vy every tick
    pub gravity: f32,
}

impl AvatarParams {
    pub fn new() -> Self {
        Self::from_config(&AvatarConfig::default())
    }

    pub fn from_config(config: &AvatarConfig) -> Self {
        Self {
            scene_width: config.scene_width,
            width: config.width,
            height: config.height,
            crouch_height: config.crouch_height,
            ground_y: config.ground_y,
            start_x: config.start_x,
            move_step: config.move_step,
            jump_velocity: config.jump_velocity,
            gravity: config.gravity,
        }
    }

    /// Rightmost x the avatar may occupy
    pub fn max_x(&self) -> f32 {
        (self.scene_width - self.width).max(0.0)
    }

    /// Standing still on the ground at the start position
    pub fn initial_state(&self) -> AvatarState {
        AvatarState {
            x: self.start_x.clamp(0.0, self.max_x()),
            y: self.ground_y,
            vy: 0.0,
            jumping: false,
            pose: PoseTag::Neutral,
        }
    }
}

impl Default for AvatarParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Stance shown by the renderer; no effect on physics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseTag {
    #[default]
    Neutral,
    Crouch,
    Punch,
    Kick,
    Block,
}

impl PoseTag {
    pub fn from_label(label: ActionLabel) -> Self {
        match label {
            ActionLabel::Crouch => Self::Crouch,
            ActionLabel::Punch => Self::Punch,
            ActionLabel::Kick => Self::Kick,
            ActionLabel::Block => Self::Block,
            _ => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AvatarState {
    pub x: f32,
    pub y: f32,
    /// Vertical velocity, per tick
    pub vy: f32,
    /// Airborne; blocks another takeoff until landing
    pub jumping: bool,
    pub pose: PoseTag,
}

/// Advance one tick under `label`
pub fn step(params: &AvatarParams, prev: &AvatarState, label: ActionLabel) -> AvatarState {
    let mut x = prev.x;
    let mut y = prev.y;
    let mut vy = prev.vy;
    let mut jumping = prev.jumping;

    if label.moves_left() {
        x = (x - params.move_step).max(0.0);
    }
    if label.moves_right() {
        x = (x + params.move_step).min(params.max_x());
    }

    // No double jump; a held jump label jumps again after landing
    if label.is_jump() && !jumping {
        vy = params.jump_velocity;
        jumping = true;
    }

    vy += params.gravity;
    y += vy;

    if y >= params.ground_y {
        y = params.ground_y;
        vy = 0.0;
        jumping = false;
    }

    AvatarState {
        x,
        y,
        vy,
        jumping,
        pose: PoseTag::from_label(label),
    }
}

/// Drawing hints for a renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Appearance {
    pub width: f32,
    pub height: f32,
    /// CSS hex colour
    pub color: &'static str,
}

pub fn appearance(params: &AvatarParams, state: &AvatarState) -> Appearance {
    let height = match state.pose {
        PoseTag::Crouch => params.crouch_height,
        _ => params.height,
    };
    let color = match state.pose {
        PoseTag::Punch => "#ef4444",
        PoseTag::Kick => "#f59e0b",
        PoseTag::Block => "#10b981",
        PoseTag::Neutral | PoseTag::Crouch => "#3b82f6",
    };
    Appearance {
        width: params.width,
        height,
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn start() -> AvatarState {
        AvatarState {
            x: 150.0,
            y: 200.0,
            vy: 0.0,
            jumping: false,
            pose: PoseTag::Neutral,
        }
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(AvatarParams::new().initial_state(), start());
    }

    #[test]
    fn test_jump_arc_returns_to_ground() {
        let params = AvatarParams::new();
        let mut labels = vec![ActionLabel::Jump, ActionLabel::Jump];
        labels.extend(std::iter::repeat(ActionLabel::Idle).take(13));

        let mut state = start();
        let mut peak = state.y;
        for label in &labels {
            state = step(&params, &state, *label);
            assert!(state.y <= params.ground_y);
            peak = peak.min(state.y);
        }
        // second jump label is ignored mid-air
        assert!(state.jumping);

        let mut ticks = labels.len();
        while state.jumping {
            state = step(&params, &state, ActionLabel::Idle);
            assert!(state.y <= params.ground_y);
            ticks += 1;
            assert!(ticks < 100, "never landed");
        }

        assert_eq!(ticks, 29);
        assert_eq!(peak, 200.0 - 105.0);
        assert_eq!(state, start());
    }

    #[test]
    fn test_first_jump_tick() {
        let state = step(&AvatarParams::new(), &start(), ActionLabel::Jump);
        assert_eq!(state.vy, -14.0);
        assert_eq!(state.y, 186.0);
        assert!(state.jumping);
    }

    #[test]
    fn test_held_jump_rejumps_after_landing() {
        let params = AvatarParams::new();
        let mut state = start();
        let mut takeoffs = 0;
        for _ in 0..60 {
            let next = step(&params, &state, ActionLabel::Jump);
            if next.jumping && !state.jumping {
                takeoffs += 1;
            }
            state = next;
        }
        assert_eq!(takeoffs, 3);
    }

    #[test]
    fn test_horizontal_clamps() {
        let params = AvatarParams::new();

        let mut state = AvatarState { x: 3.0, ..start() };
        state = step(&params, &state, ActionLabel::Left);
        assert_eq!(state.x, 0.0);
        state = step(&params, &state, ActionLabel::JumpLeft);
        assert_eq!(state.x, 0.0);

        let mut state = AvatarState { x: 588.0, ..start() };
        state = step(&params, &state, ActionLabel::Right);
        assert_eq!(state.x, 590.0);
        state = step(&params, &state, ActionLabel::JumpRight);
        assert_eq!(state.x, 590.0);
        assert!(state.jumping);
    }

    #[test]
    fn test_stances_only_set_pose() {
        let params = AvatarParams::new();
        for (label, pose) in [
            (ActionLabel::Crouch, PoseTag::Crouch),
            (ActionLabel::Punch, PoseTag::Punch),
            (ActionLabel::Kick, PoseTag::Kick),
            (ActionLabel::Block, PoseTag::Block),
            (ActionLabel::Idle, PoseTag::Neutral),
        ] {
            let state = step(&params, &start(), label);
            assert_eq!(state, AvatarState { pose, ..start() });
        }
    }

    #[test]
    fn test_appearance() {
        let params = AvatarParams::new();
        let crouch = appearance(&params, &AvatarState { pose: PoseTag::Crouch, ..start() });
        assert_eq!(crouch.height, 30.0);
        assert_eq!(crouch.color, "#3b82f6");

        let punch = appearance(&params, &AvatarState { pose: PoseTag::Punch, ..start() });
        assert_eq!(punch.height, 50.0);
        assert_eq!(punch.color, "#ef4444");
        assert_eq!(appearance(&params, &AvatarState { pose: PoseTag::Kick, ..start() }).color, "#f59e0b");
        assert_eq!(appearance(&params, &AvatarState { pose: PoseTag::Block, ..start() }).color, "#10b981");
    }

    fn any_label() -> impl Strategy<Value = ActionLabel> {
        (0..ActionLabel::ALL.len()).prop_map(|i| ActionLabel::ALL[i])
    }

    proptest! {
        #[test]
        fn prop_replay_is_deterministic(labels in prop::collection::vec(any_label(), 0..200)) {
            let params = AvatarParams::new();
            let run = || labels.iter().fold(start(), |s, l| step(&params, &s, *l));
            prop_assert_eq!(run(), run());
        }

        #[test]
        fn prop_stays_in_bounds(labels in prop::collection::vec(any_label(), 0..300)) {
            let params = AvatarParams::new();
            let mut state = start();
            for label in labels {
                state = step(&params, &state, label);
                prop_assert!(state.y <= params.ground_y);
                prop_assert!(state.x >= 0.0 && state.x <= params.max_x());
                prop_assert!(state.jumping || state.y == params.ground_y);
            }
        }
    }
}
