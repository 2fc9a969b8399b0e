//! Manual override: operator events applied to the PTZ state.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::state::PtzState;
use crate::detect::Detection;

/// Discrete operator event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtzEvent {
    ZoomIn,
    ZoomOut,
    Reset,
    CycleNext,
    CyclePrev,
}

impl PtzEvent {
    pub const ALL: [PtzEvent; 5] = [
        PtzEvent::ZoomIn,
        PtzEvent::ZoomOut,
        PtzEvent::Reset,
        PtzEvent::CycleNext,
        PtzEvent::CyclePrev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PtzEvent::ZoomIn => "zoom_in",
            PtzEvent::ZoomOut => "zoom_out",
            PtzEvent::Reset => "reset",
            PtzEvent::CycleNext => "cycle_next",
            PtzEvent::CyclePrev => "cycle_prev",
        }
    }
}

impl fmt::Display for PtzEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PtzEvent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        PtzEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == wanted)
            .ok_or_else(|| anyhow!("unknown ptz event: {}", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoystickDirection {
    Up,
    Down,
    Left,
    Right,
    Middle,
}

impl FromStr for JoystickDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            other => Err(anyhow!("unknown joystick direction: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoystickAction {
    Pressed,
    Held,
    Released,
}

impl FromStr for JoystickAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pressed" => Ok(Self::Pressed),
            "held" => Ok(Self::Held),
            "released" => Ok(Self::Released),
            other => Err(anyhow!("unknown joystick action: {}", other)),
        }
    }
}

/// Raw joystick input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoystickEvent {
    pub direction: JoystickDirection,
    pub action: JoystickAction,
}

impl JoystickEvent {
    pub fn new(direction: JoystickDirection, action: JoystickAction) -> Self {
        Self { direction, action }
    }

    /// Only `pressed` and `held` act; `released` maps to nothing.
    pub fn to_ptz_event(&self) -> Option<PtzEvent> {
        if self.action == JoystickAction::Released {
            return None;
        }
        Some(match self.direction {
            JoystickDirection::Up => PtzEvent::ZoomIn,
            JoystickDirection::Down => PtzEvent::ZoomOut,
            JoystickDirection::Middle => PtzEvent::Reset,
            JoystickDirection::Left => PtzEvent::CyclePrev,
            JoystickDirection::Right => PtzEvent::CycleNext,
        })
    }
}

/// Sorted distinct track ids in `cache`.
pub fn distinct_track_ids(cache: &[Detection]) -> Vec<i64> {
    cache
        .iter()
        .filter_map(|det| det.track_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Apply one operator event.
///
/// Cycling walks the sorted distinct ids of `cache`, wrapping in both
/// directions. Without a current target it starts at the first (next) or
/// last (prev) id; a current target not in the cache restarts at the first
/// id. An empty cache clears the target.
pub fn apply_event(state: &mut PtzState, cache: &[Detection], event: PtzEvent) {
    match event {
        PtzEvent::ZoomIn => state.zoom_by(1.0),
        PtzEvent::ZoomOut => state.zoom_by(-1.0),
        PtzEvent::Reset => state.reset(),
        PtzEvent::CycleNext => cycle(state, cache, true),
        PtzEvent::CyclePrev => cycle(state, cache, false),
    }
    log::debug!(
        "{} -> zoom {:.2}, target {:?}",
        event,
        state.zoom(),
        state.target_id()
    );
}

fn cycle(state: &mut PtzState, cache: &[Detection], forward: bool) {
    let ids = distinct_track_ids(cache);
    let (Some(&first), Some(&last)) = (ids.first(), ids.last()) else {
        state.set_target(None);
        return;
    };

    let next = match state.target_id() {
        None if forward => first,
        None => last,
        Some(current) => match ids.iter().position(|&id| id == current) {
            None => first,
            Some(pos) if forward => ids[(pos + 1) % ids.len()],
            Some(pos) => ids[(pos + ids.len() - 1) % ids.len()],
        },
    };
    state.set_target(Some(next));
}

/// Parse one line of operator input.
///
/// Accepts a named event (`zoom_in`, `cycle-next`, ...) or
/// `<direction> <action>` (`up pressed`). Blank lines, `#` comments and
/// `released` actions yield `None`.
pub fn parse_operator_input(line: &str) -> Result<Option<PtzEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [event] => event.parse().map(Some),
        [direction, action] => {
            let joystick = JoystickEvent::new(direction.parse()?, action.parse()?);
            Ok(joystick.to_ptz_event())
        }
        _ => Err(anyhow!("expected `<event>` or `<direction> <action>`, got: {}", line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::ptz::state::ZoomLimits;

    fn cache(ids: &[i64]) -> Vec<Detection> {
        ids.iter()
            .map(|&id| Detection::tracked(id, BoundingBox::new(0.0, 0.0, 1.0, 1.0)))
            .collect()
    }

    #[test]
    fn zoom_steps_and_clamps() {
        let mut state = PtzState::new(ZoomLimits::new(1.5, 0.2).unwrap());
        for _ in 0..5 {
            apply_event(&mut state, &[], PtzEvent::ZoomIn);
        }
        assert_eq!(state.zoom(), 1.5);
        for _ in 0..10 {
            apply_event(&mut state, &[], PtzEvent::ZoomOut);
        }
        assert_eq!(state.zoom(), 1.0);
    }

    #[test]
    fn reset_twice_equals_once() {
        let mut state = PtzState::default();
        state.set_target(Some(4));
        apply_event(&mut state, &[], PtzEvent::ZoomIn);
        apply_event(&mut state, &[], PtzEvent::Reset);
        let once = state.clone();
        apply_event(&mut state, &[], PtzEvent::Reset);
        assert_eq!(state, once);
        assert_eq!((state.zoom(), state.target_id()), (1.0, None));
    }

    #[test]
    fn cycle_from_no_target_starts_at_ends() {
        let ids = cache(&[9, 3, 5, 3]);
        let mut state = PtzState::default();
        apply_event(&mut state, &ids, PtzEvent::CycleNext);
        assert_eq!(state.target_id(), Some(3));

        state.set_target(None);
        apply_event(&mut state, &ids, PtzEvent::CyclePrev);
        assert_eq!(state.target_id(), Some(9));
    }

    #[test]
    fn cycle_wraps_both_ways() {
        let ids = cache(&[2, 4, 6]);
        let mut state = PtzState::default();
        state.set_target(Some(6));
        apply_event(&mut state, &ids, PtzEvent::CycleNext);
        assert_eq!(state.target_id(), Some(2));
        apply_event(&mut state, &ids, PtzEvent::CyclePrev);
        assert_eq!(state.target_id(), Some(6));
        apply_event(&mut state, &ids, PtzEvent::CyclePrev);
        assert_eq!(state.target_id(), Some(4));
    }

    #[test]
    fn cycle_next_returns_to_first_after_n_steps() {
        let ids = cache(&[11, 7, 42, 7, 19, 3]);
        let n = distinct_track_ids(&ids).len();
        let mut state = PtzState::default();

        apply_event(&mut state, &ids, PtzEvent::CycleNext);
        let first = state.target_id();
        assert_eq!(first, Some(3));
        let mut seen = Vec::new();
        for _ in 0..n {
            apply_event(&mut state, &ids, PtzEvent::CycleNext);
            seen.push(state.target_id());
        }
        assert_eq!(state.target_id(), first);
        assert_eq!(seen.len(), n);
    }

    #[test]
    fn cycle_with_missing_target_restarts_at_first() {
        let ids = cache(&[5, 8]);
        let mut state = PtzState::default();
        state.set_target(Some(77));
        apply_event(&mut state, &ids, PtzEvent::CyclePrev);
        assert_eq!(state.target_id(), Some(5));
    }

    #[test]
    fn cycle_with_empty_cache_clears_target() {
        let mut state = PtzState::default();
        state.set_target(Some(1));
        let untracked = vec![Detection::untracked(BoundingBox::new(0.0, 0.0, 1.0, 1.0))];
        apply_event(&mut state, &untracked, PtzEvent::CycleNext);
        assert_eq!(state.target_id(), None);
    }

    #[test]
    fn joystick_mapping() {
        use JoystickAction::*;
        use JoystickDirection::*;
        let cases = [
            (Up, Some(PtzEvent::ZoomIn)),
            (Down, Some(PtzEvent::ZoomOut)),
            (Middle, Some(PtzEvent::Reset)),
            (Left, Some(PtzEvent::CyclePrev)),
            (Right, Some(PtzEvent::CycleNext)),
        ];
        for (direction, expected) in cases {
            assert_eq!(JoystickEvent::new(direction, Pressed).to_ptz_event(), expected);
            assert_eq!(JoystickEvent::new(direction, Held).to_ptz_event(), expected);
            assert_eq!(JoystickEvent::new(direction, Released).to_ptz_event(), None);
        }
    }

    #[test]
    fn parses_operator_lines() {
        assert_eq!(parse_operator_input("zoom-in").unwrap(), Some(PtzEvent::ZoomIn));
        assert_eq!(
            parse_operator_input("  RIGHT held ").unwrap(),
            Some(PtzEvent::CycleNext)
        );
        assert_eq!(parse_operator_input("middle released").unwrap(), None);
        assert_eq!(parse_operator_input("# comment").unwrap(), None);
        assert!(parse_operator_input("sideways pressed").is_err());
        assert!(parse_operator_input("up pressed now").is_err());
        assert!(parse_operator_input("explode").is_err());
    }

    #[test]
    fn event_names_round_trip_through_display() {
        for event in PtzEvent::ALL {
            assert_eq!(event.to_string().parse::<PtzEvent>().unwrap(), event);
        }
    }
}
