//! Input normalizer
//!
//! Turns one [`RawSample`] plus the controller's [`MappingEntry`] (if any)
//! into a [`NormalizedFrame`]: polar stick states quantized to compass
//! sectors, 0..1 trigger intensities and a set of named buttons. Pure and
//! side-effect free; the deadzone is passed in on every call.

use crate::controller::raw_sample::{RawSample, PRESS_THRESHOLD};
use crate::mapping::{InputSource, MappingEntry, Role};
use serde::{Deserialize, Serialize};

/// Default stick deadzone (fraction of full deflection)
pub const DEFAULT_DEADZONE: f32 = 0.5;

/// Width of one compass sector in degrees
const SECTOR_WIDTH: f32 = 45.0;

/// Axis indices some drivers use for the D-pad (x, y)
const DPAD_AXIS_X: usize = 6;
const DPAD_AXIS_Y: usize = 7;

/// One of eight 45° compass sectors, clockwise from up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Sector {
    pub const ALL: [Sector; 8] = [
        Sector::North,
        Sector::NorthEast,
        Sector::East,
        Sector::SouthEast,
        Sector::South,
        Sector::SouthWest,
        Sector::West,
        Sector::NorthWest,
    ];

    /// Quantizes a north-oriented, clockwise angle in degrees.
    ///
    /// Each sector spans `[center - 22.5, center + 22.5)`: the lower edge is
    /// inclusive, so a vector exactly 22.5° clockwise of a compass point
    /// belongs to the next sector.
    pub fn from_angle(angle: f32) -> Sector {
        let shifted = (angle + SECTOR_WIDTH / 2.0).rem_euclid(360.0);
        let index = (shifted / SECTOR_WIDTH).floor() as usize;
        Sector::ALL[index.min(7)]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn center(self) -> f32 {
        self.index() as f32 * SECTOR_WIDTH
    }
}

/// Which physical stick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stick {
    Left,
    Right,
}

impl Stick {
    pub const BOTH: [Stick; 2] = [Stick::Left, Stick::Right];

    pub fn other(self) -> Stick {
        match self {
            Stick::Left => Stick::Right,
            Stick::Right => Stick::Left,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Stick::Left => 0,
            Stick::Right => 1,
        }
    }
}

/// Polar view of one analog stick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StickState {
    pub x: f32,
    pub y: f32,
    /// Degrees clockwise from up, 0..360. Zero while inactive.
    pub angle: f32,
    pub magnitude: f32,
    pub active: bool,
    pub sector: Option<Sector>,
}

impl StickState {
    /// Builds a stick state from raw axis values. Up is negative y.
    pub fn from_axes(x: f32, y: f32, deadzone: f32) -> Self {
        let magnitude = (x * x + y * y).sqrt();
        if magnitude < deadzone {
            return Self {
                x,
                y,
                angle: 0.0,
                magnitude,
                active: false,
                sector: None,
            };
        }

        let angle = (y.atan2(x).to_degrees() + 90.0).rem_euclid(360.0);
        Self {
            x,
            y,
            angle,
            magnitude,
            active: true,
            sector: Some(Sector::from_angle(angle)),
        }
    }
}

/// Named logical buttons, D-pad included
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonSet {
    pub south: bool,
    pub east: bool,
    pub west: bool,
    pub north: bool,
    pub left_shoulder: bool,
    pub right_shoulder: bool,
    pub back: bool,
    pub start: bool,
    pub left_stick: bool,
    pub right_stick: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
}

/// Semantic view of one controller tick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizedFrame {
    pub left_stick: StickState,
    pub right_stick: StickState,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub buttons: ButtonSet,
}

impl NormalizedFrame {
    pub fn stick(&self, stick: Stick) -> &StickState {
        match stick {
            Stick::Left => &self.left_stick,
            Stick::Right => &self.right_stick,
        }
    }
}

/// Normalizes one raw sample.
pub fn normalize(
    sample: &RawSample,
    mapping: Option<&MappingEntry>,
    deadzone: f32,
) -> NormalizedFrame {
    let lookup = |role: Role| mapping.and_then(|m| m.source(role));

    let axis = |role: Role| -> f32 {
        match lookup(role) {
            Some(source) => sample.source_value(source).unwrap_or(0.0),
            None => sample.axis(role.standard_index() as usize).unwrap_or(0.0),
        }
    };

    let trigger = |role: Role| -> f32 {
        let source = lookup(role)
            .copied()
            .unwrap_or(InputSource::Button(role.standard_index()));
        sample.source_intensity(&source)
    };

    let button = |role: Role| -> bool {
        match lookup(role) {
            Some(source) => sample.source_down(source),
            None => sample.button_down(role.standard_index() as usize),
        }
    };

    let dpad = |role: Role| -> bool {
        if let Some(source) = lookup(role) {
            return sample.source_down(source);
        }
        let from_axis = match role {
            Role::DPadUp => sample.axis(DPAD_AXIS_Y).is_some_and(|v| v < -PRESS_THRESHOLD),
            Role::DPadDown => sample.axis(DPAD_AXIS_Y).is_some_and(|v| v > PRESS_THRESHOLD),
            Role::DPadLeft => sample.axis(DPAD_AXIS_X).is_some_and(|v| v < -PRESS_THRESHOLD),
            Role::DPadRight => sample.axis(DPAD_AXIS_X).is_some_and(|v| v > PRESS_THRESHOLD),
            _ => false,
        };
        from_axis || sample.button_down(role.standard_index() as usize)
    };

    NormalizedFrame {
        left_stick: StickState::from_axes(axis(Role::LeftX), axis(Role::LeftY), deadzone),
        right_stick: StickState::from_axes(axis(Role::RightX), axis(Role::RightY), deadzone),
        left_trigger: trigger(Role::LeftTrigger),
        right_trigger: trigger(Role::RightTrigger),
        buttons: ButtonSet {
            south: button(Role::A),
            east: button(Role::B),
            west: button(Role::X),
            north: button(Role::Y),
            left_shoulder: button(Role::LeftShoulder),
            right_shoulder: button(Role::RightShoulder),
            back: button(Role::Back),
            start: button(Role::Start),
            left_stick: button(Role::LeftStick),
            right_stick: button(Role::RightStick),
            dpad_up: dpad(Role::DPadUp),
            dpad_down: dpad(Role::DPadDown),
            dpad_left: dpad(Role::DPadLeft),
            dpad_right: dpad(Role::DPadRight),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::raw_sample::ButtonSample;

    fn standard_sample() -> RawSample {
        RawSample::neutral(17, 4)
    }

    #[test]
    fn below_deadzone_is_inactive_without_sector() {
        for (x, y) in [(0.0, 0.0), (0.3, 0.3), (-0.49, 0.0), (0.0, 0.4999)] {
            let stick = StickState::from_axes(x, y, 0.5);
            assert!(!stick.active);
            assert_eq!(stick.sector, None);
        }
    }

    #[test]
    fn at_or_above_deadzone_is_active_with_sector() {
        let stick = StickState::from_axes(0.5, 0.0, 0.5);
        assert!(stick.active);
        assert_eq!(stick.sector, Some(Sector::East));
    }

    #[test]
    fn compass_points_map_to_their_sectors() {
        let cases = [
            ((0.0, -1.0), Sector::North),
            ((0.7, -0.7), Sector::NorthEast),
            ((1.0, 0.0), Sector::East),
            ((0.7, 0.7), Sector::SouthEast),
            ((0.0, 1.0), Sector::South),
            ((-0.7, 0.7), Sector::SouthWest),
            ((-1.0, 0.0), Sector::West),
            ((-0.7, -0.7), Sector::NorthWest),
        ];
        for ((x, y), expected) in cases {
            let stick = StickState::from_axes(x, y, 0.5);
            assert_eq!(stick.sector, Some(expected), "({x}, {y})");
            assert!((stick.angle - expected.center()).abs() < 1.0);
        }
    }

    #[test]
    fn sector_lower_edge_is_inclusive() {
        assert_eq!(Sector::from_angle(22.5), Sector::NorthEast);
        assert_eq!(Sector::from_angle(22.49), Sector::North);
        assert_eq!(Sector::from_angle(337.5), Sector::North);
        assert_eq!(Sector::from_angle(337.49), Sector::NorthWest);
        assert_eq!(Sector::from_angle(292.5), Sector::NorthWest);
        assert_eq!(Sector::from_angle(0.0), Sector::North);
        assert_eq!(Sector::from_angle(359.99), Sector::North);
    }

    #[test]
    fn deadzone_is_read_on_every_call() {
        let mut sample = standard_sample();
        sample.axes[0] = 0.4;
        assert!(normalize(&sample, None, 0.3).left_stick.active);
        assert!(!normalize(&sample, None, 0.5).left_stick.active);
        assert!(normalize(&sample, None, 0.3).left_stick.active);
    }

    #[test]
    fn mapped_stick_axes_are_used() {
        let mut sample = RawSample::neutral(4, 6);
        sample.axes[4] = -1.0;
        let entry = MappingEntry::parse("k", "n", "rightx:a3,righty:a4");
        let frame = normalize(&sample, Some(&entry), 0.5);
        assert_eq!(frame.right_stick.sector, Some(Sector::North));
        assert!(!frame.left_stick.active);
    }

    #[test]
    fn triggers_from_axis_button_and_default() {
        let mut sample = standard_sample();
        sample.buttons[6] = ButtonSample::new(true, 0.75);
        sample.axes[2] = 1.0;
        let default = normalize(&sample, None, 0.5);
        assert_eq!(default.left_trigger, 0.75);
        assert_eq!(default.right_trigger, 0.0);

        let entry = MappingEntry::parse("k", "n", "righttrigger:a2,rightx:a3");
        let mapped = normalize(&sample, Some(&entry), 0.5);
        assert_eq!(mapped.right_trigger, 1.0);
        assert_eq!(mapped.left_trigger, 0.75);
    }

    #[test]
    fn dpad_falls_back_to_axes_then_buttons() {
        let mut sample = RawSample::neutral(17, 8);
        sample.axes[7] = -1.0;
        sample.buttons[15] = ButtonSample::new(true, 1.0);
        let frame = normalize(&sample, None, 0.5);
        assert!(frame.buttons.dpad_up);
        assert!(frame.buttons.dpad_right);
        assert!(!frame.buttons.dpad_down);
        assert!(!frame.buttons.dpad_left);
    }

    #[test]
    fn mapped_dpad_ignores_fallbacks() {
        let mut sample = RawSample::neutral(17, 8);
        sample.axes[7] = -1.0;
        let entry = MappingEntry::parse("k", "n", "dpup:b3");
        let frame = normalize(&sample, Some(&entry), 0.5);
        assert!(!frame.buttons.dpad_up);
    }

    #[test]
    fn signed_axis_button_source() {
        let mut sample = RawSample::neutral(2, 4);
        sample.axes[3] = -0.9;
        let entry = MappingEntry::parse("k", "n", "a:-a3,b:+a3");
        let frame = normalize(&sample, Some(&entry), 0.5);
        assert!(frame.buttons.south);
        assert!(!frame.buttons.east);
    }

    #[test]
    fn missing_indices_read_as_idle() {
        let frame = normalize(&RawSample::default(), None, 0.5);
        assert_eq!(frame, NormalizedFrame::default());
    }
}
