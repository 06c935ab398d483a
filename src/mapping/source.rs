//! Physische Quellen und logische Rollen der Mapping-Grammatik

use crate::mapping::MappingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Richtung, in die sich eine Achse für eine vorzeichenbehaftete Quelle bewegen muss
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    /// Dreht `value` so, dass diese Richtung positiv ist.
    pub fn apply(self, value: f32) -> f32 {
        match self {
            Sign::Positive => value,
            Sign::Negative => -value,
        }
    }
}

/// Woher eine logische Rolle ihr Signal liest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// `bN`
    Button(u32),
    /// `aN`, die ganze Achse
    Axis(u32),
    /// `+aN` / `-aN`, eine Richtung der Achse
    SignedAxis { axis: u32, sign: Sign },
    /// `hN.M`, wird geparst, liefert aber nie ein Signal
    Hat { hat: u32, mask: u32 },
}

impl InputSource {
    pub fn positive(axis: u32) -> Self {
        InputSource::SignedAxis { axis, sign: Sign::Positive }
    }

    pub fn negative(axis: u32) -> Self {
        InputSource::SignedAxis { axis, sign: Sign::Negative }
    }

    /// Zwei Quellen kollidieren, wenn sie gleich sind oder eine die ganze
    /// Achse und die andere eine Richtung derselben Achse ist. Entgegengesetzte
    /// Richtungen einer Achse vertragen sich.
    pub fn conflicts_with(&self, other: &InputSource) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (InputSource::Axis(a), InputSource::SignedAxis { axis: b, .. })
                | (InputSource::SignedAxis { axis: a, .. }, InputSource::Axis(b))
                if a == b
        )
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Button(n) => write!(f, "b{}", n),
            InputSource::Axis(n) => write!(f, "a{}", n),
            InputSource::SignedAxis { axis, sign: Sign::Positive } => write!(f, "+a{}", axis),
            InputSource::SignedAxis { axis, sign: Sign::Negative } => write!(f, "-a{}", axis),
            InputSource::Hat { hat, mask } => write!(f, "h{}.{}", hat, mask),
        }
    }
}

fn parse_index(digits: &str, token: &str) -> Result<u32, MappingError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MappingError::InvalidSource(token.to_string()));
    }
    digits
        .parse()
        .map_err(|_| MappingError::InvalidSource(token.to_string()))
}

impl FromStr for InputSource {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("+a") {
            return Ok(InputSource::positive(parse_index(rest, s)?));
        }
        if let Some(rest) = s.strip_prefix("-a") {
            return Ok(InputSource::negative(parse_index(rest, s)?));
        }
        if let Some(rest) = s.strip_prefix('b') {
            return Ok(InputSource::Button(parse_index(rest, s)?));
        }
        if let Some(rest) = s.strip_prefix('a') {
            return Ok(InputSource::Axis(parse_index(rest, s)?));
        }
        if let Some(rest) = s.strip_prefix('h') {
            let (hat, mask) = rest
                .split_once('.')
                .ok_or_else(|| MappingError::InvalidSource(s.to_string()))?;
            return Ok(InputSource::Hat {
                hat: parse_index(hat, s)?,
                mask: parse_index(mask, s)?,
            });
        }
        Err(MappingError::InvalidSource(s.to_string()))
    }
}

/// Logische Rollen, die ein Mapping belegen kann
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    A,
    B,
    X,
    Y,
    LeftShoulder,
    RightShoulder,
    LeftTrigger,
    RightTrigger,
    Back,
    Start,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl Role {
    pub const ALL: [Role; 20] = [
        Role::A,
        Role::B,
        Role::X,
        Role::Y,
        Role::LeftShoulder,
        Role::RightShoulder,
        Role::LeftTrigger,
        Role::RightTrigger,
        Role::Back,
        Role::Start,
        Role::LeftStick,
        Role::RightStick,
        Role::DPadUp,
        Role::DPadDown,
        Role::DPadLeft,
        Role::DPadRight,
        Role::LeftX,
        Role::LeftY,
        Role::RightX,
        Role::RightY,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Role::A => "a",
            Role::B => "b",
            Role::X => "x",
            Role::Y => "y",
            Role::LeftShoulder => "leftshoulder",
            Role::RightShoulder => "rightshoulder",
            Role::LeftTrigger => "lefttrigger",
            Role::RightTrigger => "righttrigger",
            Role::Back => "back",
            Role::Start => "start",
            Role::LeftStick => "leftstick",
            Role::RightStick => "rightstick",
            Role::DPadUp => "dpup",
            Role::DPadDown => "dpdown",
            Role::DPadLeft => "dpleft",
            Role::DPadRight => "dpright",
            Role::LeftX => "leftx",
            Role::LeftY => "lefty",
            Role::RightX => "rightx",
            Role::RightY => "righty",
        }
    }

    /// Index der Rolle im Standard-Gamepad-Layout.
    ///
    /// Buttons liefern einen Button-Index, Stick-Rollen einen Achsen-Index.
    pub fn standard_index(self) -> u32 {
        match self {
            Role::A => 0,
            Role::B => 1,
            Role::X => 2,
            Role::Y => 3,
            Role::LeftShoulder => 4,
            Role::RightShoulder => 5,
            Role::LeftTrigger => 6,
            Role::RightTrigger => 7,
            Role::Back => 8,
            Role::Start => 9,
            Role::LeftStick => 10,
            Role::RightStick => 11,
            Role::DPadUp => 12,
            Role::DPadDown => 13,
            Role::DPadLeft => 14,
            Role::DPadRight => 15,
            Role::LeftX => 0,
            Role::LeftY => 1,
            Role::RightX => 2,
            Role::RightY => 3,
        }
    }

    pub fn is_stick_axis(self) -> bool {
        matches!(self, Role::LeftX | Role::LeftY | Role::RightX | Role::RightY)
    }

    pub fn is_trigger(self) -> bool {
        matches!(self, Role::LeftTrigger | Role::RightTrigger)
    }

    pub fn is_dpad(self) -> bool {
        matches!(
            self,
            Role::DPadUp | Role::DPadDown | Role::DPadLeft | Role::DPadRight
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.name() == s)
            .ok_or_else(|| MappingError::UnknownRole(s.to_string()))
    }
}
