//! Gesture engine subsystem
//!
//! Turns a stream of [`NormalizedFrame`](crate::controller::normalizer::NormalizedFrame)s
//! into typed text:
//!
//! 1. [`Mode`] - selected from trigger state every tick
//! 2. [`stick`] - per-stick dwell timers and locks
//! 3. [`engine`] - slot assignment, conflict resolution and commits
//! 4. [`syllable`] - onset/vowel/coda buffer and case formatting
//!
//! # Modes
//!
//! ```text
//! triggers:  none ──► Onset        (both sticks pick onsets)
//!            left ──► RimeLeft     (left = vowel, right = coda)
//!            right ─► RimeRight    (right = vowel, left = coda)
//!            both ──► Punctuation  (both sticks pick marks)
//! ```

pub mod engine;
pub mod stick;
pub mod syllable;
pub mod tables;

pub use engine::{DiscreteAction, GestureEngine, GestureOutput, GestureState};
pub use syllable::{CaseMode, Syllable};
pub use tables::{CharTables, Slot};

use crate::controller::normalizer::Stick;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trigger intensity above which a trigger counts as held
pub const DEFAULT_TRIGGER_THRESHOLD: f32 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Onset,
    RimeLeft,
    RimeRight,
    Punctuation,
}

impl Mode {
    pub fn from_triggers(left: f32, right: f32, threshold: f32) -> Mode {
        match (left > threshold, right > threshold) {
            (true, true) => Mode::Punctuation,
            (true, false) => Mode::RimeLeft,
            (false, true) => Mode::RimeRight,
            (false, false) => Mode::Onset,
        }
    }

    pub fn is_rime(self) -> bool {
        matches!(self, Mode::RimeLeft | Mode::RimeRight)
    }

    /// Slot a stick writes to in this mode.
    pub fn slot_for(self, stick: Stick) -> Slot {
        match (self, stick) {
            (Mode::Onset | Mode::Punctuation, _) => Slot::Onset,
            (Mode::RimeLeft, Stick::Left) | (Mode::RimeRight, Stick::Right) => Slot::Vowel,
            (Mode::RimeLeft, Stick::Right) | (Mode::RimeRight, Stick::Left) => Slot::Coda,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Onset => write!(f, "ONSET"),
            Mode::RimeLeft => write!(f, "RIME_LEFT"),
            Mode::RimeRight => write!(f, "RIME_RIGHT"),
            Mode::Punctuation => write!(f, "PUNCTUATION"),
        }
    }
}

/// What happens when a newer stick contests an onset another stick holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Commit the held onset with the default vowel and lock its stick
    #[default]
    Commit,
    /// Drop the newer stick's input
    Ignore,
    /// Discard the buffer and let the newer stick take the onset
    Switch,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "commit" => Ok(ConflictPolicy::Commit),
            "ignore" => Ok(ConflictPolicy::Ignore),
            "switch" => Ok(ConflictPolicy::Switch),
            other => Err(format!("unknown conflict policy '{}'", other)),
        }
    }
}
