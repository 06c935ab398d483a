//! Syllable buffer and case handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capitalisation applied when a syllable is formatted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseMode {
    #[default]
    Lower,
    /// Capitalise the next committed syllable only
    ShiftOnce,
    CapsLock,
}

impl CaseMode {
    /// lower → shift-once → caps-lock → lower
    pub fn cycle(self) -> CaseMode {
        match self {
            CaseMode::Lower => CaseMode::ShiftOnce,
            CaseMode::ShiftOnce => CaseMode::CapsLock,
            CaseMode::CapsLock => CaseMode::Lower,
        }
    }

    /// State after a commit: a one-shot shift is used up, caps lock stays.
    pub fn after_commit(self) -> CaseMode {
        match self {
            CaseMode::ShiftOnce => CaseMode::Lower,
            other => other,
        }
    }
}

impl fmt::Display for CaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseMode::Lower => write!(f, "lower"),
            CaseMode::ShiftOnce => write!(f, "shift"),
            CaseMode::CapsLock => write!(f, "caps"),
        }
    }
}

/// Onset / vowel / coda slots of the syllable being built
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Syllable {
    pub onset: Option<char>,
    pub vowel: Option<char>,
    pub coda: Option<char>,
}

impl Syllable {
    pub fn is_empty(&self) -> bool {
        self.onset.is_none() && self.vowel.is_none() && self.coda.is_none()
    }

    pub fn clear(&mut self) {
        *self = Syllable::default();
    }

    pub fn format(&self, case: CaseMode) -> String {
        let parts = [self.onset, self.vowel, self.coda];
        match case {
            CaseMode::Lower => parts.iter().flatten().collect(),
            CaseMode::CapsLock => parts.iter().flatten().flat_map(|c| c.to_uppercase()).collect(),
            CaseMode::ShiftOnce => {
                let mut out = String::new();
                let mut first = true;
                for c in parts.iter().flatten() {
                    if first {
                        out.extend(c.to_uppercase());
                        first = false;
                    } else {
                        out.push(*c);
                    }
                }
                out
            }
        }
    }
}
