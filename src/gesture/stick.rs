//! Per-stick dwell and lock bookkeeping

use crate::controller::normalizer::Sector;
use chrono::{DateTime, Duration, Local};

/// Minimum continuous hold in one sector before its character is accepted
pub const DWELL_MS: i64 = 60;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StickTracker {
    pub sector: Option<Sector>,
    pub entered_at: Option<DateTime<Local>>,
    /// Ignore all input until the stick returns to center
    pub locked: bool,
    pub active: bool,
    /// Current sector already produced its character
    pub accepted: bool,
}

impl StickTracker {
    /// Records the stick's sector for this tick. Returns true when the
    /// sector changed and the dwell timer restarted.
    pub fn enter(&mut self, sector: Sector, now: DateTime<Local>) -> bool {
        self.active = true;
        if self.sector == Some(sector) {
            return false;
        }
        self.sector = Some(sector);
        self.entered_at = Some(now);
        self.accepted = false;
        true
    }

    /// Back to center: clears dwell and lock. Returns whether the
    /// stick was active before.
    pub fn release(&mut self) -> bool {
        let was_active = self.active;
        *self = StickTracker::default();
        was_active
    }

    /// Held longer than [`DWELL_MS`] in the current sector.
    pub fn dwelled(&self, now: DateTime<Local>) -> bool {
        self.entered_at
            .is_some_and(|entered| now - entered > Duration::milliseconds(DWELL_MS))
    }

    /// Entered the current sector strictly after `instant` (always true when
    /// there is no instant to compare against).
    pub fn entered_after(&self, instant: Option<DateTime<Local>>) -> bool {
        match (self.entered_at, instant) {
            (Some(entered), Some(instant)) => entered > instant,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Whether this stick's interaction began after `other`'s.
    pub fn newer_than(&self, other: &StickTracker) -> bool {
        match (self.entered_at, other.entered_at) {
            (Some(mine), Some(theirs)) => mine > theirs,
            _ => false,
        }
    }
}
