//! Interactive calibration
//!
//! Walks the user through every logical role once, recording which physical
//! button or axis answers each prompt. Works directly on [`RawSample`]s since
//! no mapping exists yet for the controller being calibrated.
//!
//! ```text
//! InitialRelease --> AwaitingInput --> AwaitingRelease --+
//!   (stuck check)         ^                              |
//!                         +--------- next step <---------+
//!                                        | queue empty
//!                                        v
//!                     skipped steps? requeue once : Finished
//! ```

use crate::controller::raw_sample::RawSample;
use crate::mapping::{best_key, InputSource, MappingEntry, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

/// Axis movement from baseline that counts as stuck during the initial check
pub const STUCK_THRESHOLD: f32 = 0.5;
/// Axis movement from baseline that answers a prompt
pub const DETECT_THRESHOLD: f32 = 0.6;
/// Signed value an axis must exceed to count as a direction
pub const SIGN_THRESHOLD: f32 = 0.5;
/// A recorded axis counts as released once back below this
pub const RELEASE_THRESHOLD: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPhase {
    InitialRelease,
    AwaitingInput,
    AwaitingRelease,
    Finished,
}

/// What the host shows the user after every calibration tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalibrationStatus {
    pub phase: CalibrationPhase,
    pub step: Option<Role>,
    pub prompt: String,
    /// Steps recorded so far
    pub recorded: usize,
    pub total: usize,
    /// Control that was already active when the session started
    pub stuck: Option<InputSource>,
    /// Step whose recorded control the last input collided with
    pub flagged: Option<Role>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalibrationOutcome {
    InProgress(CalibrationStatus),
    Complete(MappingEntry),
}

#[derive(Debug)]
pub struct CalibrationSession {
    identity: String,
    queue: VecDeque<Role>,
    skipped: Vec<Role>,
    requeued: bool,
    phase: CalibrationPhase,
    baseline: Option<Vec<f32>>,
    recorded: BTreeMap<Role, InputSource>,
    // Control that must go back to rest before the next step
    pending_release: Option<InputSource>,
    stuck: Option<InputSource>,
    flagged: Option<Role>,
    force: bool,
}

impl CalibrationSession {
    /// Starts a session for the controller with this identity string.
    pub fn start(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        info!("Starting calibration for '{}'", identity);
        Self {
            identity,
            queue: Role::ALL.into_iter().collect(),
            skipped: Vec::new(),
            requeued: false,
            phase: CalibrationPhase::InitialRelease,
            baseline: None,
            recorded: BTreeMap::new(),
            pending_release: None,
            stuck: None,
            flagged: None,
            force: false,
        }
    }

    /// Uses known rest positions instead of the first sample as baseline.
    pub fn with_baseline(mut self, axes: Vec<f32>) -> Self {
        self.baseline = Some(axes);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn current_step(&self) -> Option<Role> {
        match self.phase {
            CalibrationPhase::AwaitingInput | CalibrationPhase::AwaitingRelease => {
                self.queue.front().copied()
            }
            _ => None,
        }
    }

    pub fn recorded(&self) -> &BTreeMap<Role, InputSource> {
        &self.recorded
    }

    /// Leave the initial check even though something still reads as pressed.
    pub fn force_advance(&mut self) {
        if self.phase == CalibrationPhase::InitialRelease {
            warn!("Calibration forced past stuck input check");
            self.force = true;
        }
    }

    /// Moves the current step to the skip queue without recording anything.
    pub fn skip(&mut self) {
        if self.phase != CalibrationPhase::AwaitingInput {
            return;
        }
        if let Some(role) = self.queue.pop_front() {
            info!("Skipped calibration step '{}'", role);
            self.skipped.push(role);
            self.flagged = None;
            self.advance();
        }
    }

    /// Aborts the session, discarding everything recorded.
    pub fn cancel(self) {
        info!(
            "Calibration for '{}' cancelled, discarding {} recorded steps",
            self.identity,
            self.recorded.len()
        );
    }

    /// Feeds one tick. Without a sample nothing changes.
    pub fn tick(&mut self, sample: Option<&RawSample>) -> CalibrationOutcome {
        if self.phase == CalibrationPhase::Finished {
            return CalibrationOutcome::Complete(self.to_entry());
        }

        let Some(sample) = sample else {
            return CalibrationOutcome::InProgress(self.status());
        };

        match self.phase {
            CalibrationPhase::InitialRelease => self.check_initial_release(sample),
            CalibrationPhase::AwaitingInput => self.await_input(sample),
            CalibrationPhase::AwaitingRelease => self.await_release(sample),
            CalibrationPhase::Finished => {}
        }

        if self.phase == CalibrationPhase::Finished {
            CalibrationOutcome::Complete(self.to_entry())
        } else {
            CalibrationOutcome::InProgress(self.status())
        }
    }

    pub fn status(&self) -> CalibrationStatus {
        let step = self.current_step();
        CalibrationStatus {
            phase: self.phase,
            step,
            prompt: self.prompt(step),
            recorded: self.recorded.len(),
            total: Role::ALL.len(),
            stuck: self.stuck,
            flagged: self.flagged,
        }
    }

    fn prompt(&self, step: Option<Role>) -> String {
        match (self.phase, step) {
            (CalibrationPhase::InitialRelease, _) => match self.stuck {
                Some(control) => format!("Release all controls ({} is still active)", control),
                None => "Release all controls".to_string(),
            },
            (CalibrationPhase::AwaitingInput, Some(role)) => prompt_for(role).to_string(),
            (CalibrationPhase::AwaitingRelease, Some(_)) => "Release".to_string(),
            _ => "Calibration complete".to_string(),
        }
    }

    fn baseline(&self, axis: usize) -> f32 {
        self.baseline
            .as_ref()
            .and_then(|b| b.get(axis).copied())
            .unwrap_or(0.0)
    }

    fn check_initial_release(&mut self, sample: &RawSample) {
        if self.baseline.is_none() {
            debug!("Calibration baseline captured: {:?}", sample.axes);
            self.baseline = Some(sample.axes.clone());
        }

        let stuck_button = sample
            .buttons
            .iter()
            .position(|b| b.pressed)
            .map(|i| InputSource::Button(i as u32));
        let stuck_axis = || {
            sample
                .axes
                .iter()
                .enumerate()
                .find(|(i, v)| (**v - self.baseline(*i)).abs() > STUCK_THRESHOLD)
                .map(|(i, _)| InputSource::Axis(i as u32))
        };
        let stuck = stuck_button.or_else(stuck_axis);

        if stuck != self.stuck {
            if let Some(control) = stuck {
                warn!("Control {} active at calibration start", control);
            }
        }
        self.stuck = stuck;

        if stuck.is_none() || self.force {
            self.stuck = None;
            self.phase = CalibrationPhase::AwaitingInput;
            info!("Calibration ready, first step '{}'", Role::ALL[0]);
        }
    }

    fn await_input(&mut self, sample: &RawSample) {
        let Some(role) = self.queue.front().copied() else {
            self.advance();
            return;
        };
        let Some(code) = self.detect(role, sample) else {
            return;
        };

        if let Some((existing, _)) = self
            .recorded
            .iter()
            .find(|(_, recorded)| recorded.conflicts_with(&code))
        {
            if self.flagged != Some(*existing) {
                warn!(
                    "{} for '{}' is already used by '{}'",
                    code, role, existing
                );
            }
            self.flagged = Some(*existing);
            return;
        }

        info!("Calibration step '{}' recorded as {}", role, code);
        self.recorded.insert(role, code);
        self.pending_release = Some(code);
        self.flagged = None;
        self.phase = CalibrationPhase::AwaitingRelease;
    }

    // Buttons first, then the first axis far enough from baseline. Axes
    // answer only stick, trigger and D-pad steps.
    fn detect(&self, role: Role, sample: &RawSample) -> Option<InputSource> {
        if let Some(index) = sample.buttons.iter().position(|b| b.pressed) {
            return Some(InputSource::Button(index as u32));
        }

        let (index, value) = sample
            .axes
            .iter()
            .copied()
            .enumerate()
            .find(|(i, v)| (v - self.baseline(*i)).abs() > DETECT_THRESHOLD)?;
        let index = index as u32;

        if role.is_stick_axis() {
            return Some(InputSource::Axis(index));
        }
        if !(role.is_trigger() || role.is_dpad()) {
            debug!("Axis {} moved during button step '{}', ignored", index, role);
            return None;
        }
        if value > SIGN_THRESHOLD {
            Some(InputSource::positive(index))
        } else if value < -SIGN_THRESHOLD {
            Some(InputSource::negative(index))
        } else {
            debug!("Axis {} moved but has no clear direction ({:.2})", index, value);
            None
        }
    }

    fn await_release(&mut self, sample: &RawSample) {
        let Some(code) = self.pending_release else {
            self.finish_step();
            return;
        };

        let released = match code {
            InputSource::Button(index) => sample
                .button(index as usize)
                .map_or(true, |b| !b.pressed),
            InputSource::SignedAxis { axis, sign } => sample
                .axis(axis as usize)
                .map_or(true, |v| sign.apply(v) < RELEASE_THRESHOLD),
            InputSource::Axis(axis) => sample
                .axis(axis as usize)
                .map_or(true, |v| (v - self.baseline(axis as usize)).abs() < RELEASE_THRESHOLD),
            InputSource::Hat { .. } => true,
        };

        if released {
            self.finish_step();
        }
    }

    fn finish_step(&mut self) {
        self.pending_release = None;
        self.queue.pop_front();
        self.advance();
    }

    fn advance(&mut self) {
        if self.queue.is_empty() {
            if !self.skipped.is_empty() && !self.requeued {
                info!("Requeueing {} skipped calibration steps", self.skipped.len());
                self.queue.extend(self.skipped.drain(..));
                self.requeued = true;
            } else {
                if !self.skipped.is_empty() {
                    warn!("Leaving {} calibration steps unmapped", self.skipped.len());
                }
                info!("Calibration for '{}' finished", self.identity);
                self.phase = CalibrationPhase::Finished;
                return;
            }
        }
        self.phase = CalibrationPhase::AwaitingInput;
        if let Some(next) = self.queue.front() {
            debug!("Next calibration step '{}'", next);
        }
    }

    fn to_entry(&self) -> MappingEntry {
        let mut entry = MappingEntry::new(best_key(&self.identity), self.identity.clone());
        for (role, source) in &self.recorded {
            entry.bind(*role, *source);
        }
        entry
    }
}

fn prompt_for(role: Role) -> &'static str {
    match role {
        Role::A => "Press the bottom face button",
        Role::B => "Press the right face button",
        Role::X => "Press the left face button",
        Role::Y => "Press the top face button",
        Role::LeftShoulder => "Press the left shoulder button",
        Role::RightShoulder => "Press the right shoulder button",
        Role::LeftTrigger => "Pull the left trigger",
        Role::RightTrigger => "Pull the right trigger",
        Role::Back => "Press select / back",
        Role::Start => "Press start",
        Role::LeftStick => "Click the left stick",
        Role::RightStick => "Click the right stick",
        Role::DPadUp => "Press D-pad up",
        Role::DPadDown => "Press D-pad down",
        Role::DPadLeft => "Press D-pad left",
        Role::DPadRight => "Press D-pad right",
        Role::LeftX => "Move the left stick right",
        Role::LeftY => "Move the left stick down",
        Role::RightX => "Move the right stick right",
        Role::RightY => "Move the right stick down",
    }
}

impl CalibrationStatus {
    /// Short one-line rendering for log output.
    pub fn summary(&self) -> String {
        let mut line = format!("[{}/{}] {}", self.recorded, self.total, self.prompt);
        if let Some(flagged) = self.flagged {
            line.push_str(&format!(" (already used by '{}')", flagged));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::raw_sample::ButtonSample;

    const BUTTONS: usize = 16;
    const AXES: usize = 8;

    fn idle() -> RawSample {
        RawSample::neutral(BUTTONS, AXES)
    }

    fn button(index: usize) -> RawSample {
        let mut sample = idle();
        sample.buttons[index] = ButtonSample::new(true, 1.0);
        sample
    }

    fn axis(index: usize, value: f32) -> RawSample {
        let mut sample = idle();
        sample.axes[index] = value;
        sample
    }

    fn ready(identity: &str) -> CalibrationSession {
        let mut session = CalibrationSession::start(identity);
        session.tick(Some(&idle()));
        assert_eq!(session.phase(), CalibrationPhase::AwaitingInput);
        session
    }

    // Press then release one control
    fn answer(session: &mut CalibrationSession, pressed: &RawSample) -> CalibrationOutcome {
        session.tick(Some(pressed));
        session.tick(Some(&idle()))
    }

    fn run_to_step(session: &mut CalibrationSession, target: Role) {
        let mut next_button = 0;
        while session.current_step() != Some(target) {
            answer(session, &button(next_button));
            next_button += 1;
        }
    }

    #[test]
    fn stuck_button_blocks_until_forced() {
        let mut session = CalibrationSession::start("pad");
        let out = session.tick(Some(&button(3)));
        match out {
            CalibrationOutcome::InProgress(status) => {
                assert_eq!(status.phase, CalibrationPhase::InitialRelease);
                assert_eq!(status.stuck, Some(InputSource::Button(3)));
            }
            other => panic!("unexpected {:?}", other),
        }
        session.tick(Some(&button(3)));
        assert_eq!(session.phase(), CalibrationPhase::InitialRelease);

        session.force_advance();
        session.tick(Some(&button(3)));
        assert_eq!(session.phase(), CalibrationPhase::AwaitingInput);
        assert_eq!(session.current_step(), Some(Role::A));
    }

    #[test]
    fn axis_away_from_rest_counts_as_stuck() {
        let mut session = CalibrationSession::start("pad").with_baseline(vec![0.0; AXES]);
        session.tick(Some(&axis(5, -0.9)));
        assert_eq!(session.phase(), CalibrationPhase::InitialRelease);
        assert_eq!(session.status().stuck, Some(InputSource::Axis(5)));

        session.tick(Some(&axis(5, -0.4)));
        assert_eq!(session.phase(), CalibrationPhase::AwaitingInput);
        assert_eq!(session.status().stuck, None);
    }

    #[test]
    fn missing_sample_is_a_no_op() {
        let mut session = ready("pad");
        session.tick(Some(&button(0)));
        assert_eq!(session.phase(), CalibrationPhase::AwaitingRelease);
        session.tick(None);
        assert_eq!(session.phase(), CalibrationPhase::AwaitingRelease);
        assert_eq!(session.current_step(), Some(Role::A));
    }

    #[test]
    fn button_is_recorded_then_waits_for_release() {
        let mut session = ready("pad");
        session.tick(Some(&button(1)));
        assert_eq!(session.recorded().get(&Role::A), Some(&InputSource::Button(1)));
        session.tick(Some(&button(1)));
        assert_eq!(session.current_step(), Some(Role::A));
        session.tick(Some(&idle()));
        assert_eq!(session.current_step(), Some(Role::B));
    }

    #[test]
    fn same_button_twice_is_flagged() {
        let mut session = ready("pad");
        answer(&mut session, &button(0));
        let out = session.tick(Some(&button(0)));
        match out {
            CalibrationOutcome::InProgress(status) => {
                assert_eq!(status.step, Some(Role::B));
                assert_eq!(status.flagged, Some(Role::A));
                assert_eq!(status.phase, CalibrationPhase::AwaitingInput);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.recorded().len(), 1);
    }

    #[test]
    fn trigger_axis_is_recorded_with_sign() {
        let mut session = ready("pad");
        run_to_step(&mut session, Role::LeftTrigger);
        answer(&mut session, &axis(4, 1.0));
        assert_eq!(
            session.recorded().get(&Role::LeftTrigger),
            Some(&InputSource::positive(4))
        );
    }

    #[test]
    fn signed_release_waits_for_direction_to_drop() {
        let mut session = ready("pad");
        run_to_step(&mut session, Role::DPadUp);
        session.tick(Some(&axis(7, -1.0)));
        assert_eq!(session.recorded().get(&Role::DPadUp), Some(&InputSource::negative(7)));
        session.tick(Some(&axis(7, -0.4)));
        assert_eq!(session.current_step(), Some(Role::DPadUp));
        session.tick(Some(&axis(7, -0.2)));
        assert_eq!(session.current_step(), Some(Role::DPadDown));
    }

    #[test]
    fn whole_axis_blocks_signed_axis_on_same_index() {
        let mut session = ready("pad");
        // Record axis 7 unsigned via a stick step
        while session.current_step() != Some(Role::LeftX) {
            session.skip();
        }
        answer(&mut session, &axis(7, 1.0));
        assert_eq!(session.current_step(), Some(Role::LeftY));
        assert_eq!(session.recorded().get(&Role::LeftX), Some(&InputSource::Axis(7)));

        // Skips take us round to the requeued button steps
        while session.current_step() != Some(Role::DPadUp) {
            session.skip();
        }
        let out = session.tick(Some(&axis(7, 1.0)));
        match out {
            CalibrationOutcome::InProgress(status) => {
                assert_eq!(status.flagged, Some(Role::LeftX));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.recorded().get(&Role::DPadUp), None);
    }

    #[test]
    fn signed_axis_blocks_whole_axis_on_same_index() {
        let mut session = ready("pad");
        run_to_step(&mut session, Role::DPadUp);
        answer(&mut session, &axis(7, -1.0));
        assert_eq!(session.recorded().get(&Role::DPadUp), Some(&InputSource::negative(7)));

        while session.current_step() != Some(Role::LeftX) {
            session.skip();
        }
        let out = session.tick(Some(&axis(7, 1.0)));
        match out {
            CalibrationOutcome::InProgress(status) => {
                assert_eq!(status.flagged, Some(Role::DPadUp));
                assert_eq!(status.step, Some(Role::LeftX));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.recorded().get(&Role::LeftX), None);
    }

    #[test]
    fn axis_cannot_answer_a_face_button_step() {
        let mut session = ready("pad");
        session.tick(Some(&axis(4, 1.0)));
        assert_eq!(session.phase(), CalibrationPhase::AwaitingInput);
        assert_eq!(session.current_step(), Some(Role::A));
        assert!(session.recorded().is_empty());
    }

    #[test]
    fn opposite_signs_on_one_axis_coexist() {
        let mut session = ready("pad");
        run_to_step(&mut session, Role::DPadUp);
        answer(&mut session, &axis(7, -1.0));
        answer(&mut session, &axis(7, 1.0));
        assert_eq!(session.recorded().get(&Role::DPadUp), Some(&InputSource::negative(7)));
        assert_eq!(session.recorded().get(&Role::DPadDown), Some(&InputSource::positive(7)));
        assert_eq!(session.status().flagged, None);
    }

    #[test]
    fn stick_step_records_unsigned_axis_regardless_of_sign() {
        let mut session = ready("pad");
        run_to_step(&mut session, Role::LeftX);
        answer(&mut session, &axis(0, -1.0));
        assert_eq!(session.recorded().get(&Role::LeftX), Some(&InputSource::Axis(0)));
        assert_eq!(session.current_step(), Some(Role::LeftY));
    }

    #[test]
    fn ambiguous_axis_movement_is_ignored_for_signed_steps() {
        let mut session = ready("pad");
        session.baseline = Some(vec![-1.0; AXES]);
        // Moved 1.0 from baseline but sits at 0.0: no direction
        session.tick(Some(&axis(2, 0.0)));
        assert_eq!(session.phase(), CalibrationPhase::AwaitingInput);
        assert!(session.recorded().is_empty());
    }

    #[test]
    fn skipped_steps_come_back_once() {
        let mut session = ready("pad");
        session.skip();
        assert_eq!(session.current_step(), Some(Role::B));
        for index in 1..16 {
            answer(&mut session, &button(index));
        }
        for axis_index in 0..4 {
            answer(&mut session, &axis(axis_index, 1.0));
        }
        assert_eq!(session.current_step(), Some(Role::A));

        // Skipping in the second round leaves the step unmapped for good
        session.skip();
        assert_eq!(session.phase(), CalibrationPhase::Finished);
        match session.tick(None) {
            CalibrationOutcome::Complete(entry) => {
                assert_eq!(entry.source(Role::A), None);
                assert_eq!(entry.source(Role::B), Some(&InputSource::Button(1)));
                assert_eq!(entry.len(), 19);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn full_run_produces_entry_keyed_by_identity() {
        let identity = "Test Pad (Vendor: 045e Product: 028e)";
        let mut session = ready(identity);
        for index in 0..16 {
            answer(&mut session, &button(index));
        }
        for axis_index in 0..3 {
            answer(&mut session, &axis(axis_index, 1.0));
        }
        let out = answer(&mut session, &axis(3, 1.0));
        match out {
            CalibrationOutcome::Complete(entry) => {
                assert_eq!(entry.key, "045e-028e");
                assert_eq!(entry.name, identity);
                assert_eq!(entry.len(), 20);
                assert_eq!(entry.source(Role::RightY), Some(&InputSource::Axis(3)));

                let reparsed = MappingEntry::parse(&entry.key, &entry.name, &entry.definition());
                assert_eq!(reparsed, entry);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn identity_without_ids_uses_generic_key() {
        let mut session = ready("Mystery Pad");
        while session.current_step().is_some() {
            session.skip();
        }
        match session.tick(None) {
            CalibrationOutcome::Complete(entry) => {
                assert_eq!(entry.key, crate::mapping::LAST_CALIBRATED_KEY);
                assert!(entry.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn status_reports_progress_and_prompt() {
        let mut session = ready("pad");
        answer(&mut session, &button(0));
        let status = session.status();
        assert_eq!(status.recorded, 1);
        assert_eq!(status.total, 20);
        assert_eq!(status.step, Some(Role::B));
        assert_eq!(status.prompt, "Press the right face button");
        assert!(status.summary().starts_with("[1/20]"));
    }
}
