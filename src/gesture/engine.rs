//! Zustandsbehafteter Gesten-Interpreter
//!
//! Ein Aufruf von [`GestureEngine::process`] pro Controller-Tick. Die
//! Reihenfolge pro Tick ist fest: Moduswechsel, Buttons, dann linker und
//! rechter Stick.

use super::stick::StickTracker;
use super::syllable::{CaseMode, Syllable};
use super::tables::{CharTables, Slot};
use super::{ConflictPolicy, Mode, DEFAULT_TRIGGER_THRESHOLD};
use crate::controller::normalizer::{ButtonSet, NormalizedFrame, Sector, Stick, StickState};
use chrono::{DateTime, Local};
use tracing::{debug, info};

/// Button-Aktionen, die direkt auf den Text wirken
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscreteAction {
    Space,
    Newline,
    Backspace,
    CycleCase(CaseMode),
}

/// Momentaufnahme für den Aufrufer nach jedem Tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GestureOutput {
    pub mode: Mode,
    pub text: String,
    /// Offene Silbe, so wie sie jetzt committet würde
    pub preview: String,
    pub case_mode: CaseMode,
    /// Letzte Button-Aktion in diesem Tick
    pub action: Option<DiscreteAction>,
    /// In diesem Tick committete Silben, in Reihenfolge
    pub committed: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GestureState {
    pub mode: Mode,
    pub syllable: Syllable,
    /// Stick, dessen Zeichen gerade im Onset-Slot steht
    pub onset_owner: Option<Stick>,
    pub sticks: [StickTracker; 2],
    pub case_mode: CaseMode,
    pub last_mode_switch: Option<DateTime<Local>>,
    pub text: String,
    previous_buttons: ButtonSet,
}

impl GestureState {
    pub fn tracker(&self, stick: Stick) -> &StickTracker {
        &self.sticks[stick.index()]
    }
}

#[derive(Debug)]
pub struct GestureEngine {
    state: GestureState,
    tables: CharTables,
    policy: ConflictPolicy,
    trigger_threshold: f32,
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::new(ConflictPolicy::default(), CharTables::default())
    }
}

impl GestureEngine {
    pub fn new(policy: ConflictPolicy, tables: CharTables) -> Self {
        Self {
            state: GestureState::default(),
            tables,
            policy,
            trigger_threshold: DEFAULT_TRIGGER_THRESHOLD,
        }
    }

    pub fn with_trigger_threshold(mut self, threshold: f32) -> Self {
        self.trigger_threshold = threshold;
        self
    }

    pub fn set_trigger_threshold(&mut self, threshold: f32) {
        self.trigger_threshold = threshold;
    }

    pub fn set_policy(&mut self, policy: ConflictPolicy) {
        info!("Conflict policy set to {:?}", policy);
        self.policy = policy;
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn text(&self) -> &str {
        &self.state.text
    }

    /// Ersetzt den Text und verwirft alle offenen Gesten: Silbe, Besitzer,
    /// Verweilzeiten und Sperren. Modus und Schreibweise bleiben.
    pub fn reset_buffer(&mut self, text: impl Into<String>) {
        self.state.text = text.into();
        self.state.syllable.clear();
        self.state.onset_owner = None;
        for tracker in self.state.sticks.iter_mut() {
            tracker.release();
        }
        debug!("Gesture buffer reset");
    }

    pub fn process(&mut self, frame: &NormalizedFrame, now: DateTime<Local>) -> GestureOutput {
        let mut committed = Vec::new();

        let mode = Mode::from_triggers(
            frame.left_trigger,
            frame.right_trigger,
            self.trigger_threshold,
        );
        self.switch_mode(mode, now, &mut committed);

        let action = self.handle_buttons(&frame.buttons);

        if !self.state.mode.is_rime() {
            self.state.syllable.vowel = None;
            self.state.syllable.coda = None;
        }

        for stick in Stick::BOTH {
            self.process_stick(stick, frame.stick(stick), now, &mut committed);
        }

        GestureOutput {
            mode: self.state.mode,
            text: self.state.text.clone(),
            preview: self.state.syllable.format(self.state.case_mode),
            case_mode: self.state.case_mode,
            action,
            committed,
        }
    }

    fn switch_mode(&mut self, mode: Mode, now: DateTime<Local>, committed: &mut Vec<String>) {
        let previous = self.state.mode;
        if mode == previous {
            return;
        }

        if previous.is_rime() || previous == Mode::Punctuation {
            self.commit(self.state.syllable, committed);
        } else if mode == Mode::Punctuation && self.state.syllable.onset.is_some() {
            // Offener Buchstaben-Onset würde sonst als Satzzeichen getippt
            self.commit_onset(self.state.syllable.onset, committed);
        }

        info!("Mode {} -> {}", previous, mode);
        self.state.mode = mode;
        self.state.last_mode_switch = Some(now);
        self.state.onset_owner = None;
    }

    fn handle_buttons(&mut self, buttons: &ButtonSet) -> Option<DiscreteAction> {
        let previous = self.state.previous_buttons;
        self.state.previous_buttons = *buttons;
        let mut action = None;

        if buttons.south && !previous.south {
            self.state.text.push(' ');
            action = Some(DiscreteAction::Space);
        }
        if buttons.east && !previous.east {
            self.state.text.push('\n');
            action = Some(DiscreteAction::Newline);
        }
        if buttons.west && !previous.west {
            self.state.text.pop();
            action = Some(DiscreteAction::Backspace);
        }

        let clicked = (buttons.left_stick && !previous.left_stick)
            || (buttons.right_stick && !previous.right_stick);
        if clicked {
            self.state.case_mode = self.state.case_mode.cycle();
            debug!("Case mode now {}", self.state.case_mode);
            // Gehaltene Sticks schreiben mit neuer Schreibweise erneut
            for tracker in self.state.sticks.iter_mut() {
                tracker.accepted = false;
            }
            action = Some(DiscreteAction::CycleCase(self.state.case_mode));
        }

        action
    }

    fn process_stick(
        &mut self,
        stick: Stick,
        stick_state: &StickState,
        now: DateTime<Local>,
        committed: &mut Vec<String>,
    ) {
        let mode = self.state.mode;
        let index = stick.index();

        let sector = match (stick_state.active, stick_state.sector) {
            (true, Some(sector)) => sector,
            _ => {
                self.release_stick(stick, committed);
                return;
            }
        };

        let tracker = &mut self.state.sticks[index];
        if tracker.locked {
            return;
        }
        if tracker.enter(sector, now) {
            debug!("{:?} stick entered {:?}", stick, sector);
        }
        if tracker.accepted
            || !tracker.dwelled(now)
            || !tracker.entered_after(self.state.last_mode_switch)
        {
            return;
        }

        let slot = mode.slot_for(stick);
        let Some(ch) = self.lookup(mode, slot, stick, sector) else {
            return;
        };

        match slot {
            Slot::Onset => self.accept_onset(stick, ch, committed),
            Slot::Vowel => {
                self.state.syllable.vowel = Some(ch);
                self.mark_accepted(stick, ch);
            }
            Slot::Coda => {
                self.state.syllable.coda = Some(ch);
                self.mark_accepted(stick, ch);
            }
        }
    }

    fn release_stick(&mut self, stick: Stick, committed: &mut Vec<String>) {
        let owned = self.state.onset_owner == Some(stick);
        let was_active = self.state.sticks[stick.index()].release();

        match self.state.mode {
            Mode::Onset if was_active && owned => {
                self.commit_onset(self.state.syllable.onset, committed);
            }
            Mode::Punctuation if was_active && owned => {
                self.commit(self.state.syllable, committed);
            }
            mode if mode.is_rime() => match mode.slot_for(stick) {
                Slot::Vowel => self.state.syllable.vowel = None,
                Slot::Coda => self.state.syllable.coda = None,
                Slot::Onset => {}
            },
            _ => {}
        }
    }

    fn accept_onset(&mut self, stick: Stick, ch: char, committed: &mut Vec<String>) {
        let mine = stick.index();
        let theirs = stick.other().index();

        if self.state.mode == Mode::Onset {
            let other = &self.state.sticks[theirs];
            // Nur der Stick, dem der offene Onset gehört, kann verdrängt werden
            let contested = self.state.onset_owner == Some(stick.other())
                && self.state.syllable.onset.is_some()
                && other.active
                && !other.locked
                && self.state.sticks[mine].newer_than(other);

            if contested {
                match self.policy {
                    ConflictPolicy::Ignore => {
                        debug!("{:?} stick ignored, onset held by {:?}", stick, stick.other());
                        return;
                    }
                    ConflictPolicy::Commit => {
                        self.commit_onset(self.state.syllable.onset, committed);
                        self.state.sticks[theirs].locked = true;
                    }
                    ConflictPolicy::Switch => {
                        debug!("{:?} stick takes the onset", stick);
                        self.state.syllable.clear();
                    }
                }
            }
        }

        self.state.syllable.onset = Some(ch);
        self.state.onset_owner = Some(stick);
        self.mark_accepted(stick, ch);
    }

    fn mark_accepted(&mut self, stick: Stick, ch: char) {
        self.state.sticks[stick.index()].accepted = true;
        debug!("{:?} stick wrote '{}'", stick, ch);
    }

    fn lookup(&self, mode: Mode, slot: Slot, stick: Stick, sector: Sector) -> Option<char> {
        match (mode, slot) {
            (Mode::Punctuation, _) => self.tables.punctuation(stick, sector),
            (_, Slot::Onset) => self.tables.onset(stick, sector),
            (_, Slot::Vowel) => self.tables.vowel(sector),
            (_, Slot::Coda) => self.tables.coda(sector),
        }
    }

    /// Committet einen einzelnen Onset, ergänzt um den Standardvokal.
    fn commit_onset(&mut self, onset: Option<char>, committed: &mut Vec<String>) {
        let syllable = Syllable {
            onset,
            vowel: onset.map(|_| self.tables.default_vowel),
            coda: None,
        };
        self.commit(syllable, committed);
    }

    fn commit(&mut self, syllable: Syllable, committed: &mut Vec<String>) {
        let typed = syllable.format(self.state.case_mode);
        if !typed.is_empty() {
            info!("Committed '{}'", typed);
            self.state.text.push_str(&typed);
            committed.push(typed);
        }
        self.state.syllable.clear();
        self.state.onset_owner = None;
        self.state.case_mode = self.state.case_mode.after_commit();
    }
}
