//! Per-tick orchestration
//!
//! A [`TypingSession`] owns every piece of pipeline state and is driven by
//! exactly one caller, once per polling tick:
//!
//! ```text
//! registry.active_sample ──► calibration (while running)
//!                       └──► table.resolve ──► normalize ──► gesture engine
//! ```

use crate::calibration::{CalibrationOutcome, CalibrationSession, CalibrationStatus};
use crate::controller::device_registry::DeviceRegistry;
use crate::controller::normalizer::normalize;
use crate::gesture::{CharTables, ConflictPolicy, GestureEngine, GestureOutput};
use crate::mapping::{MappingRecord, MappingTable};
use crate::persistence::Settings;
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutput {
    /// No active controller or no sample yet
    Idle,
    Gesture(GestureOutput),
    Calibrating(CalibrationStatus),
    /// Calibration finished; the record is already in the table and should
    /// be handed to the store
    Calibrated(MappingRecord),
}

#[derive(Debug)]
pub struct TypingSession {
    registry: DeviceRegistry,
    table: MappingTable,
    settings: Settings,
    engine: GestureEngine,
    calibration: Option<CalibrationSession>,
    // Focus lock taken for the calibration, released when it ends
    calibration_lock: bool,
}

impl TypingSession {
    pub fn new(settings: Settings, table: MappingTable) -> Self {
        let engine = GestureEngine::new(
            settings.conflict_policy,
            CharTables::default().with_default_vowel(settings.default_vowel),
        )
        .with_trigger_threshold(settings.trigger_threshold);

        Self {
            registry: DeviceRegistry::new(settings.stick_deadzone),
            table,
            settings,
            engine,
            calibration: None,
            calibration_lock: false,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn set_deadzone(&mut self, deadzone: f32) {
        info!("Stick deadzone set to {}", deadzone);
        self.settings.stick_deadzone = deadzone;
        self.registry.set_deadzone(deadzone);
    }

    pub fn set_trigger_threshold(&mut self, threshold: f32) {
        info!("Trigger threshold set to {}", threshold);
        self.settings.trigger_threshold = threshold;
        self.engine.set_trigger_threshold(threshold);
    }

    pub fn set_policy(&mut self, policy: ConflictPolicy) {
        self.settings.conflict_policy = policy;
        self.engine.set_policy(policy);
    }

    /// Replaces the engine's text, e.g. after the host undid an edit.
    pub fn reset_buffer(&mut self, text: impl Into<String>) {
        self.engine.reset_buffer(text);
    }

    /// Starts calibrating the active controller. Returns false when there is
    /// none or a calibration is already running.
    pub fn start_calibration(&mut self) -> bool {
        if self.calibration.is_some() {
            warn!("Calibration already running");
            return false;
        }
        let Some(device) = self.registry.active() else {
            warn!("No active controller to calibrate");
            return false;
        };

        let mut session = CalibrationSession::start(device.identity.clone());
        if let Some(rest) = &device.rest {
            session = session.with_baseline(rest.clone());
        }
        let slot = device.slot;

        if self.registry.focus_lock().is_none() {
            self.registry.lock_focus(slot);
            self.calibration_lock = true;
        }
        self.calibration = Some(session);
        true
    }

    pub fn calibration(&self) -> Option<&CalibrationSession> {
        self.calibration.as_ref()
    }

    /// Access for skip / force-advance.
    pub fn calibration_mut(&mut self) -> Option<&mut CalibrationSession> {
        self.calibration.as_mut()
    }

    pub fn cancel_calibration(&mut self) {
        if let Some(session) = self.calibration.take() {
            session.cancel();
            self.end_calibration();
        }
    }

    pub fn tick(&mut self, now: DateTime<Local>) -> TickOutput {
        if let Some(session) = self.calibration.as_mut() {
            return match session.tick(self.registry.active_sample()) {
                CalibrationOutcome::InProgress(status) => TickOutput::Calibrating(status),
                CalibrationOutcome::Complete(entry) => {
                    let record = entry.to_record();
                    self.table.insert(entry);
                    self.calibration = None;
                    self.end_calibration();
                    TickOutput::Calibrated(record)
                }
            };
        }

        let Some(device) = self.registry.active() else {
            return TickOutput::Idle;
        };
        let Some(sample) = device.last_sample.as_ref() else {
            return TickOutput::Idle;
        };

        let mapping = self.table.resolve(&device.identity);
        if mapping.is_none() {
            debug!("No mapping for '{}', using standard layout", device.identity);
        }
        let frame = normalize(sample, mapping, self.settings.stick_deadzone);
        TickOutput::Gesture(self.engine.process(&frame, now))
    }

    fn end_calibration(&mut self) {
        if self.calibration_lock {
            self.registry.unlock_focus();
            self.calibration_lock = false;
        }
    }
}
