//! Connected controllers and the active-device rule
//!
//! Pure bookkeeping: the platform backend reports connects, disconnects and
//! samples; the registry decides which controller the pipeline listens to.

use crate::controller::normalizer::DEFAULT_DEADZONE;
use crate::controller::raw_sample::RawSample;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectedDevice {
    pub slot: usize,
    pub identity: String,
    /// Axis values from the first sample seen, taken as rest positions
    pub rest: Option<Vec<f32>>,
    pub last_sample: Option<RawSample>,
}

impl ConnectedDevice {
    fn new(slot: usize, identity: String) -> Self {
        Self {
            slot,
            identity,
            rest: None,
            last_sample: None,
        }
    }

    fn rest_value(&self, axis: usize) -> f32 {
        self.rest
            .as_ref()
            .and_then(|rest| rest.get(axis).copied())
            .unwrap_or(0.0)
    }

    // Pressed button, or an axis beyond the deadzone that has left its rest
    // position (triggers resting at -1 do not count)
    fn is_fresh(&self, sample: &RawSample, deadzone: f32) -> bool {
        sample.any_button_down()
            || sample
                .axes
                .iter()
                .enumerate()
                .any(|(i, v)| v.abs() > deadzone && (v - self.rest_value(i)).abs() > deadzone)
    }
}

#[derive(Debug)]
pub struct DeviceRegistry {
    devices: BTreeMap<usize, ConnectedDevice>,
    active: Option<usize>,
    focus_lock: Option<usize>,
    deadzone: f32,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_DEADZONE)
    }
}

impl DeviceRegistry {
    pub fn new(deadzone: f32) -> Self {
        Self {
            devices: BTreeMap::new(),
            active: None,
            focus_lock: None,
            deadzone,
        }
    }

    pub fn set_deadzone(&mut self, deadzone: f32) {
        self.deadzone = deadzone;
    }

    /// Registers a controller. The same slot reporting a different identity
    /// is handled as a disconnect followed by a fresh connect.
    pub fn connect(&mut self, slot: usize, identity: impl Into<String>) {
        let identity = identity.into();
        if let Some(existing) = self.devices.get(&slot) {
            if existing.identity == identity {
                return;
            }
            warn!(
                "Slot {} changed from '{}' to '{}', reconnecting",
                slot, existing.identity, identity
            );
            self.disconnect(slot);
        }

        info!("Controller connected at slot {}: {}", slot, identity);
        self.devices.insert(slot, ConnectedDevice::new(slot, identity));

        // While focus is locked only the locked slot may become active
        let allowed = self.focus_lock.map_or(true, |locked| locked == slot);
        if allowed && (self.active.is_none() || self.focus_lock.is_some()) {
            self.set_active(slot);
        }
    }

    pub fn disconnect(&mut self, slot: usize) {
        let Some(device) = self.devices.remove(&slot) else {
            return;
        };
        info!("Controller disconnected from slot {}: {}", slot, device.identity);

        if self.active == Some(slot) {
            self.active = None;
            if self.focus_lock == Some(slot) {
                info!("Locked controller at slot {} gone, waiting for it", slot);
            } else {
                self.fall_back();
            }
        }
    }

    /// Reconciles against the platform's current list of `(slot, identity)`,
    /// catching disconnects the platform never announced.
    pub fn sync<'a>(&mut self, reported: impl IntoIterator<Item = (usize, &'a str)>) {
        let reported: BTreeMap<usize, &str> = reported.into_iter().collect();

        let vanished: Vec<usize> = self
            .devices
            .keys()
            .filter(|slot| !reported.contains_key(slot))
            .copied()
            .collect();
        for slot in vanished {
            debug!("Slot {} no longer reported", slot);
            self.disconnect(slot);
        }

        for (slot, identity) in reported {
            self.connect(slot, identity);
        }
    }

    /// Stores the newest sample for a slot and applies the active-device
    /// switching rule. Samples for unknown slots are dropped.
    pub fn update(&mut self, slot: usize, sample: RawSample) {
        let deadzone = self.deadzone;
        let Some(device) = self.devices.get_mut(&slot) else {
            debug!("Sample for unregistered slot {} dropped", slot);
            return;
        };

        if device.rest.is_none() {
            device.rest = Some(sample.axes.clone());
        }
        let fresh = device.is_fresh(&sample, deadzone);
        device.last_sample = Some(sample);

        if fresh && self.active != Some(slot) && self.focus_lock.is_none() {
            self.set_active(slot);
        }
    }

    /// Pins focus to one slot, suppressing automatic switching. Until that
    /// slot is connected no controller is active.
    pub fn lock_focus(&mut self, slot: usize) {
        info!("Focus locked to slot {}", slot);
        self.focus_lock = Some(slot);
        if self.devices.contains_key(&slot) {
            self.set_active(slot);
        } else {
            self.active = None;
        }
    }

    pub fn unlock_focus(&mut self) {
        if self.focus_lock.take().is_some() {
            info!("Focus unlocked");
            if self.active.is_none() {
                self.fall_back();
            }
        }
    }

    pub fn focus_lock(&self) -> Option<usize> {
        self.focus_lock
    }

    pub fn active_slot(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&ConnectedDevice> {
        self.active.and_then(|slot| self.devices.get(&slot))
    }

    pub fn active_sample(&self) -> Option<&RawSample> {
        self.active().and_then(|device| device.last_sample.as_ref())
    }

    pub fn get(&self, slot: usize) -> Option<&ConnectedDevice> {
        self.devices.get(&slot)
    }

    pub fn devices(&self) -> impl Iterator<Item = &ConnectedDevice> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn fall_back(&mut self) {
        match self.devices.keys().next() {
            Some(&next) => self.set_active(next),
            None => info!("No controllers left"),
        }
    }

    fn set_active(&mut self, slot: usize) {
        if self.active == Some(slot) {
            return;
        }
        if let Some(device) = self.devices.get(&slot) {
            info!("Active controller: slot {} ({})", slot, device.identity);
        }
        self.active = Some(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::raw_sample::ButtonSample;

    fn idle() -> RawSample {
        RawSample::neutral(4, 4)
    }

    fn pressing(button: usize) -> RawSample {
        let mut sample = idle();
        sample.buttons[button] = ButtonSample::new(true, 1.0);
        sample
    }

    fn registry_with_two() -> DeviceRegistry {
        let mut registry = DeviceRegistry::default();
        registry.connect(0, "Pad A");
        registry.connect(1, "Pad B");
        registry.update(0, idle());
        registry.update(1, idle());
        registry
    }

    #[test]
    fn first_controller_becomes_active() {
        let registry = registry_with_two();
        assert_eq!(registry.active_slot(), Some(0));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn fresh_input_switches_active() {
        let mut registry = registry_with_two();
        registry.update(1, pressing(2));
        assert_eq!(registry.active_slot(), Some(1));
        assert_eq!(registry.active().map(|d| d.identity.as_str()), Some("Pad B"));
    }

    #[test]
    fn axis_at_rest_extreme_is_not_fresh() {
        let mut registry = DeviceRegistry::default();
        registry.connect(0, "Pad A");
        registry.connect(1, "Pad B");

        let mut resting = idle();
        resting.axes[2] = -1.0;
        registry.update(1, resting.clone());
        registry.update(1, resting.clone());
        assert_eq!(registry.active_slot(), Some(0));

        let mut pulled = resting;
        pulled.axes[2] = 1.0;
        registry.update(1, pulled);
        assert_eq!(registry.active_slot(), Some(1));
    }

    #[test]
    fn small_axis_noise_is_not_fresh() {
        let mut registry = registry_with_two();
        let mut noisy = idle();
        noisy.axes[0] = 0.3;
        registry.update(1, noisy);
        assert_eq!(registry.active_slot(), Some(0));
    }

    #[test]
    fn focus_lock_suppresses_switching() {
        let mut registry = registry_with_two();
        registry.lock_focus(1);
        assert_eq!(registry.active_slot(), Some(1));
        registry.update(0, pressing(0));
        assert_eq!(registry.active_slot(), Some(1));

        registry.unlock_focus();
        registry.update(0, pressing(1));
        assert_eq!(registry.active_slot(), Some(0));
    }

    #[test]
    fn active_disconnect_falls_back_to_lowest_slot() {
        let mut registry = DeviceRegistry::default();
        registry.connect(3, "Pad C");
        registry.connect(1, "Pad B");
        registry.connect(5, "Pad D");
        registry.update(5, pressing(0));
        assert_eq!(registry.active_slot(), Some(5));
        registry.disconnect(5);
        assert_eq!(registry.active_slot(), Some(1));
        registry.disconnect(1);
        registry.disconnect(3);
        assert_eq!(registry.active_slot(), None);
        assert!(registry.active_sample().is_none());
    }

    #[test]
    fn sync_detects_silent_disconnect() {
        let mut registry = registry_with_two();
        registry.sync([(1, "Pad B")]);
        assert!(registry.get(0).is_none());
        assert_eq!(registry.active_slot(), Some(1));
    }

    #[test]
    fn new_identity_at_same_slot_is_a_reconnect() {
        let mut registry = registry_with_two();
        assert!(registry.get(0).and_then(|d| d.last_sample.as_ref()).is_some());
        registry.sync([(0, "Other Pad"), (1, "Pad B")]);

        let device = registry
            .get(0)
            .map(|d| (d.identity.clone(), d.last_sample.is_none(), d.rest.is_none()));
        assert_eq!(device, Some(("Other Pad".to_string(), true, true)));
        // Slot 0 dropped out, so slot 1 took over before slot 0 came back
        assert_eq!(registry.active_slot(), Some(1));
    }

    #[test]
    fn same_identity_keeps_state() {
        let mut registry = registry_with_two();
        registry.sync([(0, "Pad A"), (1, "Pad B")]);
        assert!(registry.get(0).and_then(|d| d.last_sample.as_ref()).is_some());
        assert_eq!(registry.active_slot(), Some(0));
    }

    #[test]
    fn samples_for_unknown_slots_are_dropped() {
        let mut registry = DeviceRegistry::default();
        registry.update(7, pressing(0));
        assert!(registry.is_empty());
        assert_eq!(registry.active_slot(), None);
    }

    #[test]
    fn locked_slot_takes_focus_when_it_connects() {
        let mut registry = DeviceRegistry::default();
        registry.lock_focus(2);
        registry.connect(0, "Pad A");
        registry.update(0, pressing(0));
        assert_eq!(registry.active_slot(), None);
        registry.connect(2, "Pad C");
        assert_eq!(registry.active_slot(), Some(2));
    }

    #[test]
    fn locked_disconnect_leaves_no_active_controller() {
        let mut registry = registry_with_two();
        registry.lock_focus(0);
        registry.disconnect(0);
        assert_eq!(registry.active_slot(), None);
        assert!(registry.active_sample().is_none());

        // Other pads cannot take over while the lock holds
        registry.update(1, pressing(3));
        assert_eq!(registry.active_slot(), None);

        registry.connect(0, "Pad A");
        assert_eq!(registry.active_slot(), Some(0));
    }

    #[test]
    fn unlock_falls_back_when_nothing_is_active() {
        let mut registry = registry_with_two();
        registry.lock_focus(0);
        registry.disconnect(0);
        registry.unlock_focus();
        assert_eq!(registry.active_slot(), Some(1));
    }
}
