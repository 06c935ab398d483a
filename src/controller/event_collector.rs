use crate::controller::device_registry::DeviceRegistry;
use crate::controller::raw_sample::{ButtonSample, RawSample};
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tracing::{error, info, trace, warn};

// Button order of the standard layout; a button's position is its index
const BUTTON_ORDER: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

// Axis order of the standard layout; D-pad axes sit at 6 and 7
const AXIS_ORDER: [Axis; 8] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
    Axis::DPadX,
    Axis::DPadY,
];

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),
}

// Poller states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Initializing,
    Polling,
}

#[machine]
#[derive(Debug)]
pub struct DevicePoller<S: PollerState> {
    // Gilrs context
    gilrs: Gilrs,

    // Events drained since startup, for the periodic stats line
    event_count: u64,
}

// Implementation for Initializing state
impl DevicePoller<Initializing> {
    pub fn create() -> Result<Self, CollectorError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, 0))
    }

    // Register pads that were plugged in before startup and start polling
    pub fn initialize(self, registry: &mut DeviceRegistry) -> DevicePoller<Polling> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (id, gamepad) in &gamepads {
                registry.connect(usize::from(*id), identity(gamepad));
            }
        }

        info!("Device poller initialized, transitioning to Polling state");
        self.transition()
    }
}

// Implementation for Polling state
impl DevicePoller<Polling> {
    /// Drains pending platform events into the registry, reconciles the
    /// connected list and stores a fresh sample for every pad.
    pub fn poll(&mut self, registry: &mut DeviceRegistry) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            self.event_count += 1;
            let slot = usize::from(id);
            match event {
                EventType::Connected => {
                    let gamepad = self.gilrs.gamepad(id);
                    registry.connect(slot, identity(&gamepad));
                }
                EventType::Disconnected => {
                    warn!("Controller disconnected event for slot {}", slot);
                    registry.disconnect(slot);
                }
                _ => {}
            }
        }

        let connected: Vec<(usize, String)> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, gamepad)| (usize::from(id), identity(&gamepad)))
            .collect();
        registry.sync(connected.iter().map(|(slot, name)| (*slot, name.as_str())));

        for (id, gamepad) in self.gilrs.gamepads() {
            if gamepad.is_connected() {
                registry.update(usize::from(id), snapshot(&gamepad));
            }
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}

/// `"Name (Vendor: 045e Product: 028e)"`, or just the name when the
/// platform does not expose ids.
pub fn identity(gamepad: &Gamepad<'_>) -> String {
    match (gamepad.vendor_id(), gamepad.product_id()) {
        (Some(vendor), Some(product)) => format!(
            "{} (Vendor: {:04x} Product: {:04x})",
            gamepad.name(),
            vendor,
            product
        ),
        _ => gamepad.name().to_string(),
    }
}

// Current state of one pad in standard layout order. Y axes are flipped so
// that down is positive, matching raw driver reports.
fn snapshot(gamepad: &Gamepad<'_>) -> RawSample {
    let buttons = BUTTON_ORDER
        .iter()
        .map(|button| match gamepad.button_data(*button) {
            Some(data) => ButtonSample::new(data.is_pressed(), data.value()),
            None => ButtonSample::released(),
        })
        .collect();

    let axes = AXIS_ORDER
        .iter()
        .map(|axis| {
            let value = gamepad.value(*axis);
            match axis {
                Axis::LeftStickY | Axis::RightStickY | Axis::DPadY => -value,
                _ => value,
            }
        })
        .collect();

    let sample = RawSample::new(buttons, axes);
    trace!("Snapshot of '{}': {:?}", gamepad.name(), sample);
    sample
}
