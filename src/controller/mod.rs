//! Controller subsystem for gamepad input handling
//!
//! Implements the input half of the pipeline:
//!
//! 1. [`event_collector`] - gilrs backend producing one [`RawSample`] per pad per tick
//! 2. [`device_registry`] - connected pads and the active-device rule
//! 3. [`normalizer`] - raw sample + mapping into a [`NormalizedFrame`]
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Poller ──► Registry ──► Normalizer ──► NormalizedFrame
//!            (RawSample)  (active pad)  (MappingEntry)
//! ```

pub mod device_registry;
pub mod event_collector;
pub mod normalizer;
pub mod raw_sample;

pub use device_registry::{ConnectedDevice, DeviceRegistry};
pub use normalizer::{normalize, NormalizedFrame, Sector, Stick, StickState};
pub use raw_sample::{ButtonSample, RawSample};
