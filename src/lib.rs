//! padscript: syllable typing with a dual-stick game controller
//!
//! Raw controller samples flow through the pipeline once per polling tick:
//!
//! ```text
//! DevicePoller ──► DeviceRegistry ──► normalize ──► GestureEngine ──► text
//!                        │                ▲
//!                        ▼                │
//!               CalibrationSession ──► MappingTable ◄──► PersistenceManager
//! ```
//!
//! [`session::TypingSession`] ties the pieces together for one caller.

pub mod calibration;
pub mod controller;
pub mod gesture;
pub mod mapping;
pub mod persistence;
pub mod session;
