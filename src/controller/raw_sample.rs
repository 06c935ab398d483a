//! Raw per-frame controller snapshots
//!
//! A [`RawSample`] is what the platform hands us once per polling tick: the
//! physical buttons and axes in the order the driver reports them, before any
//! logical meaning has been attached.

use crate::mapping::{InputSource, Sign};

/// Threshold above which an analog button value or axis reads as "pressed".
pub const PRESS_THRESHOLD: f32 = 0.5;

/// One physical button as reported by the platform
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ButtonSample {
    pub pressed: bool,
    /// Analog value, 0.0..=1.0
    pub value: f32,
}

impl ButtonSample {
    pub fn new(pressed: bool, value: f32) -> Self {
        Self { pressed, value }
    }

    pub fn released() -> Self {
        Self::default()
    }

    pub fn is_down(&self) -> bool {
        self.pressed || self.value > PRESS_THRESHOLD
    }
}

/// Snapshot of one physical controller for a single tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSample {
    pub buttons: Vec<ButtonSample>,
    /// Axis values, -1.0..=1.0
    pub axes: Vec<f32>,
}

impl RawSample {
    pub fn new(buttons: Vec<ButtonSample>, axes: Vec<f32>) -> Self {
        Self { buttons, axes }
    }

    /// A sample with `buttons` released buttons and `axes` centered axes.
    pub fn neutral(buttons: usize, axes: usize) -> Self {
        Self {
            buttons: vec![ButtonSample::released(); buttons],
            axes: vec![0.0; axes],
        }
    }

    pub fn button(&self, index: usize) -> Option<&ButtonSample> {
        self.buttons.get(index)
    }

    pub fn axis(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }

    pub fn button_down(&self, index: usize) -> bool {
        self.button(index).is_some_and(ButtonSample::is_down)
    }

    /// Reads a mapped source as a boolean button.
    ///
    /// Hat sources are accepted by the grammar but never resolved against live
    /// input, so they always read as released.
    pub fn source_down(&self, source: &InputSource) -> bool {
        match *source {
            InputSource::Button(index) => self.button_down(index as usize),
            InputSource::Axis(index) => self
                .axis(index as usize)
                .is_some_and(|v| v.abs() > PRESS_THRESHOLD),
            InputSource::SignedAxis { axis, sign } => self
                .axis(axis as usize)
                .is_some_and(|v| sign.apply(v) > PRESS_THRESHOLD),
            InputSource::Hat { .. } => false,
        }
    }

    /// Reads a mapped source as a continuous value in the source's native range.
    pub fn source_value(&self, source: &InputSource) -> Option<f32> {
        match *source {
            InputSource::Button(index) => self.button(index as usize).map(|b| b.value),
            InputSource::Axis(index) => self.axis(index as usize),
            InputSource::SignedAxis { axis, .. } => self.axis(axis as usize),
            InputSource::Hat { .. } => None,
        }
    }

    /// Reads a mapped source as a 0..1 trigger intensity.
    pub fn source_intensity(&self, source: &InputSource) -> f32 {
        match *source {
            InputSource::Button(index) => self.button(index as usize).map_or(0.0, |b| b.value),
            InputSource::Axis(index) => self
                .axis(index as usize)
                .map_or(0.0, |v| ((v + 1.0) / 2.0).clamp(0.0, 1.0)),
            InputSource::SignedAxis { axis, sign } => self
                .axis(axis as usize)
                .map_or(0.0, |v| sign.apply(v).clamp(0.0, 1.0)),
            InputSource::Hat { .. } => 0.0,
        }
    }

    pub fn any_button_down(&self) -> bool {
        self.buttons.iter().any(|b| b.pressed)
    }
}
