//! Last-confirmed bulb state tracking.

use serde::{Deserialize, Serialize};

use crate::payload::Payload;
use crate::types::{Brightness, Color, Kelvin};

/// The last confirmed power/brightness/color values for a bulb.
///
/// A registry record with no `BulbState` at all is in the "unknown"
/// state; once any state is confirmed, individual fields are only ever
/// overwritten by newer confirmed values, never cleared.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BulbState {
    emitting: bool,
    brightness: Option<Brightness>,
    color: Option<Color>,
    temp: Option<Kelvin>,
}

impl BulbState {
    /// State for a bulb whose only known attribute is its power state.
    pub fn powered(emitting: bool) -> Self {
        BulbState {
            emitting,
            brightness: None,
            color: None,
            temp: None,
        }
    }

    /// Check if the bulb is emitting light.
    pub fn emitting(&self) -> bool {
        self.emitting
    }

    /// Get the last confirmed brightness.
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    /// Get the last confirmed color.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Get the last confirmed color temperature.
    pub fn temp(&self) -> Option<Kelvin> {
        self.temp
    }

    /// Update this state with values from another state.
    ///
    /// Fields set in `other` overwrite fields in `self`; fields absent in
    /// `other` keep their previous value.
    pub fn update(&mut self, other: &Self) {
        self.emitting = other.emitting;
        if let Some(brightness) = other.brightness {
            self.brightness = Some(brightness);
        }
        if let Some(color) = other.color {
            self.color = Some(color);
        }
        if let Some(temp) = other.temp {
            self.temp = Some(temp);
        }
    }

    pub(crate) fn update_from_payload(&mut self, payload: &Payload) {
        if let Some(state) = payload.state {
            self.emitting = state;
        }
        if let Some(dimming) = payload.dimming {
            self.brightness = Brightness::create(dimming);
        }
        if let Some(color) = payload.get_color() {
            self.color = Some(color);
        }
        if let Some(temp) = payload.temp {
            self.temp = Kelvin::create(temp);
        }
    }
}

impl From<&Payload> for BulbState {
    fn from(payload: &Payload) -> Self {
        BulbState {
            // A bulb that accepted an attribute change is emitting unless
            // the payload said otherwise.
            emitting: payload.state.unwrap_or(true),
            brightness: payload.dimming.and_then(Brightness::create),
            color: payload.get_color(),
            temp: payload.temp.and_then(Kelvin::create),
        }
    }
}
