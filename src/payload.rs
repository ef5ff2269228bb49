//! Wire payload for the `setPilot` bulb command.

use serde::{Deserialize, Serialize};

use crate::types::{Brightness, Color, Kelvin, PowerMode};

/// Attribute payload sent to a bulb in a single `setPilot` command.
///
/// Payloads can combine power, brightness, color, and color temperature;
/// the bulb applies all set attributes at once. Field names follow the
/// Wiz UDP JSON schema.
///
/// # Creating Payloads
///
/// 1. **From a single attribute** using the [`From`] trait:
///    ```
///    use wiz_bridge_rs::{Payload, PowerMode};
///    let payload = Payload::from(PowerMode::On);
///    ```
///
/// 2. **Builder pattern** for combining multiple attributes:
///    ```
///    use std::str::FromStr;
///    use wiz_bridge_rs::{Payload, Brightness, Color};
///    let mut payload = Payload::new();
///    payload.brightness(Brightness::create(80).unwrap());
///    payload.color(Color::from_str("255,128,0").unwrap());
///    ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Payload {
    pub(crate) state: Option<bool>,
    pub(crate) dimming: Option<u8>,
    pub(crate) temp: Option<u16>,
    #[serde(rename = "r")]
    pub(crate) red: Option<u8>,
    #[serde(rename = "g")]
    pub(crate) green: Option<u8>,
    #[serde(rename = "b")]
    pub(crate) blue: Option<u8>,
}

impl Payload {
    /// Minimum dimming value the bulb firmware accepts.
    const DIMMING_FLOOR: u8 = 10;

    /// Create a new empty payload.
    ///
    /// At least one attribute must be set for the payload to be valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiz_bridge_rs::Payload;
    ///
    /// let payload = Payload::new();
    /// assert_eq!(payload.is_valid(), false);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this payload contains at least one attribute.
    pub fn is_valid(&self) -> bool {
        self.state.is_some()
            || self.dimming.is_some()
            || self.temp.is_some()
            || (self.red.is_some() && self.green.is_some() && self.blue.is_some())
    }

    /// Set the power state.
    pub fn power(&mut self, power: PowerMode) {
        self.state = Some(power.as_state());
    }

    /// Set the brightness level.
    ///
    /// Values below the firmware floor of 10% are raised to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiz_bridge_rs::{Payload, Brightness};
    ///
    /// let mut payload = Payload::new();
    /// payload.brightness(Brightness::create(100).unwrap());
    /// assert_eq!(payload.is_valid(), true);
    /// ```
    pub fn brightness(&mut self, brightness: Brightness) {
        self.dimming = Some(brightness.value.max(Self::DIMMING_FLOOR));
    }

    /// Set the color temperature.
    pub fn temp(&mut self, temp: Kelvin) {
        self.temp = Some(temp.kelvin);
    }

    /// Set the RGB color.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use wiz_bridge_rs::{Payload, Color};
    ///
    /// let mut payload = Payload::new();
    /// payload.color(Color::from_str("255,255,255").unwrap());
    /// assert_eq!(payload.is_valid(), true);
    /// ```
    pub fn color(&mut self, color: Color) {
        self.red = Some(color.red);
        self.green = Some(color.green);
        self.blue = Some(color.blue);
    }

    pub(crate) fn get_color(&self) -> Option<Color> {
        match (self.red, self.green, self.blue) {
            (Some(r), Some(g), Some(b)) => Some(Color::rgb(r, g, b)),
            _ => None,
        }
    }
}

impl From<PowerMode> for Payload {
    fn from(power: PowerMode) -> Self {
        let mut p = Payload::new();
        p.power(power);
        p
    }
}

impl From<Brightness> for Payload {
    fn from(brightness: Brightness) -> Self {
        let mut p = Payload::new();
        p.brightness(brightness);
        p
    }
}

impl From<Color> for Payload {
    fn from(color: Color) -> Self {
        let mut p = Payload::new();
        p.color(color);
        p
    }
}

impl From<Kelvin> for Payload {
    fn from(kelvin: Kelvin) -> Self {
        let mut p = Payload::new();
        p.temp(kelvin);
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_wire_names() {
        let mut payload = Payload::new();
        payload.power(PowerMode::On);
        payload.brightness(Brightness::create(80).unwrap());
        payload.color(Color::rgb(255, 0, 64));

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({"state": true, "dimming": 80, "r": 255, "g": 0, "b": 64})
        );
    }

    #[test]
    fn test_dimming_floor() {
        let mut payload = Payload::new();
        payload.brightness(Brightness::create(3).unwrap());
        assert_eq!(payload.dimming, Some(10));
    }

    #[test]
    fn test_empty_payload_is_invalid() {
        assert!(!Payload::new().is_valid());
        assert!(Payload::from(PowerMode::Off).is_valid());
    }
}
