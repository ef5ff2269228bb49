//! Bulb metadata and capability detection.

use serde::{Deserialize, Serialize};

use crate::types::Kelvin;

/// System configuration of a Wiz bulb, as reported by `getSystemConfig`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub mac: String,
    #[serde(default)]
    pub home_id: Option<u64>,
    #[serde(default)]
    pub room_id: Option<u64>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub fw_version: Option<String>,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default)]
    pub type_id: Option<u32>,
    #[serde(default)]
    pub state: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub(crate) struct SystemConfigResponse {
    pub method: String,
    pub result: SystemConfig,
}

/// Classification of Wiz bulb types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulbClass {
    /// Tunable white
    TW,
    /// Dimmable white
    DW,
    /// Full color
    RGB,
    /// Smart socket (on/off only)
    Socket,
}

/// Color temperature range (Kelvin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KelvinRange {
    pub min: u16,
    pub max: u16,
}

impl Default for KelvinRange {
    fn default() -> Self {
        KelvinRange {
            min: Kelvin::MIN,
            max: Kelvin::MAX,
        }
    }
}

/// Features a discovered bulb supports, derived from its module name.
///
/// Command validation checks requested attributes against these flags
/// before anything is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub dimming: bool,
    pub color: bool,
    pub color_temp: bool,
    pub kelvin_range: KelvinRange,
    pub class: BulbClass,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            dimming: false,
            color: false,
            color_temp: false,
            kelvin_range: KelvinRange::default(),
            class: BulbClass::DW,
        }
    }
}

impl Capabilities {
    /// Parse capabilities from a module name (e.g., "ESP01_SHRGB1C_31").
    ///
    /// The second underscore-separated segment of the module name encodes
    /// the hardware class. Unrecognized names fall back to dimmable white,
    /// the least capable light class.
    pub fn from_module_name(module_name: &str) -> Self {
        let mut caps = Capabilities::default();
        let parts: Vec<&str> = module_name.split('_').collect();

        if let Some(type_part) = parts.get(1) {
            if type_part.contains("RGB") {
                caps.class = BulbClass::RGB;
                caps.color = true;
                caps.color_temp = true;
                caps.dimming = true;
                caps.kelvin_range = KelvinRange { min: 2200, max: 6500 };
            } else if type_part.contains("TW") {
                caps.class = BulbClass::TW;
                caps.color_temp = true;
                caps.dimming = true;
                caps.kelvin_range = KelvinRange { min: 2700, max: 6500 };
            } else if type_part.contains("SOCKET") {
                caps.class = BulbClass::Socket;
            } else if type_part.contains("DW") || type_part.contains("SHDW") {
                caps.class = BulbClass::DW;
                caps.dimming = true;
            } else {
                caps.dimming = true;
            }
        }

        caps
    }
}

impl From<&SystemConfig> for Capabilities {
    fn from(config: &SystemConfig) -> Self {
        config
            .module_name
            .as_deref()
            .map(Capabilities::from_module_name)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_module() {
        let caps = Capabilities::from_module_name("ESP01_SHRGB1C_31");
        assert_eq!(caps.class, BulbClass::RGB);
        assert!(caps.color);
        assert!(caps.color_temp);
        assert!(caps.dimming);
        assert_eq!(caps.kelvin_range.min, 2200);
    }

    #[test]
    fn test_tunable_white_module() {
        let caps = Capabilities::from_module_name("ESP56_SHTW3_01");
        assert_eq!(caps.class, BulbClass::TW);
        assert!(!caps.color);
        assert!(caps.color_temp);
        assert!(caps.dimming);
    }

    #[test]
    fn test_dimmable_white_module() {
        let caps = Capabilities::from_module_name("ESP06_SHDW1_01");
        assert_eq!(caps.class, BulbClass::DW);
        assert!(!caps.color);
        assert!(!caps.color_temp);
        assert!(caps.dimming);
    }

    #[test]
    fn test_socket_module() {
        let caps = Capabilities::from_module_name("ESP10_SOCKET_06");
        assert_eq!(caps.class, BulbClass::Socket);
        assert!(!caps.dimming);
        assert!(!caps.color);
    }

    #[test]
    fn test_system_config_parse() {
        let raw = r#"{"method":"getSystemConfig","result":{"mac":"a8bb50123456","homeId":1,"moduleName":"ESP01_SHRGB1C_31","fwVersion":"1.25.0"}}"#;
        let resp: SystemConfigResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.result.mac, "a8bb50123456");
        let caps = Capabilities::from(&resp.result);
        assert_eq!(caps.class, BulbClass::RGB);
    }
}
