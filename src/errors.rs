use std::net::Ipv4Addr;

/// All error types that can occur while discovering or commanding Wiz bulbs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// The configured subnet string is not valid CIDR notation.
    #[error("invalid subnet config {input:?}: {reason}")]
    InvalidSubnetConfig { input: String, reason: String },

    /// A whole discovery pass failed at the transport level.
    #[error("discovery {action} error: {err:?}")]
    DiscoveryFailure { action: String, err: std::io::Error },

    /// Registry lookup for an unknown hardware identifier.
    #[error("no record for device {0}")]
    NotFound(String),

    /// A command referenced a device the registry has never seen.
    #[error("unknown device {0}")]
    UnknownDevice(String),

    /// A command requested a feature the target bulb does not support.
    #[error("device {mac} does not support {capability}")]
    UnsupportedCapability { mac: String, capability: String },

    /// A command carried no attribute to apply.
    #[error("empty command; no attributes set")]
    EmptyCommand,

    /// The device did not acknowledge within the timeout (after retry).
    #[error("device {mac} at {addr} unreachable")]
    DeviceUnreachable { mac: String, addr: Ipv4Addr },

    /// A non-timeout transport fault while commanding a device.
    #[error("device {mac} at {addr} error: {err:?}")]
    DeviceError {
        mac: String,
        addr: Ipv4Addr,
        err: std::io::Error,
    },
}

impl Error {
    /// Create a new invalid subnet config error
    pub fn invalid_subnet(input: &str, reason: &str) -> Self {
        Error::InvalidSubnetConfig {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new discovery failure error
    pub fn discovery(action: &str, err: std::io::Error) -> Self {
        Error::DiscoveryFailure {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new unsupported capability error
    pub fn unsupported(mac: &str, capability: &str) -> Self {
        Error::UnsupportedCapability {
            mac: mac.to_string(),
            capability: capability.to_string(),
        }
    }

    /// Create a new device unreachable error
    pub fn unreachable(mac: &str, addr: Ipv4Addr) -> Self {
        Error::DeviceUnreachable {
            mac: mac.to_string(),
            addr,
        }
    }

    /// Create a new device error
    pub fn device(mac: &str, addr: Ipv4Addr, err: std::io::Error) -> Self {
        Error::DeviceError {
            mac: mac.to_string(),
            addr,
            err,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
