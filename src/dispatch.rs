//! Command dispatch to discovered bulbs.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};

use crate::capabilities::Capabilities;
use crate::errors::Error;
use crate::payload::Payload;
use crate::registry::DeviceRegistry;
use crate::transport::{Transport, TransportError, UdpTransport};
use crate::types::{Brightness, Color, Kelvin, PowerMode};

type Result<T> = std::result::Result<T, Error>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A host-issued command for a single known bulb. Ephemeral.
#[derive(Debug, Clone, Default)]
pub struct CommandRequest {
    /// MAC address of the target bulb
    pub mac: String,
    pub power: Option<PowerMode>,
    pub brightness: Option<Brightness>,
    pub color: Option<Color>,
    pub temp: Option<Kelvin>,
}

impl CommandRequest {
    pub fn new(mac: &str) -> Self {
        CommandRequest {
            mac: mac.to_string(),
            ..Default::default()
        }
    }

    pub fn power(mut self, power: PowerMode) -> Self {
        self.power = Some(power);
        self
    }

    pub fn brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn temp(mut self, temp: Kelvin) -> Self {
        self.temp = Some(temp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_none()
            && self.brightness.is_none()
            && self.color.is_none()
            && self.temp.is_none()
    }
}

/// Positive acknowledgment of a dispatched command.
#[derive(Debug, Clone)]
pub struct Ack {
    pub mac: String,
    pub addr: std::net::Ipv4Addr,
    /// The payload the bulb confirmed
    pub applied: Payload,
}

/// Applies a single command to a single known bulb.
///
/// Each [`dispatch`](CommandDispatcher::dispatch) call makes exactly one
/// attempt plus at most one automatic retry after a timeout; there is no
/// queueing or batching. The registry is only touched for the initial
/// lookup and the final state update, never while the network wait is in
/// progress.
pub struct CommandDispatcher<T: Transport = UdpTransport> {
    registry: Arc<DeviceRegistry>,
    transport: T,
    timeout: Duration,
}

impl CommandDispatcher<UdpTransport> {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self::with_transport(registry, UdpTransport)
    }
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn with_transport(registry: Arc<DeviceRegistry>, transport: T) -> Self {
        CommandDispatcher {
            registry,
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dispatch one command and await the bulb's acknowledgment.
    ///
    /// Fails fast without any network send on an unknown MAC, an empty
    /// request, or an attribute the bulb's capabilities exclude. A
    /// timeout is retried once, then surfaced as `DeviceUnreachable`;
    /// any other transport fault is `DeviceError` with no retry. On
    /// acknowledgment the registry's cached state is updated exactly
    /// once.
    pub async fn dispatch(&self, request: &CommandRequest) -> Result<Ack> {
        let record = self
            .registry
            .get(&request.mac)
            .map_err(|_| Error::UnknownDevice(request.mac.clone()))?;

        let payload = build_payload(request, &record.capabilities)?;
        let msg = json!({
            "method": "setPilot",
            "params": serde_json::to_value(&payload).map_err(Error::JsonDump)?,
        });
        let bytes = serde_json::to_vec(&msg).map_err(Error::JsonDump)?;
        let addr = std::net::SocketAddr::from((record.addr, crate::discovery::WIZ_PORT));

        let mut retried = false;
        loop {
            match self.transport.request(addr, &bytes, self.timeout).await {
                Ok(reply) => {
                    self.check_ack(&request.mac, record.addr, &reply)?;
                    self.registry.apply_payload(&request.mac, &payload)?;
                    return Ok(Ack {
                        mac: request.mac.clone(),
                        addr: record.addr,
                        applied: payload,
                    });
                }
                Err(TransportError::Timeout) if !retried => {
                    debug!("command to {} timed out; retrying once", request.mac);
                    retried = true;
                }
                Err(TransportError::Timeout) => {
                    return Err(Error::unreachable(&request.mac, record.addr));
                }
                // The device is likely gone (refused, unreachable);
                // retrying would be wasteful.
                Err(TransportError::Io(err)) => {
                    return Err(Error::device(&request.mac, record.addr, err));
                }
            }
        }
    }

    fn check_ack(&self, mac: &str, addr: std::net::Ipv4Addr, reply: &[u8]) -> Result<()> {
        let value: Value = serde_json::from_slice(reply).map_err(Error::JsonLoad)?;
        let success = value
            .get("result")
            .and_then(|r| r.get("success"))
            .and_then(|s| s.as_bool())
            .unwrap_or(false);
        if success {
            Ok(())
        } else {
            debug!("negative ack from {mac}: {value}");
            Err(Error::device(
                mac,
                addr,
                std::io::Error::other("negative acknowledgment"),
            ))
        }
    }
}

fn build_payload(request: &CommandRequest, caps: &Capabilities) -> Result<Payload> {
    if request.is_empty() {
        return Err(Error::EmptyCommand);
    }

    let mut payload = Payload::new();
    if let Some(power) = request.power {
        payload.power(power);
    }
    if let Some(brightness) = request.brightness {
        if !caps.dimming {
            return Err(Error::unsupported(&request.mac, "dimming"));
        }
        payload.brightness(brightness);
    }
    if let Some(color) = request.color {
        if !caps.color {
            return Err(Error::unsupported(&request.mac, "color"));
        }
        payload.color(color);
    }
    if let Some(temp) = request.temp {
        if !caps.color_temp {
            return Err(Error::unsupported(&request.mac, "color temperature"));
        }
        let range = caps.kelvin_range;
        if !(range.min..=range.max).contains(&temp.kelvin()) {
            return Err(Error::unsupported(
                &request.mac,
                &format!("{}K (supported {}-{}K)", temp.kelvin(), range.min, range.max),
            ));
        }
        payload.temp(temp);
    }
    Ok(payload)
}
