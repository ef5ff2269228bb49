//! Device discovery via UDP broadcast.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use serde_json::json;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::capabilities::{Capabilities, SystemConfigResponse};
use crate::errors::Error;
use crate::registry::{BulbRecord, DeviceRegistry, UpsertOutcome};
use crate::state::BulbState;
use crate::subnet::SubnetConfig;

type Result<T> = std::result::Result<T, Error>;

/// UDP port Wiz bulbs listen on.
pub const WIZ_PORT: u16 = 38899;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const RECV_SLICE: Duration = Duration::from_millis(500);

/// Parameters for one discovery pass. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    /// Broadcast address the probe is sent to
    pub broadcast: Ipv4Addr,
    /// Destination port (the Wiz port unless overridden)
    pub port: u16,
    /// Wall-clock bound for the whole pass
    pub timeout: Duration,
    /// Stop early once this many distinct bulbs have answered
    pub expected: Option<usize>,
}

impl DiscoveryRequest {
    pub fn new(broadcast: Ipv4Addr) -> Self {
        DiscoveryRequest {
            broadcast,
            port: WIZ_PORT,
            timeout: DEFAULT_TIMEOUT,
            expected: None,
        }
    }

    /// Build a request targeting the broadcast address of `subnet`.
    pub fn for_subnet(subnet: &SubnetConfig) -> Self {
        Self::new(subnet.broadcast())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_expected(mut self, expected: usize) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// One bulb seen during a discovery pass, with its registry outcome.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub record: BulbRecord,
    pub outcome: UpsertOutcome,
}

/// Runs discovery passes and reconciles the results into the registry.
///
/// At most one pass runs at a time: a trigger arriving while a pass is
/// in flight is dropped, so a slow network cannot pile up overlapping
/// broadcasts.
pub struct DiscoveryEngine {
    registry: Arc<DeviceRegistry>,
    in_flight: AtomicBool,
}

impl DiscoveryEngine {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        DiscoveryEngine {
            registry,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Perform one discovery pass.
    ///
    /// Broadcasts a `getSystemConfig` probe and collects replies until
    /// the timeout elapses (or `expected` bulbs have answered). Each
    /// parseable reply is upserted into the registry; malformed replies
    /// are skipped. Replies arriving after the deadline are discarded
    /// with the probe socket.
    ///
    /// Returns `DiscoveryFailure` only for a whole-pass transport fault
    /// (bind/send). A silent network is an empty result, not an error.
    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<Vec<Discovered>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("discovery pass already in flight; dropping trigger");
            return Ok(Vec::new());
        }

        let result = self.run_pass(request).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pass(&self, request: &DiscoveryRequest) -> Result<Vec<Discovered>> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::discovery("bind", e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| Error::discovery("set_broadcast", e))?;

        let probe = json!({"method": "getSystemConfig", "params": {}});
        let probe_bytes = serde_json::to_vec(&probe).map_err(Error::JsonDump)?;

        let target = SocketAddr::from((request.broadcast, request.port));
        socket
            .send_to(&probe_bytes, target)
            .await
            .map_err(|e| Error::discovery("send_to", e))?;
        debug!("discovery probe sent to {target}");

        let mut seen: HashMap<String, Discovered> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let deadline = Instant::now() + request.timeout;
        let mut buffer = [0u8; 4096];

        while Instant::now() < deadline {
            let slice = RECV_SLICE.min(deadline - Instant::now());
            let (size, addr) =
                match tokio::time::timeout(slice, socket.recv_from(&mut buffer)).await {
                    Ok(Ok(received)) => received,
                    // Slice elapsed or transient recv error; keep going
                    // until the overall deadline.
                    Ok(Err(_)) | Err(_) => continue,
                };

            let SocketAddr::V4(v4) = addr else { continue };
            let Some(record) = parse_reply(&buffer[..size], *v4.ip()) else {
                debug!("skipping unparseable discovery reply from {addr}");
                continue;
            };

            let mac = record.mac.clone();
            let outcome = self.registry.upsert(record.clone());
            if seen
                .insert(mac.clone(), Discovered { record, outcome })
                .is_none()
            {
                order.push(mac);
            }

            if let Some(expected) = request.expected
                && seen.len() >= expected
            {
                break;
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|mac| seen.remove(&mac))
            .collect())
    }
}

fn parse_reply(bytes: &[u8], addr: Ipv4Addr) -> Option<BulbRecord> {
    let text = std::str::from_utf8(bytes).ok()?;
    let response: SystemConfigResponse = serde_json::from_str(text).ok()?;
    if response.method != "getSystemConfig" || response.result.mac.is_empty() {
        return None;
    }

    let capabilities = Capabilities::from(&response.result);
    let mut record = BulbRecord::new(&response.result.mac, addr, capabilities);
    if let Some(state) = response.result.state {
        record = record.with_state(BulbState::powered(state));
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::BulbClass;

    /// Fake bulb on loopback answering getSystemConfig probes.
    async fn spawn_bulb(mac: &str, module: &str, delay: Option<Duration>) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let reply = json!({
            "method": "getSystemConfig",
            "result": {"mac": mac, "moduleName": module, "fwVersion": "1.25.0", "state": true}
        })
        .to_string();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while let Ok((_, from)) = socket.recv_from(&mut buf).await {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                socket.send_to(reply.as_bytes(), from).await.ok();
            }
        });
        addr
    }

    fn request_for(addr: SocketAddr, timeout: Duration) -> DiscoveryRequest {
        let mut request = DiscoveryRequest::new(Ipv4Addr::LOCALHOST).with_timeout(timeout);
        request.port = addr.port();
        request
    }

    #[tokio::test]
    async fn test_discover_upserts_without_duplicates() {
        let registry = Arc::new(DeviceRegistry::new());
        let engine = DiscoveryEngine::new(Arc::clone(&registry));
        let bulb = spawn_bulb("a8bb50aabbcc", "ESP01_SHRGB1C_31", None).await;
        let request = request_for(bulb, Duration::from_secs(1)).with_expected(1);

        let first = engine.discover(&request).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].outcome, UpsertOutcome::Created);
        assert_eq!(first[0].record.capabilities.class, BulbClass::RGB);

        let second = engine.discover(&request).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].outcome, UpsertOutcome::Updated);

        assert_eq!(registry.len(), 1);
        let stored = registry.get("a8bb50aabbcc").unwrap();
        assert_eq!(stored.addr, Ipv4Addr::LOCALHOST);
        assert!(stored.state.unwrap().emitting());
    }

    #[tokio::test]
    async fn test_late_response_is_discarded() {
        let registry = Arc::new(DeviceRegistry::new());
        let engine = DiscoveryEngine::new(Arc::clone(&registry));
        let bulb =
            spawn_bulb("a8bb50ddeeff", "ESP01_SHRGB1C_31", Some(Duration::from_millis(400))).await;
        let request = request_for(bulb, Duration::from_millis(150));

        let found = engine.discover(&request).await.unwrap();
        assert!(found.is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_replies_are_skipped() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (_, from) = socket.recv_from(&mut buf).await.unwrap();
            socket.send_to(b"not json at all", from).await.ok();
            let valid = json!({
                "method": "getSystemConfig",
                "result": {"mac": "a8bb50001122", "moduleName": "ESP56_SHTW3_01"}
            })
            .to_string();
            socket.send_to(valid.as_bytes(), from).await.ok();
        });

        let registry = Arc::new(DeviceRegistry::new());
        let engine = DiscoveryEngine::new(Arc::clone(&registry));
        let request = request_for(addr, Duration::from_secs(1)).with_expected(1);

        let found = engine.discover(&request).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record.mac, "a8bb50001122");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_dropped() {
        let registry = Arc::new(DeviceRegistry::new());
        let engine = DiscoveryEngine::new(registry);
        engine.in_flight.store(true, Ordering::SeqCst);

        let request =
            DiscoveryRequest::new(Ipv4Addr::LOCALHOST).with_timeout(Duration::from_millis(50));
        let found = engine.discover(&request).await.unwrap();
        assert!(found.is_empty());

        // Guard is still owned by the "running" pass.
        assert!(engine.in_flight.load(Ordering::SeqCst));
    }
}
