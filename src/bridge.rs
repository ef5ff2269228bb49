//! Host-facing callback surface.
//!
//! The host automation framework owns the scheduler: it calls
//! [`WizBridge::on_heartbeat`] at its configured cadence and
//! [`WizBridge::on_command`] for user commands. The bridge owns the
//! registry, the discovery engine, and the dispatcher, and reports
//! device sightings back through [`HostEvents`]. No error escapes a
//! callback as a panic.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::discovery::{DiscoveryEngine, DiscoveryRequest, WIZ_PORT};
use crate::dispatch::{Ack, CommandDispatcher, CommandRequest};
use crate::errors::Error;
use crate::registry::{BulbRecord, DeviceRegistry, UpsertOutcome};
use crate::subnet::SubnetConfig;
use crate::transport::{Transport, UdpTransport};

type Result<T> = std::result::Result<T, Error>;

const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Notifications the bridge raises back to the host.
///
/// All methods default to no-ops so hosts implement only what they
/// consume.
pub trait HostEvents: Send + Sync {
    /// A bulb was seen for the first time.
    fn device_discovered(&self, _record: &BulbRecord) {}

    /// A known bulb was re-sighted or its cached state changed.
    fn device_updated(&self, _record: &BulbRecord) {}
}

/// Host event sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostEvents;

impl HostEvents for NoHostEvents {}

/// Bridge configuration, assembled from the host's parameter surface.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Subnet whose broadcast address discovery probes target
    pub subnet: SubnetConfig,
    /// Cadence the host promised for heartbeat triggers. Stored for the
    /// host's benefit; the bridge has no internal timer.
    pub heartbeat_interval: Duration,
    /// Wall-clock bound for one discovery pass
    pub discovery_timeout: Duration,
    /// Per-attempt bound for command acknowledgments
    pub command_timeout: Duration,
    /// Discovery destination port; the Wiz port unless an emulator or
    /// test overrides it
    pub discovery_port: u16,
}

impl BridgeConfig {
    /// Build a config from raw host parameters.
    ///
    /// A malformed subnet string fails with `InvalidSubnetConfig`; there
    /// is deliberately no fallback subnet, so a misconfigured host sees
    /// the error instead of silently probing the wrong network.
    pub fn from_host_params(subnet: &str, heartbeat_secs: u64) -> Result<Self> {
        Ok(BridgeConfig {
            subnet: subnet.parse()?,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            discovery_port: WIZ_PORT,
        })
    }
}

/// The plugin core: registry, discovery, and dispatch behind the two
/// host trigger points.
pub struct WizBridge<T: Transport = UdpTransport> {
    config: BridgeConfig,
    registry: Arc<DeviceRegistry>,
    discovery: DiscoveryEngine,
    dispatcher: CommandDispatcher<T>,
    events: Box<dyn HostEvents>,
}

impl WizBridge<UdpTransport> {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_events(config, Box::new(NoHostEvents))
    }

    pub fn with_events(config: BridgeConfig, events: Box<dyn HostEvents>) -> Self {
        Self::with_transport(config, UdpTransport, events)
    }
}

impl<T: Transport> WizBridge<T> {
    pub fn with_transport(config: BridgeConfig, transport: T, events: Box<dyn HostEvents>) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let discovery = DiscoveryEngine::new(Arc::clone(&registry));
        let dispatcher = CommandDispatcher::with_transport(Arc::clone(&registry), transport)
            .with_timeout(config.command_timeout);
        WizBridge {
            config,
            registry,
            discovery,
            dispatcher,
            events,
        }
    }

    /// The cadence the host configured for heartbeat triggers.
    pub fn heartbeat_interval(&self) -> Duration {
        self.config.heartbeat_interval
    }

    /// Shared handle to the registry.
    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Snapshot of all known bulbs for the host's device model.
    pub fn devices(&self) -> Vec<BulbRecord> {
        self.registry.list()
    }

    /// Periodic trigger: run one discovery pass.
    ///
    /// Failures are logged and swallowed; the host's next heartbeat
    /// simply tries again.
    pub async fn on_heartbeat(&self) {
        let mut request = DiscoveryRequest::for_subnet(&self.config.subnet)
            .with_timeout(self.config.discovery_timeout);
        request.port = self.config.discovery_port;

        match self.discovery.discover(&request).await {
            Ok(found) => {
                info!("discovered {} Wiz bulbs", found.len());
                for discovered in found {
                    match discovered.outcome {
                        UpsertOutcome::Created => {
                            info!(
                                "found bulb: {} (MAC: {})",
                                discovered.record.addr, discovered.record.mac
                            );
                            self.events.device_discovered(&discovered.record);
                        }
                        UpsertOutcome::Updated => self.events.device_updated(&discovered.record),
                    }
                }
            }
            Err(err) => error!("discovery failed: {err}"),
        }
    }

    /// Command trigger: dispatch one command to one bulb.
    ///
    /// Returns the specific error kind so the host decides user-visible
    /// messaging.
    pub async fn on_command(&self, request: &CommandRequest) -> Result<Ack> {
        match self.dispatcher.dispatch(request).await {
            Ok(ack) => {
                if let Ok(record) = self.registry.get(&ack.mac) {
                    self.events.device_updated(&record);
                }
                Ok(ack)
            }
            Err(err) => {
                warn!("command for {} failed: {err}", request.mac);
                Err(err)
            }
        }
    }
}
