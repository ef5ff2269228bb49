//! # wiz_bridge_rs
//!
//! Discovery and command-dispatch core for bridging a home-automation
//! host to Wiz smart bulbs over UDP.
//!
//! The host framework owns the scheduler, persistence, and UI; this
//! crate owns the three pieces in between:
//!
//! - [`DeviceRegistry`]: in-memory table of known bulbs keyed by MAC
//!   address, tracking address, capabilities, and last-confirmed state.
//! - [`DiscoveryEngine`]: broadcast discovery passes on a configured
//!   subnet, reconciled into the registry.
//! - [`CommandDispatcher`]: translates host commands (power,
//!   brightness, color, color temperature) into the bulb wire protocol
//!   and applies acknowledged state back to the registry.
//!
//! [`WizBridge`] wires the three behind the two host trigger points
//! (periodic heartbeat, device command).
//!
//! ## Quick Start
//!
//! ```ignore
//! use wiz_bridge_rs::{BridgeConfig, CommandRequest, PowerMode, WizBridge};
//!
//! async fn run() -> Result<(), wiz_bridge_rs::Error> {
//!     let config = BridgeConfig::from_host_params("192.168.1.0/24", 10)?;
//!     let bridge = WizBridge::new(config);
//!
//!     // The host calls this at its heartbeat cadence.
//!     bridge.on_heartbeat().await;
//!
//!     for bulb in bridge.devices() {
//!         let command = CommandRequest::new(&bulb.mac).power(PowerMode::On);
//!         bridge.on_command(&command).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Communication
//!
//! All communication with Wiz bulbs occurs over UDP on port 38899.
//! Discovery computes the probe's broadcast address from the host's
//! CIDR subnet configuration; commands go unicast to the address each
//! bulb was last discovered at.
//!
//! The registry lives as long as the process: nothing is persisted, and
//! a bulb that stops responding is aged via `last_seen`, never dropped.

mod bridge;
mod capabilities;
mod discovery;
mod dispatch;
mod errors;
mod payload;
mod registry;
mod state;
mod subnet;
mod transport;
mod types;

// Re-export public API
pub use bridge::{BridgeConfig, HostEvents, NoHostEvents, WizBridge};
pub use capabilities::{BulbClass, Capabilities, KelvinRange, SystemConfig};
pub use discovery::{Discovered, DiscoveryEngine, DiscoveryRequest, WIZ_PORT};
pub use dispatch::{Ack, CommandDispatcher, CommandRequest};
pub use errors::Error;
pub use payload::Payload;
pub use registry::{BulbRecord, DeviceRegistry, UpsertOutcome};
pub use state::BulbState;
pub use subnet::SubnetConfig;
pub use transport::{Transport, TransportError, UdpTransport};
pub use types::{Brightness, Color, Kelvin, PowerMode};
