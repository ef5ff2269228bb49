//! In-memory registry of discovered bulbs.

use std::net::Ipv4Addr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::capabilities::Capabilities;
use crate::errors::Error;
use crate::payload::Payload;
use crate::state::BulbState;

type Result<T> = std::result::Result<T, Error>;

/// One physically discovered bulb.
///
/// The MAC address is the primary key; the IP address is whatever the
/// most recent discovery response reported and may change between
/// passes (DHCP churn).
#[derive(Debug, Clone)]
pub struct BulbRecord {
    /// MAC address of the bulb (stable hardware identifier)
    pub mac: String,
    /// Current reachable IP address
    pub addr: Ipv4Addr,
    /// Features the bulb supports
    pub capabilities: Capabilities,
    /// Last confirmed state, or `None` if never queried or commanded
    pub state: Option<BulbState>,
    /// Time of the most recent discovery sighting or command ack
    pub last_seen: Instant,
    /// Staleness annotation, set by [`DeviceRegistry::mark_stale`]
    pub stale: Option<String>,
}

impl BulbRecord {
    pub fn new(mac: &str, addr: Ipv4Addr, capabilities: Capabilities) -> Self {
        BulbRecord {
            mac: mac.to_string(),
            addr,
            capabilities,
            state: None,
            last_seen: Instant::now(),
            stale: None,
        }
    }

    /// Attach an initial state (e.g. the power state a discovery
    /// response reported).
    pub fn with_state(mut self, state: BulbState) -> Self {
        self.state = Some(state);
        self
    }

    /// Time elapsed since this bulb was last seen.
    pub fn last_seen_age(&self) -> Duration {
        self.last_seen.elapsed()
    }
}

/// Outcome of a registry upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of this MAC; a record was created.
    Created,
    /// The MAC was already known; the record was refreshed in place.
    Updated,
}

/// Table of known bulbs, keyed by MAC address.
///
/// Records are created only by discovery and never removed; a bulb that
/// stops responding keeps its identity and ages via `last_seen`. All
/// access goes through a reader/writer lock held only for the duration
/// of a single lookup or record mutation, never across network waits.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    records: RwLock<IndexMap<String, BulbRecord>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a record by MAC address.
    ///
    /// A merge refreshes the address, capabilities, and `last_seen`,
    /// clears any stale marker, and folds the incoming state into the
    /// existing one. A known state is never regressed to unknown: an
    /// incoming record without state leaves the stored state untouched.
    pub fn upsert(&self, record: BulbRecord) -> UpsertOutcome {
        let mut records = self.records.write().unwrap();
        match records.get_mut(&record.mac) {
            Some(existing) => {
                existing.addr = record.addr;
                existing.capabilities = record.capabilities;
                existing.last_seen = record.last_seen;
                existing.stale = None;
                if let Some(new) = record.state {
                    match &mut existing.state {
                        Some(current) => current.update(&new),
                        slot => *slot = Some(new),
                    }
                }
                UpsertOutcome::Updated
            }
            None => {
                records.insert(record.mac.clone(), record);
                UpsertOutcome::Created
            }
        }
    }

    /// Look up a record by MAC address.
    pub fn get(&self, mac: &str) -> Result<BulbRecord> {
        self.records
            .read()
            .unwrap()
            .get(mac)
            .cloned()
            .ok_or_else(|| Error::NotFound(mac.to_string()))
    }

    /// Snapshot of all records in insertion order.
    ///
    /// The returned sequence reflects the registry at call time and is
    /// unaffected by concurrent upserts.
    pub fn list(&self) -> Vec<BulbRecord> {
        self.records.read().unwrap().values().cloned().collect()
    }

    /// Annotate a record as stale. The record is not removed.
    pub fn mark_stale(&self, mac: &str, reason: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(mac)
            .ok_or_else(|| Error::NotFound(mac.to_string()))?;
        record.stale = Some(reason.to_string());
        Ok(())
    }

    /// Record a confirmed command application.
    ///
    /// Folds the acknowledged payload into the stored state, refreshes
    /// `last_seen`, and clears any stale marker.
    pub(crate) fn apply_payload(&self, mac: &str, payload: &Payload) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(mac)
            .ok_or_else(|| Error::NotFound(mac.to_string()))?;
        match &mut record.state {
            Some(state) => state.update_from_payload(payload),
            slot => *slot = Some(BulbState::from(payload)),
        }
        record.last_seen = Instant::now();
        record.stale = None;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Brightness, Color, PowerMode};

    fn record(mac: &str, last_octet: u8) -> BulbRecord {
        BulbRecord::new(
            mac,
            Ipv4Addr::new(192, 168, 1, last_octet),
            Capabilities::from_module_name("ESP01_SHRGB1C_31"),
        )
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let registry = DeviceRegistry::new();
        assert_eq!(registry.upsert(record("aa:bb", 10)), UpsertOutcome::Created);
        assert_eq!(registry.upsert(record("aa:bb", 20)), UpsertOutcome::Updated);

        assert_eq!(registry.len(), 1);
        let stored = registry.get("aa:bb").unwrap();
        assert_eq!(stored.addr, Ipv4Addr::new(192, 168, 1, 20));
    }

    #[test]
    fn test_upsert_never_regresses_state() {
        let registry = DeviceRegistry::new();
        let seeded =
            record("aa:bb", 10).with_state(BulbState::from(&Payload::from(Color::rgb(0, 255, 0))));
        registry.upsert(seeded);

        // Re-sighting with no state keeps what we knew.
        registry.upsert(record("aa:bb", 11));
        let stored = registry.get("aa:bb").unwrap();
        assert_eq!(stored.state.unwrap().color(), Some(Color::rgb(0, 255, 0)));

        // A newer explicit state overwrites field by field.
        let newer = record("aa:bb", 11)
            .with_state(BulbState::from(&Payload::from(Brightness::create(50).unwrap())));
        registry.upsert(newer);
        let state = registry.get("aa:bb").unwrap().state.unwrap();
        assert_eq!(state.color(), Some(Color::rgb(0, 255, 0)));
        assert_eq!(state.brightness().unwrap().value(), 50);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry = DeviceRegistry::new();
        assert_eq!(
            registry.get("cc:dd").unwrap_err(),
            Error::NotFound("cc:dd".into())
        );
    }

    #[test]
    fn test_list_is_insertion_ordered_snapshot() {
        let registry = DeviceRegistry::new();
        registry.upsert(record("aa:bb", 10));
        registry.upsert(record("cc:dd", 11));
        registry.upsert(record("aa:bb", 12)); // update must not reorder

        let snapshot = registry.list();
        let macs: Vec<&str> = snapshot.iter().map(|r| r.mac.as_str()).collect();
        assert_eq!(macs, ["aa:bb", "cc:dd"]);

        // Mutations after the snapshot do not affect it.
        registry.upsert(record("ee:ff", 13));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_mark_stale_keeps_record() {
        let registry = DeviceRegistry::new();
        registry.upsert(record("aa:bb", 10));
        registry.mark_stale("aa:bb", "missed 3 passes").unwrap();

        let stored = registry.get("aa:bb").unwrap();
        assert_eq!(stored.stale.as_deref(), Some("missed 3 passes"));

        // A fresh sighting clears the marker.
        registry.upsert(record("aa:bb", 10));
        assert!(registry.get("aa:bb").unwrap().stale.is_none());
    }

    #[test]
    fn test_apply_payload_merges_and_refreshes() {
        let registry = DeviceRegistry::new();
        registry.upsert(record("aa:bb", 10));

        let mut payload = Payload::new();
        payload.power(PowerMode::On);
        payload.brightness(Brightness::create(75).unwrap());
        registry.apply_payload("aa:bb", &payload).unwrap();

        let state = registry.get("aa:bb").unwrap().state.unwrap();
        assert!(state.emitting());
        assert_eq!(state.brightness().unwrap().value(), 75);
    }
}
