//! Subnet configuration and broadcast address derivation.

use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::errors::Error;

/// A host-configured IPv4 subnet in CIDR notation.
///
/// The host supplies the subnet as a string (e.g. `"192.168.1.0/24"`);
/// discovery derives the broadcast address from it. Host bits set in the
/// input are masked off rather than rejected.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use std::str::FromStr;
/// use wiz_bridge_rs::SubnetConfig;
///
/// let subnet = SubnetConfig::from_str("192.168.1.0/24").unwrap();
/// assert_eq!(subnet.broadcast(), Ipv4Addr::new(192, 168, 1, 255));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetConfig {
    network: Ipv4Addr,
    prefix: u8,
}

impl SubnetConfig {
    /// Create a subnet from a network address and prefix length.
    ///
    /// Returns `InvalidSubnetConfig` if the prefix exceeds 32.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, Error> {
        if prefix > 32 {
            return Err(Error::invalid_subnet(
                &format!("{addr}/{prefix}"),
                "prefix length must be 0-32",
            ));
        }
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask(prefix));
        Ok(SubnetConfig { network, prefix })
    }

    /// The network address (host bits zeroed).
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// The prefix length.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The directed broadcast address of this subnet.
    ///
    /// Computed as `network | !mask`. A `/32` has no host bits, so its
    /// broadcast is the address itself.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !Self::mask(self.prefix))
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        }
    }
}

impl FromStr for SubnetConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let Some((addr_part, prefix_part)) = s.split_once('/') else {
            return Err(Error::invalid_subnet(s, "expected CIDR notation a.b.c.d/n"));
        };
        let addr = Ipv4Addr::from_str(addr_part.trim())
            .map_err(|_| Error::invalid_subnet(s, "invalid IPv4 address"))?;
        let prefix: u8 = prefix_part
            .trim()
            .parse()
            .map_err(|_| Error::invalid_subnet(s, "invalid prefix length"))?;
        SubnetConfig::new(addr, prefix)
    }
}

impl std::fmt::Display for SubnetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}
