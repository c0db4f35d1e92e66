//! CIDR helpers for prefixes and addresses read from NetBox.
//!
//! [`Cidr`] wraps an [`IpNetwork`], which owns parsing, masking and the
//! network and broadcast addresses. On top of it sit the usable host range
//! and the offsets the IP pool synchronizer needs.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnetwork::IpNetwork;

/// An address with a prefix length, e.g. `10.10.10.0/24` or `10.0.0.7/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr(IpNetwork);

impl FromStr for Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // IpNetwork accepts a bare or shortened address, NetBox always
        // sends both parts in full
        let (address, prefix_len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| "missing prefix length".to_string())?;
        let address: IpAddr = address
            .parse()
            .map_err(|e| format!("invalid address {:?}: {}", address, e))?;
        let prefix_len: u8 = prefix_len
            .parse()
            .map_err(|e| format!("invalid prefix length {:?}: {}", prefix_len, e))?;
        Self::new(address, prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_bits(address: IpAddr) -> u128 {
    match address {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

impl Cidr {
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, String> {
        IpNetwork::new(address, prefix_len)
            .map(Self)
            .map_err(|e| format!("invalid prefix length {} for {}: {}", prefix_len, address, e))
    }

    pub fn address(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix()
    }

    /// Address length of the family: 32 or 128
    pub fn max_len(&self) -> u8 {
        if self.0.is_ipv4() { 32 } else { 128 }
    }

    /// First address of the prefix with all host bits cleared
    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    fn from_bits(&self, bits: u128) -> Option<IpAddr> {
        match self.0 {
            IpNetwork::V4(_) => u32::try_from(bits).ok().map(|v4| IpAddr::V4(Ipv4Addr::from(v4))),
            IpNetwork::V6(_) => Some(IpAddr::V6(Ipv6Addr::from(bits))),
        }
    }

    /// The address `offset` positions after `address`, if it stays inside
    /// the prefix
    pub fn offset(&self, offset: u128) -> Option<IpAddr> {
        let bits = to_bits(self.address()).checked_add(offset)?;
        if bits > to_bits(self.0.broadcast()) {
            return None;
        }
        self.from_bits(bits)
    }

    /// The prefix covering this address at `prefix_len`, `None` if the
    /// length exceeds the family
    pub fn masked(&self, prefix_len: u8) -> Option<Cidr> {
        let covering = IpNetwork::new(self.address(), prefix_len).ok()?;
        IpNetwork::new(covering.network(), prefix_len).ok().map(Cidr)
    }

    /// First and last usable host address.
    ///
    /// IPv4 prefixes up to /30 exclude network and broadcast addresses,
    /// IPv6 prefixes up to /126 exclude the subnet-router anycast address.
    /// Point-to-point prefixes (/31, /127) and single addresses use every
    /// address.
    fn usable_range(&self) -> (u128, u128) {
        let network = to_bits(self.0.network());
        let last = to_bits(self.0.broadcast());
        match (self.0, self.max_len() - self.prefix_len()) {
            (_, 0 | 1) => (network, last),
            (IpNetwork::V4(_), _) => (network + 1, last - 1),
            (IpNetwork::V6(_), _) => (network + 1, last),
        }
    }

    /// Number of usable host addresses
    pub fn host_capacity(&self) -> u128 {
        let (first, last) = self.usable_range();
        (last - first).saturating_add(1)
    }

    /// The last `n` usable host addresses in ascending order, clamped to
    /// the capacity of the prefix
    pub fn last_host_addresses(&self, n: u32) -> Vec<IpAddr> {
        let (first, last) = self.usable_range();
        let count = u128::from(n).min(self.host_capacity());
        if count == 0 {
            return Vec::new();
        }
        let start = (last - (count - 1)).max(first);
        (start..=last).filter_map(|bits| self.from_bits(bits)).collect()
    }

    /// Whether `address` lies inside this prefix
    pub fn contains(&self, address: IpAddr) -> bool {
        self.0.contains(address)
    }
}
