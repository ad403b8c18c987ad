//! Host addresses and host-in-network (cidr) addresses.
//!
//! Pure value types: parsing, canonical formatting and network arithmetic.
//! Persistence converts them from and to their canonical strings.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

// Error handling
use wgtool_error::WgError;

/// A single host ip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(IpAddr);

impl Address {
    pub fn ip(&self) -> IpAddr {
        self.0
    }
    /*
     * The address right after this one,
     * or None on overflow.
     */
    pub fn next(&self) -> Option<Address> {
        let next = match self.0 {
            IpAddr::V4(v) => IpAddr::V4(Ipv4Addr::from(u32::from(v).checked_add(1)?)),
            IpAddr::V6(v) => IpAddr::V6(Ipv6Addr::from(u128::from(v).checked_add(1)?)),
        };
        Some(Address(next))
    }
}
impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address(ip)
    }
}
impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address(IpAddr::V4(ip))
    }
}
impl From<Address> for IpAddr {
    fn from(address: Address) -> Self {
        address.0
    }
}
impl FromStr for Address {
    type Err = WgError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(Address)
            .map_err(|e| WgError::InvalidAddress(format!("{s}: {e}")))
    }
}
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/**
A host address together with the network it lives in.

The host part is kept as is, so "192.168.0.1/24" formats back to
"192.168.0.1/24" and not to its network "192.168.0.0/24".
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CidrAddress(IpNet);

impl CidrAddress {
    pub fn new(address: Address, prefix_len: u8) -> Result<Self, WgError> {
        let net = IpNet::new(address.ip(), prefix_len)
            .map_err(|e| WgError::InvalidAddress(format!("{address}/{prefix_len}: {e}")))?;
        Ok(CidrAddress(net))
    }
    pub fn address(&self) -> Address {
        Address(self.0.addr())
    }
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }
    /// Same prefix, host bits cleared.
    pub fn network(&self) -> CidrAddress {
        CidrAddress(self.0.trunc())
    }
    pub fn is_network(&self) -> bool {
        self.0.addr() == self.0.network()
    }
    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(&address.ip())
    }
    /*
     * Usable host addresses of the network, in ascending order.
     * For ipv4 networks larger than /31,
     * the network and broadcast addresses are left out.
     */
    pub fn hosts(&self) -> impl Iterator<Item = Address> {
        self.0.trunc().hosts().map(Address)
    }
    /// Whether `hosts()` would yield this address.
    pub fn is_host(&self, address: &Address) -> bool {
        if !self.contains(address) {
            return false;
        }
        match self.0 {
            IpNet::V4(net) if net.prefix_len() < 31 => {
                address.ip() != IpAddr::V4(net.network())
                    && address.ip() != IpAddr::V4(net.broadcast())
            }
            _ => true,
        }
    }
    /// The same network with another host inside it.
    pub fn with_host(&self, address: Address) -> Result<CidrAddress, WgError> {
        if !self.contains(&address) {
            let message = format!("{address} is outside of {}", self.network());
            return Err(WgError::InvalidAddress(message));
        }
        CidrAddress::new(address, self.prefix_len())
    }
    pub fn as_ipnet(&self) -> &IpNet {
        &self.0
    }
}
impl From<IpNet> for CidrAddress {
    fn from(net: IpNet) -> Self {
        CidrAddress(net)
    }
}
impl FromStr for CidrAddress {
    type Err = WgError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpNet>()
            .map(CidrAddress)
            .map_err(|e| WgError::InvalidAddress(format!("{s}: {e}")))
    }
}
impl fmt::Display for CidrAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn cidr_round_trip() -> Result<()> {
        let cases = [
            "192.168.0.1/24",
            "192.168.23.23/23",
            "123.123.123.123/32",
            "10.0.0.0/8",
            "fd00::1/64",
        ];
        for case in cases {
            let cidr = CidrAddress::from_str(case)?;
            assert_eq!(cidr.to_string(), case);
        }
        Ok(())
    }

    #[test]
    fn cidr_rejects_malformed() {
        let cases = [
            "123.123.123.256/24",
            "10.0.0.1/33",
            "10.0.0.1",
            "10.0.0/24",
            "not-a-cidr",
            "",
            " 10.0.0.1/24",
        ];
        for case in cases {
            let res = CidrAddress::from_str(case);
            assert!(
                matches!(res, Err(WgError::InvalidAddress(_))),
                "{case:?} should not parse"
            );
        }
    }

    #[test]
    fn network_projection() -> Result<()> {
        let cidr = CidrAddress::from_str("192.168.1.22/24")?;
        assert_eq!(cidr.network().to_string(), "192.168.1.0/24");
        assert_eq!(cidr.address().to_string(), "192.168.1.22");
        assert!(!cidr.is_network());
        assert!(cidr.network().is_network());
        Ok(())
    }

    #[test]
    fn hosts_skip_network_and_broadcast() -> Result<()> {
        let cidr = CidrAddress::from_str("127.0.0.0/30")?;
        let hosts: Vec<String> = cidr.hosts().map(|e| e.to_string()).collect();
        assert_eq!(hosts, vec!["127.0.0.1", "127.0.0.2"]);

        assert!(cidr.is_host(&Address::from_str("127.0.0.2")?));
        assert!(!cidr.is_host(&Address::from_str("127.0.0.3")?));
        assert!(!cidr.is_host(&Address::from_str("127.0.0.0")?));
        assert!(!cidr.is_host(&Address::from_str("127.0.0.4")?));
        Ok(())
    }

    #[test]
    fn with_host_stays_in_network() -> Result<()> {
        let cidr = CidrAddress::from_str("10.8.0.0/24")?;
        let host = cidr.with_host(Address::from_str("10.8.0.7")?)?;
        assert_eq!(host.to_string(), "10.8.0.7/24");

        let outside = cidr.with_host(Address::from_str("10.9.0.7")?);
        assert!(matches!(outside, Err(WgError::InvalidAddress(_))));
        Ok(())
    }

    #[test]
    fn address_next() -> Result<()> {
        let address = Address::from_str("10.0.0.255")?;
        assert_eq!(address.next().map(|e| e.to_string()), Some("10.0.1.0".to_owned()));
        assert_eq!(Address::from_str("255.255.255.255")?.next(), None);
        Ok(())
    }
}
